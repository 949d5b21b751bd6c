//! Application state shared across handlers.

use courier_core::CriteriaKind;
use courier_core::config::AppConfig;
use courier_storage::ArtifactRepository;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Artifact repository.
    pub repository: Arc<dyn ArtifactRepository>,
    /// Criteria kind used to read request parameters.
    pub criteria_kind: CriteriaKind,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Fails if the configuration does not validate.
    pub fn new(
        config: AppConfig,
        repository: Arc<dyn ArtifactRepository>,
    ) -> courier_core::Result<Self> {
        config.validate().map_err(courier_core::Error::Config)?;
        let criteria_kind = config.repository.criteria_kind()?;

        Ok(Self {
            config: Arc::new(config),
            repository,
            criteria_kind,
        })
    }

    /// Largest accepted upload, in bytes.
    pub fn max_file_size(&self) -> usize {
        self.config.repository.max_file_size()
    }
}
