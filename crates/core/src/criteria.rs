//! Lookup criteria built from request parameters.

use crate::error::{Error, Result};
use crate::params::{APPLICATION_FOLDER, FILE_NAME, Parameters, RequestParameters, USER_ID};
use crate::payload::validate_segment;
use std::fmt;
use std::str::FromStr;

/// Identity descriptor used to find a stored artifact.
///
/// `artifact_name` and `owner_id` are always non-blank. A blank application
/// folder is stored as `None`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Criteria {
    artifact_name: String,
    owner_id: String,
    application_folder: Option<String>,
}

impl Criteria {
    pub fn new(
        artifact_name: impl Into<String>,
        owner_id: impl Into<String>,
        application_folder: Option<String>,
    ) -> Result<Self> {
        let artifact_name = artifact_name.into();
        let owner_id = owner_id.into();
        if artifact_name.trim().is_empty() {
            return Err(Error::MissingParameter(FILE_NAME));
        }
        if owner_id.trim().is_empty() {
            return Err(Error::MissingParameter(USER_ID));
        }
        Ok(Self {
            artifact_name,
            owner_id,
            application_folder: application_folder.filter(|f| !f.trim().is_empty()),
        })
    }

    /// Build criteria from normalized request metadata.
    pub fn from_params(params: &Parameters) -> Result<Self> {
        Self::new(
            params.get(FILE_NAME).cloned().unwrap_or_default(),
            params.get(USER_ID).cloned().unwrap_or_default(),
            params.get(APPLICATION_FOLDER).cloned(),
        )
    }

    pub fn artifact_name(&self) -> &str {
        &self.artifact_name
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn application_folder(&self) -> Option<&str> {
        self.application_folder.as_deref()
    }

    /// Check that every segment is a plain file or directory name.
    pub fn check_segments(&self) -> Result<()> {
        validate_segment(USER_ID, &self.owner_id)?;
        if let Some(folder) = &self.application_folder {
            validate_segment(APPLICATION_FOLDER, folder)?;
        }
        validate_segment(FILE_NAME, &self.artifact_name)
    }

    /// Location segments in repository order: owner, folder, name.
    pub fn segments(&self) -> Vec<&str> {
        let mut segments = Vec::with_capacity(3);
        segments.push(self.owner_id.as_str());
        if let Some(folder) = &self.application_folder {
            segments.push(folder.as_str());
        }
        segments.push(self.artifact_name.as_str());
        segments
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments().join("/"))
    }
}

/// Criteria implementations selectable by name in configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CriteriaKind {
    /// Owner, optional application folder, artifact name.
    #[default]
    Default,
}

impl CriteriaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
        }
    }

    /// Parameters this kind reads from a request.
    pub fn parameters(&self) -> RequestParameters {
        match self {
            Self::Default => RequestParameters::DEFAULT,
        }
    }

    /// Validate `params` against this kind and build the criteria.
    pub fn build(&self, params: &Parameters) -> Result<Criteria> {
        self.parameters().check_required(params)?;
        match self {
            Self::Default => Criteria::from_params(params),
        }
    }
}

impl FromStr for CriteriaKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            other => Err(Error::Config(format!("unknown criteria kind: {other}"))),
        }
    }
}
