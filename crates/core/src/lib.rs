//! Core domain types for the courier artifact transfer service.
//!
//! This crate defines the data model shared by the repository and the HTTP
//! server:
//! - Request parameter tables and lookup criteria
//! - Artifact identity derived from repository paths
//! - The normalized upload payload
//! - Application configuration

pub mod config;
pub mod criteria;
pub mod error;
pub mod identity;
pub mod kind;
pub mod params;
pub mod payload;

pub use criteria::{Criteria, CriteriaKind};
pub use error::{Error, Result};
pub use identity::ArtifactIdentity;
pub use kind::ArtifactKind;
pub use params::{Parameters, RequestParameters};
pub use payload::{UploadedPayload, UploadedPayloadBuilder, validate_segment};

/// Default artifact time-to-live: 24 hours.
pub const DEFAULT_ARTIFACT_TTL_MS: u64 = 24 * 60 * 60 * 1000;

/// Default maximum upload size: 100 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
