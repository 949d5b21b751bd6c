//! HTTP artifact transfer server.
//!
//! This crate provides:
//! - Artifact upload (raw body or multipart) with negotiated responses
//! - Artifact download and presence probes
//! - The periodic expiry sweep
//! - Health and Prometheus endpoints

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod sweeper;
pub mod transfer;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
pub use sweeper::spawn_sweeper;
