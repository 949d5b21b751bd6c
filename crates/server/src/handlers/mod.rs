//! HTTP request handlers.

pub mod health;
pub mod transfer;

pub use health::*;
pub use transfer::*;
