//! Transfer exchange: decode uploads, persist them, and render responses.
//!
//! An upload moves through negotiation (pick a responder from `Accept`),
//! decoding (one processor per `Content-Type`), persistence and rendering.
//! Any step may fail; nothing is retried.

pub mod context;
pub mod download;
pub mod respond;
pub mod upload;

pub use context::TransferContext;
pub use download::{DownloadResponder, parse_download_path};
pub use respond::{ResponseFormat, UploadResponder, UploadResponse, UploadedFile};
pub use upload::{UploadPipeline, UploadRequestProcessor, processor_for};
