//! Upload responses: `Accept` negotiation and rendering.

use super::context::TransferContext;
use crate::error::{ApiError, ApiResult};
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use courier_storage::ManagedArtifact;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};

/// Characters escaped in URL path segments (RFC 3986 unreserved are kept).
pub const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Rendering selected for an upload response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Text,
}

impl ResponseFormat {
    /// Pick a rendering from the `Accept` header.
    ///
    /// Only the literal `application/json` and `text/plain` ranges count,
    /// parameters ignored. JSON wins when both are listed. A missing header
    /// or one naming neither is refused.
    pub fn negotiate(headers: &HeaderMap) -> ApiResult<Self> {
        let values: Vec<&str> = headers
            .get_all(ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        let accept = values.join(",");

        let ranges: Vec<String> = accept
            .split(',')
            .filter_map(|range| range.split(';').next())
            .map(|media| media.trim().to_ascii_lowercase())
            .collect();
        if ranges.iter().any(|m| m == "application/json") {
            Ok(Self::Json)
        } else if ranges.iter().any(|m| m == "text/plain") {
            Ok(Self::Text)
        } else {
            Err(ApiError::NotAcceptable(accept))
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Text => "text/plain; charset=utf-8",
        }
    }
}

/// One saved file in an upload response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub url: String,
}

/// JSON body of an upload response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub files: Vec<UploadedFile>,
}

impl UploadResponse {
    /// `fileName=<name>,url=<url>` records joined by `;`.
    pub fn to_text(&self) -> String {
        let records: Vec<String> = self
            .files
            .iter()
            .map(|f| format!("fileName={},url={}", f.file_name, f.url))
            .collect();
        let mut text = records.join(";");
        text.push('\n');
        text
    }
}

/// Renders saved artifacts as download URLs.
#[derive(Debug, Clone, Copy)]
pub struct UploadResponder {
    format: ResponseFormat,
}

impl UploadResponder {
    pub fn new(format: ResponseFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> ResponseFormat {
        self.format
    }

    /// Build the response body, checking each artifact landed where the
    /// request metadata addressed it.
    pub fn collect(
        &self,
        ctx: &TransferContext,
        artifacts: &[Box<dyn ManagedArtifact>],
    ) -> ApiResult<UploadResponse> {
        if artifacts.is_empty() {
            return Err(ApiError::NothingUploaded);
        }

        let expected = ctx.expected_segments();
        let mut files = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let actual = artifact.identity().segments();
            if actual != expected {
                return Err(ApiError::LocationMismatch {
                    expected: expected.join("/"),
                    actual: actual.join("/"),
                });
            }
            let encoded: Vec<String> = actual
                .iter()
                .map(|s| utf8_percent_encode(s, SEGMENT).to_string())
                .collect();
            files.push(UploadedFile {
                file_name: artifact.name().to_string(),
                url: format!("{}/{}", ctx.request_url(), encoded.join("/")),
            });
        }
        Ok(UploadResponse { files })
    }

    pub fn respond(
        &self,
        ctx: &TransferContext,
        artifacts: &[Box<dyn ManagedArtifact>],
    ) -> ApiResult<Response> {
        let body = self.collect(ctx, artifacts)?;
        let rendered = match self.format {
            ResponseFormat::Json => serde_json::to_string(&body)
                .map_err(|e| ApiError::Internal(format!("failed to render response: {e}")))?,
            ResponseFormat::Text => body.to_text(),
        };
        Ok((
            StatusCode::OK,
            [(CONTENT_TYPE, self.format.content_type())],
            rendered,
        )
            .into_response())
    }
}
