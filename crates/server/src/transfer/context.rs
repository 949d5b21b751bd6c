//! Per-request transfer context.

use crate::state::AppState;
use axum::http::header::HOST;
use axum::http::{HeaderMap, Method, Uri};
use courier_core::params::{APPLICATION_FOLDER, FILE_NAME, USER_ID};
use courier_core::{Parameters, RequestParameters};

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// State carried through one transfer exchange.
///
/// Holds a snapshot of the request line and headers so the body can be handed
/// to a processor, plus the normalized metadata the processor recorded.
#[derive(Debug, Clone)]
pub struct TransferContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    request_url: String,
    parameters: RequestParameters,
    max_file_size: usize,
    metadata: Parameters,
}

impl TransferContext {
    pub fn new(state: &AppState, method: &Method, uri: &Uri, headers: &HeaderMap) -> Self {
        let base = match state.config.server.public_base_url.as_deref() {
            Some(url) if !url.trim().is_empty() => url.trim().trim_end_matches('/').to_string(),
            _ => match headers.get(HOST).and_then(|h| h.to_str().ok()) {
                Some(host) => {
                    let scheme = headers
                        .get(FORWARDED_PROTO)
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("http");
                    format!("{scheme}://{host}")
                }
                None => format!("http://{}", state.config.server.bind),
            },
        };
        let request_url = format!("{base}{}", uri.path().trim_end_matches('/'));

        Self {
            method: method.clone(),
            uri: uri.clone(),
            headers: headers.clone(),
            request_url,
            parameters: state.criteria_kind.parameters(),
            max_file_size: state.max_file_size(),
            metadata: Parameters::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Absolute URL the request was addressed to, without a trailing slash.
    pub fn request_url(&self) -> &str {
        &self.request_url
    }

    pub fn parameters(&self) -> RequestParameters {
        self.parameters
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Normalized metadata recorded by the upload processor.
    pub fn metadata(&self) -> &Parameters {
        &self.metadata
    }

    pub fn set_metadata(&mut self, metadata: Parameters) {
        self.metadata = metadata;
    }

    /// Known parameters found in the request headers.
    pub fn header_parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        for (name, value) in &self.headers {
            if let Ok(value) = value.to_str() {
                self.parameters.collect(&mut params, name.as_str(), value);
            }
        }
        params
    }

    /// Location segments the request metadata addresses.
    pub fn expected_segments(&self) -> Vec<&str> {
        let mut segments = Vec::with_capacity(3);
        if let Some(owner) = self.metadata.get(USER_ID) {
            segments.push(owner.as_str());
        }
        if let Some(folder) = self.metadata.get(APPLICATION_FOLDER)
            && !folder.is_empty()
        {
            segments.push(folder.as_str());
        }
        if let Some(name) = self.metadata.get(FILE_NAME) {
            segments.push(name.as_str());
        }
        segments
    }
}
