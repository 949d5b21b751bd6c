//! Artifact downloads.

use crate::error::{ApiError, ApiResult};
use axum::body::Body;
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use courier_core::Criteria;
use courier_storage::ManagedArtifact;
use percent_encoding::{percent_decode_str, utf8_percent_encode};

use super::respond::SEGMENT;

/// Parse `/{mount}/{owner}[/{folder}]/{name}` into lookup criteria.
///
/// The leading mount segment is discarded. Remaining segments are
/// percent-decoded; any count other than two or three is rejected.
pub fn parse_download_path(raw_path: &str) -> ApiResult<Criteria> {
    let mut segments: Vec<&str> = raw_path.trim_start_matches('/').split('/').collect();
    if segments.is_empty() {
        return Err(ApiError::BadPath(raw_path.to_string()));
    }
    segments.remove(0);

    if !(2..=3).contains(&segments.len()) || segments.iter().any(|s| s.is_empty()) {
        return Err(ApiError::BadPath(raw_path.to_string()));
    }

    let decoded = segments
        .iter()
        .map(|s| {
            percent_decode_str(s)
                .decode_utf8()
                .map(|d| d.into_owned())
                .map_err(|_| ApiError::BadPath(raw_path.to_string()))
        })
        .collect::<ApiResult<Vec<String>>>()?;

    let criteria = match decoded.as_slice() {
        [owner, name] => Criteria::new(name.clone(), owner.clone(), None),
        [owner, folder, name] => Criteria::new(name.clone(), owner.clone(), Some(folder.clone())),
        _ => return Err(ApiError::BadPath(raw_path.to_string())),
    };
    criteria.map_err(|_| ApiError::BadPath(raw_path.to_string()))
}

/// `Content-Disposition` value naming the artifact.
pub fn content_disposition(name: &str) -> String {
    let plain = name
        .chars()
        .all(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'));
    if plain {
        format!("attachment; filename={name}")
    } else {
        format!(
            "attachment; filename*=UTF-8''{}",
            utf8_percent_encode(name, SEGMENT)
        )
    }
}

/// Streams a resolved artifact back to the client.
#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadResponder;

impl DownloadResponder {
    pub async fn respond(&self, artifact: &dyn ManagedArtifact) -> ApiResult<Response> {
        let contents = artifact.contents().await?;
        Ok((
            StatusCode::OK,
            [
                (CONTENT_TYPE, artifact.content_type().to_string()),
                (CONTENT_LENGTH, contents.len().to_string()),
                (CONTENT_DISPOSITION, content_disposition(artifact.name())),
            ],
            Body::from(contents),
        )
            .into_response())
    }
}
