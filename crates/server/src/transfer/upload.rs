//! Upload request processors and the persistence pipeline.

use super::context::TransferContext;
use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use axum::body::Body;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use bytes::{Bytes, BytesMut};
use courier_core::UploadedPayload;
use courier_core::params::{APPLICATION_FOLDER, FILE_NAME, USER_ID};
use courier_core::Parameters;
use courier_storage::{ArtifactRepository, ManagedArtifact};
use std::sync::Arc;
use tracing::debug;

const MULTIPART_FORM_DATA: &str = "multipart/form-data";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const OCTET_STREAM: &str = "application/octet-stream";

/// Decodes an inbound upload into payloads.
#[async_trait]
pub trait UploadRequestProcessor: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Read and validate the request body.
    ///
    /// Records the normalized metadata on the context. A processor owns the
    /// request body, so it can decode at most once.
    async fn decode(&mut self, ctx: &mut TransferContext) -> ApiResult<Vec<UploadedPayload>>;
}

/// Media type of the request without parameters, lowercased.
fn content_type_essence(request: &Request) -> Option<String> {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
}

/// Pick the processor for the request's `Content-Type`.
pub async fn processor_for(request: Request) -> ApiResult<Box<dyn UploadRequestProcessor>> {
    let essence = content_type_essence(&request).unwrap_or_default();
    match essence.as_str() {
        MULTIPART_FORM_DATA => {
            let multipart = Multipart::from_request(request, &())
                .await
                .map_err(|e| ApiError::Multipart(e.body_text()))?;
            Ok(Box::new(MultipartProcessor::new(multipart)))
        }
        FORM_URLENCODED | OCTET_STREAM => Ok(Box::new(RawBodyProcessor::new(request.into_body()))),
        _ => Err(ApiError::UnsupportedMediaType(essence)),
    }
}

fn build_payload(params: &Parameters, contents: Bytes) -> ApiResult<UploadedPayload> {
    let payload = UploadedPayload::builder()
        .part_name(params.get(FILE_NAME).cloned().unwrap_or_default())
        .owner_id(params.get(USER_ID).cloned().unwrap_or_default())
        .application_folder(params.get(APPLICATION_FOLDER).cloned())
        .contents(contents)
        .build()?;
    Ok(payload)
}

/// Whole request body is the file; metadata comes from headers.
pub struct RawBodyProcessor {
    body: Option<Body>,
}

impl RawBodyProcessor {
    pub fn new(body: Body) -> Self {
        Self { body: Some(body) }
    }
}

#[async_trait]
impl UploadRequestProcessor for RawBodyProcessor {
    fn name(&self) -> &'static str {
        "raw"
    }

    async fn decode(&mut self, ctx: &mut TransferContext) -> ApiResult<Vec<UploadedPayload>> {
        let body = self
            .body
            .take()
            .ok_or_else(|| ApiError::Internal("request body already consumed".into()))?;

        let params = ctx.header_parameters();
        ctx.parameters().check_required(&params)?;

        let limit = ctx.max_file_size();
        let declared = ctx
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        match declared {
            Some(0) => return Err(ApiError::EmptyBody),
            Some(len) if len > limit as u64 => return Err(ApiError::PayloadTooLarge { limit }),
            _ => {}
        }

        let contents = axum::body::to_bytes(body, limit).await.map_err(|err| {
            let inner = err.into_inner();
            if inner.downcast_ref::<http_body_util::LengthLimitError>().is_some() {
                ApiError::PayloadTooLarge { limit }
            } else {
                ApiError::Internal(format!("failed to read request body: {inner}"))
            }
        })?;
        if contents.is_empty() {
            return Err(ApiError::EmptyBody);
        }

        let payload = build_payload(&params, contents)?;
        debug!(
            processor = self.name(),
            part = payload.part_name(),
            size = payload.len(),
            "decoded upload"
        );
        ctx.set_metadata(params);
        Ok(vec![payload])
    }
}

/// `multipart/form-data` with exactly one file part.
///
/// Text fields override header metadata of the same name. The file part's
/// filename becomes the artifact name.
pub struct MultipartProcessor {
    multipart: Option<Multipart>,
}

impl MultipartProcessor {
    pub fn new(multipart: Multipart) -> Self {
        Self {
            multipart: Some(multipart),
        }
    }
}

fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge { limit }
    } else {
        ApiError::Multipart(err.body_text())
    }
}

async fn read_field(mut field: Field<'_>, limit: usize) -> ApiResult<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if buf.len() + chunk.len() > limit {
            return Err(ApiError::PayloadTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

#[async_trait]
impl UploadRequestProcessor for MultipartProcessor {
    fn name(&self) -> &'static str {
        "multipart"
    }

    async fn decode(&mut self, ctx: &mut TransferContext) -> ApiResult<Vec<UploadedPayload>> {
        let mut multipart = self
            .multipart
            .take()
            .ok_or_else(|| ApiError::Internal("request body already consumed".into()))?;

        let limit = ctx.max_file_size();
        let parameters = ctx.parameters();
        let mut params = ctx.header_parameters();
        let mut file: Option<(String, Bytes)> = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, limit))?
        {
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    if file.is_some() {
                        return Err(ApiError::MultipleFileParts);
                    }
                    if file_name.trim().is_empty() {
                        return Err(ApiError::BlankFileName);
                    }
                    let contents = read_field(field, limit).await?;
                    file = Some((file_name, contents));
                }
                None => {
                    let name = field.name().unwrap_or_default().to_string();
                    if parameters.canonical(&name).is_none() {
                        continue;
                    }
                    let value = field.text().await.map_err(|e| multipart_error(e, limit))?;
                    parameters.collect(&mut params, &name, &value);
                }
            }
        }

        let Some((file_name, contents)) = file else {
            debug!(processor = self.name(), "multipart request carried no file part");
            ctx.set_metadata(params);
            return Ok(Vec::new());
        };

        parameters.collect(&mut params, FILE_NAME, &file_name);
        parameters.check_required(&params)?;

        let payload = build_payload(&params, contents)?;
        debug!(
            processor = self.name(),
            part = payload.part_name(),
            size = payload.len(),
            "decoded upload"
        );
        ctx.set_metadata(params);
        Ok(vec![payload])
    }
}

/// Decodes once, persists each payload, and memoizes the saved artifacts.
pub struct UploadPipeline {
    processor: Box<dyn UploadRequestProcessor>,
    repository: Arc<dyn ArtifactRepository>,
    uploaded: Option<Vec<Box<dyn ManagedArtifact>>>,
}

impl UploadPipeline {
    pub fn new(
        processor: Box<dyn UploadRequestProcessor>,
        repository: Arc<dyn ArtifactRepository>,
    ) -> Self {
        Self {
            processor,
            repository,
            uploaded: None,
        }
    }

    /// Artifacts saved for this request.
    ///
    /// The first call decodes and persists; later calls return the same list.
    pub async fn uploaded_data(
        &mut self,
        ctx: &mut TransferContext,
    ) -> ApiResult<&[Box<dyn ManagedArtifact>]> {
        if self.uploaded.is_none() {
            let payloads = self.processor.decode(ctx).await?;
            let mut saved = Vec::with_capacity(payloads.len());
            for payload in &payloads {
                saved.push(self.repository.save(payload).await?);
            }
            self.uploaded = Some(saved);
        }
        Ok(self.uploaded.as_deref().unwrap_or_default())
    }
}
