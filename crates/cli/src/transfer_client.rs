use anyhow::{Context, Result};
use reqwest::Url;
use reqwest::header::{ACCEPT, CONTENT_DISPOSITION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upload response body as rendered by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub url: String,
}

/// How the file is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Whole body is the file, metadata in headers.
    Raw,
    /// `multipart/form-data` with one file part.
    Multipart,
}

/// A single upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub user_id: String,
    pub application_folder: Option<String>,
    pub contents: Vec<u8>,
    pub mode: UploadMode,
}

/// A downloaded artifact.
#[derive(Debug, Clone)]
pub struct Download {
    /// Name from `Content-Disposition` reduced to its final component, if the
    /// server sent a usable one.
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub contents: Vec<u8>,
}

#[derive(Clone)]
pub struct TransferClient {
    http: reqwest::Client,
    base_url: Url,
    mount: String,
}

impl TransferClient {
    pub fn new(base_url: &str, mount: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url).context("invalid server URL")?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            mount: mount.trim_matches('/').to_string(),
        })
    }

    fn upload_url(&self) -> Result<Url> {
        self.base_url
            .join(&self.mount)
            .context("failed to build upload URL")
    }

    fn build_upload(&self, req: UploadRequest) -> Result<reqwest::RequestBuilder> {
        let url = self.upload_url()?;
        let builder = match req.mode {
            UploadMode::Raw => {
                let mut builder = self
                    .http
                    .post(url)
                    .header(CONTENT_TYPE, "application/octet-stream")
                    .header("fileName", &req.file_name)
                    .header("userId", &req.user_id);
                if let Some(folder) = &req.application_folder {
                    builder = builder.header("applicationFolder", folder);
                }
                builder.body(req.contents)
            }
            UploadMode::Multipart => {
                let part =
                    reqwest::multipart::Part::bytes(req.contents).file_name(req.file_name);
                let mut form = reqwest::multipart::Form::new().text("userId", req.user_id);
                if let Some(folder) = req.application_folder {
                    form = form.text("applicationFolder", folder);
                }
                self.http.post(url).multipart(form.part("file", part))
            }
        };
        Ok(builder)
    }

    async fn send_text(&self, req: reqwest::RequestBuilder) -> Result<String> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("API error ({}): {}", status, body);
        }
        Ok(body)
    }

    /// Upload and return the JSON response.
    pub async fn upload(&self, req: UploadRequest) -> Result<UploadResponse> {
        let builder = self.build_upload(req)?.header(ACCEPT, "application/json");
        let body = self.send_text(builder).await?;
        serde_json::from_str(&body).context("invalid upload response")
    }

    /// Upload and return the plain-text response.
    pub async fn upload_text(&self, req: UploadRequest) -> Result<String> {
        let builder = self.build_upload(req)?.header(ACCEPT, "text/plain");
        self.send_text(builder).await
    }

    /// Fetch an artifact by the URL an upload returned.
    pub async fn download(&self, url: &str) -> Result<Download> {
        let url = Url::parse(url).context("invalid artifact URL")?;
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        let header = |name: reqwest::header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let file_name = header(CONTENT_DISPOSITION)
            .and_then(|v| disposition_file_name(&v))
            .and_then(|name| local_file_name(&name));
        let content_type = header(CONTENT_TYPE);
        let contents = response.bytes().await?.to_vec();

        Ok(Download {
            file_name,
            content_type,
            contents,
        })
    }

    /// Whether a live artifact exists at `url`.
    pub async fn exists(&self, url: &str) -> Result<bool> {
        let url = Url::parse(url).context("invalid artifact URL")?;
        let response = self.http.head(url).send().await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            s => anyhow::bail!("API error ({})", s),
        }
    }
}

/// Extract the file name from a `Content-Disposition` value.
pub fn disposition_file_name(value: &str) -> Option<String> {
    let mut plain = None;
    for param in value.split(';').map(str::trim) {
        if let Some(encoded) = param.strip_prefix("filename*=UTF-8''") {
            return percent_encoding::percent_decode_str(encoded)
                .decode_utf8()
                .ok()
                .map(|s| s.into_owned());
        }
        if let Some(name) = param.strip_prefix("filename=") {
            plain = Some(name.trim_matches('"').to_string());
        }
    }
    plain
}

/// Reduce a server-supplied name to a bare file name safe to write into the
/// current directory. Directory parts are dropped; empty, `.` and `..` names
/// yield `None`.
pub fn local_file_name(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?;
    let file_name = Path::new(last).file_name()?.to_str()?;
    match file_name.trim() {
        "" | "." | ".." => None,
        _ => Some(file_name.to_string()),
    }
}
