//! Normalized upload payload handed to the repository.

use crate::criteria::Criteria;
use crate::error::{Error, Result};
use crate::params::{APPLICATION_FOLDER, FILE_NAME, USER_ID};
use bytes::Bytes;
use std::path::PathBuf;

/// Check that `value` can be used as a single directory or file name.
pub fn validate_segment(field: &'static str, value: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidSegment {
        field,
        reason: reason.to_string(),
    };

    if value.trim().is_empty() {
        return Err(Error::MissingParameter(field));
    }
    if value == "." || value == ".." {
        return Err(invalid("relative path segments are not allowed"));
    }
    if value.contains(['/', '\\', ':']) {
        return Err(invalid("must not contain '/', '\\' or ':'"));
    }
    if value.contains('\0') {
        return Err(invalid("must not contain NUL"));
    }
    Ok(())
}

/// Decoded upload, immutable once built.
#[derive(Clone, Debug)]
pub struct UploadedPayload {
    part_name: String,
    owner_id: String,
    application_folder: Option<String>,
    contents: Bytes,
}

impl UploadedPayload {
    pub fn builder() -> UploadedPayloadBuilder {
        UploadedPayloadBuilder::default()
    }

    /// File name as supplied by the client.
    pub fn part_name(&self) -> &str {
        &self.part_name
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn application_folder(&self) -> Option<&str> {
        self.application_folder.as_deref()
    }

    pub fn contents(&self) -> &Bytes {
        &self.contents
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Location segments: owner, folder, name.
    pub fn segments(&self) -> Vec<&str> {
        let mut segments = Vec::with_capacity(3);
        segments.push(self.owner_id.as_str());
        if let Some(folder) = &self.application_folder {
            segments.push(folder.as_str());
        }
        segments.push(self.part_name.as_str());
        segments
    }

    /// Path of the artifact relative to the repository root.
    pub fn relative_path(&self) -> PathBuf {
        self.segments().iter().collect()
    }

    /// Criteria that resolve the artifact this payload produces.
    pub fn criteria(&self) -> Result<Criteria> {
        Criteria::new(
            self.part_name.clone(),
            self.owner_id.clone(),
            self.application_folder.clone(),
        )
    }
}

/// Builder for [`UploadedPayload`].
#[derive(Debug, Default)]
pub struct UploadedPayloadBuilder {
    part_name: Option<String>,
    owner_id: Option<String>,
    application_folder: Option<String>,
    contents: Option<Bytes>,
}

impl UploadedPayloadBuilder {
    pub fn part_name(mut self, name: impl Into<String>) -> Self {
        self.part_name = Some(name.into());
        self
    }

    pub fn owner_id(mut self, owner: impl Into<String>) -> Self {
        self.owner_id = Some(owner.into());
        self
    }

    pub fn application_folder(mut self, folder: Option<impl Into<String>>) -> Self {
        self.application_folder = folder.map(Into::into);
        self
    }

    pub fn contents(mut self, contents: impl Into<Bytes>) -> Self {
        self.contents = Some(contents.into());
        self
    }

    /// Validate every segment and produce the payload.
    pub fn build(self) -> Result<UploadedPayload> {
        let part_name = self.part_name.ok_or(Error::MissingParameter(FILE_NAME))?;
        let owner_id = self.owner_id.ok_or(Error::MissingParameter(USER_ID))?;
        let contents = self.contents.ok_or(Error::Builder("contents not set"))?;

        validate_segment(FILE_NAME, &part_name)?;
        validate_segment(USER_ID, &owner_id)?;

        let application_folder = match self.application_folder {
            Some(folder) if !folder.trim().is_empty() => {
                validate_segment(APPLICATION_FOLDER, &folder)?;
                Some(folder)
            }
            _ => None,
        };

        Ok(UploadedPayload {
            part_name,
            owner_id,
            application_folder,
            contents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_flat_payload() {
        let payload = UploadedPayload::builder()
            .part_name("app.apk")
            .owner_id("alice")
            .application_folder(None::<String>)
            .contents(&b"PK\x03\x04"[..])
            .build()
            .unwrap();
        assert_eq!(payload.relative_path(), PathBuf::from("alice/app.apk"));
        assert_eq!(payload.len(), 4);
        assert_eq!(payload.criteria().unwrap().segments(), payload.segments());
    }

    #[test]
    fn blank_folder_is_dropped() {
        let payload = UploadedPayload::builder()
            .part_name("t.zip")
            .owner_id("bob")
            .application_folder(Some(" "))
            .contents(Bytes::from_static(b"x"))
            .build()
            .unwrap();
        assert_eq!(payload.application_folder(), None);
    }

    #[test]
    fn missing_fields_fail() {
        let err = UploadedPayload::builder()
            .owner_id("bob")
            .contents(Bytes::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MissingParameter(FILE_NAME)));

        let err = UploadedPayload::builder()
            .part_name("t.zip")
            .owner_id("bob")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Builder(_)));
    }

    #[test]
    fn rejects_unsafe_segments() {
        for bad in ["../x", "a/b", "a\\b", "c:evil", ".", "..", "a\0b"] {
            assert!(
                validate_segment(FILE_NAME, bad).is_err(),
                "segment {bad:?} should be rejected"
            );
        }
        validate_segment(FILE_NAME, "app-1.2.apk").unwrap();
    }

    #[test]
    fn accepts_names_with_double_dots() {
        for name in ["app..v2.apk", "build..1.zip", "...", "..hidden"] {
            validate_segment(FILE_NAME, name).unwrap();
        }
    }

    #[test]
    fn rejects_unsafe_folder() {
        let err = UploadedPayload::builder()
            .part_name("t.zip")
            .owner_id("bob")
            .application_folder(Some("ios/../../etc"))
            .contents(Bytes::from_static(b"x"))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidSegment {
                field: APPLICATION_FOLDER,
                ..
            }
        ));
    }
}
