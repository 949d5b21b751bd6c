//! Artifact identity derived from a repository-relative path.

use crate::criteria::Criteria;
use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Identity of a stored artifact.
///
/// For `bob/ios/t.zip` the name is `t.zip`, the owner folder is `ios` and the
/// parent folder is `bob`. For the flat layout `alice/app.apk` there is no
/// parent folder.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArtifactIdentity {
    name: String,
    owner_folder: String,
    parent_folder: Option<String>,
}

impl ArtifactIdentity {
    /// Derive the identity from a path relative to the repository root.
    ///
    /// Only `owner/name` and `owner/folder/name` shapes are valid.
    pub fn from_relative_path(path: &Path) -> Result<Self> {
        let mut parts = Vec::with_capacity(3);
        for component in path.components() {
            match component {
                Component::Normal(part) => {
                    let part = part
                        .to_str()
                        .ok_or_else(|| Error::InvalidPath(path.display().to_string()))?;
                    parts.push(part.to_string());
                }
                _ => return Err(Error::InvalidPath(path.display().to_string())),
            }
        }

        let mut parts = parts.into_iter();
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(owner_folder), Some(name), None, None) => Ok(Self {
                name,
                owner_folder,
                parent_folder: None,
            }),
            (Some(parent), Some(owner_folder), Some(name), None) => Ok(Self {
                name,
                owner_folder,
                parent_folder: Some(parent),
            }),
            _ => Err(Error::InvalidPath(format!(
                "expected 2 or 3 segments: {}",
                path.display()
            ))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Folder the artifact sits directly in.
    pub fn owner_folder(&self) -> &str {
        &self.owner_folder
    }

    /// Folder containing the owner folder, if the artifact is nested.
    pub fn parent_folder(&self) -> Option<&str> {
        self.parent_folder.as_deref()
    }

    /// Whether `criteria` addresses this artifact.
    ///
    /// With an application folder the criteria owner must be the parent folder
    /// and the application folder the owner folder. Without one, the criteria
    /// owner must be the owner folder of a flat artifact: nested artifacts are
    /// never matched by folder-less criteria.
    pub fn matches(&self, criteria: &Criteria) -> bool {
        if criteria.artifact_name() != self.name {
            return false;
        }
        match criteria.application_folder() {
            Some(folder) => {
                folder == self.owner_folder
                    && self.parent_folder.as_deref() == Some(criteria.owner_id())
            }
            None => self.parent_folder.is_none() && criteria.owner_id() == self.owner_folder,
        }
    }

    /// Location segments in repository order.
    pub fn segments(&self) -> Vec<&str> {
        let mut segments = Vec::with_capacity(3);
        if let Some(parent) = &self.parent_folder {
            segments.push(parent.as_str());
        }
        segments.push(self.owner_folder.as_str());
        segments.push(self.name.as_str());
        segments
    }

    pub fn relative_path(&self) -> PathBuf {
        self.segments().iter().collect()
    }
}
