//! Artifact kinds selectable by name in configuration.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Stored artifact flavour. Determines the content type served on download.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Zip-based packages (apk, ipa, zip).
    #[default]
    Zip,
    /// Opaque binaries.
    Binary,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Binary => "binary",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Zip => "application/zip",
            Self::Binary => "application/octet-stream",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zip" | "default" => Ok(Self::Zip),
            "binary" | "octet-stream" => Ok(Self::Binary),
            other => Err(Error::Config(format!("unknown artifact kind: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("zip".parse::<ArtifactKind>().unwrap(), ArtifactKind::Zip);
        assert_eq!("default".parse::<ArtifactKind>().unwrap(), ArtifactKind::Zip);
        assert_eq!(
            "Octet-Stream".parse::<ArtifactKind>().unwrap(),
            ArtifactKind::Binary
        );
        assert!("tarball".parse::<ArtifactKind>().is_err());
    }

    #[test]
    fn content_types() {
        assert_eq!(ArtifactKind::Zip.content_type(), "application/zip");
        assert_eq!(
            ArtifactKind::Binary.content_type(),
            "application/octet-stream"
        );
    }
}
