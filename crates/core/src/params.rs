//! Request parameter names accepted by the transfer endpoints.
//!
//! Upload decoders collect metadata from headers and form fields. Only the
//! names listed by a [`RequestParameters`] table are kept; everything else on
//! the request is ignored.

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Name of the uploaded file.
pub const FILE_NAME: &str = "fileName";

/// Owner of the artifact (top-level repository folder).
pub const USER_ID: &str = "userId";

/// Optional folder nested under the owner.
pub const APPLICATION_FOLDER: &str = "applicationFolder";

/// Normalized request metadata, keyed by canonical parameter name.
pub type Parameters = BTreeMap<&'static str, String>;

/// A single accepted parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub required: bool,
}

/// The set of parameters a criteria kind understands.
#[derive(Clone, Copy, Debug)]
pub struct RequestParameters {
    specs: &'static [ParameterSpec],
}

impl RequestParameters {
    /// `fileName` and `userId` required, `applicationFolder` optional.
    pub const DEFAULT: RequestParameters = RequestParameters {
        specs: &[
            ParameterSpec {
                name: FILE_NAME,
                required: true,
            },
            ParameterSpec {
                name: USER_ID,
                required: true,
            },
            ParameterSpec {
                name: APPLICATION_FOLDER,
                required: false,
            },
        ],
    };

    pub fn iter(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.specs.iter()
    }

    /// Map an inbound header or field name to its canonical spelling.
    ///
    /// HTTP header names arrive lowercased, so the comparison ignores ASCII case.
    pub fn canonical(&self, name: &str) -> Option<&'static str> {
        self.specs
            .iter()
            .find(|spec| spec.name.eq_ignore_ascii_case(name))
            .map(|spec| spec.name)
    }

    /// Insert `value` under the canonical name of `name`, if it is known.
    ///
    /// Values are trimmed. Returns `true` when the parameter was recorded.
    pub fn collect(&self, params: &mut Parameters, name: &str, value: &str) -> bool {
        match self.canonical(name) {
            Some(canonical) => {
                params.insert(canonical, value.trim().to_string());
                true
            }
            None => false,
        }
    }

    /// Fail on the first required parameter that is absent or blank.
    pub fn check_required(&self, params: &Parameters) -> Result<()> {
        for spec in self.specs.iter().filter(|spec| spec.required) {
            match params.get(spec.name) {
                Some(value) if !value.trim().is_empty() => {}
                _ => return Err(Error::MissingParameter(spec.name)),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_ignores_header_case() {
        let params = RequestParameters::DEFAULT;
        assert_eq!(params.canonical("filename"), Some(FILE_NAME));
        assert_eq!(params.canonical("USERID"), Some(USER_ID));
        assert_eq!(params.canonical("content-type"), None);
    }

    #[test]
    fn collect_trims_and_skips_unknown() {
        let table = RequestParameters::DEFAULT;
        let mut params = Parameters::new();
        assert!(table.collect(&mut params, "userid", "  alice "));
        assert!(!table.collect(&mut params, "x-trace", "abc"));
        assert_eq!(params.get(USER_ID).map(String::as_str), Some("alice"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn check_required_reports_first_missing() {
        let table = RequestParameters::DEFAULT;
        let mut params = Parameters::new();
        params.insert(USER_ID, "alice".into());

        let err = table.check_required(&params).unwrap_err();
        assert!(matches!(err, Error::MissingParameter(FILE_NAME)));

        params.insert(FILE_NAME, "   ".into());
        assert!(table.check_required(&params).is_err());

        params.insert(FILE_NAME, "app.apk".into());
        table.check_required(&params).unwrap();
    }
}
