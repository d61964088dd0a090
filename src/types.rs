//! Domain types exchanged with the Foxops incarnation API.
//!
//! These are plain values: the client never caches them and every read
//! returns a freshly fetched [`Incarnation`].
//!
//! # Examples
//!
//! ```
//! use foxops_client::{CreateIncarnationRequest, TemplateValue};
//!
//! let request = CreateIncarnationRequest::new("inc/repo", "template/repo", "v1.2.0")
//!     .with_target_directory("services/api")
//!     .with_template_value("name", "api")
//!     .with_template_value("replicas", 3)
//!     .with_template_value("ratio", 0.5);
//!
//! assert_eq!(request.template_data["replicas"], TemplateValue::Integer(3));
//! ```

use crate::error::{FoxopsError, Result, TemplateDataError, TemplateDataErrors};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Identifier of an incarnation.
///
/// Callers handle it as an opaque string; on the wire it is an integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncarnationId(String);

impl IncarnationId {
    /// Wrap an id string without validating it.
    pub fn new(id: impl Into<String>) -> Self {
        IncarnationId(id.into())
    }

    /// The id as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric form used in request paths.
    ///
    /// Fails with [`FoxopsError::InvalidId`] before any request is sent.
    pub fn to_wire(&self) -> Result<i64> {
        self.0.parse().map_err(|source| FoxopsError::InvalidId {
            id: self.0.clone(),
            source,
        })
    }

    pub(crate) fn from_wire(id: i64) -> Self {
        IncarnationId(id.to_string())
    }
}

impl fmt::Display for IncarnationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IncarnationId {
    fn from(id: &str) -> Self {
        IncarnationId::new(id)
    }
}

impl From<String> for IncarnationId {
    fn from(id: String) -> Self {
        IncarnationId(id)
    }
}

impl From<i64> for IncarnationId {
    fn from(id: i64) -> Self {
        IncarnationId::from_wire(id)
    }
}

/// A single template parameter.
///
/// Template data is flat: a value is always one of these three scalars.
/// The variant is the discriminant used both to encode and to decode, see
/// [`crate::protocol::wire`].
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    /// A JSON string.
    String(String),
    /// A JSON number without fractional part that fits in an `i64`.
    Integer(i64),
    /// Any other JSON number.
    Float(f64),
}

impl TemplateValue {
    /// Name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            TemplateValue::String(_) => "string",
            TemplateValue::Integer(_) => "integer",
            TemplateValue::Float(_) => "float",
        }
    }

    /// The value as a string, for string-typed state.
    ///
    /// Floats are rendered with six decimals.
    pub fn to_state_string(&self) -> String {
        match self {
            TemplateValue::String(value) => value.clone(),
            TemplateValue::Integer(value) => value.to_string(),
            TemplateValue::Float(value) => format!("{value:.6}"),
        }
    }
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        TemplateValue::String(value)
    }
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        TemplateValue::String(value.to_string())
    }
}

impl From<i64> for TemplateValue {
    fn from(value: i64) -> Self {
        TemplateValue::Integer(value)
    }
}

impl From<i32> for TemplateValue {
    fn from(value: i32) -> Self {
        TemplateValue::Integer(value.into())
    }
}

impl From<f64> for TemplateValue {
    fn from(value: f64) -> Self {
        TemplateValue::Float(value)
    }
}

/// Template parameters keyed by name.
pub type TemplateData = BTreeMap<String, TemplateValue>;

/// Check that every value can be represented in JSON.
///
/// All offending keys are reported together.
pub(crate) fn validate_template_data(data: &TemplateData) -> Result<()> {
    let mut errors = TemplateDataErrors::default();
    for (key, value) in data {
        if let TemplateValue::Float(float) = value {
            if !float.is_finite() {
                errors.push(TemplateDataError::new(
                    key,
                    format!("float {float} has no JSON representation"),
                ));
            }
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(FoxopsError::InvalidTemplateData(errors))
    }
}

/// Lifecycle state of a merge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeRequestStatus {
    /// Waiting for review.
    Open,
    /// Merged into the target branch.
    Merged,
    /// Closed without merging.
    Closed,
    /// The server could not determine the status.
    Unknown,
}

impl MergeRequestStatus {
    /// Every status, in wire order.
    pub const ALL: [MergeRequestStatus; 4] = [
        MergeRequestStatus::Open,
        MergeRequestStatus::Merged,
        MergeRequestStatus::Closed,
        MergeRequestStatus::Unknown,
    ];

    /// Wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeRequestStatus::Open => "open",
            MergeRequestStatus::Merged => "merged",
            MergeRequestStatus::Closed => "closed",
            MergeRequestStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MergeRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected merge request status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown merge request status {0:?}, expected one of open, merged, closed, unknown")]
pub struct ParseStatusError(pub String);

impl FromStr for MergeRequestStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        MergeRequestStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// An instantiated template inside a target repository.
///
/// Merge request fields stay `None` until an update produced a merge request.
#[derive(Debug, Clone, PartialEq)]
pub struct Incarnation {
    pub id: IncarnationId,
    pub incarnation_repository: String,
    pub target_directory: String,
    pub template_repository: String,
    /// Tag, branch or commit of the template repository.
    pub template_repository_version: String,
    pub template_data: TemplateData,
    /// Hash of the last commit created for the incarnation.
    pub commit_sha: String,
    pub commit_url: String,
    pub merge_request_id: Option<String>,
    pub merge_request_url: Option<String>,
    /// Status as sent by the server; absent when the server sent none or a
    /// non-string value.
    pub merge_request_status: Option<String>,
}

impl Incarnation {
    /// Parsed merge request status, when it is one of the known values.
    pub fn merge_request_state(&self) -> Option<MergeRequestStatus> {
        self.merge_request_status.as_deref()?.parse().ok()
    }

    /// Template data rendered as strings, as stored in string-typed state.
    pub fn template_data_strings(&self) -> BTreeMap<String, String> {
        self.template_data
            .iter()
            .map(|(key, value)| (key.clone(), value.to_state_string()))
            .collect()
    }
}

/// Desired initial state of a new incarnation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIncarnationRequest {
    pub incarnation_repository: String,
    /// Directory inside the repository; the server defaults to `.`.
    pub target_directory: Option<String>,
    pub template_repository: String,
    pub template_repository_version: String,
    pub template_data: TemplateData,
}

impl CreateIncarnationRequest {
    /// Request with no target directory and empty template data.
    pub fn new(
        incarnation_repository: impl Into<String>,
        template_repository: impl Into<String>,
        template_repository_version: impl Into<String>,
    ) -> Self {
        CreateIncarnationRequest {
            incarnation_repository: incarnation_repository.into(),
            target_directory: None,
            template_repository: template_repository.into(),
            template_repository_version: template_repository_version.into(),
            template_data: TemplateData::new(),
        }
    }

    pub fn with_target_directory(mut self, target_directory: impl Into<String>) -> Self {
        self.target_directory = Some(target_directory.into());
        self
    }

    pub fn with_template_value(
        mut self,
        key: impl Into<String>,
        value: impl Into<TemplateValue>,
    ) -> Self {
        self.template_data.insert(key.into(), value.into());
        self
    }

    pub fn with_template_data(mut self, template_data: TemplateData) -> Self {
        self.template_data = template_data;
        self
    }
}

/// Desired change to an existing incarnation.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateIncarnationRequest {
    pub template_repository_version: String,
    pub template_data: TemplateData,
    /// Ask the server to merge the resulting merge request right away.
    pub automerge: bool,
}

impl UpdateIncarnationRequest {
    /// Request with empty template data and auto-merge enabled.
    pub fn new(template_repository_version: impl Into<String>) -> Self {
        UpdateIncarnationRequest {
            template_repository_version: template_repository_version.into(),
            template_data: TemplateData::new(),
            automerge: true,
        }
    }

    pub fn with_automerge(mut self, automerge: bool) -> Self {
        self.automerge = automerge;
        self
    }

    pub fn with_template_value(
        mut self,
        key: impl Into<String>,
        value: impl Into<TemplateValue>,
    ) -> Self {
        self.template_data.insert(key.into(), value.into());
        self
    }

    pub fn with_template_data(mut self, template_data: TemplateData) -> Self {
        self.template_data = template_data;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_to_wire() {
        assert_eq!(IncarnationId::from("1234").to_wire().unwrap(), 1234);

        let err = IncarnationId::from("abc").to_wire().unwrap_err();
        assert!(matches!(err, FoxopsError::InvalidId { ref id, .. } if id == "abc"));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("merged".parse(), Ok(MergeRequestStatus::Merged));
        assert_eq!(MergeRequestStatus::Closed.to_string(), "closed");
        assert!("merge".parse::<MergeRequestStatus>().is_err());
    }

    #[test]
    fn test_state_strings() {
        assert_eq!(TemplateValue::from("x").to_state_string(), "x");
        assert_eq!(TemplateValue::from(7).to_state_string(), "7");
        assert_eq!(TemplateValue::from(1.5).to_state_string(), "1.500000");
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let mut data = TemplateData::new();
        data.insert("nan".into(), TemplateValue::Float(f64::NAN));
        data.insert("ok".into(), TemplateValue::Float(2.0));
        data.insert("inf".into(), TemplateValue::Float(f64::INFINITY));

        match validate_template_data(&data) {
            Err(FoxopsError::InvalidTemplateData(errors)) => {
                let keys: Vec<_> = errors.errors().iter().map(|e| e.key.as_str()).collect();
                assert_eq!(keys, vec!["inf", "nan"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_update_defaults_to_automerge() {
        let request = UpdateIncarnationRequest::new("v2");
        assert!(request.automerge);
        assert!(!request.with_automerge(false).automerge);
    }
}
