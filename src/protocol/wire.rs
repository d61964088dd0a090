//! JSON wire model and its mapping to the domain types.
//!
//! # Template data
//!
//! On the wire a template data value is a bare JSON scalar whose shape tells
//! the variant:
//!
//! | JSON | [`TemplateValue`] |
//! |------|-------------------|
//! | string | `String` |
//! | number that fits in `i64` | `Integer` |
//! | any other number | `Float` |
//!
//! Anything else (booleans, `null`, arrays, objects) is rejected for that key.
//! Decoding does not stop at the first bad key: every failure is collected and
//! reported together in [`DecodeError::TemplateData`].
//!
//! # Merge request status
//!
//! `merge_request_status` is only taken when it is a JSON string. Any other
//! JSON type is treated as if the field were absent, so the server can change
//! how it represents statuses it does not know without breaking reads.
//!
//! # Examples
//!
//! ```
//! use foxops_client::protocol::wire::decode_incarnation;
//!
//! let body = br#"{
//!     "id": 1234,
//!     "incarnation_repository": "inc/repo",
//!     "template_repository": "template/repo",
//!     "template_repository_version": "v1",
//!     "target_directory": ".",
//!     "commit_sha": "12345678",
//!     "commit_url": "u"
//! }"#;
//!
//! let incarnation = decode_incarnation(body).unwrap();
//! assert_eq!(incarnation.id.as_str(), "1234");
//! assert!(incarnation.merge_request_id.is_none());
//! ```

use crate::error::{DecodeError, TemplateDataError, TemplateDataErrors};
use crate::types::{
    CreateIncarnationRequest, Incarnation, IncarnationId, TemplateData, TemplateValue,
    UpdateIncarnationRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Incarnation document returned by `GET`, `POST` and `PUT`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncarnationWithDetails {
    pub id: i64,
    #[serde(default)]
    pub incarnation_repository: String,
    #[serde(default)]
    pub target_directory: String,
    pub template_repository: String,
    pub template_repository_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_data: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub commit_sha: String,
    #[serde(default)]
    pub commit_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_request_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_request_status: Option<Value>,
}

/// Body of `POST /api/incarnations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredIncarnationState {
    pub incarnation_repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_directory: Option<String>,
    pub template_repository: String,
    pub template_repository_version: String,
    pub template_data: BTreeMap<String, Value>,
}

/// Body of `PUT /api/incarnations/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredIncarnationStatePatch {
    pub automerge: bool,
    pub template_repository_version: String,
    pub template_data: BTreeMap<String, Value>,
}

/// Error body sent with any unexpected status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
}

/// Decode a template value from its JSON form.
///
/// The JSON type is the discriminant; there is no trial-and-error between
/// variants.
pub fn decode_template_value(key: &str, value: &Value) -> Result<TemplateValue, TemplateDataError> {
    match value {
        Value::String(s) => Ok(TemplateValue::String(s.clone())),
        Value::Number(n) => {
            if let Some(int) = n.as_i64() {
                Ok(TemplateValue::Integer(int))
            } else if let Some(float) = n.as_f64() {
                Ok(TemplateValue::Float(float))
            } else {
                Err(TemplateDataError::new(key, format!("number {n} is out of range")))
            }
        }
        other => Err(TemplateDataError::new(
            key,
            format!(
                "expected a string, integer or float, found {}",
                json_type_name(other)
            ),
        )),
    }
}

/// Encode a template value to its JSON form.
pub fn encode_template_value(value: &TemplateValue) -> Value {
    match value {
        TemplateValue::String(s) => Value::String(s.clone()),
        TemplateValue::Integer(int) => Value::from(*int),
        TemplateValue::Float(float) => Value::from(*float),
    }
}

/// Decode every entry of a template data map, collecting all failures.
pub fn decode_template_data(
    data: &BTreeMap<String, Value>,
) -> Result<TemplateData, TemplateDataErrors> {
    let mut decoded = TemplateData::new();
    let mut errors = TemplateDataErrors::default();

    for (key, value) in data {
        match decode_template_value(key, value) {
            Ok(value) => {
                decoded.insert(key.clone(), value);
            }
            Err(err) => errors.push(err),
        }
    }

    if errors.is_empty() {
        Ok(decoded)
    } else {
        Err(errors)
    }
}

pub fn encode_template_data(data: &TemplateData) -> BTreeMap<String, Value> {
    data.iter()
        .map(|(key, value)| (key.clone(), encode_template_value(value)))
        .collect()
}

/// Decode a response body into an [`Incarnation`].
pub fn decode_incarnation(body: &[u8]) -> Result<Incarnation, DecodeError> {
    let wire: IncarnationWithDetails = serde_json::from_slice(body).map_err(DecodeError::Body)?;
    map_incarnation(wire)
}

/// Map the wire document to the domain model.
pub fn map_incarnation(wire: IncarnationWithDetails) -> Result<Incarnation, DecodeError> {
    let template_data = match &wire.template_data {
        Some(data) => decode_template_data(data).map_err(DecodeError::TemplateData)?,
        None => TemplateData::new(),
    };

    // Non-string statuses are dropped, not rejected.
    let merge_request_status = match wire.merge_request_status {
        Some(Value::String(status)) => Some(status),
        _ => None,
    };

    Ok(Incarnation {
        id: IncarnationId::from_wire(wire.id),
        incarnation_repository: wire.incarnation_repository,
        target_directory: wire.target_directory,
        template_repository: wire.template_repository,
        template_repository_version: wire.template_repository_version,
        template_data,
        commit_sha: wire.commit_sha,
        commit_url: wire.commit_url,
        merge_request_id: wire.merge_request_id,
        merge_request_url: wire.merge_request_url,
        merge_request_status,
    })
}

impl From<&CreateIncarnationRequest> for DesiredIncarnationState {
    fn from(request: &CreateIncarnationRequest) -> Self {
        DesiredIncarnationState {
            incarnation_repository: request.incarnation_repository.clone(),
            target_directory: request.target_directory.clone(),
            template_repository: request.template_repository.clone(),
            template_repository_version: request.template_repository_version.clone(),
            template_data: encode_template_data(&request.template_data),
        }
    }
}

impl From<&UpdateIncarnationRequest> for DesiredIncarnationStatePatch {
    fn from(request: &UpdateIncarnationRequest) -> Self {
        DesiredIncarnationStatePatch {
            automerge: request.automerge,
            template_repository_version: request.template_repository_version.clone(),
            template_data: encode_template_data(&request.template_data),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
