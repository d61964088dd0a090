//! Error types for the Foxops client.
//!
//! Every failure the client can report is a [`FoxopsError`]. Variants keep
//! their underlying cause reachable through [`std::error::Error::source`], so
//! callers can walk the chain or match on the variant that matters to them.
//!
//! # Taxonomy
//!
//! | Variant | Raised when | Retried |
//! |---------|-------------|---------|
//! | [`FoxopsError::InvalidId`] | an id is not numeric | never |
//! | [`FoxopsError::Transport`] | the network call itself failed | by the retry layer |
//! | [`FoxopsError::UnexpectedStatus`] | the server answered with the wrong status | never |
//! | [`FoxopsError::Decode`] | the body could not be mapped | never |
//! | [`FoxopsError::WaitTimedOut`] | a merge request did not reach its status in time | never |
//!
//! # Examples
//!
//! ```
//! use foxops_client::{ApiError, FoxopsError};
//!
//! let err = FoxopsError::UnexpectedStatus {
//!     expected: 200,
//!     actual: 404,
//!     source: ApiError::Message { message: "incarnation not found".into() },
//! };
//! assert_eq!(
//!     err.to_string(),
//!     "unexpected status code 404, wants 200: incarnation not found"
//! );
//! assert_eq!(err.status(), Some(404));
//! ```

use crate::context::ContextError;
use crate::transport::TransportError;
use crate::types::{Incarnation, IncarnationId};
use std::fmt;
use std::num::ParseIntError;
use thiserror::Error;

/// Result type alias for Foxops client operations.
pub type Result<T> = std::result::Result<T, FoxopsError>;

/// Errors returned by the Foxops client.
#[derive(Debug, Error)]
pub enum FoxopsError {
    /// The incarnation id could not be converted to its numeric wire form.
    #[error("invalid incarnation id {id:?}")]
    InvalidId {
        /// The id as supplied by the caller.
        id: String,
        /// Why parsing failed.
        #[source]
        source: ParseIntError,
    },

    /// Client configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The request never produced a response.
    #[error("request failed after {attempts} attempt(s)")]
    Transport {
        /// How many times the request was sent.
        attempts: u32,
        /// The last transport failure.
        #[source]
        source: TransportError,
    },

    /// The server answered with a status other than the one the operation expects.
    #[error("unexpected status code {actual}, wants {expected}: {source}")]
    UnexpectedStatus {
        /// Status the operation expects.
        expected: u16,
        /// Status the server returned.
        actual: u16,
        /// What the error body said, if anything.
        #[source]
        source: ApiError,
    },

    /// A successful response body could not be mapped to an [`Incarnation`].
    #[error("failed to decode incarnation")]
    Decode(#[from] DecodeError),

    /// Template data supplied by the caller cannot be put on the wire.
    #[error("invalid template data")]
    InvalidTemplateData(#[source] TemplateDataErrors),

    /// The request body could not be serialized.
    #[error("failed to encode request body")]
    Encode(#[source] serde_json::Error),

    /// The execution context ended before the operation completed.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// The context deadline elapsed while waiting for a merge request status.
    #[error("timed out waiting for the merge request of incarnation {id} to reach status {status:?}")]
    WaitTimedOut {
        /// Incarnation being polled.
        id: IncarnationId,
        /// Status that was awaited.
        status: String,
        /// Last incarnation observed before the deadline, if any poll succeeded.
        last_seen: Option<Box<Incarnation>>,
        /// Always [`ContextError::DeadlineExceeded`].
        #[source]
        source: ContextError,
    },
}

impl FoxopsError {
    /// Whether this error means a deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        match self {
            FoxopsError::WaitTimedOut { .. } => true,
            FoxopsError::Context(ContextError::DeadlineExceeded) => true,
            FoxopsError::Transport { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Whether this error was caused by cancelling the context.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FoxopsError::Context(ContextError::Cancelled))
    }

    /// Whether repeating the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FoxopsError::Transport { .. } => true,
            FoxopsError::UnexpectedStatus { actual, .. } => {
                crate::client::is_retryable_status(*actual)
            }
            _ => false,
        }
    }

    /// The HTTP status the server returned, for status mismatches.
    pub fn status(&self) -> Option<u16> {
        match self {
            FoxopsError::UnexpectedStatus { actual, .. } => Some(*actual),
            _ => None,
        }
    }
}

/// Cause attached to [`FoxopsError::UnexpectedStatus`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server sent its structured `{"message": ...}` error body.
    #[error("{message}")]
    Message {
        /// Message from the server, verbatim.
        message: String,
    },

    /// The body was readable but not a structured error.
    #[error("failed to decode error message")]
    UndecodableBody(#[source] serde_json::Error),

    /// The body could not be read at all.
    #[error("failed to read response body")]
    UnreadableBody(#[source] reqwest::Error),
}

impl ApiError {
    /// Server message, when one was sent.
    pub fn message(&self) -> Option<&str> {
        match self {
            ApiError::Message { message } => Some(message),
            _ => None,
        }
    }
}

/// Failure mapping a success response body.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body could not be read.
    #[error("failed to read response body")]
    Read(#[source] reqwest::Error),

    /// The body is not a valid incarnation document.
    #[error("malformed incarnation body")]
    Body(#[source] serde_json::Error),

    /// One or more template data entries had an unsupported shape.
    #[error("malformed template data")]
    TemplateData(#[source] TemplateDataErrors),
}

/// A single template data entry that is not a string, integer or float.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("template_data[{key:?}]: {reason}")]
pub struct TemplateDataError {
    /// Key of the offending entry.
    pub key: String,
    /// What was wrong with it.
    pub reason: String,
}

impl TemplateDataError {
    pub(crate) fn new(key: impl Into<String>, reason: impl Into<String>) -> Self {
        TemplateDataError {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// All template data failures of a single encode or decode, joined.
///
/// Template data is processed key by key without stopping at the first bad
/// entry, so one error reports every key that failed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemplateDataErrors(pub Vec<TemplateDataError>);

impl TemplateDataErrors {
    /// The individual failures, in key order.
    pub fn errors(&self) -> &[TemplateDataError] {
        &self.0
    }

    pub(crate) fn push(&mut self, error: TemplateDataError) {
        self.0.push(error);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TemplateDataErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for TemplateDataErrors {}

/// Invalid or missing client configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// No endpoint was configured.
    #[error("missing Foxops API endpoint: set the endpoint or the {env_var} environment variable")]
    MissingEndpoint {
        /// Environment variable consulted as a fallback.
        env_var: &'static str,
    },

    /// No token was configured.
    #[error("missing Foxops API token: set the token or the {env_var} environment variable")]
    MissingToken {
        /// Environment variable consulted as a fallback.
        env_var: &'static str,
    },

    /// The endpoint is not an absolute URL.
    #[error("invalid Foxops API endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint {
        /// Endpoint as configured.
        endpoint: String,
        /// Parser message.
        reason: String,
    },

    /// The token cannot be carried in an Authorization header.
    #[error("invalid Foxops API token: {0}")]
    InvalidToken(String),

    /// A timeout string could not be parsed.
    #[error("invalid timeout {value:?}: {reason}")]
    InvalidTimeout {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_status_keeps_cause() {
        use std::error::Error as _;

        let err = FoxopsError::UnexpectedStatus {
            expected: 201,
            actual: 409,
            source: ApiError::Message {
                message: "incarnation already exists".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "unexpected status code 409, wants 201: incarnation already exists"
        );
        let cause = err.source().unwrap();
        assert_eq!(cause.to_string(), "incarnation already exists");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_template_data_errors_join() {
        let mut errors = TemplateDataErrors::default();
        errors.push(TemplateDataError::new("a", "found boolean"));
        errors.push(TemplateDataError::new("b", "found null"));
        assert_eq!(
            errors.to_string(),
            r#"template_data["a"]: found boolean; template_data["b"]: found null"#
        );
        assert_eq!(errors.errors().len(), 2);
    }

    #[test]
    fn test_timeout_classification() {
        assert!(FoxopsError::Context(ContextError::DeadlineExceeded).is_timeout());
        assert!(!FoxopsError::Context(ContextError::Cancelled).is_timeout());
        assert!(FoxopsError::Context(ContextError::Cancelled).is_cancelled());
    }

    #[test]
    fn test_status_only_for_mismatch() {
        let err = FoxopsError::Config(ConfigError::MissingToken {
            env_var: "FOXOPS_TOKEN",
        });
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("FOXOPS_TOKEN"));
    }
}
