//! Error types for Diagflow.
//!
//! All errors in Diagflow are represented by the `DiagflowError` enum,
//! which provides specific variants for different error categories.

use std::{io::ErrorKind, string::FromUtf8Error};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Diagflow operations.
///
/// Local failures (`Parse`, `Validation`) block the operation that raised them.
/// Backend failures (`Network`) are retried by the retry policy before they
/// reach the caller; `Auth` never is.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum DiagflowError {
    /// Malformed JSON input.
    #[error("parse error: {0}")]
    Parse(String),

    /// Structural or security rule violations found while validating input.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Backend or transport call failure.
    #[error("network error: {0}")]
    Network(String),

    /// Missing or expired session, or a request the backend refused to authorize.
    #[error("auth error: {0}")]
    Auth(String),

    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, TOML).
    #[error("{0}")]
    Convert(String),

    /// Storage operation errors.
    #[error("{0}")]
    Store(String),

    /// Template library errors.
    #[error("{0}")]
    Template(String),

    /// Workflow definition errors.
    #[error("{0}")]
    Workflow(String),

    /// Node definition errors.
    #[error("{0}")]
    Node(String),

    /// Edge definition errors.
    #[error("{0}")]
    Edge(String),

    /// The workflow was saved but the follow-up step failed.
    #[error("workflow {id} was saved, but the follow-up step failed: {message}")]
    AfterSave {
        id: String,
        message: String,
    },

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),
}

impl DiagflowError {
    /// Whether a retry policy may attempt the failed call again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DiagflowError::Network(_))
    }
}

impl From<DiagflowError> for String {
    fn from(val: DiagflowError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for DiagflowError {
    fn from(error: std::io::Error) -> Self {
        DiagflowError::IoError(error.to_string())
    }
}

impl From<DiagflowError> for std::io::Error {
    fn from(val: DiagflowError) -> Self {
        #[allow(clippy::io_other_error)]
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<FromUtf8Error> for DiagflowError {
    fn from(_: FromUtf8Error) -> Self {
        DiagflowError::Convert("Error with utf-8 string convert".to_string())
    }
}

impl From<serde_json::Error> for DiagflowError {
    fn from(error: serde_json::Error) -> Self {
        DiagflowError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for DiagflowError {
    fn from(error: toml::de::Error) -> Self {
        DiagflowError::Config(error.to_string())
    }
}

impl From<jsonschema::ValidationError<'_>> for DiagflowError {
    fn from(error: jsonschema::ValidationError<'_>) -> Self {
        DiagflowError::Validation(vec![error.to_string()])
    }
}

impl From<reqwest::Error> for DiagflowError {
    /// Malformed requests and undecodable bodies are not transient, so they
    /// map to `Convert` and stay out of the retry path.
    fn from(error: reqwest::Error) -> Self {
        if error.is_builder() || error.is_decode() {
            return DiagflowError::Convert(error.to_string());
        }
        match error.status() {
            Some(status) if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN => {
                DiagflowError::Auth(error.to_string())
            }
            _ => DiagflowError::Network(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_network_is_retryable() {
        assert!(DiagflowError::Network("timeout".into()).is_retryable());
        assert!(!DiagflowError::Auth("expired".into()).is_retryable());
        assert!(!DiagflowError::Parse("eof".into()).is_retryable());
        assert!(!DiagflowError::Validation(vec![]).is_retryable());
    }

    #[test]
    fn test_malformed_request_is_not_retryable() {
        let err = reqwest::Client::new().get("not a url").build().unwrap_err();
        assert!(err.is_builder());
        let err = DiagflowError::from(err);
        assert!(matches!(err, DiagflowError::Convert(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_validation_message_joins_errors() {
        let err = DiagflowError::Validation(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "validation failed: a; b");
    }

    #[test]
    fn test_after_save_mentions_saved_id() {
        let err = DiagflowError::AfterSave {
            id: "wf-1".into(),
            message: "route not found".into(),
        };
        assert!(err.to_string().contains("wf-1 was saved"));
    }
}
