//! Error types for the communication worker.
//!
//! # Design
//! Two channels reach the caller. Transport and (de)serialization faults from
//! `reqwest` and `serde_json` are wrapped without classification. Status
//! failures are raised by the worker itself when a write operation receives a
//! code outside its success set; they carry the verb and the observed code.
//! GET never produces `UnexpectedStatus`.

use thiserror::Error;

use crate::http::HttpMethod;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, WorkerError>;

/// Errors returned by `CommunicationWorker` and its transient clients.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The base address is not an absolute URL usable as a base.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The relative request path could not be resolved against the base URL.
    #[error("invalid request path '{path}': {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: url::ParseError,
    },

    /// The per-call HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// Network failure while sending the request or reading the response.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// A write operation received a status outside its success set.
    #[error(
        "{method} operation unsuccessful{} Got HTTP status code '{status}'",
        .method.failure_mark()
    )]
    UnexpectedStatus { method: HttpMethod, status: u16 },

    /// The basic-auth token cannot be carried in an HTTP header.
    #[error("credential is not a valid header value")]
    InvalidCredential,

    /// Missing or contradictory configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl WorkerError {
    /// The observed HTTP status for status-check failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            WorkerError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_status_failure(&self) -> bool {
        matches!(self, WorkerError::UnexpectedStatus { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_status_names_verb_and_code() {
        let err = WorkerError::UnexpectedStatus {
            method: HttpMethod::Post,
            status: 409,
        };
        assert_eq!(
            err.to_string(),
            "POST operation unsuccessful. Got HTTP status code '409'"
        );
        assert_eq!(err.status(), Some(409));
        assert!(err.is_status_failure());
    }

    #[test]
    fn delete_failure_ends_with_exclamation() {
        let err = WorkerError::UnexpectedStatus {
            method: HttpMethod::Delete,
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "DELETE operation unsuccessful! Got HTTP status code '404'"
        );
    }

    #[test]
    fn other_errors_carry_no_status() {
        let err = WorkerError::Config("missing base URL".to_string());
        assert_eq!(err.status(), None);
        assert!(!err.is_status_failure());
    }

    #[test]
    fn deserialization_wraps_serde_error() {
        let source = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = WorkerError::Deserialization(source);
        assert!(err.to_string().starts_with("deserialization failed"));
    }
}
