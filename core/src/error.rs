//! Error types for REST method execution.
//!
//! # Design
//! Two families are kept apart because the pipeline treats them differently.
//! `ApiError` covers everything local to one REST method (building the
//! request, decoding and parsing the response) and is always folded into a
//! `RestMethodResult` with the 506 sentinel status. `TransportError` covers
//! connection-level failures and is returned to the caller untouched.

use thiserror::Error;

/// Failures raised while building a request or interpreting a response.
///
/// The `Display` text becomes the status message of an unparseable result,
/// so every variant renders a non-empty description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The request target could not be turned into an absolute URI.
    #[error("invalid uri: {0}")]
    InvalidUri(String),

    /// The response body is not valid text in the chosen encoding.
    #[error("response body is not valid {encoding}: {reason}")]
    Decode {
        encoding: &'static str,
        reason: String,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The service answered, but reported errors inside the body.
    #[error("request rejected by service: {0}")]
    Rejected(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Deserialization(err.to_string())
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::InvalidUri(err.to_string())
    }
}

/// Connection-level failures reported by a `Transport`.
///
/// HTTP error statuses are not transport errors; they come back as ordinary
/// `Response` values.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be expressed to the underlying HTTP client.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The exchange failed before a complete response was received.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The response body could not be read off the wire.
    #[error("failed to read response body: {0}")]
    Body(String),
}
