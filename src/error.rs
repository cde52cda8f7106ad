//! Error types for fetching, decoding and caching provider data.
//!
//! Every failure that can originate from a remote provider is represented
//! here as a value. The refresh cycle logs these and moves on; nothing in
//! this taxonomy is allowed to take the process down.

use thiserror::Error;

/// Failure of a single HTTP GET against a provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("{url}: request timed out")]
    Timeout { url: String },

    #[error("{url}: non-success status: {status}")]
    Remote { url: String, status: u16 },

    #[error("{url}: failed to send request: {message}")]
    Transport { url: String, message: String },

    #[error("{url}: failed to read body: {message}")]
    Body { url: String, message: String },
}

/// Failure to turn a response body into a validated record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unmarshal failed: {0}")]
    Json(String),

    #[error("missing required fields: {}", keys.join(", "))]
    MissingFields { keys: Vec<String> },

    #[error("field '{field}' is not {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },

    #[error("non-success status '{status}'")]
    Rejected { status: String },
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Json(err.to_string())
    }
}

/// Failure of one attempt (or all attempts) to refresh a provider instance.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{url}: {source}")]
    Decode { url: String, source: DecodeError },

    #[error("all {attempts} attempts failed, last: {last}")]
    Exhausted {
        attempts: usize,
        last: Box<ProviderError>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Programming-invariant violation inside the store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("bad item in {key} cache: expected {expected}")]
    UnexpectedType {
        key: &'static str,
        expected: &'static str,
    },

    #[error("unknown provider '{id}'")]
    UnknownProvider { id: String },
}

/// Failure to produce a lazily computed aggregate value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{url}: {source}")]
    Decode { url: String, source: DecodeError },

    #[error(transparent)]
    Store(#[from] StoreError),
}
