//! Error taxonomy for a batch run.
//!
//! Every variant of [`ItemError`] is fatal to one work item only; the driver
//! catches it, logs it with the item's identity and moves on. Field-level
//! extraction problems are not errors at all, see [`crate::metrics::FieldWarning`].

use thiserror::Error;

/// Failure while turning the response body into JSON values.
#[derive(Debug, Error)]
pub enum StreamDecodeError {
    #[error("Malformed JSON in response stream (value starting at byte {value_start}): {source}")]
    Malformed {
        value_start: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Response stream ended inside a JSON value ({pending} bytes pending)")]
    Truncated { pending: usize },

    #[error("Failed to read response stream: {0}")]
    Io(#[source] std::io::Error),
}

/// Failure that aborts processing of a single work item.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("Failed to serialize generation request: {0}")]
    RequestConstruction(#[source] serde_json::Error),

    #[error("Failed to reach generation service: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Received non-OK response: {status} (body: {body})")]
    NonSuccessStatus { status: u16, body: String },

    #[error("Error reading JSON stream: {0}")]
    StreamDecode(#[from] StreamDecodeError),

    #[error("Processing cancelled")]
    Cancelled,
}

/// Failure while persisting a record. Reported, never fatal to the run.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Result store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to prepare result store location: {0}")]
    Io(#[from] std::io::Error),
}
