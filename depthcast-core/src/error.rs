//! Domain-specific error types for the depthcast pipeline.
//!
//! All fallible operations return `Result<T, DepthcastError>`.
//! Most variants are contained within a single frame's processing pass;
//! only startup failures (`Sensor`, `Bind`, `Io` at startup) reach the
//! process entry point.

use thiserror::Error;

/// The canonical error type for the depthcast pipeline.
#[derive(Debug, Error)]
pub enum DepthcastError {
    // ── Pipeline Errors ──────────────────────────────────────────
    /// No color frame has been received yet, so depth cannot be paired.
    #[error("no color frame available yet")]
    ColorUnavailable,

    /// A raw frame's sample buffer disagrees with its declared dimensions.
    #[error("invalid frame: expected {expected} samples, got {actual}")]
    InvalidFrame { expected: usize, actual: usize },

    /// The compressor rejected the packed buffer.
    #[error("compression failed: {0}")]
    Compression(String),

    /// A packed payload could not be parsed back into its fields.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    // ── Consumer Errors ──────────────────────────────────────────
    /// The consumer's connection has already been torn down.
    #[error("consumer {0} is gone")]
    ConsumerGone(u64),

    /// The consumer's bounded queue is full; the frame was dropped for it.
    #[error("consumer {0} is lagging, frame dropped")]
    ConsumerLagging(u64),

    // ── Service Errors ───────────────────────────────────────────
    /// The frame source could not start or failed mid-run.
    #[error("sensor error: {0}")]
    Sensor(String),

    /// The consumer-facing endpoint could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The TCP/IO layer reported an error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The hand-off channel to the service context was closed.
    #[error("channel closed")]
    ChannelClosed,

    /// A configuration value is outside its supported range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl DepthcastError {
    /// Whether the error only affects a single consumer and must not
    /// interrupt a broadcast.
    pub fn is_per_consumer(&self) -> bool {
        matches!(
            self,
            DepthcastError::ConsumerGone(_) | DepthcastError::ConsumerLagging(_)
        )
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for DepthcastError {
    fn from(s: String) -> Self {
        DepthcastError::Other(s)
    }
}

impl From<&str> for DepthcastError {
    fn from(s: &str) -> Self {
        DepthcastError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for DepthcastError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        DepthcastError::ChannelClosed
    }
}
