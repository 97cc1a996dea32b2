//! Error types for chatveil

use crate::types::ModelKind;

/// Result type alias using chatveil's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for chatveil operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Expected attachment point missing on the host page
    #[error("discovery error: {0}")]
    Discovery(String),

    /// Wrong inference backend kind for the requested model
    #[error("backend mismatch: expected a {expected} backend, got {actual}")]
    BackendMismatch {
        expected: ModelKind,
        actual: ModelKind,
    },

    /// Generation produced no text
    #[error("empty output from generative backend")]
    EmptyOutput,

    /// Model output did not match the expected grammar
    #[error("malformed output: {0}")]
    OutputFormat(String),

    /// Confidence parsed but fell outside [0, 1]
    #[error("invalid confidence: {0}")]
    InvalidConfidence(f32),

    /// Classification label outside the known sentiment values
    #[error("unknown sentiment label: {0}")]
    UnknownLabel(String),

    /// History persistence failure
    #[error("history write error: {0}")]
    HistoryWrite(String),

    /// Inference backend execution failure
    #[error("backend error: {0}")]
    Backend(String),

    /// Analysis worker unreachable (channel closed)
    #[error("analysis worker unavailable: {0}")]
    Worker(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new discovery error
    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery(msg.into())
    }

    /// Create a new output-format error
    pub fn output_format(msg: impl Into<String>) -> Self {
        Self::OutputFormat(msg.into())
    }

    /// Create a new unknown-label error
    pub fn unknown_label(label: impl Into<String>) -> Self {
        Self::UnknownLabel(label.into())
    }

    /// Create a new history-write error
    pub fn history_write(msg: impl Into<String>) -> Self {
        Self::HistoryWrite(msg.into())
    }

    /// Create a new backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a new worker error
    pub fn worker(msg: impl Into<String>) -> Self {
        Self::Worker(msg.into())
    }
}
