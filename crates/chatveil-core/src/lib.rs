//! Chatveil Core
//!
//! Core types, traits, and utilities shared across chatveil components.
//!
//! This crate provides:
//! - Sentiment labels, model selection, and analysis result types
//! - Error types and result handling
//! - The strict FIFO, single-concurrency task queue that serializes
//!   per-comment classification work

pub mod error;
pub mod prompt;
pub mod queue;
pub mod types;

pub use error::{Error, Result};
pub use prompt::PromptTemplates;
pub use queue::TaskQueue;
pub use types::{
    AnalysisResult, ChatMessage, CommentHistoryItem, ModelKind, ModelSpec, Sentiment,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::prompt::PromptTemplates;
    pub use crate::queue::TaskQueue;
    pub use crate::types::{AnalysisResult, ChatMessage, ModelKind, ModelSpec, Sentiment};
}
