//! Chatveil Inference
//!
//! The classification side of the pipeline: the backend contract for the
//! two supported model kinds, the output-grammar parser for generative
//! text, the classification client that owns a lazily-initialized backend
//! handle, and the analysis worker service that exposes everything across
//! a message-passing boundary.
//!
//! The real ML engine is an external collaborator; the [`BackendFactory`]
//! seam is its interface. The built-in lexicon backends keep the full
//! pipeline runnable offline and in tests.

pub mod backend;
pub mod client;
pub mod lexicon;
pub mod output;
pub mod service;

pub use backend::{BackendFactory, GenerationOptions, RawClassification, SentimentBackend};
pub use client::SentimentClient;
pub use lexicon::{LexiconBackendFactory, LexiconClassifierBackend, LexiconGenerativeBackend};
pub use output::{parse_sentiment_output, ParsedSentiment};
pub use service::AnalysisService;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::backend::{BackendFactory, GenerationOptions, SentimentBackend};
    pub use crate::client::SentimentClient;
    pub use crate::lexicon::LexiconBackendFactory;
    pub use crate::output::parse_sentiment_output;
    pub use crate::service::AnalysisService;
}
