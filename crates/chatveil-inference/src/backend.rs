//! Sentiment backend contract
//!
//! A backend is one loaded inference engine instance, keyed by its model
//! identifier. Exactly one backend is alive inside the classification
//! client at a time; requesting a different identifier re-creates it.

use async_trait::async_trait;
use chatveil_core::{ChatMessage, Error, ModelKind, ModelSpec, Result};

/// Options controlling generative decoding.
///
/// Defaults match the pipeline's requirements: deterministic decoding
/// (no sampling) with a bounded output length.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Upper bound on generated tokens
    pub max_new_tokens: usize,

    /// Enable sampling; the pipeline always decodes deterministically
    pub sample: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_new_tokens: 256,
            sample: false,
        }
    }
}

/// Raw label+score candidate as emitted by a classifier backend,
/// before label normalization
#[derive(Debug, Clone)]
pub struct RawClassification {
    pub label: String,
    pub score: f32,
}

impl RawClassification {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Trait for sentiment inference backends.
///
/// A backend implements the operation matching its [`ModelKind`]; the
/// other operation fails with a backend-mismatch error by default.
#[async_trait]
pub trait SentimentBackend: Send + Sync {
    /// The kind of model this backend runs
    fn kind(&self) -> ModelKind;

    /// Identifier of the loaded model
    fn model_id(&self) -> &str;

    /// Run chat generation and return the transcript with the generated
    /// assistant message appended
    async fn generate(
        &self,
        _messages: &[ChatMessage],
        _options: &GenerationOptions,
    ) -> Result<Vec<ChatMessage>> {
        Err(Error::BackendMismatch {
            expected: ModelKind::Generative,
            actual: self.kind(),
        })
    }

    /// Classify raw text into label+score candidates, best first
    async fn classify(&self, _text: &str) -> Result<Vec<RawClassification>> {
        Err(Error::BackendMismatch {
            expected: ModelKind::Classifier,
            actual: self.kind(),
        })
    }
}

/// Creates backends for model specs.
///
/// This is the seam to the external inference engine: the production
/// wiring plugs in real model loading here, tests plug in scripted mocks.
#[async_trait]
pub trait BackendFactory: Send + Sync {
    async fn create(&self, model: &ModelSpec) -> Result<Box<dyn SentimentBackend>>;
}
