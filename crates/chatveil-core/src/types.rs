//! Core types for chatveil

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentiment predicted for a chat comment.
///
/// Ordered from most negative to most positive. Generative backends only
/// ever produce the middle three values; classifier backends may produce
/// all five.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    VeryNegative,
    Negative,
    Neutral,
    Positive,
    VeryPositive,
}

impl Sentiment {
    /// Parse a raw backend label into a sentiment value.
    ///
    /// Labels are normalized by lowercasing and replacing spaces with
    /// underscores before matching, so `"Very Negative"` and
    /// `"very_negative"` are equivalent.
    pub fn from_label(label: &str) -> Result<Self> {
        let normalized = label.replace(' ', "_").to_lowercase();
        match normalized.as_str() {
            "very_negative" => Ok(Self::VeryNegative),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            "positive" => Ok(Self::Positive),
            "very_positive" => Ok(Self::VeryPositive),
            _ => Err(Error::unknown_label(normalized)),
        }
    }

    /// Canonical snake_case label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryNegative => "very_negative",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Positive => "positive",
            Self::VeryPositive => "very_positive",
        }
    }

    /// Whether this sentiment counts as negative for veiling decisions
    pub fn is_negative(&self) -> bool {
        matches!(self, Self::VeryNegative | Self::Negative)
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of inference backend a model runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Free-text generation; output is parsed against the sentiment grammar
    Generative,
    /// Structured label+score classification
    Classifier,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generative => f.write_str("generative"),
            Self::Classifier => f.write_str("classifier"),
        }
    }
}

/// Selects one of the two supported inference backends.
///
/// The identifier keys backend initialization: the classification client
/// re-creates its backend whenever the active identifier differs from the
/// requested one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub kind: ModelKind,
    pub id: String,
}

impl ModelSpec {
    /// Create a generative model spec
    pub fn generative(id: impl Into<String>) -> Self {
        Self {
            kind: ModelKind::Generative,
            id: id.into(),
        }
    }

    /// Create a classifier model spec
    pub fn classifier(id: impl Into<String>) -> Self {
        Self {
            kind: ModelKind::Classifier,
            id: id.into(),
        }
    }

    /// Default generative model (built-in lexicon backend)
    pub fn default_generative() -> Self {
        Self::generative("chatveil/lexicon-instruct")
    }

    /// Default classifier model (built-in lexicon backend)
    pub fn default_classifier() -> Self {
        Self::classifier("chatveil/lexicon-sentiment")
    }
}

/// A chat message in a generative prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Normalized result of a sentiment analysis request.
///
/// Mirrors the two model kinds: generative results carry a parsed
/// confidence, classifier results carry the backend's score. Both scalars
/// live in [0, 1] and gate the veil/restore decision identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model_kind", rename_all = "snake_case")]
pub enum AnalysisResult {
    Generative {
        model: String,
        sentiment: Sentiment,
        confidence: f32,
    },
    Classifier {
        model: String,
        sentiment: Sentiment,
        score: f32,
    },
}

impl AnalysisResult {
    /// The model identifier that produced this result
    pub fn model(&self) -> &str {
        match self {
            Self::Generative { model, .. } | Self::Classifier { model, .. } => model,
        }
    }

    /// The predicted sentiment
    pub fn sentiment(&self) -> Sentiment {
        match self {
            Self::Generative { sentiment, .. } | Self::Classifier { sentiment, .. } => *sentiment,
        }
    }

    /// The gating scalar (confidence or score, depending on model kind)
    pub fn certainty(&self) -> f32 {
        match self {
            Self::Generative { confidence, .. } => *confidence,
            Self::Classifier { score, .. } => *score,
        }
    }
}

/// One analyzed comment as persisted in the history store.
///
/// The `id` is assigned by the store at insertion time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentHistoryItem {
    pub id: u64,
    pub analyzed_at: DateTime<Utc>,
    pub comment: String,
    pub result: AnalysisResult,
}
