//! Lexicon-based sentiment backends
//!
//! Wordlist-driven stand-ins for the external ML engine. They are cheap,
//! deterministic, and speak both backend dialects: the classifier twin
//! emits human-form labels with scores, the generative twin renders its
//! verdict in the output grammar. The full pipeline runs offline on them,
//! and every test that is not about a specific backend behavior uses them.

use crate::backend::{BackendFactory, GenerationOptions, RawClassification, SentimentBackend};
use aho_corasick::AhoCorasick;
use async_trait::async_trait;
use chatveil_core::{ChatMessage, Error, ModelKind, ModelSpec, Result, Sentiment};

const POSITIVE_WORDS: &[&str] = &[
    "good",
    "great",
    "excellent",
    "love",
    "amazing",
    "wonderful",
    "happy",
    "fantastic",
    "awesome",
    "best",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad",
    "terrible",
    "awful",
    "hate",
    "horrible",
    "worst",
    "sad",
    "angry",
    "disappointed",
    "trash",
];

/// Shared wordlist matcher used by both lexicon backends
struct Lexicon {
    positive: AhoCorasick,
    negative: AhoCorasick,
}

impl Lexicon {
    fn new() -> Result<Self> {
        let positive = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(POSITIVE_WORDS)
            .map_err(|e| Error::backend(format!("failed to build positive matcher: {e}")))?;

        let negative = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(NEGATIVE_WORDS)
            .map_err(|e| Error::backend(format!("failed to build negative matcher: {e}")))?;

        Ok(Self { positive, negative })
    }

    /// Weigh a text into a five-label sentiment plus a certainty in [0, 1]
    fn weigh(&self, text: &str) -> (Sentiment, f32) {
        let positive_hits = self.positive.find_iter(text).count() as f32;
        let negative_hits = self.negative.find_iter(text).count() as f32;
        let total = positive_hits + negative_hits;

        if total == 0.0 {
            return (Sentiment::Neutral, 0.5);
        }

        let positivity = positive_hits / total;
        let sentiment = if positivity >= 0.9 {
            Sentiment::VeryPositive
        } else if positivity > 0.5 {
            Sentiment::Positive
        } else if positivity >= 0.5 {
            Sentiment::Neutral
        } else if positivity > 0.1 {
            Sentiment::Negative
        } else {
            Sentiment::VeryNegative
        };

        let certainty = positivity.max(1.0 - positivity);
        (sentiment, certainty)
    }
}

/// Classifier-kind lexicon backend emitting raw `{label, score}` candidates
pub struct LexiconClassifierBackend {
    model_id: String,
    lexicon: Lexicon,
}

impl LexiconClassifierBackend {
    pub fn new(model_id: impl Into<String>) -> Result<Self> {
        Ok(Self {
            model_id: model_id.into(),
            lexicon: Lexicon::new()?,
        })
    }
}

#[async_trait]
impl SentimentBackend for LexiconClassifierBackend {
    fn kind(&self) -> ModelKind {
        ModelKind::Classifier
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn classify(&self, text: &str) -> Result<Vec<RawClassification>> {
        let (sentiment, certainty) = self.lexicon.weigh(text);

        // Human-form label, the way hosted classification engines report
        // them; the client is responsible for normalization.
        let label = match sentiment {
            Sentiment::VeryNegative => "Very Negative",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
            Sentiment::Positive => "Positive",
            Sentiment::VeryPositive => "Very Positive",
        };

        Ok(vec![RawClassification::new(label, certainty)])
    }
}

/// Generative-kind lexicon backend rendering its verdict in the output grammar
pub struct LexiconGenerativeBackend {
    model_id: String,
    lexicon: Lexicon,
}

impl LexiconGenerativeBackend {
    pub fn new(model_id: impl Into<String>) -> Result<Self> {
        Ok(Self {
            model_id: model_id.into(),
            lexicon: Lexicon::new()?,
        })
    }
}

#[async_trait]
impl SentimentBackend for LexiconGenerativeBackend {
    fn kind(&self) -> ModelKind {
        ModelKind::Generative
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        _options: &GenerationOptions,
    ) -> Result<Vec<ChatMessage>> {
        // The comment arrives embedded in the user template; weighing the
        // whole message is equivalent for a wordlist model.
        let input = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let (sentiment, certainty) = self.lexicon.weigh(input);

        // Generative models only speak the three-label grammar.
        let label = match sentiment {
            Sentiment::VeryNegative | Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::VeryPositive | Sentiment::Positive => "positive",
        };

        let mut transcript = messages.to_vec();
        transcript.push(ChatMessage::assistant(format!(
            "sentiment:{label}\nconfidence:{certainty:.2}"
        )));
        Ok(transcript)
    }
}

/// Default backend factory wiring the lexicon backends
pub struct LexiconBackendFactory;

#[async_trait]
impl BackendFactory for LexiconBackendFactory {
    async fn create(&self, model: &ModelSpec) -> Result<Box<dyn SentimentBackend>> {
        match model.kind {
            ModelKind::Classifier => Ok(Box::new(LexiconClassifierBackend::new(&model.id)?)),
            ModelKind::Generative => Ok(Box::new(LexiconGenerativeBackend::new(&model.id)?)),
        }
    }
}
