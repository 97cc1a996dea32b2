//! Classification client
//!
//! Owns the single live inference backend as an explicitly held,
//! lazily-initialized resource. The backend is keyed by model identifier:
//! requesting a different identifier drops the old backend and creates a
//! fresh one, it is never reused across models.

use crate::backend::{BackendFactory, GenerationOptions, SentimentBackend};
use crate::output::parse_sentiment_output;
use chatveil_core::{AnalysisResult, Error, ModelKind, ModelSpec, PromptTemplates, Result, Sentiment};
use tracing::debug;

/// Adapter between the pipeline and the inference backend.
///
/// Exactly one logical consumer (the task queue, via the analysis worker)
/// calls into this, so no internal locking is needed.
pub struct SentimentClient {
    factory: Box<dyn BackendFactory>,
    backend: Option<Box<dyn SentimentBackend>>,
}

impl SentimentClient {
    pub fn new(factory: Box<dyn BackendFactory>) -> Self {
        Self {
            factory,
            backend: None,
        }
    }

    /// Analyze one comment with the requested model.
    ///
    /// `templates` only applies to the generative kind and is read by the
    /// caller at request time, so edits take effect for in-flight work.
    pub async fn analyze(
        &mut self,
        comment: &str,
        model: &ModelSpec,
        templates: &PromptTemplates,
    ) -> Result<AnalysisResult> {
        let backend = self.ensure_backend(model).await?;

        if backend.kind() != model.kind {
            return Err(Error::BackendMismatch {
                expected: model.kind,
                actual: backend.kind(),
            });
        }

        match model.kind {
            ModelKind::Generative => {
                let messages = templates.build_messages(comment);
                let transcript = backend
                    .generate(&messages, &GenerationOptions::default())
                    .await?;

                let output = transcript
                    .last()
                    .map(|m| m.content.as_str())
                    .unwrap_or_default();
                let parsed = parse_sentiment_output(output)?;

                Ok(AnalysisResult::Generative {
                    model: model.id.clone(),
                    sentiment: parsed.sentiment,
                    confidence: parsed.confidence,
                })
            }
            ModelKind::Classifier => {
                let candidates = backend.classify(comment).await?;
                let first = candidates
                    .first()
                    .ok_or_else(|| Error::backend("classifier returned no candidates"))?;

                let sentiment = Sentiment::from_label(&first.label)?;

                Ok(AnalysisResult::Classifier {
                    model: model.id.clone(),
                    sentiment,
                    score: first.score,
                })
            }
        }
    }

    /// Identifier of the currently loaded backend, if any
    pub fn active_model(&self) -> Option<&str> {
        self.backend.as_deref().map(|b| b.model_id())
    }

    async fn ensure_backend(&mut self, model: &ModelSpec) -> Result<&dyn SentimentBackend> {
        let stale = match &self.backend {
            Some(backend) => backend.model_id() != model.id,
            None => true,
        };

        if stale {
            debug!(model = %model.id, kind = %model.kind, "initializing inference backend");
            self.backend = Some(self.factory.create(model).await?);
        }

        self.backend
            .as_deref()
            .ok_or_else(|| Error::backend("backend initialization produced no instance"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RawClassification;
    use async_trait::async_trait;
    use chatveil_core::ChatMessage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Backend that replays a fixed generative output or classification
    struct ScriptedBackend {
        id: String,
        kind: ModelKind,
        generative_output: String,
        classification: Option<RawClassification>,
    }

    #[async_trait]
    impl SentimentBackend for ScriptedBackend {
        fn kind(&self) -> ModelKind {
            self.kind
        }

        fn model_id(&self) -> &str {
            &self.id
        }

        async fn generate(
            &self,
            messages: &[ChatMessage],
            _options: &GenerationOptions,
        ) -> Result<Vec<ChatMessage>> {
            let mut transcript = messages.to_vec();
            transcript.push(ChatMessage::assistant(self.generative_output.clone()));
            Ok(transcript)
        }

        async fn classify(&self, _text: &str) -> Result<Vec<RawClassification>> {
            Ok(self.classification.clone().into_iter().collect())
        }
    }

    struct CountingFactory {
        created: Arc<AtomicUsize>,
        output: String,
        classification: Option<RawClassification>,
    }

    #[async_trait]
    impl BackendFactory for CountingFactory {
        async fn create(&self, model: &ModelSpec) -> Result<Box<dyn SentimentBackend>> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedBackend {
                id: model.id.clone(),
                kind: model.kind,
                generative_output: self.output.clone(),
                classification: self.classification.clone(),
            }))
        }
    }

    fn client_with(
        output: &str,
        classification: Option<RawClassification>,
    ) -> (SentimentClient, Arc<AtomicUsize>) {
        let created = Arc::new(AtomicUsize::new(0));
        let factory = CountingFactory {
            created: Arc::clone(&created),
            output: output.to_string(),
            classification,
        };
        (SentimentClient::new(Box::new(factory)), created)
    }

    #[tokio::test]
    async fn generative_analysis_parses_the_transcript() {
        let (mut client, _) = client_with("sentiment:negative\nconfidence:0.87", None);
        let model = ModelSpec::generative("scripted");

        let result = client
            .analyze("boo", &model, &PromptTemplates::default())
            .await
            .unwrap();

        assert_eq!(
            result,
            AnalysisResult::Generative {
                model: "scripted".to_string(),
                sentiment: Sentiment::Negative,
                confidence: 0.87,
            }
        );
    }

    #[tokio::test]
    async fn classifier_analysis_normalizes_labels() {
        let (mut client, _) = client_with("", Some(RawClassification::new("Very Negative", 0.93)));
        let model = ModelSpec::classifier("scripted");

        let result = client
            .analyze("boo", &model, &PromptTemplates::default())
            .await
            .unwrap();

        assert_eq!(result.sentiment(), Sentiment::VeryNegative);
        assert_eq!(result.certainty(), 0.93);
    }

    #[tokio::test]
    async fn unknown_labels_fail_the_task() {
        let (mut client, _) = client_with("", Some(RawClassification::new("SOMETHING ELSE", 0.9)));
        let model = ModelSpec::classifier("scripted");

        assert!(matches!(
            client
                .analyze("boo", &model, &PromptTemplates::default())
                .await,
            Err(Error::UnknownLabel(_))
        ));
    }

    #[tokio::test]
    async fn backend_is_reused_for_the_same_identifier() {
        let (mut client, created) = client_with("sentiment:neutral\nconfidence:0.5", None);
        let model = ModelSpec::generative("same");

        for _ in 0..3 {
            client
                .analyze("hm", &model, &PromptTemplates::default())
                .await
                .unwrap();
        }

        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn switching_models_recreates_the_backend() {
        let (mut client, created) = client_with(
            "sentiment:neutral\nconfidence:0.5",
            Some(RawClassification::new("Neutral", 0.5)),
        );

        let generative = ModelSpec::generative("a");
        let classifier = ModelSpec::classifier("b");
        let templates = PromptTemplates::default();

        client.analyze("x", &generative, &templates).await.unwrap();
        client.analyze("x", &classifier, &templates).await.unwrap();
        client.analyze("x", &generative, &templates).await.unwrap();

        assert_eq!(created.load(Ordering::SeqCst), 3);
        assert_eq!(client.active_model(), Some("a"));
    }

    #[tokio::test]
    async fn kind_mismatch_is_reported() {
        // Same identifier requested under a different kind: the cached
        // backend survives the identifier check but fails the kind check.
        let (mut client, _) = client_with("sentiment:neutral\nconfidence:0.5", None);
        let templates = PromptTemplates::default();

        client
            .analyze("x", &ModelSpec::generative("shared"), &templates)
            .await
            .unwrap();

        let mismatched = ModelSpec {
            kind: ModelKind::Classifier,
            id: "shared".to_string(),
        };
        assert!(matches!(
            client.analyze("x", &mismatched, &templates).await,
            Err(Error::BackendMismatch { .. })
        ));
    }
}
