//! End-to-end pipeline tests over the simulated page
//!
//! Drive the full chain: mutation events → veil → single-flight
//! classification → visibility decision → history, with backends gated on
//! a semaphore so in-flight states are observable.

use async_trait::async_trait;
use chatveil_core::{ModelSpec, Result};
use chatveil_engine::observer::SUPPRESSION_WINDOW;
use chatveil_engine::{HostPage, NodeHandle, SimulatedPage, VeilEngine};
use chatveil_inference::{
    AnalysisService, BackendFactory, GenerationOptions, RawClassification, SentimentBackend,
};
use chatveil_core::{ChatMessage, Error, ModelKind};
use chatveil_store::{CommentHistory, SettingsStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Backend gated on a semaphore, recording how many classifications ever
/// overlapped. Classifier calls label comments containing "bad" negative;
/// generative calls replay a fixed grammar line.
struct GatedBackend {
    id: String,
    kind: ModelKind,
    gate: Arc<Semaphore>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    generative_output: String,
}

impl GatedBackend {
    async fn enter(&self) {
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SentimentBackend for GatedBackend {
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
        self.enter().await;
        let mut transcript = messages.to_vec();
        transcript.push(ChatMessage::assistant(self.generative_output.clone()));
        self.leave();
        Ok(transcript)
    }

    async fn classify(&self, text: &str) -> Result<Vec<RawClassification>> {
        self.enter().await;
        let out = if text.contains("boom") {
            Err(Error::backend("synthetic inference failure"))
        } else if text.contains("bad") {
            Ok(vec![RawClassification::new("Negative", 0.9)])
        } else {
            Ok(vec![RawClassification::new("Positive", 0.9)])
        };
        self.leave();
        out
    }
}

#[derive(Clone)]
struct GatedFactory {
    gate: Arc<Semaphore>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    generative_output: String,
}

impl GatedFactory {
    fn new(generative_output: &str) -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
            generative_output: generative_output.to_string(),
        }
    }

    fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    fn max_concurrency(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendFactory for GatedFactory {
    async fn create(&self, model: &ModelSpec) -> Result<Box<dyn SentimentBackend>> {
        Ok(Box::new(GatedBackend {
            id: model.id.clone(),
            kind: model.kind,
            gate: Arc::clone(&self.gate),
            active: Arc::clone(&self.active),
            max_active: Arc::clone(&self.max_active),
            generative_output: self.generative_output.clone(),
        }))
    }
}

struct Harness {
    page: Arc<SimulatedPage>,
    chat_document: NodeHandle,
    engine: VeilEngine,
    settings: SettingsStore,
    service: AnalysisService,
}

/// Build the full surface hierarchy, start the engine, and let the
/// suppression window lapse.
async fn harness(factory: GatedFactory, model: ModelSpec) -> Harness {
    let settings = SettingsStore::in_memory();
    settings.set_model(model).unwrap();
    let history = CommentHistory::in_memory(settings.clone());
    let service = AnalysisService::spawn(Box::new(factory), settings.clone(), history);

    let page = Arc::new(SimulatedPage::new());
    let shell = page.insert_element(page.document(), "live-app");

    let engine = VeilEngine::new(
        Arc::clone(&page) as Arc<dyn HostPage>,
        settings.clone(),
        service.clone(),
    );
    engine.start().unwrap();

    page.insert_element(shell, "page-manager");
    let frame = page.create_element("live-chat-frame");
    let iframe = page.create_element("iframe#chatframe");
    page.append_child(frame, iframe);
    page.append_child(shell, frame);
    tokio::time::sleep(Duration::from_millis(1)).await;

    let chat_document = page.load_iframe(iframe, true).expect("accessible document");
    tokio::time::sleep(SUPPRESSION_WINDOW + Duration::from_millis(10)).await;

    Harness {
        page,
        chat_document,
        engine,
        settings,
        service,
    }
}

async fn tick() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn comments_are_veiled_immediately_and_classified_in_order() {
    let factory = GatedFactory::new("");
    let h = harness(factory.clone(), ModelSpec::classifier("gated")).await;

    let first = h.page.insert_chat_message(h.chat_document, "bad driver");
    let second = h.page.insert_chat_message(h.chat_document, "lovely weather");
    let third = h.page.insert_chat_message(h.chat_document, "bad stewards");
    tick().await;

    // All veiled synchronously at discovery, before any classification
    // finished (the gate is still closed).
    for node in [first, second, third] {
        assert!(h.page.style_of(node).contains("blur(5px)"));
    }
    assert_eq!(h.engine.veiled_count(), 3);
    assert_eq!(h.engine.stats().discovered, 3);

    factory.release(3);
    h.engine.drained().await;

    // Strict single-flight execution.
    assert_eq!(factory.max_concurrency(), 1);

    // Decisions: negative comments stay veiled, the rest are restored.
    assert!(h.page.style_of(first).contains("blur(5px)"));
    assert!(!h.page.style_of(second).contains("blur"));
    assert!(h.page.style_of(third).contains("blur(5px)"));

    // History preserves discovery order.
    let items = h.service.get_all_comments_from_history().await.unwrap();
    let comments: Vec<_> = items.iter().map(|i| i.comment.as_str()).collect();
    assert_eq!(comments, ["bad driver", "lovely weather", "bad stewards"]);
}

#[tokio::test(start_paused = true)]
async fn thresholds_changed_mid_flight_apply_to_pending_decisions() {
    let factory = GatedFactory::new("sentiment:negative\nconfidence:0.6");
    let h = harness(factory.clone(), ModelSpec::generative("gated")).await;

    let node = h.page.insert_chat_message(h.chat_document, "ugh");
    tick().await;
    assert!(h.page.style_of(node).contains("blur(5px)"));

    // With the default 0.5 threshold this would stay veiled; raise it
    // while the classification is in flight.
    h.settings.set_confidence_threshold(0.7).unwrap();
    factory.release(1);
    h.engine.drained().await;

    assert!(!h.page.style_of(node).contains("blur"));
    assert_eq!(h.engine.stats().restored, 1);
}

#[tokio::test(start_paused = true)]
async fn failed_classification_leaves_the_comment_veiled() {
    let factory = GatedFactory::new("");
    let h = harness(factory.clone(), ModelSpec::classifier("gated")).await;

    let failing = h.page.insert_chat_message(h.chat_document, "boom goes the backend");
    let fine = h.page.insert_chat_message(h.chat_document, "good recovery");
    tick().await;

    factory.release(2);
    h.engine.drained().await;

    // The failed comment stays in its pre-classification state; the queue
    // moved on to the next task.
    assert!(h.page.style_of(failing).contains("blur(5px)"));
    assert!(!h.page.style_of(fine).contains("blur"));

    let stats = h.engine.stats();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.restored, 1);

    // Only completed classifications reach the history log.
    let items = h.service.get_all_comments_from_history().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].comment, "good recovery");
}

#[tokio::test(start_paused = true)]
async fn switching_the_model_applies_to_queued_work() {
    let factory = GatedFactory::new("sentiment:positive\nconfidence:0.9");
    let h = harness(factory.clone(), ModelSpec::classifier("gated")).await;

    h.page.insert_chat_message(h.chat_document, "bad luck");
    tick().await;

    // Switch models before the queued task runs: it must pick up the
    // generative spec at execution time.
    h.settings.set_model(ModelSpec::generative("gated-gen")).unwrap();
    factory.release(1);
    h.engine.drained().await;

    let items = h.service.get_all_comments_from_history().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].result.model(), "gated-gen");
}
