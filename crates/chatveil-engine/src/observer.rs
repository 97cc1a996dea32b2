//! DOM observation state machine
//!
//! The root component of the pipeline. It attaches nested watchers to
//! progressively discovered host surfaces (app shell → chat frame →
//! iframe document), veils each qualifying chat message the moment it is
//! inserted, and enqueues classification work on the single-flight queue.
//!
//! Missing attachment points are logged and left alone; there is no retry
//! or backoff. A host page reload tears the surfaces down and the whole
//! machine is rebuilt from `Idle` by whoever owns it.

use crate::host::{HostPage, IframeLoad, Insertion, NodeHandle, SurfaceSelectors};
use crate::logfilter::EngineLog;
use crate::visibility::{VeilDecision, VisibilityController};
use chatveil_core::{Error, Result, TaskQueue};
use chatveil_inference::AnalysisService;
use chatveil_store::{Settings, SettingsStore};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

/// Quiet window after attaching to a chat document during which the
/// replayed comment backlog is ignored. One-shot per attachment.
pub const SUPPRESSION_WINDOW: Duration = Duration::from_millis(1000);

/// Where the machine currently sits in the discovery hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Idle,
    AttachedToShell,
    AwaitingLiveChatFrame,
    AttachedToLiveChatIframe,
    Observing,
    Stopped,
}

#[derive(Default)]
struct Stats {
    discovered: AtomicU64,
    kept: AtomicU64,
    restored: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time counters for the engine's work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Comments discovered and enqueued
    pub discovered: u64,
    /// Decisions that kept the veil
    pub kept: u64,
    /// Decisions that restored the original appearance
    pub restored: u64,
    /// Tasks that failed before reaching a decision
    pub failed: u64,
}

/// The live-chat veil engine.
///
/// `start` attaches the outer watcher and spawns the event loop; `stop`
/// disconnects everything and is idempotent. Restarting after a stop
/// means building a fresh engine, mirroring a full page reload.
pub struct VeilEngine {
    page: Arc<dyn HostPage>,
    selectors: SurfaceSelectors,
    settings: SettingsStore,
    service: AnalysisService,
    queue: TaskQueue,
    visibility: VisibilityController,
    log: EngineLog,
    state: Arc<RwLock<ObserverState>>,
    stats: Arc<Stats>,
    stop: watch::Sender<bool>,
}

impl VeilEngine {
    /// Build an engine over a page. Must be called inside a tokio
    /// runtime; the task queue's drain loop starts immediately.
    pub fn new(page: Arc<dyn HostPage>, settings: SettingsStore, service: AnalysisService) -> Self {
        let log = EngineLog::new(settings.get().log_filters);
        let visibility = VisibilityController::new(Arc::clone(&page));
        let (stop, _) = watch::channel(false);
        Self {
            page,
            selectors: SurfaceSelectors::default(),
            settings,
            service,
            queue: TaskQueue::new(),
            visibility,
            log,
            state: Arc::new(RwLock::new(ObserverState::Idle)),
            stats: Arc::new(Stats::default()),
            stop,
        }
    }

    /// Override the surface selectors
    pub fn with_selectors(mut self, selectors: SurfaceSelectors) -> Self {
        self.selectors = selectors;
        self
    }

    /// Locate the app shell and start observing.
    ///
    /// A missing shell is a non-fatal discovery error: logged, no retry,
    /// state stays `Idle` (the page is assumed not yet loaded or
    /// structurally incompatible).
    pub fn start(&self) -> Result<()> {
        if *self.state.read() != ObserverState::Idle {
            self.log.warn("start ignored: observer is not idle");
            return Ok(());
        }

        let Some(shell) = self.page.query(&self.selectors.app_shell) else {
            self.log.error(format!(
                "failed to find {} element",
                self.selectors.app_shell
            ));
            return Err(Error::discovery(format!(
                "{} element not found",
                self.selectors.app_shell
            )));
        };

        let outer = self.page.watch_children(shell);
        *self.state.write() = ObserverState::AttachedToShell;
        self.log
            .debug(format!("started observing {} element", self.selectors.app_shell));

        let ctx = LoopCtx {
            page: Arc::clone(&self.page),
            selectors: self.selectors.clone(),
            settings: self.settings.clone(),
            service: self.service.clone(),
            queue: self.queue.clone(),
            visibility: self.visibility.clone(),
            log: self.log.clone(),
            state: Arc::clone(&self.state),
            stats: Arc::clone(&self.stats),
            processed: HashSet::new(),
        };
        tokio::spawn(ctx.run(outer, self.stop.subscribe(), self.settings.watch()));
        Ok(())
    }

    /// Disconnect both watchers. Idempotent; in-flight and queued tasks
    /// still run to completion.
    pub fn stop(&self) {
        {
            let mut state = self.state.write();
            if *state == ObserverState::Stopped {
                return;
            }
            *state = ObserverState::Stopped;
        }
        let _ = self.stop.send(true);
        self.log.info("stopped observing the live chat");
    }

    /// Current state of the machine
    pub fn state(&self) -> ObserverState {
        *self.state.read()
    }

    /// Snapshot of the work counters
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            discovered: self.stats.discovered.load(Ordering::Relaxed),
            kept: self.stats.kept.load(Ordering::Relaxed),
            restored: self.stats.restored.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
        }
    }

    /// Number of comments currently veiled
    pub fn veiled_count(&self) -> usize {
        self.visibility.veiled_count()
    }

    /// Wait for every enqueued classification task to finish
    pub async fn drained(&self) {
        self.queue.drained().await;
    }
}

enum LoopEvent {
    Stop,
    Settings,
    Shell(Option<Insertion>),
    Iframe(Option<IframeLoad>),
    Chat(Option<Insertion>),
}

struct LoopCtx {
    page: Arc<dyn HostPage>,
    selectors: SurfaceSelectors,
    settings: SettingsStore,
    service: AnalysisService,
    queue: TaskQueue,
    visibility: VisibilityController,
    log: EngineLog,
    state: Arc<RwLock<ObserverState>>,
    stats: Arc<Stats>,
    processed: HashSet<NodeHandle>,
}

impl LoopCtx {
    async fn run(
        mut self,
        mut shell_rx: mpsc::UnboundedReceiver<Insertion>,
        mut stop_rx: watch::Receiver<bool>,
        mut settings_rx: watch::Receiver<Settings>,
    ) {
        let mut iframe_rx: Option<mpsc::UnboundedReceiver<IframeLoad>> = None;
        let mut chat_rx: Option<mpsc::UnboundedReceiver<Insertion>> = None;
        let mut attached_at: Option<Instant> = None;

        loop {
            let event = tokio::select! {
                _ = stop_rx.changed() => LoopEvent::Stop,
                _ = settings_rx.changed() => LoopEvent::Settings,
                insertion = shell_rx.recv() => LoopEvent::Shell(insertion),
                load = recv_or_pending(&mut iframe_rx) => LoopEvent::Iframe(load),
                insertion = recv_or_pending(&mut chat_rx) => LoopEvent::Chat(insertion),
            };

            match event {
                LoopEvent::Stop => break,
                LoopEvent::Settings => {
                    self.log.set_filters(settings_rx.borrow().log_filters);
                }
                // The page tore the shell watcher down; nothing left to
                // observe until a rebuild.
                LoopEvent::Shell(None) => break,
                LoopEvent::Shell(Some(insertion)) => {
                    self.on_shell_insertion(insertion, &mut iframe_rx);
                }
                LoopEvent::Iframe(None) => iframe_rx = None,
                LoopEvent::Iframe(Some(load)) => {
                    self.on_iframe_load(load, &mut chat_rx, &mut attached_at);
                }
                LoopEvent::Chat(None) => chat_rx = None,
                LoopEvent::Chat(Some(insertion)) => {
                    self.on_chat_insertion(insertion, attached_at);
                }
            }
        }

        *self.state.write() = ObserverState::Stopped;
    }

    /// Insertions under the app shell: intermediate containers are
    /// logged, the chat frame host triggers iframe discovery.
    fn on_shell_insertion(
        &mut self,
        insertion: Insertion,
        iframe_rx: &mut Option<mpsc::UnboundedReceiver<IframeLoad>>,
    ) {
        let tag = insertion.tag.as_str();

        if tag == SurfaceSelectors::tag_of(&self.selectors.page_manager) {
            self.log
                .debug(format!("loaded {} element", self.selectors.page_manager));
        } else if tag == SurfaceSelectors::tag_of(&self.selectors.watch_view) {
            self.log
                .debug(format!("loaded {} element", self.selectors.watch_view));
        } else if tag == SurfaceSelectors::tag_of(&self.selectors.chat_frame) {
            self.log
                .debug(format!("loaded {} element", self.selectors.chat_frame));

            match self
                .page
                .query_within(insertion.node, &self.selectors.chat_iframe)
            {
                Some(iframe) => {
                    self.log
                        .debug(format!("found {} element", self.selectors.chat_iframe));
                    *iframe_rx = Some(self.page.iframe_loads(iframe));
                    self.set_state(ObserverState::AwaitingLiveChatFrame);
                }
                // The frame is assumed transient or incompatible.
                None => self.log.warn(format!(
                    "failed to find {} element",
                    self.selectors.chat_iframe
                )),
            }
        }
    }

    /// The iframe finished loading; attach the inner watcher if its
    /// content document is accessible. No retry is scheduled otherwise.
    fn on_iframe_load(
        &mut self,
        load: IframeLoad,
        chat_rx: &mut Option<mpsc::UnboundedReceiver<Insertion>>,
        attached_at: &mut Option<Instant>,
    ) {
        match load.document {
            Some(document) => {
                self.log.debug("loaded live chat content document");
                self.set_state(ObserverState::AttachedToLiveChatIframe);

                *chat_rx = Some(self.page.watch_children(document));
                *attached_at = Some(Instant::now());

                self.set_state(ObserverState::Observing);
                self.log.debug("started observing live chat content document");
            }
            None => {
                self.log.warn("failed to load live chat content document");
            }
        }
    }

    /// One insertion inside the chat document: veil it and enqueue
    /// classification, unless it falls inside the suppression window.
    fn on_chat_insertion(&mut self, insertion: Insertion, attached_at: Option<Instant>) {
        if insertion.tag != SurfaceSelectors::tag_of(&self.selectors.message_renderer) {
            return;
        }
        let Some(attached_at) = attached_at else {
            return;
        };

        if Instant::now() < attached_at + SUPPRESSION_WINDOW {
            self.log
                .debug("initial load window active, skipping replayed comment");
            return;
        }

        if self.processed.contains(&insertion.node) {
            return;
        }
        self.processed.insert(insertion.node);
        self.stats.discovered.fetch_add(1, Ordering::Relaxed);

        let comment = self
            .page
            .query_within(insertion.node, &self.selectors.message_text)
            .map(|n| self.page.text_of(n))
            .unwrap_or_default()
            .trim()
            .to_string();

        self.visibility.obscure(insertion.node);
        self.log
            .debug(format!("veiling comment: {}...", prefix(&comment)));

        let node = insertion.node;
        let service = self.service.clone();
        let settings = self.settings.clone();
        let visibility = self.visibility.clone();
        let log = self.log.clone();
        let stats = Arc::clone(&self.stats);

        self.queue.push(async move {
            // The selected model is read at execution time, so a switch
            // mid-queue applies to everything still waiting.
            let model = settings.get().model;
            let result = match service.analyze_sentiment(comment.clone(), model).await {
                Ok(result) => result,
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    log.error(format!(
                        "sentiment analysis failed for comment \"{}\": {e}",
                        prefix(&comment)
                    ));
                    // The comment stays veiled; the error surfaces at the
                    // queue boundary.
                    return Err(e);
                }
            };

            log.debug(format!(
                "analysis result for \"{}\": {} ({:.2})",
                prefix(&comment),
                result.sentiment(),
                result.certainty()
            ));

            // Thresholds are read fresh now, not at veil time.
            match visibility.apply_decision(node, &result, &settings.get()) {
                VeilDecision::Kept => {
                    stats.kept.fetch_add(1, Ordering::Relaxed);
                    log.debug(format!("keeping veil on negative comment: {comment}"));
                }
                VeilDecision::Restored => {
                    stats.restored.fetch_add(1, Ordering::Relaxed);
                    log.debug(format!("restoring comment: {comment}"));
                }
            }

            service.add_comment_to_history(comment, result);
            Ok(())
        });
    }

    fn set_state(&self, next: ObserverState) {
        let mut state = self.state.write();
        // Stop wins over any in-flight transition.
        if *state != ObserverState::Stopped {
            *state = next;
        }
    }
}

async fn recv_or_pending<T>(rx: &mut Option<mpsc::UnboundedReceiver<T>>) -> Option<T> {
    match rx {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

fn prefix(comment: &str) -> String {
    comment.chars().take(20).collect()
}
