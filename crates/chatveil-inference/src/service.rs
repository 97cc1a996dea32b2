//! Analysis worker service
//!
//! The isolated long-lived worker context behind a message-passing
//! boundary. A single background task owns the classification client and
//! the history store; callers talk to it through an mpsc command channel
//! with oneshot replies, so the backend never sees concurrent use.

use crate::backend::BackendFactory;
use crate::client::SentimentClient;
use chatveil_core::{AnalysisResult, CommentHistoryItem, Error, ModelSpec, Result};
use chatveil_store::{CommentHistory, SettingsStore};
use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

enum Command {
    Analyze {
        comment: String,
        model: ModelSpec,
        reply: oneshot::Sender<Result<AnalysisResult>>,
    },
    AddToHistory {
        comment: String,
        result: AnalysisResult,
    },
    AllHistory {
        reply: oneshot::Sender<Vec<CommentHistoryItem>>,
    },
}

/// Handle to the analysis worker.
///
/// Cheap to clone; the worker shuts down when every handle is dropped,
/// after draining commands already sent.
#[derive(Clone)]
pub struct AnalysisService {
    sender: mpsc::UnboundedSender<Command>,
}

impl AnalysisService {
    /// Spawn the worker task and return a handle to it
    pub fn spawn(
        factory: Box<dyn BackendFactory>,
        settings: SettingsStore,
        history: CommentHistory,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let client = SentimentClient::new(factory);
        tokio::spawn(run_worker(client, settings, history, receiver));
        Self { sender }
    }

    /// Classify one comment with the given model
    pub async fn analyze_sentiment(
        &self,
        comment: impl Into<String>,
        model: ModelSpec,
    ) -> Result<AnalysisResult> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Command::Analyze {
                comment: comment.into(),
                model,
                reply,
            })
            .map_err(|_| Error::worker("analysis worker stopped"))?;
        response
            .await
            .map_err(|_| Error::worker("analysis worker dropped the request"))?
    }

    /// Fire-and-forget history write; failures are logged in the worker
    /// and never affect the caller.
    pub fn add_comment_to_history(&self, comment: impl Into<String>, result: AnalysisResult) {
        let sent = self.sender.send(Command::AddToHistory {
            comment: comment.into(),
            result,
        });
        if sent.is_err() {
            warn!("analysis worker stopped, dropping history write");
        }
    }

    /// Full scan of the persisted comment history
    pub async fn get_all_comments_from_history(&self) -> Result<Vec<CommentHistoryItem>> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Command::AllHistory { reply })
            .map_err(|_| Error::worker("analysis worker stopped"))?;
        response
            .await
            .map_err(|_| Error::worker("analysis worker dropped the request"))
    }
}

async fn run_worker(
    mut client: SentimentClient,
    settings: SettingsStore,
    history: CommentHistory,
    mut receiver: mpsc::UnboundedReceiver<Command>,
) {
    while let Some(command) = receiver.recv().await {
        match command {
            Command::Analyze {
                comment,
                model,
                reply,
            } => {
                // Prompts are read per request so edits apply to
                // everything still queued behind this point.
                let templates = settings.get().generative.templates();
                let result = client.analyze(&comment, &model, &templates).await;
                let _ = reply.send(result);
            }
            Command::AddToHistory { comment, result } => {
                if let Err(e) = history.append(Utc::now(), comment, result) {
                    warn!("failed to write comment history: {e}");
                }
            }
            Command::AllHistory { reply } => {
                let _ = reply.send(history.all());
            }
        }
    }
    debug!("analysis worker shutting down");
}
