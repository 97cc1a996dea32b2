//! Strict FIFO, single-concurrency task queue
//!
//! Serializes all classification and visibility-update work for a page:
//! tasks run one at a time, in push order, and a failing task never blocks
//! or poisons the ones behind it.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::Result;

type Task = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// Single-concurrency FIFO executor over asynchronous units of work.
///
/// Must be created inside a tokio runtime; the drain loop runs as a
/// spawned task and shuts down when the queue handle is dropped, after
/// finishing everything already pushed.
#[derive(Clone)]
pub struct TaskQueue {
    sender: mpsc::UnboundedSender<Task>,
    pending: Arc<AtomicUsize>,
}

impl TaskQueue {
    /// Create a queue and start its drain loop
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Task>();
        let pending = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pending);

        tokio::spawn(async move {
            // Single consumer: the next task is not picked up until the
            // previous one completed, success or failure alike.
            while let Some(task) = receiver.recv().await {
                if let Err(e) = task.await {
                    warn!("queued task failed: {e}");
                }
                counter.fetch_sub(1, Ordering::SeqCst);
            }
        });

        Self { sender, pending }
    }

    /// Append a task to the tail of the queue.
    ///
    /// Draining begins immediately when the queue is idle. There is no
    /// cancellation, timeout, or priority.
    pub fn push<F>(&self, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(Box::pin(task)).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            warn!("task queue closed, dropping task");
        }
    }

    /// Number of tasks pushed but not yet completed (incl. the running one)
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Wait until every task pushed so far has completed
    pub async fn drained(&self) {
        while self.pending() > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
