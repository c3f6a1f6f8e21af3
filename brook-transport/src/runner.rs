//! Single-worker FIFO task dispatch.
//!
//! The cross-thread delivery primitive behind the loopback transport: tasks
//! posted from any thread run one at a time, in post order per producer, on
//! one spawned worker. Dropping the runner cancels tasks that have not
//! started; a task already running completes (tasks own everything they
//! capture, so late completion is always safe).

use tokio::sync::{mpsc, oneshot, watch};

type Task = Box<dyn FnOnce() + Send>;

/// Owns a dispatch worker. Dropping it shuts the worker down and cancels
/// queued tasks.
pub struct TaskRunner {
    task_tx: mpsc::UnboundedSender<Task>,
    shutdown_tx: watch::Sender<bool>,
}

/// Cheap cloneable posting handle to a [`TaskRunner`]'s worker.
#[derive(Clone)]
pub struct TaskRunnerHandle {
    task_tx: mpsc::UnboundedSender<Task>,
}

impl TaskRunner {
    /// Spawn the worker on the ambient tokio runtime.
    pub fn new() -> Self {
        let (task_tx, mut task_rx) = mpsc::unbounded_channel::<Task>();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            tracing::debug!("task runner started");
            loop {
                tokio::select! {
                    biased;
                    result = shutdown_rx.changed() => {
                        if result.is_err() || *shutdown_rx.borrow() {
                            tracing::debug!("task runner shutdown, pending tasks cancelled");
                            return;
                        }
                    }
                    task = task_rx.recv() => {
                        let Some(task) = task else {
                            tracing::debug!("task channel closed");
                            return;
                        };
                        task();
                    }
                }
            }
        });

        Self {
            task_tx,
            shutdown_tx,
        }
    }

    /// Get a posting handle that can be held by the runner's clients.
    pub fn handle(&self) -> TaskRunnerHandle {
        TaskRunnerHandle {
            task_tx: self.task_tx.clone(),
        }
    }

    /// Enqueue a task. Returns `false` if the worker is gone, in which case
    /// the task is dropped un-run.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) -> bool {
        self.task_tx.send(Box::new(task)).is_ok()
    }

    /// Wait until every task posted before this call has executed.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if !self.post(move || {
            let _ = ack_tx.send(());
        }) {
            return;
        }
        // An error means the worker shut down before reaching the marker;
        // either way nothing posted earlier is still pending.
        let _ = ack_rx.await;
    }
}

impl TaskRunnerHandle {
    /// Enqueue a task. Returns `false` if the worker is gone, in which case
    /// the task is dropped un-run.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) -> bool {
        self.task_tx.send(Box::new(task)).is_ok()
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskRunner {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}
