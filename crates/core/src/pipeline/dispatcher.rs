use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::events::{EventLogHandle, PipelineEvent};
use crate::task::{StageKind, TaskStatus, TaskStore};

use super::handlers::{HandlerOutcome, StageHandler};
use super::sequencer::StageSequencer;
use super::TaskHandle;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The queue is at capacity; the caller should back off and retry.
    #[error("Task queue is full")]
    QueueFull,

    #[error("Dispatcher is shut down")]
    Closed,
}

struct DispatcherInner {
    tasks: Arc<dyn TaskStore>,
    handlers: HashMap<StageKind, Arc<dyn StageHandler>>,
    sequencer: StageSequencer,
    events: EventLogHandle,
}

/// Bounded worker pool executing pending tasks.
///
/// Submission is a non-blocking enqueue of the task id; workers pull ids
/// off the shared queue, re-read the task row and run its stage handler.
/// A task that is no longer pending when a worker picks it up (cancelled,
/// already taken) is dropped silently.
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
    tx: mpsc::Sender<String>,
    // Held so the queue survives worker shutdown
    _rx: Arc<Mutex<mpsc::Receiver<String>>>,
    shutdown_tx: broadcast::Sender<()>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        handlers: HashMap<StageKind, Arc<dyn StageHandler>>,
        sequencer: StageSequencer,
        events: EventLogHandle,
        worker_count: usize,
        queue_capacity: usize,
    ) -> Self {
        let inner = Arc::new(DispatcherInner {
            tasks,
            handlers,
            sequencer,
            events,
        });

        let (tx, rx) = mpsc::channel::<String>(queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let (shutdown_tx, _) = broadcast::channel(1);

        let mut workers = Vec::with_capacity(worker_count.max(1));
        for worker in 0..worker_count.max(1) {
            let inner = inner.clone();
            let rx = rx.clone();
            let mut shutdown = shutdown_tx.subscribe();
            workers.push(tokio::spawn(async move {
                debug!(worker, "Task worker started");
                loop {
                    let next = {
                        let mut rx = rx.lock().await;
                        tokio::select! {
                            _ = shutdown.recv() => None,
                            task_id = rx.recv() => task_id,
                        }
                    };
                    match next {
                        Some(task_id) => Self::execute(&inner, &task_id).await,
                        None => break,
                    }
                }
                debug!(worker, "Task worker stopped");
            }));
        }

        info!(worker_count, queue_capacity, "Task dispatcher started");

        Self {
            inner,
            tx,
            _rx: rx,
            shutdown_tx,
            workers: Mutex::new(workers),
        }
    }

    /// Enqueue a pending task for execution.
    pub fn submit(&self, task_id: &str) -> Result<(), DispatchError> {
        self.tx
            .try_send(task_id.to_string())
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => DispatchError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => DispatchError::Closed,
            })
    }

    /// Stop the workers and wait for in-flight tasks to finish.
    pub async fn stop(&self) {
        info!("Stopping task dispatcher");
        let _ = self.shutdown_tx.send(());
        let mut workers = self.workers.lock().await;
        for worker in workers.drain(..) {
            if let Err(e) = worker.await {
                warn!("Task worker join failed: {}", e);
            }
        }
    }

    async fn execute(inner: &Arc<DispatcherInner>, task_id: &str) {
        let task = match inner.tasks.get(task_id) {
            Ok(Some(task)) => task,
            Ok(None) => {
                debug!(task_id, "Queued task no longer exists");
                return;
            }
            Err(e) => {
                error!(task_id, "Failed to load queued task: {}", e);
                return;
            }
        };

        if task.status != TaskStatus::Pending {
            debug!(task_id, status = %task.status, "Queued task is not pending, skipping");
            return;
        }

        let task = match inner.tasks.update_status(task_id, TaskStatus::Running) {
            Ok(task) => task,
            Err(e) => {
                // Raced with a cancel or another worker
                debug!(task_id, "Could not start queued task: {}", e);
                return;
            }
        };

        info!(task_id, project_id = %task.project_id, stage = %task.stage, "Task started");
        inner
            .events
            .emit(PipelineEvent::TaskStarted {
                task_id: task.id.clone(),
                project_id: task.project_id.clone(),
                stage: task.stage.as_str().to_string(),
            })
            .await;

        let Some(handler) = inner.handlers.get(&task.stage) else {
            error!(task_id, stage = %task.stage, "No handler for stage");
            Self::fail(inner, task_id, &task, "no handler registered for stage").await;
            return;
        };

        let handle = TaskHandle::new(task.id.clone(), inner.tasks.clone());
        match handler.run(&task, &handle).await {
            Ok(HandlerOutcome::Completed(result)) => {
                match inner.tasks.complete(&task.id, result) {
                    Ok(completed) => {
                        info!(task_id, stage = %task.stage, "Task completed");
                        inner
                            .events
                            .emit(PipelineEvent::TaskCompleted {
                                task_id: task.id.clone(),
                                project_id: task.project_id.clone(),
                                stage: task.stage.as_str().to_string(),
                            })
                            .await;
                        if let Err(e) = inner.sequencer.advance_on_completion(&completed).await {
                            error!(task_id, "Failed to advance project stage: {}", e);
                        }
                    }
                    Err(e) => {
                        // Cancelled under the handler's feet; nothing to finalize
                        debug!(task_id, "Could not record completion: {}", e);
                    }
                }
            }
            Ok(HandlerOutcome::Cancelled) => {
                info!(task_id, stage = %task.stage, "Task observed cancellation and stopped");
            }
            Err(e) => {
                warn!(task_id, stage = %task.stage, "Task failed: {}", e);
                Self::fail(inner, task_id, &task, &e.to_string()).await;
            }
        }
    }

    async fn fail(
        inner: &Arc<DispatcherInner>,
        task_id: &str,
        task: &crate::task::Task,
        error: &str,
    ) {
        if let Err(e) = inner.tasks.fail(task_id, error) {
            debug!(task_id, "Could not record failure: {}", e);
            return;
        }
        inner
            .events
            .emit(PipelineEvent::TaskFailed {
                task_id: task_id.to_string(),
                project_id: task.project_id.clone(),
                stage: task.stage.as_str().to_string(),
                error: error.to_string(),
            })
            .await;
    }
}
