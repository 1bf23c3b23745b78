//! # Upload Queue
//!
//! Strictly sequential file transfers.
//!
//! ## Overview
//!
//! - **FIFO**: tasks run in enqueue order, at most one at a time
//! - **Single drain worker**: a worker is spawned when the queue goes from idle
//!   to busy and exits once it is empty again
//! - **Cancellation**: queued tasks are dropped without touching the network;
//!   the active task has its transfer aborted
//! - **No retries**: a failed transfer is reported and the queue moves on
//!
//! ## Usage
//!
//! ```ignore
//! let queue = UploadQueue::new(server, writers.uploads, bus);
//! let id = queue.enqueue(UploadPayload::new("notes.txt", bytes), folder_id)?;
//! queue.cancel(id);
//! queue.wait_idle().await;
//! ```

use crate::error::{Result, SyncError};
use bridge_traits::{
    BridgeError, FileServer, FileUpload, ObjectId, ProgressCallback, UploadPayload,
};
use core_runtime::events::{CoreEvent, EventBus, UploadEvent};
use core_runtime::state::{cell, StateReader, StateWriter, UploadSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique upload task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UploadTaskId(u64);

impl UploadTaskId {
    fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for UploadTaskId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for UploadTaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Floored transfer percentage, or `None` when the total is unknown.
pub fn progress_percent(total: u64, sent: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let percent = (u128::from(sent) * 100 / u128::from(total)).min(100);
    Some(percent as u8)
}

/// A file waiting for, or undergoing, transfer.
pub struct UploadTask {
    id: UploadTaskId,
    created_at: i64,
    payload: UploadPayload,
    /// Captured at enqueue time; later navigation does not move the upload.
    folder_id: ObjectId,
    cancel: CancellationToken,
    progress: AtomicU8,
}

impl UploadTask {
    fn new(payload: UploadPayload, folder_id: ObjectId) -> Self {
        Self {
            id: UploadTaskId::next(),
            created_at: chrono::Utc::now().timestamp_millis(),
            payload,
            folder_id,
            cancel: CancellationToken::new(),
            progress: AtomicU8::new(0),
        }
    }

    pub fn id(&self) -> UploadTaskId {
        self.id
    }

    /// Enqueue time, Unix milliseconds.
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn name(&self) -> &str {
        &self.payload.name
    }

    pub fn payload(&self) -> &UploadPayload {
        &self.payload
    }

    pub fn folder_id(&self) -> ObjectId {
        self.folder_id
    }

    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Acquire)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Record a `(total, sent)` report. Returns the new percentage when it
    /// changed.
    pub fn on_progress(&self, total: u64, sent: u64) -> Option<u8> {
        let percent = progress_percent(total, sent)?;
        let previous = self.progress.swap(percent, Ordering::AcqRel);
        (previous != percent).then_some(percent)
    }

    fn snapshot(&self, active: bool) -> UploadSnapshot {
        UploadSnapshot {
            task_id: self.id.as_u64(),
            name: self.payload.name.clone(),
            folder_id: self.folder_id,
            progress: self.progress(),
            active,
        }
    }
}

impl fmt::Debug for UploadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadTask")
            .field("id", &self.id)
            .field("name", &self.payload.name)
            .field("size", &self.payload.len())
            .field("folder_id", &self.folder_id)
            .field("progress", &self.progress())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Queue counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Tasks waiting behind the active one
    pub queued: usize,
    pub active: Option<UploadTaskId>,
    pub completed: u64,
    pub cancelled: u64,
    pub failed: u64,
    /// Drain workers spawned so far
    pub drain_passes: u64,
}

#[derive(Default)]
struct QueueState {
    /// Active task (if any) stays at the head until it finishes.
    pending: VecDeque<Arc<UploadTask>>,
    active: Option<UploadTaskId>,
    draining: bool,
}

#[derive(Default)]
struct Counters {
    completed: AtomicU64,
    cancelled: AtomicU64,
    failed: AtomicU64,
    drain_passes: AtomicU64,
}

/// Sequential upload queue
#[derive(Clone)]
pub struct UploadQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    server: Arc<dyn FileServer>,
    state: Mutex<QueueState>,
    uploads: StateWriter<Vec<UploadSnapshot>>,
    idle: StateWriter<bool>,
    counters: Counters,
    event_bus: EventBus,
}

impl UploadQueue {
    pub fn new(
        server: Arc<dyn FileServer>,
        uploads: StateWriter<Vec<UploadSnapshot>>,
        event_bus: EventBus,
    ) -> Self {
        let (idle, _) = cell(true);
        Self {
            inner: Arc::new(QueueInner {
                server,
                state: Mutex::new(QueueState::default()),
                uploads,
                idle,
                counters: Counters::default(),
                event_bus,
            }),
        }
    }

    /// Append a transfer of `payload` into `folder_id`.
    ///
    /// Returns immediately. A drain worker is spawned only if none is
    /// running. Must be called from within a Tokio runtime.
    #[instrument(skip(self, payload), fields(name = %payload.name, size = payload.len()))]
    pub fn enqueue(&self, payload: UploadPayload, folder_id: ObjectId) -> Result<UploadTaskId> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| BridgeError::NotAvailable(format!("async runtime: {}", e)))?;

        let task = Arc::new(UploadTask::new(payload, folder_id));
        let id = task.id();
        let name = task.name().to_string();

        let spawn_worker = {
            let mut state = self.inner.lock_state();
            state.pending.push_back(task);
            let spawn_worker = !state.draining;
            state.draining = true;
            self.inner.publish(&state);
            spawn_worker
        };

        info!(task_id = %id, folder_id, "Upload queued");
        self.inner.emit(UploadEvent::Queued {
            task_id: id.as_u64(),
            name,
            folder_id,
        });

        if spawn_worker {
            self.inner.counters.drain_passes.fetch_add(1, Ordering::Relaxed);
            let inner = Arc::clone(&self.inner);
            handle.spawn(async move { inner.drain().await });
        }
        Ok(id)
    }

    /// Cancel a queued or active task.
    ///
    /// Returns `false` when the task is unknown or already finished. A queued
    /// task is dropped without any network traffic; the active task has its
    /// transfer aborted and the queue moves on.
    #[instrument(skip(self))]
    pub fn cancel(&self, task_id: UploadTaskId) -> bool {
        let mut state = self.inner.lock_state();
        let Some(position) = state.pending.iter().position(|t| t.id() == task_id) else {
            debug!("Nothing to cancel");
            return false;
        };
        let Some(task) = state.pending.remove(position) else {
            return false;
        };

        if state.active == Some(task_id) {
            info!(task_id = %task_id, "Aborting active upload");
            task.cancel.cancel();
        } else {
            info!(task_id = %task_id, "Removed queued upload");
            self.inner.counters.cancelled.fetch_add(1, Ordering::Relaxed);
            self.inner.emit(UploadEvent::Cancelled {
                task_id: task_id.as_u64(),
            });
        }
        self.inner.publish(&state);
        true
    }

    /// Current queue contents, head first.
    pub fn snapshot(&self) -> Vec<UploadSnapshot> {
        self.inner.uploads.get()
    }

    pub fn watch(&self) -> StateReader<Vec<UploadSnapshot>> {
        self.inner.uploads.reader()
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.inner.lock_state();
        let counters = &self.inner.counters;
        QueueStats {
            queued: state
                .pending
                .iter()
                .filter(|t| Some(t.id()) != state.active)
                .count(),
            active: state.active,
            completed: counters.completed.load(Ordering::Relaxed),
            cancelled: counters.cancelled.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            drain_passes: counters.drain_passes.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock_state().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until no drain worker is running and nothing is queued.
    pub async fn wait_idle(&self) {
        self.inner.idle.reader().wait_for(|idle| *idle).await;
    }
}

impl QueueInner {
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish the queue view. Called with the state lock held so observers
    /// never see a stale idle flag.
    fn publish(&self, state: &QueueState) {
        let snapshot = state
            .pending
            .iter()
            .map(|task| task.snapshot(state.active == Some(task.id())))
            .collect();
        self.uploads.set(snapshot);

        let idle = !state.draining;
        self.idle.modify(|current| {
            if *current == idle {
                false
            } else {
                *current = idle;
                true
            }
        });
    }

    async fn drain(self: Arc<Self>) {
        debug!("Upload drain started");
        let mut guard = DrainGuard {
            inner: &*self,
            finished: false,
        };
        loop {
            let task = {
                let mut state = self.lock_state();
                match state.pending.front().cloned() {
                    Some(task) => {
                        state.active = Some(task.id());
                        self.publish(&state);
                        task
                    }
                    None => {
                        state.active = None;
                        state.draining = false;
                        self.publish(&state);
                        guard.finished = true;
                        break;
                    }
                }
            };

            self.transfer(&task).await;

            let mut state = self.lock_state();
            state.pending.retain(|t| t.id() != task.id());
            state.active = None;
            self.publish(&state);
        }
        debug!("Upload drain finished");
    }

    async fn transfer(self: &Arc<Self>, task: &Arc<UploadTask>) {
        let task_id = task.id();
        info!(task_id = %task_id, name = %task.name(), folder_id = task.folder_id(), "Upload started");
        self.emit(UploadEvent::Started {
            task_id: task_id.as_u64(),
        });

        let progress: ProgressCallback = {
            let inner = Arc::downgrade(self);
            let task = Arc::clone(task);
            Arc::new(move |total, sent| {
                let Some(percent) = task.on_progress(total, sent) else {
                    return;
                };
                if let Some(inner) = inner.upgrade() {
                    inner.publish(&inner.lock_state());
                    inner.emit(UploadEvent::Progress {
                        task_id: task.id().as_u64(),
                        percent,
                    });
                }
            })
        };

        let upload = FileUpload {
            payload: task.payload().clone(),
            folder_id: task.folder_id(),
        };
        let outcome = tokio::select! {
            biased;
            _ = task.cancel.cancelled() => Err(SyncError::TransferCancelled),
            result = self.server.upload_file(upload, progress, task.cancel.clone()) => {
                result.map_err(SyncError::from)
            }
        };

        match outcome {
            Ok(()) => {
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
                info!(task_id = %task_id, "Upload completed");
                self.emit(UploadEvent::Completed {
                    task_id: task_id.as_u64(),
                });
            }
            Err(SyncError::TransferCancelled) | Err(SyncError::Bridge(BridgeError::Cancelled)) => {
                self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(task_id = %task_id, "Upload cancelled");
                self.emit(UploadEvent::Cancelled {
                    task_id: task_id.as_u64(),
                });
            }
            Err(err) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(task_id = %task_id, error = %err, "Upload failed");
                self.emit(UploadEvent::Failed {
                    task_id: task_id.as_u64(),
                    message: err.to_string(),
                });
            }
        }
    }

    fn emit(&self, event: UploadEvent) {
        let _ = self.event_bus.emit(CoreEvent::Upload(event));
    }
}

/// Releases the drain slot when a worker stops without emptying the queue,
/// which only happens when a transfer panics or the runtime drops the task.
/// The interrupted task is dropped; the rest wait for the next enqueue.
struct DrainGuard<'a> {
    inner: &'a QueueInner,
    finished: bool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let inner = self.inner;
        let mut state = inner.lock_state();
        if let Some(task_id) = state.active.take() {
            state.pending.retain(|t| t.id() != task_id);
            inner.counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(task_id = %task_id, "Upload worker stopped mid-transfer");
            inner.emit(UploadEvent::Failed {
                task_id: task_id.as_u64(),
                message: "upload worker stopped unexpectedly".to_string(),
            });
        }
        state.draining = false;
        inner.publish(&state);
    }
}

impl fmt::Debug for UploadQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadQueue")
            .field("stats", &self.stats())
            .finish()
    }
}
