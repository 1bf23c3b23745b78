//! # Observable State Cells
//!
//! Process-wide state that the UI layer reads reactively. Each cell has
//! exactly one [`StateWriter`], owned by the component responsible for it,
//! and any number of [`StateReader`]s.
//!
//! | cell | writer |
//! |---|---|
//! | `is_privileged` | `AccessResolver` |
//! | `current_folder`, `listing` | `FolderSyncChannel` |
//! | `uploads` | `UploadQueue` |
//!
//! ```rust
//! use core_runtime::state::SharedState;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (state, writers) = SharedState::new();
//! let mut privileged = state.is_privileged.clone();
//!
//! writers.is_privileged.set(true);
//! assert!(privileged.changed().await);
//! assert!(privileged.get());
//! # }
//! ```

use bridge_traits::{FileObject, FolderEntry, ObjectId};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;

/// Create a cell holding `initial`.
pub fn cell<T>(initial: T) -> (StateWriter<T>, StateReader<T>) {
    let (sender, receiver) = watch::channel(initial);
    (StateWriter { sender }, StateReader { receiver })
}

/// Sole mutator of a cell. Deliberately not `Clone`.
pub struct StateWriter<T> {
    sender: watch::Sender<T>,
}

impl<T> StateWriter<T> {
    /// Replace the value and notify readers.
    pub fn set(&self, value: T) {
        self.sender.send_replace(value);
    }

    /// Mutate in place; readers are notified only when `f` returns `true`.
    pub fn modify<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut T) -> bool,
    {
        self.sender.send_if_modified(f)
    }

    /// New reader that observes this cell.
    pub fn reader(&self) -> StateReader<T> {
        StateReader {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.sender.borrow().clone()
    }
}

impl<T: fmt::Debug> fmt::Debug for StateWriter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateWriter")
            .field("value", &*self.sender.borrow())
            .finish()
    }
}

/// Read-only handle to a cell.
#[derive(Clone)]
pub struct StateReader<T> {
    receiver: watch::Receiver<T>,
}

impl<T> StateReader<T> {
    /// Snapshot of the current value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.receiver.borrow().clone()
    }

    /// Inspect the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.receiver.borrow())
    }

    /// Wait for the next change. Returns `false` once the writer is gone.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// Wait until the value satisfies `predicate`, checking the current
    /// value first. `None` if the writer is dropped before that happens.
    pub async fn wait_for<F>(&self, mut predicate: F) -> Option<T>
    where
        T: Clone,
        F: FnMut(&T) -> bool,
    {
        let mut receiver = self.receiver.clone();
        let value = receiver.wait_for(|value| predicate(value)).await.ok()?;
        Some(value.clone())
    }
}

impl<T: fmt::Debug> fmt::Debug for StateReader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateReader")
            .field("value", &*self.receiver.borrow())
            .finish()
    }
}

/// Observer-facing view of an upload task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSnapshot {
    pub task_id: u64,
    pub name: String,
    pub folder_id: ObjectId,
    /// Floored percentage, 0..=100
    pub progress: u8,
    /// Currently transmitting
    pub active: bool,
}

/// Read side of every shared cell.
#[derive(Debug, Clone)]
pub struct SharedState {
    pub is_privileged: StateReader<bool>,
    pub current_folder: StateReader<Option<FolderEntry>>,
    pub listing: StateReader<Vec<FileObject>>,
    pub uploads: StateReader<Vec<UploadSnapshot>>,
}

/// Write side of every shared cell, to be split up among the owners.
#[derive(Debug)]
pub struct SharedStateWriters {
    pub is_privileged: StateWriter<bool>,
    pub current_folder: StateWriter<Option<FolderEntry>>,
    pub listing: StateWriter<Vec<FileObject>>,
    pub uploads: StateWriter<Vec<UploadSnapshot>>,
}

impl SharedState {
    /// Fresh cells: unprivileged, no folder, empty listing and queue.
    pub fn new() -> (SharedState, SharedStateWriters) {
        let (is_privileged_w, is_privileged) = cell(false);
        let (current_folder_w, current_folder) = cell(None);
        let (listing_w, listing) = cell(Vec::new());
        let (uploads_w, uploads) = cell(Vec::new());

        (
            SharedState {
                is_privileged,
                current_folder,
                listing,
                uploads,
            },
            SharedStateWriters {
                is_privileged: is_privileged_w,
                current_folder: current_folder_w,
                listing: listing_w,
                uploads: uploads_w,
            },
        )
    }
}
