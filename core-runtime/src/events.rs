//! # Event Bus System
//!
//! Event-driven notifications for the file manager core using
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: one enum per component, wrapped in [`CoreEvent`]
//! - **EventBus**: central broadcast channel for publishing events
//! - **EventStream**: wrapper for consuming events with filtering
//!
//! Events complement the observable state cells in [`crate::state`]: the
//! cells always hold the latest value, while events describe each
//! transition and may be missed by slow subscribers.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐   emit   ┌───────────┐
//! │ AccessResolver ├─────────>│           │
//! └────────────────┘          │           │  subscribe  ┌────────────┐
//! ┌────────────────┐   emit   │ EventBus  ├────────────>│ Subscriber │
//! │ FolderChannel  ├─────────>│           │             └────────────┘
//! └────────────────┘          │           │
//! ┌────────────────┐   emit   │           │
//! │ UploadQueue    ├─────────>│           │
//! └────────────────┘          └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, UploadEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Upload(UploadEvent::Completed { task_id: 1 }))
//!     .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.description(), "Upload completed");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it can keep
//!   receiving.
//! - **`RecvError::Closed`**: all senders were dropped; treat as shutdown.
//!
//! `emit` fails only when nobody is subscribed, so publishers call
//! `.emit(..).ok()`.

use bridge_traits::{ChannelState, ObjectId};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Privilege resolution and held-secret events
    Access(AccessEvent),
    /// Folder channel and listing events
    Folder(FolderEvent),
    /// Upload queue events
    Upload(UploadEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Access(e) => e.description(),
            CoreEvent::Folder(e) => e.description(),
            CoreEvent::Upload(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Upload(UploadEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Access(AccessEvent::CheckFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Folder(FolderEvent::ListingRejected { .. }) => EventSeverity::Warning,
            CoreEvent::Access(AccessEvent::Resolved { .. }) => EventSeverity::Info,
            CoreEvent::Folder(FolderEvent::Navigated { .. }) => EventSeverity::Info,
            CoreEvent::Upload(UploadEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Access Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AccessEvent {
    /// The privilege check was issued.
    Resolving,
    /// Access state reached its terminal value.
    Resolved { granted: bool },
    /// The privilege check itself failed; access resolves as denied.
    CheckFailed { message: String },
    /// A password exchange finished.
    Unlocked { accepted: bool },
}

impl AccessEvent {
    fn description(&self) -> &str {
        match self {
            AccessEvent::Resolving => "Resolving access",
            AccessEvent::Resolved { .. } => "Access resolved",
            AccessEvent::CheckFailed { .. } => "Privilege check failed",
            AccessEvent::Unlocked { .. } => "Password exchange finished",
        }
    }
}

// ============================================================================
// Folder Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum FolderEvent {
    /// The push channel changed readiness.
    ChannelStateChanged { state: ChannelState },
    /// A pushed listing replaced the observable listing.
    ListingUpdated { entries: usize },
    /// A pushed message could not be parsed; the listing is unchanged.
    ListingRejected { message: String },
    /// Navigation finished and the current folder changed.
    Navigated { folder_id: ObjectId, name: String },
}

impl FolderEvent {
    fn description(&self) -> &str {
        match self {
            FolderEvent::ChannelStateChanged { .. } => "Folder channel state changed",
            FolderEvent::ListingUpdated { .. } => "Folder listing updated",
            FolderEvent::ListingRejected { .. } => "Folder listing rejected",
            FolderEvent::Navigated { .. } => "Navigated to folder",
        }
    }
}

// ============================================================================
// Upload Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum UploadEvent {
    Queued {
        task_id: u64,
        name: String,
        folder_id: ObjectId,
    },
    Started {
        task_id: u64,
    },
    /// Floored percentage of the active transfer.
    Progress {
        task_id: u64,
        percent: u8,
    },
    Completed {
        task_id: u64,
    },
    /// Removed by the caller, either while queued or mid-transfer.
    Cancelled {
        task_id: u64,
    },
    /// Transfer failed; it is not retried.
    Failed {
        task_id: u64,
        message: String,
    },
}

impl UploadEvent {
    fn description(&self) -> &str {
        match self {
            UploadEvent::Queued { .. } => "Upload queued",
            UploadEvent::Started { .. } => "Upload started",
            UploadEvent::Progress { .. } => "Upload in progress",
            UploadEvent::Completed { .. } => "Upload completed",
            UploadEvent::Cancelled { .. } => "Upload cancelled",
            UploadEvent::Failed { .. } => "Upload failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel shared by all components.
///
/// Cloning is cheap; all clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// Subscribers falling more than `capacity` events behind receive
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event, returning how many subscribers received it.
    ///
    /// Errors when there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a receiver for all future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with optional filtering.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, CoreEvent};
///
/// let event_bus = EventBus::new(100);
/// let uploads_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Upload(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once all senders are gone.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive; `None` when nothing matching is buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
