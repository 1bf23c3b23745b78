//! # Folder Channel
//!
//! Push-fed folder listing plus navigation between folders.
//!
//! The channel is opened once, scoped to the first folder. Every text message
//! the server pushes is a complete listing of the folder being watched; it
//! replaces the observable listing wholesale. Navigation asks the server to
//! switch the feed to another folder and, concurrently, fetches that folder's
//! metadata for the breadcrumb.
//!
//! ```ignore
//! let channel = FolderSyncChannel::new(server, connector, writers.current_folder, writers.listing, bus);
//! channel.open(0).await?;
//! let folder = channel.navigate(42).await?;
//! println!("now in {}", folder.name);
//! ```

use crate::error::{Result, SyncError};
use crate::listing::sort_listing;
use bridge_traits::{
    BridgeError, ChannelState, FileObject, FileServer, FolderEntry, ObjectId, PushChannel,
    PushConnector,
};
use core_runtime::events::{CoreEvent, EventBus, FolderEvent};
use core_runtime::state::{StateReader, StateWriter};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument, warn};

/// Client-to-server request that switches the feed to another folder.
#[derive(Debug, Serialize)]
struct ChangeFolder {
    action: &'static str,
    id: ObjectId,
}

impl ChangeFolder {
    fn new(id: ObjectId) -> Self {
        Self {
            action: "change_folder",
            id,
        }
    }
}

/// Push-fed listing and current-folder tracking.
#[derive(Clone)]
pub struct FolderSyncChannel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    server: Arc<dyn FileServer>,
    connector: Arc<dyn PushConnector>,
    channel: Mutex<Option<Arc<dyn PushChannel>>>,
    /// Bumped by every navigation that reaches the server; only the latest
    /// one may publish its folder.
    navigations: AtomicU64,
    current_folder: StateWriter<Option<FolderEntry>>,
    listing: StateWriter<Vec<FileObject>>,
    event_bus: EventBus,
}

impl FolderSyncChannel {
    pub fn new(
        server: Arc<dyn FileServer>,
        connector: Arc<dyn PushConnector>,
        current_folder: StateWriter<Option<FolderEntry>>,
        listing: StateWriter<Vec<FileObject>>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                server,
                connector,
                channel: Mutex::new(None),
                navigations: AtomicU64::new(0),
                current_folder,
                listing,
                event_bus,
            }),
        }
    }

    /// Open the push channel for `folder_id`.
    ///
    /// Only the first call connects; later calls return the existing channel
    /// whatever folder they name. The returned channel may still be
    /// connecting.
    #[instrument(skip(self))]
    pub async fn open(&self, folder_id: ObjectId) -> Result<Arc<dyn PushChannel>> {
        let mut slot = self
            .inner
            .channel
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(channel) = slot.as_ref() {
            debug!("Folder channel already open, reusing it");
            return Ok(Arc::clone(channel));
        }

        let url = self.inner.server.listing_feed_url(folder_id);
        let channel = self.inner.connector.open(&url)?;

        // Subscribe before the listener starts so no early message is missed.
        let messages = channel.subscribe();
        let states = channel.watch_state();
        *slot = Some(Arc::clone(&channel));
        drop(slot);

        info!(url = %url, "Folder channel opened");
        tokio::spawn(run_listener(
            Arc::downgrade(&self.inner),
            messages,
            states,
        ));

        Ok(channel)
    }

    /// Move to `folder_id`.
    ///
    /// Waits while the channel is still connecting. Fails with
    /// [`SyncError::ChannelNotReady`] when it is not open, without contacting
    /// the server. Otherwise the change-folder request is sent alongside the
    /// metadata fetch, and the call completes when the metadata arrives. A
    /// failed send is only logged. The pushed listing for the new folder may
    /// arrive before or after this returns.
    ///
    /// When navigations overlap, only the most recent one updates the current
    /// folder; an earlier one still returns its metadata.
    #[instrument(skip(self))]
    pub async fn navigate(&self, folder_id: ObjectId) -> Result<FolderEntry> {
        let channel = match self.inner.current_channel() {
            Some(channel) => channel,
            None => {
                return Err(SyncError::ChannelNotReady {
                    state: ChannelState::Closed,
                })
            }
        };

        let mut states = channel.watch_state();
        let state = states
            .wait_for(|state| *state != ChannelState::Connecting)
            .await
            .map(|state| *state)
            .unwrap_or_else(|_| channel.state());
        if !state.is_open() {
            warn!(state = %state, "Navigation refused, folder channel not open");
            return Err(SyncError::ChannelNotReady { state });
        }

        let request = serde_json::to_string(&ChangeFolder::new(folder_id)).map_err(BridgeError::from)?;
        let generation = self.inner.navigations.fetch_add(1, Ordering::AcqRel) + 1;
        let send = async {
            if let Err(err) = channel.send_text(request).await {
                warn!(error = %err, "Failed to send change-folder request");
            }
        };
        let (_, folder) = tokio::join!(send, self.inner.server.folder_metadata(folder_id));
        let folder = folder?;

        let navigations = &self.inner.navigations;
        let applied = self.inner.current_folder.modify(|current| {
            if navigations.load(Ordering::Acquire) != generation {
                return false;
            }
            *current = Some(folder.clone());
            true
        });
        if !applied {
            debug!(folder_id = folder.id, "Navigation superseded by a later one");
            return Ok(folder);
        }

        info!(folder_id = folder.id, name = %folder.name, "Navigated");
        self.inner.emit(FolderEvent::Navigated {
            folder_id: folder.id,
            name: folder.name.clone(),
        });
        Ok(folder)
    }

    /// Current readiness; `Closed` before the channel is opened.
    pub fn channel_state(&self) -> ChannelState {
        self.inner
            .current_channel()
            .map(|channel| channel.state())
            .unwrap_or(ChannelState::Closed)
    }

    pub fn current_folder(&self) -> StateReader<Option<FolderEntry>> {
        self.inner.current_folder.reader()
    }

    pub fn listing(&self) -> StateReader<Vec<FileObject>> {
        self.inner.listing.reader()
    }
}

impl ChannelInner {
    fn current_channel(&self) -> Option<Arc<dyn PushChannel>> {
        self.channel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Parse, order and publish one pushed listing.
    fn apply_listing_message(&self, text: &str) -> Result<usize> {
        let mut entries: Vec<FileObject> =
            serde_json::from_str(text).map_err(|e| SyncError::MalformedListing(e.to_string()))?;
        sort_listing(&mut entries);
        let count = entries.len();
        self.listing.set(entries);
        self.emit(FolderEvent::ListingUpdated { entries: count });
        Ok(count)
    }

    fn emit(&self, event: FolderEvent) {
        let _ = self.event_bus.emit(CoreEvent::Folder(event));
    }
}

async fn run_listener(
    inner: Weak<ChannelInner>,
    mut messages: broadcast::Receiver<String>,
    mut states: watch::Receiver<ChannelState>,
) {
    let mut watching_state = true;
    loop {
        tokio::select! {
            message = messages.recv() => {
                let text = match message {
                    Ok(text) => text,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Folder listener lagged behind the feed");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Folder feed closed, listener stopping");
                        break;
                    }
                };
                let Some(inner) = inner.upgrade() else { break };
                match inner.apply_listing_message(&text) {
                    Ok(count) => debug!(entries = count, "Listing replaced"),
                    Err(err) => {
                        warn!(error = %err, "Dropping malformed listing message");
                        inner.emit(FolderEvent::ListingRejected {
                            message: err.to_string(),
                        });
                    }
                }
            }
            changed = states.changed(), if watching_state => {
                if changed.is_err() {
                    watching_state = false;
                    continue;
                }
                let state = *states.borrow_and_update();
                let Some(inner) = inner.upgrade() else { break };
                debug!(state = %state, "Folder channel state changed");
                inner.emit(FolderEvent::ChannelStateChanged { state });
            }
        }
    }
}

impl fmt::Debug for FolderSyncChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FolderSyncChannel")
            .field("state", &self.channel_state())
            .field("current_folder", &self.inner.current_folder.get().map(|f| f.id))
            .finish()
    }
}
