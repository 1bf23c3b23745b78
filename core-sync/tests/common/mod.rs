//! Hand-written fakes shared by the integration suites.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    ChannelState, FileServer, FileUpload, FolderEntry, ObjectId, PathSegment, ProgressCallback,
    PushChannel, PushConnector,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch, Semaphore};
use tokio_util::sync::CancellationToken;

// ============================================================================
// File server
// ============================================================================

/// Server whose uploads block until released, so tests control ordering.
pub struct FakeServer {
    pub metadata_calls: AtomicUsize,
    pub metadata_delay: Option<Duration>,
    /// Per-folder metadata delays, overriding `metadata_delay`
    pub folder_delays: Vec<(ObjectId, Duration)>,
    /// Names in the order their transfers started
    pub started: Mutex<Vec<String>>,
    /// Cancellation token handed to each transfer, by name
    pub tokens: Mutex<Vec<(String, CancellationToken)>>,
    pub completed: Mutex<Vec<(String, ObjectId)>>,
    /// Names whose transfer fails
    pub failing: Mutex<Vec<String>>,
    /// Names whose transfer panics inside the server
    pub panicking: Mutex<Vec<String>>,
    release: Semaphore,
    hold_uploads: bool,
}

impl FakeServer {
    /// Uploads finish immediately.
    pub fn new() -> Self {
        Self::build(false)
    }

    /// Uploads wait for [`FakeServer::release`].
    pub fn holding() -> Self {
        Self::build(true)
    }

    fn build(hold_uploads: bool) -> Self {
        Self {
            metadata_calls: AtomicUsize::new(0),
            metadata_delay: None,
            folder_delays: Vec::new(),
            started: Mutex::new(Vec::new()),
            tokens: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
            failing: Mutex::new(Vec::new()),
            panicking: Mutex::new(Vec::new()),
            release: Semaphore::new(0),
            hold_uploads,
        }
    }

    pub fn with_metadata_delay(mut self, delay: Duration) -> Self {
        self.metadata_delay = Some(delay);
        self
    }

    pub fn with_folder_delay(mut self, folder_id: ObjectId, delay: Duration) -> Self {
        self.folder_delays.push((folder_id, delay));
        self
    }

    pub fn panic_on_upload(&self, name: &str) {
        self.panicking.lock().unwrap().push(name.to_string());
    }

    pub fn fail_upload(&self, name: &str) {
        self.failing.lock().unwrap().push(name.to_string());
    }

    /// Let `count` held transfers finish.
    pub fn release(&self, count: usize) {
        self.release.add_permits(count);
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    /// Names of transfers whose token was cancelled.
    pub fn aborted(&self) -> Vec<String> {
        self.tokens
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, token)| token.is_cancelled())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn completed(&self) -> Vec<(String, ObjectId)> {
        self.completed.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileServer for FakeServer {
    async fn check_privilege(&self) -> BridgeResult<bool> {
        Ok(false)
    }

    async fn fetch_secret(&self, _password: &str) -> BridgeResult<Option<String>> {
        Ok(None)
    }

    async fn verify_secret(&self, _secret: &str) -> BridgeResult<bool> {
        Ok(false)
    }

    async fn folder_metadata(&self, folder_id: ObjectId) -> BridgeResult<FolderEntry> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self
            .folder_delays
            .iter()
            .find(|(id, _)| *id == folder_id)
            .map(|(_, delay)| *delay)
            .or(self.metadata_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(FolderEntry {
            id: folder_id,
            name: format!("folder-{}", folder_id),
            path: vec![
                PathSegment {
                    id: 0,
                    name: "root".to_string(),
                },
                PathSegment {
                    id: folder_id,
                    name: format!("folder-{}", folder_id),
                },
            ],
        })
    }

    async fn add_folder(&self, _parent_id: ObjectId, _name: &str) -> BridgeResult<FolderEntry> {
        Err(BridgeError::NotAvailable("add_folder".to_string()))
    }

    async fn delete_object(&self, _object_id: ObjectId, _secret: Option<&str>) -> BridgeResult<()> {
        Err(BridgeError::NotAvailable("delete_object".to_string()))
    }

    async fn check_lock(&self, _object_id: ObjectId) -> BridgeResult<bool> {
        Ok(false)
    }

    async fn upload_file(
        &self,
        upload: FileUpload,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> BridgeResult<()> {
        let name = upload.payload.name.clone();
        self.started.lock().unwrap().push(name.clone());
        self.tokens
            .lock()
            .unwrap()
            .push((name.clone(), cancel.clone()));
        progress(111, 55);

        let should_panic = self.panicking.lock().unwrap().contains(&name);
        if should_panic {
            panic!("server implementation crashed on {}", name);
        }

        if self.hold_uploads {
            tokio::select! {
                _ = cancel.cancelled() => return Err(BridgeError::Cancelled),
                permit = self.release.acquire() => {
                    if let Ok(permit) = permit {
                        permit.forget();
                    }
                }
            }
        }

        if self.failing.lock().unwrap().contains(&name) {
            return Err(BridgeError::OperationFailed("disk full".to_string()));
        }
        progress(111, 111);
        self.completed.lock().unwrap().push((name, upload.folder_id));
        Ok(())
    }

    fn download_url(&self, file_id: ObjectId) -> String {
        format!("http://files.test/f/downloadFile?id={}", file_id)
    }

    fn listing_feed_url(&self, folder_id: ObjectId) -> String {
        format!("ws://files.test/ws/fileList?id={}", folder_id)
    }
}

// ============================================================================
// Push channel
// ============================================================================

pub struct FakePushChannel {
    state: watch::Sender<ChannelState>,
    messages: broadcast::Sender<String>,
    pub sent: Mutex<Vec<String>>,
    pub fail_sends: bool,
}

impl FakePushChannel {
    pub fn new(initial: ChannelState) -> Arc<Self> {
        Self::build(initial, false)
    }

    pub fn failing_sends(initial: ChannelState) -> Arc<Self> {
        Self::build(initial, true)
    }

    fn build(initial: ChannelState, fail_sends: bool) -> Arc<Self> {
        let (state, _) = watch::channel(initial);
        let (messages, _) = broadcast::channel(64);
        Arc::new(Self {
            state,
            messages,
            sent: Mutex::new(Vec::new()),
            fail_sends,
        })
    }

    pub fn set_state(&self, state: ChannelState) {
        self.state.send_replace(state);
    }

    /// Deliver a server message to subscribers.
    pub fn push(&self, text: &str) {
        let _ = self.messages.send(text.to_string());
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushChannel for FakePushChannel {
    fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }

    async fn send_text(&self, text: String) -> BridgeResult<()> {
        if self.fail_sends {
            return Err(BridgeError::OperationFailed("socket closed".to_string()));
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.messages.subscribe()
    }
}

pub struct FakeConnector {
    pub channel: Arc<FakePushChannel>,
    pub urls: Mutex<Vec<String>>,
}

impl FakeConnector {
    pub fn new(channel: Arc<FakePushChannel>) -> Self {
        Self {
            channel,
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn open_count(&self) -> usize {
        self.urls.lock().unwrap().len()
    }
}

impl PushConnector for FakeConnector {
    fn open(&self, url: &str) -> BridgeResult<Arc<dyn PushChannel>> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(self.channel.clone())
    }
}
