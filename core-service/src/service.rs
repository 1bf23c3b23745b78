use crate::error::{CoreError, Result};
use bridge_traits::{FileServer, FolderEntry, ObjectId, UploadPayload};
use core_access::AccessResolver;
use core_runtime::config::ClientConfig;
use core_runtime::events::{EventBus, EventStream};
use core_runtime::state::SharedState;
use core_sync::{FolderSyncChannel, UploadQueue, UploadTaskId};
use provider_server::{ServerConnector, ServerEndpoints};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of a batch deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionReport {
    pub deleted: Vec<ObjectId>,
    /// Skipped because another session holds a lock on them
    pub locked: Vec<ObjectId>,
}

impl DeletionReport {
    pub fn is_complete(&self) -> bool {
        self.locked.is_empty()
    }
}

/// Primary façade exposed to host applications.
///
/// Cloning is cheap; clones drive the same components.
///
/// ```ignore
/// let config = ClientConfig::builder()
///     .server_address("files.local:8080")
///     .push_connector(connector)
///     .build()?;
/// let service = FileManagerService::new(config)?;
/// service.start().await?;
/// let folder = service.navigate(12).await?;
/// ```
#[derive(Clone)]
pub struct FileManagerService {
    config: ClientConfig,
    server: Arc<dyn FileServer>,
    access: AccessResolver,
    folders: FolderSyncChannel,
    uploads: UploadQueue,
    state: SharedState,
    event_bus: EventBus,
}

impl FileManagerService {
    /// Build the service against the file server named in `config`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let endpoints = ServerEndpoints::new(config.http_base_url(), config.ws_base_url());
        let server = ServerConnector::new(Arc::clone(&config.http_client), endpoints)
            .with_request_timeout(config.request_timeout);
        Self::with_server(config, Arc::new(server))
    }

    /// Build the service over an existing [`FileServer`] implementation.
    pub fn with_server(config: ClientConfig, server: Arc<dyn FileServer>) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let (state, writers) = SharedState::new();

        let access = AccessResolver::new(
            Arc::clone(&server),
            writers.is_privileged,
            event_bus.clone(),
        );
        let folders = FolderSyncChannel::new(
            Arc::clone(&server),
            Arc::clone(&config.push_connector),
            writers.current_folder,
            writers.listing,
            event_bus.clone(),
        );
        let uploads = UploadQueue::new(Arc::clone(&server), writers.uploads, event_bus.clone());

        Ok(Self {
            config,
            server,
            access,
            folders,
            uploads,
            state,
            event_bus,
        })
    }

    /// Start access resolution and open the listing feed on the initial
    /// folder. Returns once the feed is opening; neither step is awaited to
    /// completion.
    #[instrument(skip(self), fields(server = %self.config.server_address))]
    pub async fn start(&self) -> Result<()> {
        self.access.resolve();
        self.folders.open(self.config.initial_folder_id).await?;
        info!(folder_id = self.config.initial_folder_id, "File manager started");
        Ok(())
    }

    pub async fn navigate(&self, folder_id: ObjectId) -> Result<FolderEntry> {
        Ok(self.folders.navigate(folder_id).await?)
    }

    /// Create `name` inside the current folder.
    #[instrument(skip(self))]
    pub async fn add_folder(&self, name: &str) -> Result<FolderEntry> {
        let parent = self
            .state
            .current_folder
            .with(|folder| folder.as_ref().map(|f| f.id))
            .ok_or(CoreError::NoCurrentFolder)?;
        let folder = self.server.add_folder(parent, name).await?;
        info!(parent, folder_id = folder.id, "Folder created");
        Ok(folder)
    }

    /// Delete the given objects, skipping any that are locked.
    ///
    /// Requires implicit privilege or a held secret the server accepts. The
    /// first server error aborts the batch.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn delete_objects(&self, ids: &[ObjectId]) -> Result<DeletionReport> {
        if !self.access.can_modify().await? {
            warn!("Deletion refused without admin access");
            return Err(CoreError::PermissionDenied);
        }

        let secret = self.access.secret();
        let mut report = DeletionReport::default();
        for &id in ids {
            if self.server.check_lock(id).await? {
                info!(object_id = id, "Skipping locked object");
                report.locked.push(id);
                continue;
            }
            self.server.delete_object(id, secret.as_deref()).await?;
            report.deleted.push(id);
        }

        info!(
            deleted = report.deleted.len(),
            locked = report.locked.len(),
            "Deletion finished"
        );
        Ok(report)
    }

    pub async fn check_lock(&self, object_id: ObjectId) -> Result<bool> {
        Ok(self.server.check_lock(object_id).await?)
    }

    pub fn download_url(&self, file_id: ObjectId) -> String {
        self.server.download_url(file_id)
    }

    /// Exchange the admin password for a secret. Returns whether it was
    /// accepted.
    pub async fn login(&self, password: &str) -> Result<bool> {
        Ok(self.access.unlock(password).await?)
    }

    /// Queue files for upload into the current folder, or the initial folder
    /// when none has been navigated to.
    #[instrument(skip(self, payloads), fields(count = payloads.len()))]
    pub fn upload(&self, payloads: Vec<UploadPayload>) -> Result<Vec<UploadTaskId>> {
        let folder_id = self
            .state
            .current_folder
            .with(|folder| folder.as_ref().map(|f| f.id))
            .unwrap_or(self.config.initial_folder_id);

        payloads
            .into_iter()
            .map(|payload| {
                self.uploads
                    .enqueue(payload, folder_id)
                    .map_err(CoreError::from)
            })
            .collect()
    }

    pub fn cancel_upload(&self, task_id: UploadTaskId) -> bool {
        self.uploads.cancel(task_id)
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn access(&self) -> &AccessResolver {
        &self.access
    }

    pub fn folders(&self) -> &FolderSyncChannel {
        &self.folders
    }

    pub fn uploads(&self) -> &UploadQueue {
        &self.uploads
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }
}

impl std::fmt::Debug for FileManagerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileManagerService")
            .field("config", &self.config)
            .field("access", &self.access)
            .field("folders", &self.folders)
            .field("uploads", &self.uploads)
            .finish()
    }
}
