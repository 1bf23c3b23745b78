//! File Server Abstraction
//!
//! Operations the core needs from the remote file server. The concrete
//! implementation lives in `provider-server`; tests substitute fakes.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::files::{FolderEntry, ObjectId, UploadPayload};
use crate::http::ProgressCallback;

/// A single file transfer request.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub payload: UploadPayload,
    /// Destination folder, fixed when the upload was requested.
    pub folder_id: ObjectId,
}

/// Remote file server operations
///
/// # Example
///
/// ```ignore
/// use bridge_traits::server::FileServer;
///
/// async fn enter(server: &dyn FileServer, id: i64) -> Result<String> {
///     let folder = server.folder_metadata(id).await?;
///     Ok(folder.name)
/// }
/// ```
#[async_trait]
pub trait FileServer: Send + Sync {
    /// Whether the calling client is implicitly privileged.
    async fn check_privilege(&self) -> Result<bool>;

    /// Exchange a password for the privileged secret, if the password is right.
    async fn fetch_secret(&self, password: &str) -> Result<Option<String>>;

    /// Verify a previously obtained secret.
    async fn verify_secret(&self, secret: &str) -> Result<bool>;

    /// Metadata (including breadcrumbs) of a folder.
    async fn folder_metadata(&self, folder_id: ObjectId) -> Result<FolderEntry>;

    /// Create `name` under `parent_id`.
    async fn add_folder(&self, parent_id: ObjectId, name: &str) -> Result<FolderEntry>;

    /// Delete a file or folder, presenting the secret when one is held.
    async fn delete_object(&self, object_id: ObjectId, secret: Option<&str>) -> Result<()>;

    /// Whether an object is currently locked by another session.
    async fn check_lock(&self, object_id: ObjectId) -> Result<bool>;

    /// Transfer a file, reporting `(total, sent)` progress.
    ///
    /// Returns [`BridgeError::Cancelled`](crate::BridgeError::Cancelled) when
    /// `cancel` fires before the transfer completes.
    async fn upload_file(
        &self,
        upload: FileUpload,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> Result<()>;

    /// Direct download link for a file.
    fn download_url(&self, file_id: ObjectId) -> String;

    /// Address of the push feed for a folder listing.
    fn listing_feed_url(&self, folder_id: ObjectId) -> String;
}
