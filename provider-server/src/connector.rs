//! File server connector
//!
//! Implements [`FileServer`] over an injected [`HttpClient`].

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::files::{FolderEntry, ObjectId};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, MultipartForm, ProgressCallback};
use bridge_traits::server::{FileServer, FileUpload};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::ServerError;
use crate::types::SecretReply;

/// Base addresses of one file server deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoints {
    /// e.g. `http://files.local:8080`
    pub http_base: String,
    /// e.g. `ws://files.local:8080`
    pub ws_base: String,
}

impl ServerEndpoints {
    pub fn new(http_base: impl Into<String>, ws_base: impl Into<String>) -> Self {
        Self {
            http_base: trim_slash(http_base.into()),
            ws_base: trim_slash(ws_base.into()),
        }
    }
}

fn trim_slash(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}

/// File server API connector
///
/// Never retries: every trait call maps to exactly one HTTP request.
///
/// # Example
///
/// ```ignore
/// use provider_server::{ServerConnector, ServerEndpoints};
///
/// let endpoints = ServerEndpoints::new("http://localhost:8080", "ws://localhost:8080");
/// let connector = ServerConnector::new(http_client, endpoints);
/// let privileged = connector.check_privilege().await?;
/// ```
pub struct ServerConnector {
    http_client: Arc<dyn HttpClient>,
    endpoints: ServerEndpoints,
    request_timeout: Option<Duration>,
}

impl ServerConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, endpoints: ServerEndpoints) -> Self {
        Self {
            http_client,
            endpoints,
            request_timeout: None,
        }
    }

    /// Apply a timeout to every request-response call (uploads excluded).
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn endpoints(&self) -> &ServerEndpoints {
        &self.endpoints
    }

    fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.endpoints.http_base, path_and_query)
    }

    #[instrument(skip(self), fields(url = %url))]
    async fn get(&self, url: String) -> Result<HttpResponse> {
        let request = HttpRequest::get(url).maybe_timeout(self.request_timeout);
        let response = self.http_client.execute(request).await?;

        if response.is_success() {
            debug!(status = response.status, "Request succeeded");
            Ok(response)
        } else {
            warn!(status = response.status, "Request failed");
            Err(ServerError::ApiError {
                status_code: response.status,
                message: String::from_utf8_lossy(&response.body).to_string(),
            }
            .into())
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let response = self.get(url).await?;
        serde_json::from_slice(&response.body).map_err(|e| {
            ServerError::ParseError(format!("Unexpected response body: {}", e)).into()
        })
    }
}

#[async_trait]
impl FileServer for ServerConnector {
    #[instrument(skip(self))]
    async fn check_privilege(&self) -> Result<bool> {
        self.get_json(self.url("/w/checkAdmin")).await
    }

    #[instrument(skip(self, password))]
    async fn fetch_secret(&self, password: &str) -> Result<Option<String>> {
        let url = self.url(&format!("/w/getAdminPass?pw={}", urlencoding::encode(password)));
        let reply: SecretReply = self.get_json(url).await?;
        let secret = reply.into_secret();
        info!(accepted = secret.is_some(), "Secret exchange finished");
        Ok(secret)
    }

    #[instrument(skip(self, secret))]
    async fn verify_secret(&self, secret: &str) -> Result<bool> {
        let url = self.url(&format!("/w/checkAdminPass?pw={}", urlencoding::encode(secret)));
        self.get_json(url).await
    }

    #[instrument(skip(self))]
    async fn folder_metadata(&self, folder_id: ObjectId) -> Result<FolderEntry> {
        self.get_json(self.url(&format!("/w/getFolderInfo?id={}", folder_id)))
            .await
    }

    #[instrument(skip(self))]
    async fn add_folder(&self, parent_id: ObjectId, name: &str) -> Result<FolderEntry> {
        let url = self.url(&format!(
            "/f/addFolder?id={}&name={}",
            parent_id,
            urlencoding::encode(name)
        ));
        let folder: FolderEntry = self.get_json(url).await?;
        info!(folder_id = folder.id, parent_id, "Folder created");
        Ok(folder)
    }

    #[instrument(skip(self, secret))]
    async fn delete_object(&self, object_id: ObjectId, secret: Option<&str>) -> Result<()> {
        let mut path = format!("/f/deleteFileObj?id={}", object_id);
        if let Some(secret) = secret {
            path.push_str(&format!("&pw={}", urlencoding::encode(secret)));
        }
        self.get(self.url(&path)).await?;
        info!(object_id, "Object deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn check_lock(&self, object_id: ObjectId) -> Result<bool> {
        self.get_json(self.url(&format!("/f/checkFileObjLock?id={}", object_id)))
            .await
    }

    #[instrument(skip(self, upload, progress, cancel), fields(name = %upload.payload.name, folder_id = upload.folder_id))]
    async fn upload_file(
        &self,
        upload: FileUpload,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> Result<()> {
        let form = MultipartForm::new()
            .file("file", upload.payload.name, upload.payload.bytes)
            .text("folder_id", upload.folder_id.to_string());

        let response = self
            .http_client
            .upload(self.url("/f/uploadFile"), form, progress, cancel)
            .await?;

        if !response.is_success() {
            warn!(status = response.status, "Upload rejected");
            return Err(ServerError::ApiError {
                status_code: response.status,
                message: String::from_utf8_lossy(&response.body).to_string(),
            }
            .into());
        }

        debug!("Upload accepted");
        Ok(())
    }

    fn download_url(&self, file_id: ObjectId) -> String {
        self.url(&format!("/f/downloadFile?id={}", file_id))
    }

    fn listing_feed_url(&self, folder_id: ObjectId) -> String {
        format!("{}/ws/fileList?id={}", self.endpoints.ws_base, folder_id)
    }
}
