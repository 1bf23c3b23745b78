//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm, ProgressCallback},
};
use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Size of the slices an upload body is streamed in; progress is reported
/// once per slice.
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Reqwest-based HTTP client implementation
///
/// Provides HTTP operations with:
/// - Connection pooling via reqwest
/// - TLS support by default
/// - Chunked upload bodies with per-chunk progress and cancellation
///
/// Requests are attempted once; there is no retry layer.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_connect_timeout(Duration::from_secs(10))
    }

    /// Create a new HTTP client with a custom connect timeout
    ///
    /// No overall request timeout is set so that large uploads are not cut
    /// off; per-request timeouts come from [`HttpRequest::timeout`].
    pub fn with_connect_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .pool_max_idle_per_host(10)
            .user_agent("file-manager-core/0.1.0")
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }

    /// Build reqwest request from bridge request
    fn build_request(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);

        for (key, value) in request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = request.body {
            req = req.body(body);
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    fn build_form(
        form: MultipartForm,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> Result<reqwest::multipart::Form> {
        let mut multipart = reqwest::multipart::Form::new();

        if let Some(file) = form.file {
            let total = file.bytes.len() as u64;
            let body = reqwest::Body::wrap_stream(progress_stream(
                file.bytes,
                UPLOAD_CHUNK_SIZE,
                progress,
                cancel,
            ));
            let part = reqwest::multipart::Part::stream_with_length(body, total)
                .file_name(file.file_name)
                .mime_str("application/octet-stream")
                .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;
            multipart = multipart.part(file.field, part);
        }

        for (name, value) in form.text_fields {
            multipart = multipart.text(name, value);
        }

        Ok(multipart)
    }

    async fn into_response(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn map_send_error(e: reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::OperationFailed("Request timed out".to_string())
        } else if e.is_connect() {
            BridgeError::OperationFailed(format!("Connection failed: {}", e))
        } else {
            BridgeError::OperationFailed(e.to_string())
        }
    }
}

/// Slice `bytes` into a body stream that reports `(total, sent)` after each
/// chunk and stops with an error once `cancel` fires.
fn progress_stream(
    bytes: Bytes,
    chunk_size: usize,
    progress: ProgressCallback,
    cancel: CancellationToken,
) -> impl Stream<Item = std::io::Result<Bytes>> + Send + 'static {
    let total = bytes.len() as u64;
    let chunk_size = chunk_size.max(1);
    let chunks: Vec<Bytes> = (0..bytes.len())
        .step_by(chunk_size)
        .map(|start| bytes.slice(start..(start + chunk_size).min(bytes.len())))
        .collect();

    let mut sent = 0u64;
    stream::iter(chunks).map(move |chunk| {
        if cancel.is_cancelled() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Interrupted,
                "upload cancelled",
            ));
        }
        sent += chunk.len() as u64;
        progress(total, sent);
        Ok(chunk)
    })
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(url = %request.url, method = ?request.method, "Executing HTTP request");

        let response = self.build_request(request).send().await.map_err(|e| {
            warn!(error = %e, "HTTP request failed");
            Self::map_send_error(e)
        })?;

        Self::into_response(response).await
    }

    async fn upload(
        &self,
        url: String,
        form: MultipartForm,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> Result<HttpResponse> {
        if cancel.is_cancelled() {
            return Err(BridgeError::Cancelled);
        }

        debug!(url = %url, size = form.payload_len(), "Starting multipart upload");
        let multipart = Self::build_form(form, progress, cancel.clone())?;
        let send = self.client.post(&url).multipart(multipart).send();

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(url = %url, "Upload cancelled");
                Err(BridgeError::Cancelled)
            }
            result = send => {
                match result {
                    Ok(response) => Self::into_response(response).await,
                    Err(_) if cancel.is_cancelled() => Err(BridgeError::Cancelled),
                    Err(e) => {
                        warn!(error = %e, "Upload failed");
                        Err(Self::map_send_error(e))
                    }
                }
            }
        }
    }
}
