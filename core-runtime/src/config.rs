//! # Client Configuration Module
//!
//! Configuration for the file manager core.
//!
//! ## Overview
//!
//! A builder assembles a [`ClientConfig`] holding the server address, request
//! policy and the host bridges the core runs on. `build()` fails fast when a
//! required capability is missing so misconfigured hosts are caught before
//! any network traffic happens.
//!
//! ## Required Dependencies
//!
//! - `PushConnector` - transport for the folder-listing feed
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - HTTP operations (desktop default: reqwest)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ClientConfig;
//!
//! let config = ClientConfig::builder()
//!     .server_address("files.local:8080")
//!     .push_connector(Arc::new(MyWebSocketConnector::new()))
//!     .build()?;
//!
//! assert_eq!(config.http_base_url(), "http://files.local:8080");
//! assert_eq!(config.ws_base_url(), "ws://files.local:8080");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{HttpClient, ObjectId, PushConnector};
use std::sync::Arc;
use std::time::Duration;

/// Folder the listing feed is opened on when nothing else is configured.
pub const ROOT_FOLDER_ID: ObjectId = 0;

const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Core configuration for the file manager client.
///
/// Use [`ClientConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct ClientConfig {
    /// `host[:port]` of the file server, without scheme
    pub server_address: String,

    /// Use `https`/`wss` instead of `http`/`ws`
    pub secure: bool,

    /// Timeout applied to request/response calls; `None` waits indefinitely
    pub request_timeout: Option<Duration>,

    /// Folder the listing feed is scoped to at startup
    pub initial_folder_id: ObjectId,

    /// Capacity of the event bus
    pub event_buffer_size: usize,

    /// HTTP client for server requests and uploads
    pub http_client: Arc<dyn HttpClient>,

    /// Factory for the folder-listing push channel
    pub push_connector: Arc<dyn PushConnector>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server_address", &self.server_address)
            .field("secure", &self.secure)
            .field("request_timeout", &self.request_timeout)
            .field("initial_folder_id", &self.initial_folder_id)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("http_client", &"HttpClient { ... }")
            .field("push_connector", &"PushConnector { ... }")
            .finish()
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Base URL for request/response calls, e.g. `http://files.local:8080`.
    pub fn http_base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}", scheme, self.server_address)
    }

    /// Base URL for the push feed, e.g. `ws://files.local:8080`.
    pub fn ws_base_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}", scheme, self.server_address)
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The server address is a bare `host[:port]`
    /// - The event buffer size is within bounds
    /// - A configured request timeout is non-zero
    pub fn validate(&self) -> Result<()> {
        let address = self.server_address.as_str();

        if address.is_empty() {
            return Err(Error::Config("Server address cannot be empty".to_string()));
        }

        if address.contains("://") {
            return Err(Error::Config(format!(
                "Server address '{}' must not include a scheme; use .secure() for TLS",
                address
            )));
        }

        if address.chars().any(char::is_whitespace) || address.ends_with('/') {
            return Err(Error::Config(format!(
                "Server address '{}' must be of the form host[:port]",
                address
            )));
        }

        if let Some((_, port)) = address.rsplit_once(':') {
            if port.parse::<u16>().is_err() {
                return Err(Error::Config(format!("Invalid server port '{}'", port)));
            }
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        if self.request_timeout == Some(Duration::ZERO) {
            return Err(Error::Config(
                "Request timeout must be greater than zero when set".to_string(),
            ));
        }

        Ok(())
    }
}

fn push_connector_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "PushConnector".to_string(),
        message: "A PushConnector is required for the live folder listing. \
                 Inject a WebSocket-backed connector from the host platform."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for server requests. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
                 Other hosts: inject a platform-native HTTP client."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new()?);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

/// Builder for constructing [`ClientConfig`] instances.
#[derive(Default)]
pub struct ClientConfigBuilder {
    server_address: Option<String>,
    secure: bool,
    request_timeout: Option<Duration>,
    initial_folder_id: Option<ObjectId>,
    event_buffer_size: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
    push_connector: Option<Arc<dyn PushConnector>>,
}

impl ClientConfigBuilder {
    /// Sets the server address (`host[:port]`, required).
    pub fn server_address(mut self, address: impl Into<String>) -> Self {
        self.server_address = Some(address.into());
        self
    }

    /// Use TLS for both HTTP and the push feed.
    ///
    /// Default: false
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Sets a timeout for request/response calls. Uploads are not affected.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Folder the listing feed starts on.
    ///
    /// Default: [`ROOT_FOLDER_ID`]
    pub fn initial_folder_id(mut self, folder_id: ObjectId) -> Self {
        self.initial_folder_id = Some(folder_id);
        self
    }

    /// Event bus capacity.
    ///
    /// Default: [`DEFAULT_EVENT_BUFFER_SIZE`]
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the push channel factory (required).
    pub fn push_connector(mut self, connector: Arc<dyn PushConnector>) -> Self {
        self.push_connector = Some(connector);
        self
    }

    /// Builds the final `ClientConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when the address is missing or malformed
    /// - [`Error::CapabilityMissing`] when a required bridge is absent
    pub fn build(self) -> Result<ClientConfig> {
        let server_address = self.server_address.ok_or_else(|| {
            Error::Config(
                "Server address is required. Use .server_address() to set it.".to_string(),
            )
        })?;

        let push_connector = self.push_connector.ok_or_else(push_connector_missing_error)?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let config = ClientConfig {
            server_address: server_address.trim().to_string(),
            secure: self.secure,
            request_timeout: self.request_timeout,
            initial_folder_id: self.initial_folder_id.unwrap_or(ROOT_FOLDER_ID),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            http_client,
            push_connector,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpRequest, HttpResponse, MultipartForm, ProgressCallback};
    use bridge_traits::{BridgeError, PushChannel};
    use tokio_util::sync::CancellationToken;

    struct MockHttpClient;

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(BridgeError::NotAvailable("test".into()))
        }

        async fn upload(
            &self,
            _url: String,
            _form: MultipartForm,
            _progress: ProgressCallback,
            _cancel: CancellationToken,
        ) -> BridgeResult<HttpResponse> {
            Err(BridgeError::NotAvailable("test".into()))
        }
    }

    struct MockPushConnector;

    impl PushConnector for MockPushConnector {
        fn open(&self, _url: &str) -> BridgeResult<Arc<dyn PushChannel>> {
            Err(BridgeError::NotAvailable("test".into()))
        }
    }

    fn builder() -> ClientConfigBuilder {
        ClientConfig::builder()
            .server_address("files.local:8080")
            .http_client(Arc::new(MockHttpClient))
            .push_connector(Arc::new(MockPushConnector))
    }

    #[test]
    fn test_builder_with_all_required_fields() {
        let config = builder().build().unwrap();

        assert_eq!(config.server_address, "files.local:8080");
        assert!(!config.secure);
        assert_eq!(config.initial_folder_id, ROOT_FOLDER_ID);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn test_urls_follow_tls_flag() {
        let plain = builder().build().unwrap();
        assert_eq!(plain.http_base_url(), "http://files.local:8080");
        assert_eq!(plain.ws_base_url(), "ws://files.local:8080");

        let secure = builder().secure(true).build().unwrap();
        assert_eq!(secure.http_base_url(), "https://files.local:8080");
        assert_eq!(secure.ws_base_url(), "wss://files.local:8080");
    }

    #[test]
    fn test_builder_requires_server_address() {
        let result = ClientConfig::builder()
            .push_connector(Arc::new(MockPushConnector))
            .http_client(Arc::new(MockHttpClient))
            .build();

        match result {
            Err(Error::Config(msg)) => assert!(msg.contains("Server address is required")),
            other => panic!("Expected config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_builder_requires_push_connector() {
        let result = ClientConfig::builder()
            .server_address("localhost")
            .http_client(Arc::new(MockHttpClient))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "PushConnector")
            }
            other => panic!("Expected missing capability, got {:?}", other.map(|_| ())),
        }
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_http_client_without_shims() {
        let result = ClientConfig::builder()
            .server_address("localhost")
            .push_connector(Arc::new(MockPushConnector))
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { ref capability, .. }) if capability == "HttpClient"
        ));
    }

    #[test]
    fn test_validate_rejects_scheme_and_bad_port() {
        assert!(matches!(
            builder().server_address("http://files.local").build(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            builder().server_address("files.local:http").build(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            builder().server_address("").build(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_validate_event_buffer_bounds() {
        assert!(builder().event_buffer_size(0).build().is_err());
        assert!(builder().event_buffer_size(MAX_EVENT_BUFFER_SIZE + 1).build().is_err());
        assert_eq!(
            builder().event_buffer_size(16).build().unwrap().event_buffer_size,
            16
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(builder().request_timeout(Duration::ZERO).build().is_err());
        let config = builder()
            .request_timeout(Duration::from_secs(3))
            .initial_folder_id(12)
            .build()
            .unwrap();
        assert_eq!(config.request_timeout, Some(Duration::from_secs(3)));
        assert_eq!(config.initial_folder_id, 12);
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = builder().build().unwrap();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("HttpClient { ... }"));
        assert!(rendered.contains("files.local:8080"));
    }

    #[test]
    fn test_config_is_cloneable() {
        let config = builder().build().unwrap();
        let cloned = config.clone();
        assert_eq!(cloned.server_address, config.server_address);
    }
}
