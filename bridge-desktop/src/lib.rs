//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`, including streamed multipart uploads with
//!   progress reporting and cooperative cancellation
//!
//! The push channel has no desktop default; hosts inject a
//! `PushConnector` backed by their WebSocket stack.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//!
//! let http_client = Arc::new(ReqwestHttpClient::new()?);
//! let config = ClientConfig::builder()
//!     .server_address("localhost:8080")
//!     .http_client(http_client)
//!     .push_connector(connector)
//!     .build()?;
//! ```

mod http;

pub use http::{ReqwestHttpClient, UPLOAD_CHUNK_SIZE};
