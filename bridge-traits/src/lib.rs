//! # Host Bridge Traits
//!
//! Contract between the file manager core and whatever hosts it.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - request/response calls and streamed multipart uploads
//! - [`FileServer`](server::FileServer) - the remote file server's operations
//! - [`PushChannel`](push::PushChannel) / [`PushConnector`](push::PushConnector) - folder-listing feed
//! - [`LoggerSink`](sink::LoggerSink) - forward structured logs to host logging
//!
//! The [`files`] module holds the listing data model shared by all crates.
//!
//! ## Fail-Fast Strategy
//!
//! The core refuses to start when a required capability is missing:
//!
//! ```ignore
//! let connector = config.push_connector
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "PushConnector".to_string(),
//!         message: "The host must provide a push channel transport".to_string(),
//!     })?;
//! ```
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync` so implementations can be shared across
//! tokio tasks.

pub mod error;
pub mod files;
pub mod http;
pub mod push;
pub mod server;
pub mod sink;

pub use error::BridgeError;

pub use files::{FileEntry, FileKind, FileObject, FolderEntry, ObjectId, PathSegment, UploadPayload};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm, ProgressCallback};
pub use push::{ChannelState, PushChannel, PushConnector};
pub use server::{FileServer, FileUpload};
pub use sink::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
