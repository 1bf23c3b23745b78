//! # File Server Provider
//!
//! Implements the `FileServer` trait against the file manager's HTTP API.
//!
//! ## Overview
//!
//! - privilege and secret checks (`/w/...` endpoints)
//! - folder metadata, creation, deletion and lock checks (`/f/...` endpoints)
//! - streamed multipart uploads with progress and cancellation
//! - download and listing-feed address construction

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{ServerConnector, ServerEndpoints};
pub use error::{Result, ServerError};
