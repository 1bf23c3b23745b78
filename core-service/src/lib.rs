//! Core service façade.
//!
//! Wires the host-provided bridges from a [`ClientConfig`] into the access
//! resolver, the folder channel and the upload queue, and exposes the folder
//! management operations a file manager front end needs. Desktop hosts
//! typically enable the `desktop-shims` feature so a reqwest-backed HTTP
//! client is supplied by default.
//!
//! [`ClientConfig`]: core_runtime::config::ClientConfig

pub mod error;
pub mod service;

pub use error::{CoreError, Result};
pub use service::{DeletionReport, FileManagerService};
