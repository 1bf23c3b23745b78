//! # Folder Sync Module
//!
//! Keeps the observable folder view in step with the server and moves files
//! up to it.
//!
//! ## Components
//!
//! - **Listing order** (`listing`): folders first, then by name
//! - **Folder channel** (`folder_channel`): push-fed listing and folder navigation
//! - **Upload queue** (`upload_queue`): strictly sequential, cancellable transfers

pub mod error;
pub mod folder_channel;
pub mod listing;
pub mod upload_queue;

pub use error::{Result, SyncError};
pub use folder_channel::FolderSyncChannel;
pub use listing::{compare_names, sort_listing};
pub use upload_queue::{QueueStats, UploadQueue, UploadTask, UploadTaskId};
