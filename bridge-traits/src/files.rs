//! Listing data model shared by the server connector and the core.
//!
//! The server tags every record with a `type` field (`"file"` or
//! `"folder"`); that tag drives the [`FileObject`] variant.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-side identity of a file or folder.
pub type ObjectId = i64;

/// Kind of a listable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Folder,
    File,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Folder => "folder",
            FileKind::File => "file",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A plain file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub id: ObjectId,
    #[serde(default)]
    pub name: String,
    /// Set while another session holds an exclusive lock on the file.
    #[serde(rename = "is_lock", default)]
    pub locked: bool,
}

/// One breadcrumb element of a folder path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    pub id: ObjectId,
    #[serde(default)]
    pub name: String,
}

/// A folder, with the breadcrumb chain used for navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    pub id: ObjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: Vec<PathSegment>,
}

impl FolderEntry {
    /// Placeholder for a folder known only by id.
    pub fn with_id(id: ObjectId) -> Self {
        Self {
            id,
            name: String::new(),
            path: Vec::new(),
        }
    }
}

/// Anything that can appear in a folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FileObject {
    Folder(FolderEntry),
    File(FileEntry),
}

impl FileObject {
    pub fn kind(&self) -> FileKind {
        match self {
            FileObject::Folder(_) => FileKind::Folder,
            FileObject::File(_) => FileKind::File,
        }
    }

    pub fn id(&self) -> ObjectId {
        match self {
            FileObject::Folder(folder) => folder.id,
            FileObject::File(file) => file.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FileObject::Folder(folder) => &folder.name,
            FileObject::File(file) => &file.name,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, FileObject::Folder(_))
    }

    /// Lock flag as mirrored from the server; folders are never locked.
    pub fn is_locked(&self) -> bool {
        match self {
            FileObject::Folder(_) => false,
            FileObject::File(file) => file.locked,
        }
    }
}

/// Raw bytes to upload together with the name the server should store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPayload {
    pub name: String,
    pub bytes: Bytes,
}

impl UploadPayload {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
