use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Operation requires admin access")]
    PermissionDenied,

    #[error("No folder has been navigated to yet")]
    NoCurrentFolder,

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Access error: {0}")]
    Access(#[from] core_access::AccessError),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),

    #[error("Server error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
