use bridge_traits::{BridgeError, ChannelState};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Folder channel is not open (state: {state})")]
    ChannelNotReady { state: ChannelState },

    #[error("Transfer cancelled")]
    TransferCancelled,

    #[error("Malformed listing: {0}")]
    MalformedListing(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl SyncError {
    pub fn is_channel_not_ready(&self) -> bool {
        matches!(self, SyncError::ChannelNotReady { .. })
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
