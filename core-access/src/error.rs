use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccessError {
    /// The privilege check could not be completed. Access resolves to
    /// denied when this happens.
    #[error("Privilege check failed: {0}")]
    CheckFailed(String),

    #[error("Server request failed: {0}")]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, AccessError>;
