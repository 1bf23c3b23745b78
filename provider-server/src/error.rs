//! Error types for the file server provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// File server provider errors
#[derive(Error, Debug)]
pub enum ServerError {
    /// Server answered with a non-success status
    #[error("File server error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Response body did not have the expected shape
    #[error("Failed to parse server response: {0}")]
    ParseError(String),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for file server operations
pub type Result<T> = std::result::Result<T, ServerError>;

impl From<ServerError> for BridgeError {
    fn from(error: ServerError) -> Self {
        match error {
            ServerError::ApiError {
                status_code,
                message,
            } => BridgeError::OperationFailed(format!(
                "API error (status {}): {}",
                status_code, message
            )),
            ServerError::ParseError(msg) => BridgeError::Serialization(msg),
            ServerError::BridgeError(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ServerError::ApiError {
            status_code: 404,
            message: "no such folder".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "File server error (status 404): no such folder"
        );
    }

    #[test]
    fn test_cancellation_survives_conversion() {
        let error = ServerError::BridgeError(BridgeError::Cancelled);
        let bridge_error: BridgeError = error.into();
        assert!(bridge_error.is_cancelled());

        let parse: BridgeError = ServerError::ParseError("bad".into()).into();
        assert!(matches!(parse, BridgeError::Serialization(_)));
    }
}
