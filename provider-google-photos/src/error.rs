//! Error types for Google Photos provider

use core_auth::AuthError;
use thiserror::Error;

/// Google Photos provider errors
#[derive(Error, Debug)]
pub enum GooglePhotosError {
    /// No fresh access token could be obtained
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// API request returned a non-2xx status
    #[error("Google Photos API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),
}

impl GooglePhotosError {
    /// The remote side asked us to slow down.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GooglePhotosError::ApiError { status_code: 429, .. })
    }
}

/// Result type for Google Photos operations
pub type Result<T> = std::result::Result<T, GooglePhotosError>;

impl From<GooglePhotosError> for bridge_traits::error::BridgeError {
    fn from(error: GooglePhotosError) -> Self {
        match error {
            GooglePhotosError::Auth(e) => bridge_traits::error::BridgeError::OperationFailed(
                format!("Authentication failed: {}", e),
            ),
            GooglePhotosError::ApiError {
                status_code,
                message,
            } => bridge_traits::error::BridgeError::OperationFailed(format!(
                "API error (status {}): {}",
                status_code, message
            )),
            GooglePhotosError::ParseError(msg) => {
                bridge_traits::error::BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            GooglePhotosError::NetworkError(msg) => {
                bridge_traits::error::BridgeError::OperationFailed(format!(
                    "Network error: {}",
                    msg
                ))
            }
        }
    }
}
