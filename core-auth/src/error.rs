use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Token endpoint returned {status}: {body}")]
    TokenEndpoint { status: u16, body: String },

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    #[error("Operation timed out: {operation}")]
    OperationTimeout { operation: String },

    #[error("Settings storage error: {0}")]
    Storage(#[from] BridgeError),
}

impl AuthError {
    /// Whether a later attempt may succeed without the user signing in again.
    ///
    /// A 4xx from the token endpoint means the grant itself was rejected.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AuthError::NotAuthenticated => false,
            AuthError::TokenEndpoint { status, .. } => !(400..500).contains(status),
            _ => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
