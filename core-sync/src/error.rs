use bridge_traits::error::BridgeError;
use core_auth::AuthError;
use provider_google_photos::GooglePhotosError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Storage(#[from] BridgeError),

    #[error("Artwork store error: {0}")]
    ArtworkStore(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Provider error: {0}")]
    Provider(#[from] GooglePhotosError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Sync run did not succeed: {0}")]
    Unsuccessful(String),
}

impl From<sqlx::Error> for SyncError {
    fn from(error: sqlx::Error) -> Self {
        SyncError::Database(error.to_string())
    }
}

impl From<SyncError> for BridgeError {
    fn from(error: SyncError) -> Self {
        match error {
            SyncError::Storage(e) => e,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_round_trips_to_bridge() {
        let error = SyncError::from(BridgeError::InvalidInput("bad key".into()));
        assert!(matches!(
            BridgeError::from(error),
            BridgeError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_unsuccessful_run_maps_to_operation_failed() {
        let error = SyncError::Unsuccessful("empty page".into());
        assert_eq!(error.to_string(), "Sync run did not succeed: empty page");
        assert!(matches!(
            BridgeError::from(error),
            BridgeError::OperationFailed(_)
        ));
    }
}
