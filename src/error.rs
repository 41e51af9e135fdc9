use thiserror::Error;
use vaultseal_jwe::JweError;

use crate::secret::SecretError;

/// Terminal outcome of a failed validation.
///
/// `Display` is the sentinel written back to the client in place of the
/// payload; it never carries key material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("*** ERROR - Property not found ***")]
    PropertyUnavailable,

    #[error("{0}")]
    SecretUnavailable(SecretError),

    #[error("*** ERROR - Call to getPassword is not allowed ***")]
    NotAuthorized,

    #[error("*** ERROR - Message integrity invalid ***")]
    IntegrityInvalid,

    #[error("*** ERROR - Invalid data ***")]
    InvalidData,

    #[error("*** ERROR - Invalid time window ***")]
    InvalidTimeWindow,

    #[error("*** ERROR - Token has expired ***")]
    TokenExpired,

    #[error("*** ERROR - Token replay ***")]
    TokenReplay,

    #[error("*** ERROR - Request cancelled ***")]
    Cancelled,

    #[error("*** ERROR - Exception ***")]
    Exception,
}

impl From<SecretError> for ValidationError {
    fn from(err: SecretError) -> Self {
        match err {
            SecretError::NotAuthorized => ValidationError::NotAuthorized,
            SecretError::Cancelled => ValidationError::Cancelled,
            unavailable @ SecretError::Unavailable { .. } => {
                ValidationError::SecretUnavailable(unavailable)
            }
        }
    }
}

impl From<JweError> for ValidationError {
    fn from(err: JweError) -> Self {
        match err {
            JweError::IntegrityFailure(_) => ValidationError::IntegrityInvalid,
            JweError::InvalidClaims(_) => ValidationError::InvalidData,
            JweError::Format(_)
            | JweError::UnsupportedAlgorithm(_)
            | JweError::EncryptionFailed(_) => ValidationError::Exception,
        }
    }
}

#[derive(Debug, Error)]
pub enum SealError {
    #[error("No vault alias configured")]
    PropertyUnavailable,

    #[error("Secret error: {0}")]
    Secret(#[from] SecretError),

    #[error("Envelope error: {0}")]
    Codec(#[from] JweError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
