use thiserror::Error;
use vaultseal_crypto::CryptoError;

#[derive(Debug, Error)]
pub enum JweError {
    /// The compact serialization or protected header could not be parsed.
    #[error("JWE format error: {0}")]
    Format(String),

    /// The header advertises an algorithm outside the allow-list.
    #[error("JWE unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Key unwrap or authentication tag verification failed.
    #[error("JWE integrity failure: {0}")]
    IntegrityFailure(String),

    /// Decrypted plaintext is not a well-formed claims object.
    #[error("Invalid claims: {0}")]
    InvalidClaims(String),

    #[error("JWE encryption failed: {0}")]
    EncryptionFailed(String),
}

impl From<CryptoError> for JweError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::IntegrityFailed(msg) => JweError::IntegrityFailure(msg),
            CryptoError::InvalidIvLength { .. }
            | CryptoError::InvalidTagLength { .. }
            | CryptoError::InvalidWrappedCekLength { .. }
            | CryptoError::InvalidKeyLength { .. } => JweError::Format(err.to_string()),
            CryptoError::EncryptionFailed(_)
            | CryptoError::WrapFailed(_)
            | CryptoError::RngFailed(_) => JweError::EncryptionFailed(err.to_string()),
        }
    }
}
