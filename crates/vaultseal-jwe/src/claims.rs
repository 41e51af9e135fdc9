//! Token claims sealed inside an envelope.

use serde::{Deserialize, Serialize};

use crate::error::JweError;

/// Issuer written into every token this crate mints.
pub const ISSUER: &str = "PAM";

/// Plaintext claims. Timestamps are seconds since the Unix epoch.
///
/// Wire names follow RFC 7519 (`iss`, `iat`, `nbf`, `exp`, `jti`) plus the
/// private `userData` claim carrying the application payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "iss", default)]
    pub issuer: String,
    #[serde(rename = "exp")]
    pub expires_at: i64,
    #[serde(rename = "nbf")]
    pub not_before: i64,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "jti")]
    pub token_id: String,
    #[serde(rename = "userData")]
    pub user_data: String,
}

impl Claims {
    /// Width of the validity window, `exp - nbf`. `None` on overflow.
    pub fn window(&self) -> Option<i64> {
        self.expires_at.checked_sub(self.not_before)
    }

    /// Reject claims that violate `nbf <= exp` or lack a token id.
    pub fn ensure_well_formed(&self) -> Result<(), JweError> {
        if self.not_before > self.expires_at {
            return Err(JweError::InvalidClaims(format!(
                "not_before {} is after expires_at {}",
                self.not_before, self.expires_at
            )));
        }
        if self.token_id.is_empty() {
            return Err(JweError::InvalidClaims("empty token id".to_string()));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<Vec<u8>, JweError> {
        serde_json::to_vec(self).map_err(|e| JweError::InvalidClaims(e.to_string()))
    }

    /// Parse decrypted plaintext. Missing or mistyped fields are `InvalidClaims`.
    pub fn from_json(plaintext: &[u8]) -> Result<Self, JweError> {
        serde_json::from_slice(plaintext).map_err(|e| JweError::InvalidClaims(e.to_string()))
    }
}
