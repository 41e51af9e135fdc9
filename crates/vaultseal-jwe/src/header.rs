//! Protected header and algorithm allow-list.

use serde::{Deserialize, Serialize};

use crate::error::JweError;

/// AES key wrap with a 128-bit key (RFC 7518 §4.4).
pub const A128KW: &str = "A128KW";
/// AES-128-CBC with HMAC-SHA-256 (RFC 7518 §5.2.3).
pub const A128CBC_HS256: &str = "A128CBC-HS256";

/// Key-management algorithms this codec can process.
pub const SUPPORTED_KEY_MANAGEMENT: &[&str] = &[A128KW];
/// Content-encryption algorithms this codec can process.
pub const SUPPORTED_CONTENT_ENCRYPTION: &[&str] = &[A128CBC_HS256];

/// JOSE protected header of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedHeader {
    pub alg: String,
    pub enc: String,
    /// Compression is never produced and is rejected on receipt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    /// No extension is understood, so any critical extension is rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crit: Option<serde_json::Value>,
}

impl ProtectedHeader {
    /// The only header this codec produces.
    pub fn a128kw_a128cbc_hs256() -> Self {
        Self {
            alg: A128KW.to_string(),
            enc: A128CBC_HS256.to_string(),
            zip: None,
            crit: None,
        }
    }
}

/// Which algorithms a decryptor accepts.
///
/// Checked twice: when a [`crate::Decryptor`] is built (every permitted name
/// must be supported by this codec) and again against each envelope header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmConstraints {
    key_management: Vec<String>,
    content_encryption: Vec<String>,
}

impl AlgorithmConstraints {
    /// Permit exactly the listed algorithm names.
    pub fn permit(key_management: &[&str], content_encryption: &[&str]) -> Self {
        Self {
            key_management: key_management.iter().map(|s| s.to_string()).collect(),
            content_encryption: content_encryption.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// A128KW + A128CBC-HS256 only.
    pub fn strict() -> Self {
        Self::permit(SUPPORTED_KEY_MANAGEMENT, SUPPORTED_CONTENT_ENCRYPTION)
    }

    /// Fails if the constraint set is empty or names something this codec cannot process.
    pub(crate) fn ensure_supported(&self) -> Result<(), JweError> {
        if self.key_management.is_empty() || self.content_encryption.is_empty() {
            return Err(JweError::UnsupportedAlgorithm(
                "constraints permit no algorithms".to_string(),
            ));
        }
        if let Some(alg) = self
            .key_management
            .iter()
            .find(|alg| !SUPPORTED_KEY_MANAGEMENT.contains(&alg.as_str()))
        {
            return Err(JweError::UnsupportedAlgorithm(format!("alg: {} is not supported", alg)));
        }
        if let Some(enc) = self
            .content_encryption
            .iter()
            .find(|enc| !SUPPORTED_CONTENT_ENCRYPTION.contains(&enc.as_str()))
        {
            return Err(JweError::UnsupportedAlgorithm(format!("enc: {} is not supported", enc)));
        }
        Ok(())
    }

    /// Check an envelope header against the permitted and supported sets.
    pub fn check(&self, header: &ProtectedHeader) -> Result<(), JweError> {
        if !self.key_management.iter().any(|a| a == &header.alg)
            || !SUPPORTED_KEY_MANAGEMENT.contains(&header.alg.as_str())
        {
            return Err(JweError::UnsupportedAlgorithm(format!(
                "alg: {} is not permitted",
                header.alg
            )));
        }
        if !self.content_encryption.iter().any(|e| e == &header.enc)
            || !SUPPORTED_CONTENT_ENCRYPTION.contains(&header.enc.as_str())
        {
            return Err(JweError::UnsupportedAlgorithm(format!(
                "enc: {} is not permitted",
                header.enc
            )));
        }
        if let Some(zip) = &header.zip {
            return Err(JweError::UnsupportedAlgorithm(format!("zip: {} is not supported", zip)));
        }
        if let Some(crit) = &header.crit {
            return Err(JweError::UnsupportedAlgorithm(format!(
                "crit: {} is not understood",
                crit
            )));
        }
        Ok(())
    }
}

impl Default for AlgorithmConstraints {
    fn default() -> Self {
        Self::strict()
    }
}
