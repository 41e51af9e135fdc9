use zeroize::{Zeroize, ZeroizeOnDrop};

/// Symmetric key length in bytes (128 bits).
pub const SYMMETRIC_KEY_LENGTH: usize = 16;

/// Content encryption key length for A128CBC-HS256 (16-byte MAC key + 16-byte AES key).
pub const CEK_LENGTH: usize = 32;

/// AES key wrap output for a 32-byte CEK: 32 + 8 = 40 bytes.
pub const WRAPPED_CEK_LENGTH: usize = 40;

/// AES-CBC IV length in bytes.
pub const CBC_IV_LENGTH: usize = 16;

/// Authentication tag length in bytes (HMAC-SHA-256 truncated to 128 bits).
pub const AUTH_TAG_LENGTH: usize = 16;

/// 128-bit key-encryption key derived from a shared secret.
///
/// Owned by a single seal or open call and wiped on drop. Never cached.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_LENGTH]);

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; SYMMETRIC_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_LENGTH] {
        &self.0
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

/// Output of content encryption: IV, ciphertext and truncated tag.
#[derive(Debug, Clone)]
pub struct SealedContent {
    pub iv: [u8; CBC_IV_LENGTH],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; AUTH_TAG_LENGTH],
}
