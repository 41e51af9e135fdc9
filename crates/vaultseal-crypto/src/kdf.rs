//! Shared-secret to symmetric key derivation.
//!
//! key = SHA-256(secret)[..16]

use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::types::{SymmetricKey, SYMMETRIC_KEY_LENGTH};

/// Derive a 128-bit key from the UTF-8 bytes of a shared secret.
///
/// The caller guarantees a non-empty secret; the secret provider never
/// hands out an empty success value.
pub fn derive_symmetric_key(secret: &[u8]) -> SymmetricKey {
    debug_assert!(!secret.is_empty(), "key derivation requires a non-empty secret");

    let mut digest: [u8; 32] = Sha256::digest(secret).into();
    let mut key = [0u8; SYMMETRIC_KEY_LENGTH];
    key.copy_from_slice(&digest[..SYMMETRIC_KEY_LENGTH]);
    digest.zeroize();

    let derived = SymmetricKey::from_bytes(key);
    key.zeroize();
    derived
}
