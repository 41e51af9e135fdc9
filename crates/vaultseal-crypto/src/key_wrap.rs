//! A128KW content-key wrapping (RFC 3394 with a 128-bit KEK).
//!
//! Each token gets a random 256-bit CEK. The CEK is wrapped with the key
//! derived from the shared secret and travels in the envelope's
//! encrypted-key segment.

use aes_kw::KekAes128;
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::types::{SymmetricKey, CEK_LENGTH, WRAPPED_CEK_LENGTH};

/// Generate a random content encryption key.
pub fn generate_cek() -> Result<Zeroizing<[u8; CEK_LENGTH]>, CryptoError> {
    let mut cek = Zeroizing::new([0u8; CEK_LENGTH]);
    getrandom::getrandom(cek.as_mut()).map_err(|e| CryptoError::RngFailed(e.to_string()))?;
    Ok(cek)
}

/// Wrap a CEK under the 128-bit key-encryption key.
pub fn wrap_cek(
    cek: &[u8; CEK_LENGTH],
    kek: &SymmetricKey,
) -> Result<[u8; WRAPPED_CEK_LENGTH], CryptoError> {
    let kek_bytes = Zeroizing::new(*kek.as_bytes());
    let kek = KekAes128::from(*kek_bytes);
    let mut wrapped = [0u8; WRAPPED_CEK_LENGTH];
    kek.wrap(cek, &mut wrapped)
        .map_err(|e| CryptoError::WrapFailed(format!("{:?}", e)))?;
    Ok(wrapped)
}

/// Unwrap a CEK. A wrong KEK or a modified wrapped key fails the RFC 3394
/// integrity check and yields [`CryptoError::IntegrityFailed`].
pub fn unwrap_cek(
    wrapped: &[u8],
    kek: &SymmetricKey,
) -> Result<Zeroizing<[u8; CEK_LENGTH]>, CryptoError> {
    if wrapped.len() != WRAPPED_CEK_LENGTH {
        return Err(CryptoError::InvalidWrappedCekLength {
            expected: WRAPPED_CEK_LENGTH,
            got: wrapped.len(),
        });
    }

    let kek_bytes = Zeroizing::new(*kek.as_bytes());
    let kek = KekAes128::from(*kek_bytes);
    let mut cek = Zeroizing::new([0u8; CEK_LENGTH]);
    kek.unwrap(wrapped, cek.as_mut())
        .map_err(|e| CryptoError::IntegrityFailed(format!("AES-KW unwrap: {:?}", e)))?;
    Ok(cek)
}
