//! AES_128_CBC_HMAC_SHA_256 authenticated encryption (RFC 7518 §5.2.3).
//!
//! The 32-byte CEK splits into MAC_KEY = CEK[..16] and ENC_KEY = CEK[16..].
//! E = AES-128-CBC(ENC_KEY, IV, PKCS#7(P))
//! T = HMAC-SHA-256(MAC_KEY, AAD || IV || E || AL)[..16]
//! where AL is the AAD length in bits as a 64-bit big-endian integer.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::CryptoError;
use crate::types::{SealedContent, AUTH_TAG_LENGTH, CBC_IV_LENGTH, CEK_LENGTH};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type HmacSha256 = Hmac<Sha256>;

const MAC_KEY_LENGTH: usize = CEK_LENGTH / 2;

/// Generate a random 16-byte CBC IV.
pub fn generate_iv() -> Result<[u8; CBC_IV_LENGTH], CryptoError> {
    let mut iv = [0u8; CBC_IV_LENGTH];
    getrandom::getrandom(&mut iv).map_err(|e| CryptoError::RngFailed(e.to_string()))?;
    Ok(iv)
}

fn mac(
    mac_key: &[u8],
    aad: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<HmacSha256, CryptoError> {
    let mut mac = HmacSha256::new_from_slice(mac_key).map_err(|_| CryptoError::InvalidKeyLength {
        expected: MAC_KEY_LENGTH,
        got: mac_key.len(),
    })?;
    let al = (aad.len() as u64) * 8;
    mac.update(aad);
    mac.update(iv);
    mac.update(ciphertext);
    mac.update(&al.to_be_bytes());
    Ok(mac)
}

/// Encrypt and authenticate `plaintext` with a fresh random IV.
pub fn encrypt(
    cek: &[u8; CEK_LENGTH],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<SealedContent, CryptoError> {
    let iv = generate_iv()?;
    encrypt_with_iv(cek, &iv, aad, plaintext)
}

/// Encrypt with a caller-supplied IV. Only [`encrypt`] should be used for real tokens.
pub fn encrypt_with_iv(
    cek: &[u8; CEK_LENGTH],
    iv: &[u8; CBC_IV_LENGTH],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<SealedContent, CryptoError> {
    let (mac_key, enc_key) = cek.split_at(MAC_KEY_LENGTH);

    let ciphertext = Aes128CbcEnc::new_from_slices(enc_key, iv)
        .map_err(|e| CryptoError::EncryptionFailed(format!("AES-CBC init: {}", e)))?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let full = mac(mac_key, aad, iv, &ciphertext)?.finalize().into_bytes();
    let mut tag = [0u8; AUTH_TAG_LENGTH];
    tag.copy_from_slice(&full[..AUTH_TAG_LENGTH]);

    Ok(SealedContent {
        iv: *iv,
        ciphertext,
        tag,
    })
}

/// Verify the tag, then decrypt.
///
/// The tag is checked in constant time before any CBC processing, so a
/// modified IV, ciphertext, tag or AAD always surfaces as
/// [`CryptoError::IntegrityFailed`] and never as a padding error.
pub fn decrypt(
    cek: &[u8; CEK_LENGTH],
    aad: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if iv.len() != CBC_IV_LENGTH {
        return Err(CryptoError::InvalidIvLength {
            expected: CBC_IV_LENGTH,
            got: iv.len(),
        });
    }
    if tag.len() != AUTH_TAG_LENGTH {
        return Err(CryptoError::InvalidTagLength {
            expected: AUTH_TAG_LENGTH,
            got: tag.len(),
        });
    }

    let (mac_key, enc_key) = cek.split_at(MAC_KEY_LENGTH);
    mac(mac_key, aad, iv, ciphertext)?
        .verify_truncated_left(tag)
        .map_err(|_| CryptoError::IntegrityFailed("authentication tag mismatch".to_string()))?;

    Aes128CbcDec::new_from_slices(enc_key, iv)
        .map_err(|e| CryptoError::IntegrityFailed(format!("AES-CBC init: {}", e)))?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::IntegrityFailed("invalid padding".to_string()))
}
