//! Cryptographic primitives for vaultseal tokens.
//!
//! - SHA-256 derivation of a 128-bit key from a shared secret
//! - A128KW wrapping of per-token content keys (RFC 3394)
//! - A128CBC-HS256 authenticated encryption (RFC 7518 §5.2.3)
//! - Unpadded base64url

pub mod base64url;
pub mod cbc_hmac;
pub mod error;
pub mod kdf;
pub mod key_wrap;
pub mod types;

pub use base64url::{base64url_decode, base64url_encode};
pub use error::CryptoError;
pub use kdf::derive_symmetric_key;
pub use key_wrap::{generate_cek, unwrap_cek, wrap_cek};
pub use types::{
    SealedContent, SymmetricKey, AUTH_TAG_LENGTH, CBC_IV_LENGTH, CEK_LENGTH,
    SYMMETRIC_KEY_LENGTH, WRAPPED_CEK_LENGTH,
};
