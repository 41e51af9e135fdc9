//! Envelope codec for vaultseal tokens.
//!
//! This crate provides:
//! - Compact JWE with A128KW key wrapping and A128CBC-HS256 content encryption
//! - An algorithm allow-list enforced at decryptor construction and per envelope
//! - Token claims (`iss`, `iat`, `nbf`, `exp`, `jti`, `userData`)

mod claims;
mod error;
mod header;
mod jwe;

pub use claims::{Claims, ISSUER};
pub use error::JweError;
pub use header::{
    AlgorithmConstraints, ProtectedHeader, A128CBC_HS256, A128KW, SUPPORTED_CONTENT_ENCRYPTION,
    SUPPORTED_KEY_MANAGEMENT,
};
pub use jwe::{encrypt_compact, open, seal, Decryptor, Envelope};
