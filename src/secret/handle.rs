use vaultseal_crypto::{derive_symmetric_key, SymmetricKey};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The shared secret as returned by the vault.
///
/// Lives only for the seal/open call that fetched it: [`SecretHandle::derive_key`]
/// consumes the handle and the buffer is wiped on drop. Never empty when
/// handed out by the provider.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretHandle(String);

impl SecretHandle {
    pub(crate) fn new(secret: String) -> Self {
        Self(secret)
    }

    /// SHA-256 of the secret's UTF-8 bytes, first 128 bits. Consumes the handle.
    pub fn derive_key(self) -> SymmetricKey {
        derive_symmetric_key(self.0.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SecretHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretHandle([REDACTED])")
    }
}
