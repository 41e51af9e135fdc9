//! Shared-secret retrieval from the credential vault.

mod error;
mod gate;
mod handle;
mod provider;
mod vault;

pub use error::SecretError;
pub use gate::{AccessGrant, ProvenanceGate, TrustedCaller};
pub use handle::SecretHandle;
pub use provider::{
    KeyUseError, RetryPolicy, SecretProvider, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY,
};
pub use vault::{CredentialVault, StaticVault, VaultResponse, STATUS_BUSY, STATUS_SUCCESS};
