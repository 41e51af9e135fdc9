//! Short-lived encrypted tokens keyed by a vault-held shared secret.
//!
//! A [`TokenSealer`] mints compact JWE tokens (A128KW / A128CBC-HS256) whose
//! key is derived from a secret fetched from the credential vault. A
//! [`TokenValidator`] opens them, enforces the validity window and expiry, and
//! rejects replays through a process-wide [`ReplayGuard`].

pub mod cancel;
pub mod clock;
pub mod config;
pub mod error;
pub mod replay;
pub mod sealer;
pub mod secret;
pub mod validator;

pub use cancel::CancelToken;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{ConfigError, SealError, ValidationError};
pub use replay::{ReplayGuard, ReplayWindow};
pub use sealer::{SealOptions, TokenSealer};
pub use secret::{
    AccessGrant, CredentialVault, KeyUseError, ProvenanceGate, RetryPolicy, SecretError,
    SecretHandle, SecretProvider, StaticVault, TrustedCaller, VaultResponse,
};
pub use validator::TokenValidator;
pub use vaultseal_jwe::{AlgorithmConstraints, Claims, Decryptor, JweError};
