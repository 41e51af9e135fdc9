//! Client-side token minting.

use std::sync::Arc;

use tracing::{debug, error};
use uuid::Uuid;
use vaultseal_jwe::{Claims, ISSUER};

use crate::cancel::CancelToken;
use crate::clock::{Clock, SystemClock};
use crate::error::SealError;
use crate::secret::{KeyUseError, SecretProvider};

/// Validity window of minted tokens, relative to the issue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SealOptions {
    /// Seconds `nbf` is set before `iat`, absorbing clock skew.
    pub not_before_skew: i64,
    /// Seconds `exp` is set after `iat`.
    pub lifetime: i64,
}

impl Default for SealOptions {
    fn default() -> Self {
        Self {
            not_before_skew: 60,
            lifetime: 60,
        }
    }
}

/// Seals payloads into tokens for a [`TokenValidator`](crate::TokenValidator)
/// sharing the same vault alias.
pub struct TokenSealer {
    alias: String,
    secrets: SecretProvider,
    options: SealOptions,
    clock: Arc<dyn Clock>,
}

impl TokenSealer {
    pub fn new(alias: impl Into<String>, secrets: SecretProvider) -> Self {
        Self {
            alias: alias.into(),
            secrets,
            options: SealOptions::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_options(mut self, options: SealOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Fresh claims for `payload` with a new random token id.
    pub fn claims_for(&self, payload: &str) -> Claims {
        let now = self.clock.now();
        Claims {
            issuer: ISSUER.to_string(),
            issued_at: now,
            not_before: now.saturating_sub(self.options.not_before_skew),
            expires_at: now.saturating_add(self.options.lifetime),
            token_id: Uuid::new_v4().to_string(),
            user_data: payload.to_string(),
        }
    }

    pub fn seal(&self, payload: &str) -> Result<String, SealError> {
        self.seal_with_cancel(payload, &CancelToken::new())
    }

    /// Mint a token. A hard vault failure is retried once with the vault
    /// cache bypassed.
    pub fn seal_with_cancel(&self, payload: &str, cancel: &CancelToken) -> Result<String, SealError> {
        if self.alias.trim().is_empty() {
            error!("sealer has no vault alias");
            return Err(SealError::PropertyUnavailable);
        }

        let claims = self.claims_for(payload);
        debug!(token_id = %claims.token_id, payload_len = payload.len(), "sealing token");

        self.secrets
            .with_key(
                &self.alias,
                cancel,
                |key| vaultseal_jwe::seal(&claims, key),
                |_| false,
            )
            .map_err(|err| match err {
                KeyUseError::Secret(err) => {
                    error!(alias = %self.alias, error = %err, "secret resolution failed");
                    SealError::Secret(err)
                }
                KeyUseError::Operation(err) => {
                    error!(alias = %self.alias, error = %err, "token sealing failed");
                    SealError::Codec(err)
                }
            })
    }
}
