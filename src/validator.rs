//! Server-side token validation.
//!
//! Each token runs once through a linear pipeline: resolve the secret and
//! derive the key, decrypt, parse claims, then under the replay lock purge
//! stale entries, check the validity window, check expiry and admit the
//! token id. Every failure is a distinct [`ValidationError`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use vaultseal_jwe::{Claims, Decryptor, Envelope, JweError};
use zeroize::Zeroizing;

use crate::cancel::CancelToken;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::ValidationError;
use crate::replay::ReplayGuard;
use crate::secret::{KeyUseError, SecretProvider};

pub struct TokenValidator {
    alias: Option<String>,
    time_window: i64,
    secrets: SecretProvider,
    replay: Arc<ReplayGuard>,
    clock: Arc<dyn Clock>,
    decryptor: Decryptor,
    calls: AtomicU64,
}

impl TokenValidator {
    /// `replay` is the process-wide guard; every validator in the process
    /// must share the same instance.
    pub fn new(config: &Config, secrets: SecretProvider, replay: Arc<ReplayGuard>) -> Self {
        if config.alias.is_none() {
            error!("validator created without a vault alias");
        }
        Self {
            alias: config.alias.clone(),
            time_window: config.time_window(),
            secrets,
            replay,
            clock: Arc::new(SystemClock),
            decryptor: Decryptor::strict(),
            calls: AtomicU64::new(0),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate a compact token and return its payload.
    pub fn open(&self, token: &str) -> Result<String, ValidationError> {
        self.open_with_cancel(token, &CancelToken::new())
    }

    pub fn open_with_cancel(
        &self,
        token: &str,
        cancel: &CancelToken,
    ) -> Result<String, ValidationError> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(call, "validating token");

        let Some(alias) = self.alias.as_deref() else {
            error!(property = crate::config::ALIAS_PROPERTY, "vault alias is not configured");
            return Err(ValidationError::PropertyUnavailable);
        };

        let plaintext = self.decrypt(alias, token.trim(), cancel)?;

        let claims = Claims::from_json(&plaintext).map_err(|err| {
            warn!(error = %err, "token claims malformed");
            ValidationError::InvalidData
        })?;
        drop(plaintext);

        self.check_and_admit(&claims)?;

        debug!(token_id = %claims.token_id, payload_len = claims.user_data.len(), "token accepted");
        Ok(claims.user_data)
    }

    /// [`open`](Self::open) with the outcome rendered for the wire: the
    /// payload on success, the failure sentinel otherwise.
    pub fn handle(&self, body: &str) -> String {
        match self.open(body) {
            Ok(payload) => payload,
            Err(err) => err.to_string(),
        }
    }

    /// Validation requests seen so far, successful or not.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn replay_guard(&self) -> &Arc<ReplayGuard> {
        &self.replay
    }

    fn decrypt(
        &self,
        alias: &str,
        token: &str,
        cancel: &CancelToken,
    ) -> Result<Zeroizing<Vec<u8>>, ValidationError> {
        let result = self.secrets.with_key(
            alias,
            cancel,
            |key| -> Result<Zeroizing<Vec<u8>>, JweError> {
                let envelope = Envelope::parse(token)?;
                self.decryptor.decrypt(&envelope, key).map(Zeroizing::new)
            },
            |err| matches!(err, JweError::IntegrityFailure(_)),
        );

        result.map_err(|err| match err {
            KeyUseError::Secret(err) => {
                error!(alias, error = %err, "secret resolution failed");
                ValidationError::from(err)
            }
            KeyUseError::Operation(JweError::IntegrityFailure(reason)) => {
                error!(alias, reason = %reason, "token integrity check failed");
                ValidationError::IntegrityInvalid
            }
            KeyUseError::Operation(err) => {
                error!(alias, error = %err, "token could not be decrypted");
                ValidationError::from(err)
            }
        })
    }

    /// Cleanup, window, expiry and replay checks under one lock hold.
    fn check_and_admit(&self, claims: &Claims) -> Result<(), ValidationError> {
        let now = self.clock.now();
        let mut window = self.replay.lock();

        let evicted = window.cleanup(now.saturating_sub(self.time_window));
        if evicted > 0 {
            debug!(evicted, "replay entries purged");
        }

        match claims.window() {
            Some(width) if (0..=self.time_window).contains(&width) => {}
            width => {
                warn!(
                    token_id = %claims.token_id,
                    width = ?width,
                    time_window = self.time_window,
                    "token validity window rejected"
                );
                return Err(ValidationError::InvalidTimeWindow);
            }
        }

        if claims.expires_at < now {
            info!(token_id = %claims.token_id, expires_at = claims.expires_at, now, "token expired");
            return Err(ValidationError::TokenExpired);
        }

        if !window.admit(&claims.token_id, claims.issued_at) {
            warn!(token_id = %claims.token_id, "token replay detected");
            return Err(ValidationError::TokenReplay);
        }

        Ok(())
    }
}
