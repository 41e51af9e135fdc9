//! Resilient secret retrieval.
//!
//! The vault occasionally answers "busy" (401) even when nothing is wrong.
//! Those answers are retried after a fixed delay up to a bounded number of
//! attempts; any other non-success answer fails the sequence immediately.
//! A caller that gets a hard failure (or a key that does not fit) may run
//! the whole sequence once more with the vault cache bypassed, see
//! [`SecretProvider::with_key`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use vaultseal_crypto::SymmetricKey;

use super::error::SecretError;
use super::gate::{AccessGrant, ProvenanceGate};
use super::handle::SecretHandle;
use super::vault::{CredentialVault, STATUS_BUSY, STATUS_SUCCESS};
use crate::cancel::CancelToken;
use crate::clock::{Clock, SystemClock};

/// Maximum vault calls per retrieval sequence.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
/// Delay after a busy answer.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Bounded retry for busy vault answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Failure of [`SecretProvider::with_key`]: either the secret could not be
/// obtained or the operation run with the derived key failed.
#[derive(Debug)]
pub enum KeyUseError<E> {
    Secret(SecretError),
    Operation(E),
}

/// Wraps the vault capability with retry, cache-bypass escalation and the
/// provenance check.
///
/// Holds no secret state; safe to share across threads.
pub struct SecretProvider {
    vault: Arc<dyn CredentialVault>,
    grant: Option<AccessGrant>,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl SecretProvider {
    /// Create a provider, consulting `gate` exactly once. A denied provider
    /// fails every call with [`SecretError::NotAuthorized`] without
    /// contacting the vault.
    pub fn new(vault: Arc<dyn CredentialVault>, gate: &dyn ProvenanceGate) -> Self {
        let grant = AccessGrant::from_gate(gate);
        if grant.is_none() {
            error!("provenance gate denied secret access");
        }
        Self {
            vault,
            grant,
            retry: RetryPolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Create a provider from an already-issued grant.
    pub fn with_grant(vault: Arc<dyn CredentialVault>, grant: AccessGrant) -> Self {
        Self {
            vault,
            grant: Some(grant),
            retry: RetryPolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn is_authorized(&self) -> bool {
        self.grant.is_some()
    }

    /// Run one retrieval sequence against the vault.
    ///
    /// Busy answers are retried after `retry.delay`, up to
    /// `retry.max_attempts` calls. Success with an empty password counts as
    /// a hard failure so an empty secret never escapes.
    pub fn obtain(
        &self,
        alias: &str,
        bypass_cache: bool,
        cancel: &CancelToken,
    ) -> Result<SecretHandle, SecretError> {
        if self.grant.is_none() {
            error!(alias, "secret retrieval is not allowed");
            return Err(SecretError::NotAuthorized);
        }

        let max_attempts = self.retry.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                warn!(alias, attempt, "secret retrieval cancelled");
                return Err(SecretError::Cancelled);
            }

            debug!(alias, bypass_cache, attempt, "requesting secret from vault");
            let mut response = self.vault.retrieve(alias, bypass_cache);
            let status_code = response.status_code;
            info!(alias, status_code, attempt, "vault answered");

            match status_code {
                STATUS_SUCCESS => {
                    return match response.password.take() {
                        Some(password) if !password.is_empty() => {
                            Ok(SecretHandle::new(password))
                        }
                        _ => {
                            error!(alias, "vault returned success without a secret");
                            Err(SecretError::unavailable(STATUS_SUCCESS))
                        }
                    };
                }
                STATUS_BUSY => {
                    warn!(alias, attempt, "vault busy, waiting before retry");
                    if attempt < max_attempts {
                        if cancel.is_cancelled() {
                            warn!(alias, attempt, "secret retrieval cancelled");
                            return Err(SecretError::Cancelled);
                        }
                        self.clock.sleep(self.retry.delay);
                    }
                }
                _ => {
                    let err = SecretError::unavailable(status_code);
                    error!(alias, status_code, message = %response.message, error = %err, "vault hard failure");
                    return Err(err);
                }
            }
        }

        let err = SecretError::unavailable(STATUS_BUSY);
        error!(alias, attempts = max_attempts, error = %err, "vault still busy after all attempts");
        Err(err)
    }

    /// Obtain the secret, derive the key and run `op` with it.
    ///
    /// If the first pass fails with a hard vault failure, or `op` fails with
    /// an error for which `stale_key` returns true, the whole pass is
    /// repeated exactly once with the vault cache bypassed. The secret is
    /// dropped as soon as the key is derived; the key is dropped when `op`
    /// returns.
    pub fn with_key<T, E>(
        &self,
        alias: &str,
        cancel: &CancelToken,
        mut op: impl FnMut(&SymmetricKey) -> Result<T, E>,
        stale_key: impl Fn(&E) -> bool,
    ) -> Result<T, KeyUseError<E>> {
        match self.key_pass(alias, false, cancel, &mut op) {
            Ok(value) => Ok(value),
            Err(err) => {
                let escalate = match &err {
                    KeyUseError::Secret(e) => e.warrants_cache_bypass(),
                    KeyUseError::Operation(e) => stale_key(e),
                };
                if !escalate {
                    return Err(err);
                }
                info!(alias, "retrying with bypass_cache=true");
                self.key_pass(alias, true, cancel, &mut op)
            }
        }
    }

    fn key_pass<T, E>(
        &self,
        alias: &str,
        bypass_cache: bool,
        cancel: &CancelToken,
        op: &mut impl FnMut(&SymmetricKey) -> Result<T, E>,
    ) -> Result<T, KeyUseError<E>> {
        let secret = self
            .obtain(alias, bypass_cache, cancel)
            .map_err(KeyUseError::Secret)?;
        let key = secret.derive_key();
        op(&key).map_err(KeyUseError::Operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::secret::gate::TrustedCaller;
    use crate::secret::vault::VaultResponse;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Vault answering from a script of status codes; the last code repeats.
    struct ScriptedVault {
        script: Mutex<VecDeque<u16>>,
        calls: Mutex<Vec<bool>>,
    }

    impl ScriptedVault {
        fn new(codes: &[u16]) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(codes.iter().copied().collect()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<bool> {
            self.calls.lock().clone()
        }
    }

    impl CredentialVault for ScriptedVault {
        fn retrieve(&self, _alias: &str, bypass_cache: bool) -> VaultResponse {
            self.calls.lock().push(bypass_cache);
            let mut script = self.script.lock();
            let code = if script.len() > 1 {
                script.pop_front().unwrap_or(500)
            } else {
                script.front().copied().unwrap_or(500)
            };
            if code == STATUS_SUCCESS {
                VaultResponse::success("svc", "shared-secret")
            } else {
                VaultResponse::failure(code, "scripted")
            }
        }
    }

    fn provider(vault: Arc<ScriptedVault>, clock: Arc<ManualClock>) -> SecretProvider {
        SecretProvider::new(vault, &TrustedCaller).with_clock(clock)
    }

    #[test]
    fn immediate_success() {
        let vault = ScriptedVault::new(&[400]);
        let clock = Arc::new(ManualClock::new(0));
        let secret = provider(vault.clone(), clock.clone())
            .obtain("alias", false, &CancelToken::new())
            .unwrap();
        assert_eq!(secret.len(), "shared-secret".len());
        assert_eq!(vault.calls(), vec![false]);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn busy_three_times_then_success() {
        let vault = ScriptedVault::new(&[401, 401, 401, 400]);
        let clock = Arc::new(ManualClock::new(0));
        let result = provider(vault.clone(), clock.clone()).obtain("alias", false, &CancelToken::new());
        assert!(result.is_ok());
        assert_eq!(vault.calls().len(), 4);
        assert_eq!(clock.sleeps(), vec![DEFAULT_RETRY_DELAY; 3]);
        assert_eq!(clock.total_slept(), Duration::from_millis(750));
    }

    #[test]
    fn always_busy_exhausts_ten_attempts() {
        let vault = ScriptedVault::new(&[401]);
        let clock = Arc::new(ManualClock::new(0));
        let err = provider(vault.clone(), clock.clone())
            .obtain("alias", false, &CancelToken::new())
            .unwrap_err();
        assert_eq!(err.status_code(), Some(401));
        assert_eq!(vault.calls().len(), 10);
        assert_eq!(clock.sleeps().len(), 9);
    }

    #[test]
    fn hard_failure_stops_immediately() {
        let vault = ScriptedVault::new(&[500]);
        let clock = Arc::new(ManualClock::new(0));
        let err = provider(vault.clone(), clock.clone())
            .obtain("alias", false, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, SecretError::Unavailable { code: 500, .. }));
        assert_eq!(vault.calls().len(), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn busy_then_hard_failure_reports_hard_code() {
        let vault = ScriptedVault::new(&[401, 404]);
        let clock = Arc::new(ManualClock::new(0));
        let err = provider(vault.clone(), clock)
            .obtain("alias", false, &CancelToken::new())
            .unwrap_err();
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(vault.calls().len(), 2);
    }

    #[test]
    fn success_without_password_is_unavailable() {
        struct EmptyVault;
        impl CredentialVault for EmptyVault {
            fn retrieve(&self, _alias: &str, _bypass_cache: bool) -> VaultResponse {
                VaultResponse::success("svc", "")
            }
        }
        let p = SecretProvider::new(Arc::new(EmptyVault), &TrustedCaller);
        let err = p.obtain("alias", false, &CancelToken::new()).unwrap_err();
        assert_eq!(err.status_code(), Some(400));
    }

    #[test]
    fn denied_gate_never_contacts_vault() {
        let vault = ScriptedVault::new(&[400]);
        let deny = || false;
        let p = SecretProvider::new(vault.clone(), &deny);
        assert!(!p.is_authorized());
        let err = p.obtain("alias", false, &CancelToken::new()).unwrap_err();
        assert_eq!(err, SecretError::NotAuthorized);
        assert!(vault.calls().is_empty());
    }

    #[test]
    fn provider_from_issued_grant() {
        let vault = ScriptedVault::new(&[400]);
        let grant = AccessGrant::from_gate(&TrustedCaller).unwrap();
        let p = SecretProvider::with_grant(vault.clone(), grant)
            .with_clock(Arc::new(ManualClock::new(0)));
        assert!(p.is_authorized());
        let secret = p.obtain("alias", false, &CancelToken::new()).unwrap();
        assert_eq!(secret.len(), "shared-secret".len());
        assert_eq!(vault.calls(), vec![false]);
    }

    #[test]
    fn gate_is_consulted_once() {
        use std::sync::atomic::{AtomicU32, Ordering};
        let consulted = AtomicU32::new(0);
        let gate = || {
            consulted.fetch_add(1, Ordering::SeqCst);
            true
        };
        let p = SecretProvider::new(ScriptedVault::new(&[400]), &gate);
        for _ in 0..3 {
            assert!(p.obtain("alias", false, &CancelToken::new()).is_ok());
        }
        assert_eq!(consulted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancelled_token_stops_before_vault() {
        let vault = ScriptedVault::new(&[400]);
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = provider(vault.clone(), Arc::new(ManualClock::new(0)))
            .obtain("alias", false, &cancel)
            .unwrap_err();
        assert_eq!(err, SecretError::Cancelled);
        assert!(vault.calls().is_empty());
    }

    #[test]
    fn cancellation_during_retries_stops_loop() {
        /// Cancels the token on its first sleep.
        struct CancellingClock(CancelToken);
        impl Clock for CancellingClock {
            fn now(&self) -> i64 {
                0
            }
            fn sleep(&self, _duration: Duration) {
                self.0.cancel();
            }
        }

        let vault = ScriptedVault::new(&[401]);
        let cancel = CancelToken::new();
        let p = SecretProvider::new(vault.clone(), &TrustedCaller)
            .with_clock(Arc::new(CancellingClock(cancel.clone())));
        let err = p.obtain("alias", false, &cancel).unwrap_err();
        assert_eq!(err, SecretError::Cancelled);
        assert_eq!(vault.calls().len(), 1);
    }

    #[test]
    fn custom_retry_policy() {
        let vault = ScriptedVault::new(&[401]);
        let clock = Arc::new(ManualClock::new(0));
        let p = provider(vault.clone(), clock.clone()).with_retry(RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(10),
        });
        assert!(p.obtain("alias", false, &CancelToken::new()).is_err());
        assert_eq!(vault.calls().len(), 3);
        assert_eq!(clock.total_slept(), Duration::from_millis(20));
    }

    // ========================================================================
    // with_key — cache-bypass escalation
    // ========================================================================

    #[test]
    fn with_key_escalates_hard_failure_once() {
        let vault = ScriptedVault::new(&[500, 400]);
        let p = provider(vault.clone(), Arc::new(ManualClock::new(0)));
        let out: Result<u8, KeyUseError<()>> =
            p.with_key("alias", &CancelToken::new(), |_key| Ok(7), |_| false);
        assert_eq!(out.unwrap(), 7);
        assert_eq!(vault.calls(), vec![false, true]);
    }

    #[test]
    fn with_key_does_not_escalate_busy_exhaustion() {
        let vault = ScriptedVault::new(&[401]);
        let p = provider(vault.clone(), Arc::new(ManualClock::new(0)));
        let out: Result<u8, KeyUseError<()>> =
            p.with_key("alias", &CancelToken::new(), |_key| Ok(7), |_| false);
        assert!(matches!(out, Err(KeyUseError::Secret(SecretError::Unavailable { code: 401, .. }))));
        assert!(vault.calls().iter().all(|bypass| !bypass));
    }

    #[test]
    fn with_key_escalates_stale_key_once() {
        let vault = ScriptedVault::new(&[400]);
        let p = provider(vault.clone(), Arc::new(ManualClock::new(0)));
        let out: Result<u8, KeyUseError<&str>> =
            p.with_key("alias", &CancelToken::new(), |_key| Err("wrong key"), |_| true);
        assert!(matches!(out, Err(KeyUseError::Operation("wrong key"))));
        assert_eq!(vault.calls(), vec![false, true]);
    }

    #[test]
    fn with_key_operation_error_without_escalation() {
        let vault = ScriptedVault::new(&[400]);
        let p = provider(vault.clone(), Arc::new(ManualClock::new(0)));
        let out: Result<u8, KeyUseError<&str>> =
            p.with_key("alias", &CancelToken::new(), |_key| Err("malformed"), |_| false);
        assert!(matches!(out, Err(KeyUseError::Operation("malformed"))));
        assert_eq!(vault.calls(), vec![false]);
    }

    #[test]
    fn with_key_passes_derived_key() {
        let vault = ScriptedVault::new(&[400]);
        let p = provider(vault, Arc::new(ManualClock::new(0)));
        let expected = vaultseal_crypto::derive_symmetric_key(b"shared-secret");
        let matched: Result<bool, KeyUseError<()>> = p.with_key(
            "alias",
            &CancelToken::new(),
            |key| Ok(key.as_bytes() == expected.as_bytes()),
            |_| false,
        );
        assert!(matched.unwrap());
    }
}
