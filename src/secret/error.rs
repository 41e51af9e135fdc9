use thiserror::Error;

use super::vault::STATUS_BUSY;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    /// The vault never returned success. Carries the last status code and a
    /// random disambiguator so log lines can be correlated; never key material.
    #[error("*** not available - rc={code} *** ({ticket})")]
    Unavailable { code: u16, ticket: u16 },

    /// The provenance gate denied this provider; the vault was not contacted.
    #[error("*** ERROR - Call to getPassword is not allowed ***")]
    NotAuthorized,

    #[error("*** ERROR - Secret retrieval cancelled ***")]
    Cancelled,
}

impl SecretError {
    pub(crate) fn unavailable(code: u16) -> Self {
        SecretError::Unavailable {
            code,
            ticket: random_ticket(),
        }
    }

    /// Vault status code, if the vault was reached.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SecretError::Unavailable { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether a fresh fetch with `bypass_cache = true` may succeed.
    ///
    /// True for hard vault failures ("no data"), false when the vault was
    /// merely busy for every attempt, denied, or cancelled.
    pub fn warrants_cache_bypass(&self) -> bool {
        matches!(self, SecretError::Unavailable { code, .. } if *code != STATUS_BUSY)
    }
}

fn random_ticket() -> u16 {
    let mut buf = [0u8; 2];
    // The ticket only disambiguates log lines; a zero ticket is acceptable.
    if getrandom::getrandom(&mut buf).is_err() {
        return 0;
    }
    u16::from_be_bytes(buf)
}
