//! The credential vault, consumed as an opaque capability.

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Vault status: credential returned.
pub const STATUS_SUCCESS: u16 = 400;
/// Vault status: spuriously busy, worth retrying after a short delay.
pub const STATUS_BUSY: u16 = 401;

/// One vault answer. The password is wiped when the response is dropped.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct VaultResponse {
    pub status_code: u16,
    pub user_id: Option<String>,
    pub password: Option<String>,
    pub message: String,
}

impl VaultResponse {
    pub fn success(user_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            status_code: STATUS_SUCCESS,
            user_id: Some(user_id.into()),
            password: Some(password.into()),
            message: String::new(),
        }
    }

    pub fn failure(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            user_id: None,
            password: None,
            message: message.into(),
        }
    }
}

impl std::fmt::Debug for VaultResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultResponse")
            .field("status_code", &self.status_code)
            .field("user_id", &self.user_id)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("message", &self.message)
            .finish()
    }
}

/// Retrieve the credential stored under `alias`.
///
/// `bypass_cache` asks the vault to ignore any locally cached copy. The
/// transport, authentication and caching behind this call are the
/// implementor's concern. Implementations must be callable from many
/// threads at once.
pub trait CredentialVault: Send + Sync {
    fn retrieve(&self, alias: &str, bypass_cache: bool) -> VaultResponse;
}

/// In-process vault holding a single credential under one alias.
///
/// Unknown aliases answer with status 404.
pub struct StaticVault {
    alias: String,
    user_id: String,
    password: Zeroizing<String>,
}

impl StaticVault {
    pub fn new(alias: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            user_id: String::new(),
            password: Zeroizing::new(password.into()),
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }
}

impl CredentialVault for StaticVault {
    fn retrieve(&self, alias: &str, _bypass_cache: bool) -> VaultResponse {
        if alias != self.alias {
            return VaultResponse::failure(404, format!("unknown alias '{}'", alias));
        }
        VaultResponse::success(self.user_id.clone(), self.password.as_str())
    }
}
