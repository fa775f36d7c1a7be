//! Administrator credential loaded from environment variables.
//!
//! Administrative endpoints require `Authorization: Bearer <ADMIN_API_KEY>`. When the
//! variable is unset or empty no request is treated as an administrator.

use subtle::ConstantTimeEq;
use tracing::warn;

/// Shared secret presented by administrative callers.
#[derive(Clone, Default)]
pub struct AdminKey {
    key: Option<String>,
}

impl std::fmt::Debug for AdminKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminKey")
            .field("configured", &self.key.is_some())
            .finish()
    }
}

impl AdminKey {
    /// Wraps a key; an empty string means no key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            key: (!key.trim().is_empty()).then_some(key),
        }
    }

    /// Reads `ADMIN_API_KEY` from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        let admin_key = std::env::var("ADMIN_API_KEY").map(Self::new).unwrap_or_default();
        if admin_key.key.is_none() {
            warn!("ADMIN_API_KEY is not set; administrative endpoints will reject every request");
        }
        admin_key
    }

    /// Whether a key is configured at all.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.key.is_some()
    }

    /// Compares a presented key in constant time.
    #[must_use]
    pub fn matches(&self, presented: &str) -> bool {
        self.key
            .as_deref()
            .is_some_and(|key| bool::from(key.as_bytes().ct_eq(presented.as_bytes())))
    }
}
