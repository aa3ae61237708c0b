//! Keychain configuration.

use serde::Deserialize;

use crate::keychain::{KeychainError, KeychainResult};

/// Service namespace used when the host does not pick one.
pub const DEFAULT_SERVICE: &str = "me.otpkit.tokens";

/// Settings for opening a [`Keychain`](crate::keychain::Keychain).
///
/// Hosts usually embed this in their own configuration file; every field has
/// a default so an empty table is valid.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeychainConfig {
    /// Namespace of every entry the keychain writes. Keychains with different
    /// services never see each other's entries.
    pub service: String,
}

impl Default for KeychainConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

impl KeychainConfig {
    /// Creates a configuration for `service`.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Checks that the configuration can address a store.
    ///
    /// # Errors
    ///
    /// Returns [`KeychainError::InvalidConfig`] if the service is empty or
    /// only whitespace.
    pub fn validate(&self) -> KeychainResult<()> {
        if self.service.trim().is_empty() {
            return Err(KeychainError::InvalidConfig(
                "service must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}
