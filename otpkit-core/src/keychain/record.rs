//! The persisted form of a token.

use std::hash::{Hash, Hasher};

use crate::token::{Secret, Token};

/// A token stored in the keychain under a unique identifier.
///
/// Identity is the identifier alone: two records holding equal tokens under
/// different identifiers are different records, and equality and hashing
/// ignore the token, secret, and correlation data.
#[derive(Debug, Clone)]
pub struct PersistentToken {
    identifier: String,
    token: Token,
    secret: Secret,
    correlation: Option<Vec<u8>>,
}

impl PersistentToken {
    pub(crate) const fn new(
        identifier: String,
        token: Token,
        secret: Secret,
        correlation: Option<Vec<u8>>,
    ) -> Self {
        Self {
            identifier,
            token,
            secret,
            correlation,
        }
    }

    /// Identifier of the keychain entry.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The stored token configuration.
    #[must_use]
    pub const fn token(&self) -> &Token {
        &self.token
    }

    /// The stored key material.
    #[must_use]
    pub const fn secret(&self) -> &Secret {
        &self.secret
    }

    /// Opaque bytes an external system uses to match this record.
    #[must_use]
    pub fn correlation(&self) -> Option<&[u8]> {
        self.correlation.as_deref()
    }
}

impl PartialEq for PersistentToken {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for PersistentToken {}

impl Hash for PersistentToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
    }
}
