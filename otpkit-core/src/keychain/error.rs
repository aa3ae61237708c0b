//! Error types for keychain persistence.

use thiserror::Error;

use crate::token::TokenUrlError;

/// Result type for keychain operations.
pub type KeychainResult<T> = Result<T, KeychainError>;

/// Failures reported by the platform store, translated from status codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An entry with this identifier already exists.
    #[error("an item with this identifier already exists")]
    DuplicateIdentifier,
    /// No entry with this identifier exists.
    #[error("no item with this identifier exists")]
    NotFound,
    /// The platform store failed with its native status code.
    #[error("secure store failed with status {0}")]
    System(i32),
    /// The store returned data that is not a usable attribute map.
    #[error("unexpected secure store result: {0}")]
    UnexpectedReturnShape(String),
}

/// Reasons a stored entry cannot be turned back into a token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The entry has no secret attribute.
    #[error("stored item has no secret")]
    MissingSecret,
    /// The entry has no metadata attribute.
    #[error("stored item has no metadata")]
    MissingMetadata,
    /// The metadata attribute is not a readable metadata map.
    #[error("stored metadata is unreadable: {0}")]
    UnreadableMetadata(String),
    /// The stored URL does not describe a valid token.
    #[error("stored token url is invalid: {0}")]
    InvalidConfiguration(#[source] TokenUrlError),
}

/// Errors raised by [`Keychain`](super::Keychain) operations.
#[derive(Debug, Error)]
pub enum KeychainError {
    /// The token cannot be rendered to its URL form.
    #[error("token cannot be encoded: {0}")]
    ConfigurationEncoding(#[source] TokenUrlError),

    /// The metadata map could not be serialized.
    #[error("metadata serialization failed: {0}")]
    Serialization(String),

    /// A stored entry exists but cannot be decoded.
    #[error("stored token {identifier} is corrupt: {source}")]
    CorruptRecord {
        /// Identifier of the unreadable entry.
        identifier: String,
        /// Why decoding failed.
        #[source]
        source: DecodeError,
    },

    /// The platform store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The keychain configuration is unusable.
    #[error("invalid keychain configuration: {0}")]
    InvalidConfig(String),
}

impl KeychainError {
    /// Returns the store failure behind this error, if any.
    #[must_use]
    pub const fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}
