//! Keychain-backed persistence for one-time-password tokens.
//!
//! A [`Token`] describes how passwords are generated; its [`Secret`] is kept
//! next to it. The [`Keychain`] stores both in a host-provided
//! [`SecureItemStore`] under a random identifier and reads them back as
//! [`PersistentToken`] records.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use otpkit_core::keychain::platform::memory::MemoryItemStore;
//! use otpkit_core::{Generator, Keychain, KeychainConfig, Secret, Token};
//!
//! let keychain = Keychain::new(&KeychainConfig::default(), Arc::new(MemoryItemStore::new()))?;
//! let token = Token::new("alice@example.com", "Example", Generator::totp());
//! let record = keychain.add(token, Secret::from_slice(b"12345678901234567890"))?;
//!
//! let loaded = keychain.persistent_token(record.identifier())?;
//! assert_eq!(loaded.as_ref().map(|r| r.token()), Some(record.token()));
//! # Ok::<(), otpkit_core::keychain::KeychainError>(())
//! ```
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod config;
pub mod keychain;
pub mod logger;
pub mod token;

pub use config::{KeychainConfig, DEFAULT_SERVICE};
pub use keychain::platform::{ItemLookup, SecureItemStore};
pub use keychain::{
    DecodeError, Keychain, KeychainError, KeychainResult, PersistentToken, StoreError,
    TokenEnumeration,
};
pub use token::{Algorithm, Factor, Generator, Secret, Token, TokenUrlError};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!("otpkit_core");
