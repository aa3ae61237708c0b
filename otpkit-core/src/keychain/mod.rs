//! Identifier-addressed persistence of tokens in a platform secure store.
//!
//! Writes flow from [`Keychain`] through [`codec::encode`] into the
//! [`adapter::ItemAdapter`], which talks to the host's
//! [`platform::SecureItemStore`]. Reads take the same path back through
//! [`codec::decode`]. Entries of a bulk read are handled independently: an
//! entry that fails to decode, or that comes back without an identifier, is
//! set aside while the rest are still returned.
//!
//! Each stored entry is keyed by `(service, account)` where `account` is the
//! record identifier, and carries these attributes:
//!
//! | attribute  | contents                               |
//! |------------|----------------------------------------|
//! | `account`  | identifier, UTF-8                      |
//! | `service`  | namespace of the owning [`Keychain`]   |
//! | `secret`   | raw key bytes                          |
//! | `metadata` | CBOR map, see [`codec`]                |

pub mod adapter;
pub mod codec;
mod error;
pub mod platform;
mod record;
mod repository;

pub use error::{DecodeError, KeychainError, KeychainResult, StoreError};
pub use record::PersistentToken;
pub use repository::{Keychain, TokenEnumeration};

/// Attribute holding the entry's identifier.
pub const ACCOUNT_ATTRIBUTE: &str = "account";
/// Attribute holding the entry's service namespace.
pub const SERVICE_ATTRIBUTE: &str = "service";
/// Attribute holding the raw key bytes.
pub const SECRET_ATTRIBUTE: &str = "secret";
/// Attribute holding the encoded token metadata.
pub const METADATA_ATTRIBUTE: &str = "metadata";
