//! Platform secure item store interface.
//!
//! The keychain layer reaches the host's encrypted credential store through
//! [`SecureItemStore`]. Every entry is keyed by a `(service, account)` pair and
//! carries a flat map of named byte attributes. Calls report their outcome as
//! a raw status code using the Apple Security framework values:
//!
//! - [`ERR_SEC_SUCCESS`]: the call succeeded
//! - [`ERR_SEC_DUPLICATE_ITEM`]: `add_item` found an entry with the same key
//! - [`ERR_SEC_ITEM_NOT_FOUND`]: no entry matched
//!
//! Any other value is passed through as a platform failure.
//!
//! # Platform Implementations
//!
//! - **iOS / macOS**: `SecItemAdd` / `SecItemUpdate` / `SecItemDelete` /
//!   `SecItemCopyMatching` on generic password items
//! - **Android**: Keystore-wrapped entries in encrypted shared preferences,
//!   reporting the same status values
//! - **Tests**: [`memory::MemoryItemStore`]

use std::collections::HashMap;

pub mod memory;

/// The call succeeded.
pub const ERR_SEC_SUCCESS: i32 = 0;
/// An entry with the same `(service, account)` already exists.
pub const ERR_SEC_DUPLICATE_ITEM: i32 = -25299;
/// No entry matched the query.
pub const ERR_SEC_ITEM_NOT_FOUND: i32 = -25300;

/// Named byte attributes of one stored entry.
pub type ItemAttributes = HashMap<String, Vec<u8>>;

/// Result of a lookup against the platform store.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ItemLookup {
    /// Platform status code.
    pub status: i32,
    /// Attribute maps of the matching entries, including their `account`.
    pub items: Vec<HashMap<String, Vec<u8>>>,
}

impl ItemLookup {
    /// A successful lookup returning `items`.
    #[must_use]
    pub const fn found(items: Vec<HashMap<String, Vec<u8>>>) -> Self {
        Self {
            status: ERR_SEC_SUCCESS,
            items,
        }
    }

    /// A lookup that failed with `status` and returned nothing.
    #[must_use]
    pub const fn failed(status: i32) -> Self {
        Self {
            status,
            items: Vec::new(),
        }
    }
}

/// Host-provided encrypted key-value store.
///
/// Implementations must be linearizable per `(service, account)` key. The
/// keychain layer adds no locking of its own.
#[cfg_attr(feature = "ffi", uniffi::export(with_foreign))]
pub trait SecureItemStore: Send + Sync {
    /// Inserts a new entry. Returns [`ERR_SEC_DUPLICATE_ITEM`] if the key exists.
    fn add_item(
        &self,
        service: String,
        account: String,
        attributes: HashMap<String, Vec<u8>>,
    ) -> i32;

    /// Replaces the given attributes of an existing entry.
    ///
    /// Returns [`ERR_SEC_ITEM_NOT_FOUND`] if no entry has the key.
    fn update_item(
        &self,
        service: String,
        account: String,
        attributes: HashMap<String, Vec<u8>>,
    ) -> i32;

    /// Removes an entry. Returns [`ERR_SEC_ITEM_NOT_FOUND`] if none existed.
    fn delete_item(&self, service: String, account: String) -> i32;

    /// Returns the attributes of the entry for `(service, account)`.
    fn copy_item(&self, service: String, account: String) -> ItemLookup;

    /// Returns the attributes of every entry under `service`.
    ///
    /// Platforms report an empty match as [`ERR_SEC_ITEM_NOT_FOUND`].
    fn copy_all_items(&self, service: String) -> ItemLookup;
}
