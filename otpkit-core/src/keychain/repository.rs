//! Typed CRUD over the tokens of one service.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use super::adapter::{ItemAdapter, ItemListing, StoredItem};
use super::codec;
use super::error::{DecodeError, KeychainError, KeychainResult, StoreError};
use super::platform::{SecureItemStore, ERR_SEC_DUPLICATE_ITEM};
use super::record::PersistentToken;
use crate::config::KeychainConfig;
use crate::token::{Secret, Token};

/// Result of an enumeration that reports entries it could not decode.
#[derive(Debug, Default)]
pub struct TokenEnumeration {
    /// Every entry that decoded successfully.
    pub tokens: HashSet<PersistentToken>,
    /// Identifier and decode failure of every entry that did not.
    pub failures: Vec<(String, DecodeError)>,
    /// Entries the store returned without a readable identifier.
    pub unaddressable: Vec<StoreError>,
}

/// Typed CRUD access to the tokens stored under one service.
///
/// The keychain holds no state besides its binding to the store; every call
/// goes straight through to the platform.
#[derive(Debug, Clone)]
pub struct Keychain {
    adapter: ItemAdapter,
}

impl Keychain {
    /// Opens the keychain described by `config` on top of `store`.
    ///
    /// # Errors
    ///
    /// Returns [`KeychainError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: &KeychainConfig, store: Arc<dyn SecureItemStore>) -> KeychainResult<Self> {
        config.validate()?;
        log::debug!("opening keychain for service {}", config.service);
        Ok(Self {
            adapter: ItemAdapter::new(config.service.clone(), store),
        })
    }

    /// The service namespace this keychain reads and writes.
    #[must_use]
    pub fn service(&self) -> &str {
        self.adapter.service()
    }

    /// Stores a new token under a freshly minted identifier.
    ///
    /// # Errors
    ///
    /// Returns [`KeychainError::ConfigurationEncoding`] if the token has no URL
    /// form, or [`KeychainError::Store`] if the store rejects the entry. An
    /// identifier collision is reported as a duplicate-item system error.
    pub fn add(&self, token: Token, secret: Secret) -> KeychainResult<PersistentToken> {
        let record = PersistentToken::new(Uuid::new_v4().to_string(), token, secret, None);
        let serialized = codec::encode(&record)?;
        match self
            .adapter
            .add(record.identifier(), serialized.into_attributes())
        {
            Ok(()) => {}
            Err(StoreError::DuplicateIdentifier) => {
                return Err(StoreError::System(ERR_SEC_DUPLICATE_ITEM).into())
            }
            Err(err) => return Err(err.into()),
        }
        log::debug!("added token {}", record.identifier());
        Ok(record)
    }

    /// Loads the token stored under `identifier`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`KeychainError::CorruptRecord`] if the entry exists but cannot
    /// be decoded, or [`KeychainError::Store`] if the lookup fails.
    pub fn persistent_token(&self, identifier: &str) -> KeychainResult<Option<PersistentToken>> {
        let Some(attributes) = self.adapter.fetch(identifier)? else {
            return Ok(None);
        };
        codec::decode(&attributes, identifier)
            .map(Some)
            .map_err(|source| KeychainError::CorruptRecord {
                identifier: identifier.to_owned(),
                source,
            })
    }

    /// Loads every decodable token in the service.
    ///
    /// Entries that fail to decode are left out of the result and logged at
    /// `warn`. Use [`Keychain::all_persistent_tokens_reporting`] to see them.
    ///
    /// # Errors
    ///
    /// Returns [`KeychainError::Store`] if the bulk lookup fails.
    pub fn all_persistent_tokens(&self) -> KeychainResult<HashSet<PersistentToken>> {
        let TokenEnumeration {
            tokens,
            failures,
            unaddressable,
        } = self.all_persistent_tokens_reporting()?;
        for (identifier, err) in &failures {
            log::warn!("skipping unreadable token {identifier}: {err}");
        }
        for err in &unaddressable {
            log::warn!("skipping entry without identifier: {err}");
        }
        Ok(tokens)
    }

    /// Loads every token in the service, reporting the entries that fail to
    /// decode next to the ones that succeed.
    ///
    /// # Errors
    ///
    /// Returns [`KeychainError::Store`] if the bulk lookup fails.
    pub fn all_persistent_tokens_reporting(&self) -> KeychainResult<TokenEnumeration> {
        let ItemListing {
            items,
            unaddressable,
        } = self.adapter.fetch_all()?;
        let mut enumeration = TokenEnumeration {
            unaddressable,
            ..TokenEnumeration::default()
        };
        for StoredItem {
            account,
            attributes,
        } in items
        {
            match codec::decode(&attributes, &account) {
                Ok(record) => {
                    enumeration.tokens.insert(record);
                }
                Err(err) => enumeration.failures.push((account, err)),
            }
        }
        Ok(enumeration)
    }

    /// Replaces the token and correlation data of an existing record,
    /// keeping its identifier and secret.
    ///
    /// # Arguments
    ///
    /// * `record` - The record to overwrite. Only its identifier and secret
    ///   are used.
    /// * `token` - The new token configuration.
    /// * `correlation` - The new correlation data; `None` clears it.
    ///
    /// # Returns
    ///
    /// The record as now stored.
    ///
    /// # Errors
    ///
    /// Returns [`KeychainError::Store`] wrapping [`StoreError::NotFound`] if
    /// the record no longer exists, or any encoding or store failure.
    pub fn update(
        &self,
        record: &PersistentToken,
        token: Token,
        correlation: Option<Vec<u8>>,
    ) -> KeychainResult<PersistentToken> {
        let updated = PersistentToken::new(
            record.identifier().to_owned(),
            token,
            record.secret().clone(),
            correlation,
        );
        let serialized = codec::encode(&updated)?;
        self.adapter
            .update(updated.identifier(), serialized.into_attributes())?;
        log::debug!("updated token {}", updated.identifier());
        Ok(updated)
    }

    /// Removes a record. Removing a record that is already gone succeeds.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub fn delete(&self, record: &PersistentToken) -> KeychainResult<()> {
        self.adapter.delete(record.identifier())?;
        log::debug!("deleted token {}", record.identifier());
        Ok(())
    }

    /// Removes every entry in the service, including ones that cannot be
    /// decoded.
    ///
    /// Deletion goes by the raw identifier of each entry, so undecodable
    /// entries are removed too. Entries the store returns without an
    /// identifier cannot be addressed and are skipped with a warning.
    ///
    /// # Returns
    ///
    /// The number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns [`KeychainError::Store`] on the first store failure. Entries
    /// removed before the failure stay removed.
    pub fn delete_all(&self) -> KeychainResult<usize> {
        let ItemListing {
            items,
            unaddressable,
        } = self.adapter.fetch_all()?;
        for item in &items {
            self.adapter.delete(&item.account)?;
        }
        if !unaddressable.is_empty() {
            log::warn!(
                "left {} entries without identifier in {}",
                unaddressable.len(),
                self.service()
            );
        }
        log::debug!("deleted {} tokens from {}", items.len(), self.service());
        Ok(items.len())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::keychain::platform::memory::MemoryItemStore;
    use crate::keychain::platform::{
        ItemAttributes, ItemLookup, ERR_SEC_ITEM_NOT_FOUND, ERR_SEC_SUCCESS,
    };
    use crate::keychain::{METADATA_ATTRIBUTE, SECRET_ATTRIBUTE};
    use crate::token::{Algorithm, Factor, Generator};

    fn keychain() -> (Arc<MemoryItemStore>, Keychain) {
        let store = Arc::new(MemoryItemStore::new());
        let keychain = Keychain::new(&KeychainConfig::new("test.repository"), store.clone())
            .expect("keychain");
        (store, keychain)
    }

    fn token(name: &str) -> Token {
        Token::new(name, "Example", Generator::totp())
    }

    #[test]
    fn test_new_rejects_empty_service() {
        let store = Arc::new(MemoryItemStore::new());
        match Keychain::new(&KeychainConfig::new(""), store) {
            Err(KeychainError::InvalidConfig(_)) => {}
            Err(err) => panic!("unexpected error: {err}"),
            Ok(_) => panic!("expected error"),
        }
    }

    #[test]
    fn test_add_mints_uuid_identifiers() {
        let (_, keychain) = keychain();
        let a = keychain.add(token("a"), Secret::from_slice(b"k")).expect("add");
        let b = keychain.add(token("a"), Secret::from_slice(b"k")).expect("add");
        assert_ne!(a.identifier(), b.identifier());
        let parsed = Uuid::parse_str(a.identifier()).expect("uuid");
        assert_eq!(parsed.get_version_num(), 4);
        assert_eq!(a.correlation(), None);
    }

    #[test]
    fn test_add_propagates_encoding_error_without_writing() {
        let (store, keychain) = keychain();
        let invalid = Token::new(
            "a",
            "b",
            Generator::new(Factor::Timer { period: 0 }, Algorithm::Sha1, 6),
        );
        match keychain.add(invalid, Secret::from_slice(b"k")) {
            Err(KeychainError::ConfigurationEncoding(_)) => {}
            Err(err) => panic!("unexpected error: {err}"),
            Ok(_) => panic!("expected error"),
        }
        assert!(store.is_empty(keychain.service()));
    }

    #[test]
    fn test_persistent_token_reports_corruption() {
        let (store, keychain) = keychain();
        store.insert_raw(
            keychain.service(),
            "broken",
            ItemAttributes::from([(METADATA_ATTRIBUTE.to_owned(), vec![0xa0])]),
        );
        match keychain.persistent_token("broken") {
            Err(KeychainError::CorruptRecord { identifier, source }) => {
                assert_eq!(identifier, "broken");
                assert_eq!(source, DecodeError::MissingSecret);
            }
            Err(err) => panic!("unexpected error: {err}"),
            Ok(_) => panic!("expected error"),
        }
        assert!(keychain.persistent_token("absent").expect("fetch").is_none());
    }

    #[test]
    fn test_update_keeps_identifier_and_secret() {
        let (_, keychain) = keychain();
        let record = keychain.add(token("old"), Secret::from_slice(b"key")).expect("add");
        let updated = keychain
            .update(&record, token("new"), Some(vec![7, 7]))
            .expect("update");
        assert_eq!(updated, record);

        let fetched = keychain
            .persistent_token(record.identifier())
            .expect("fetch")
            .expect("present");
        assert_eq!(fetched.token().name, "new");
        assert_eq!(fetched.secret(), &Secret::from_slice(b"key"));
        assert_eq!(fetched.correlation(), Some(&[7u8, 7][..]));
    }

    #[test]
    fn test_update_after_delete_is_not_found() {
        let (_, keychain) = keychain();
        let record = keychain.add(token("a"), Secret::from_slice(b"k")).expect("add");
        keychain.delete(&record).expect("delete");
        keychain.delete(&record).expect("delete is idempotent");
        match keychain.update(&record, token("b"), None) {
            Err(KeychainError::Store(StoreError::NotFound)) => {}
            Err(err) => panic!("unexpected error: {err}"),
            Ok(_) => panic!("expected error"),
        }
    }

    #[test]
    fn test_store_failures_propagate() {
        let (store, keychain) = keychain();
        store.force_status(Some(-34018));
        let err = keychain.all_persistent_tokens().expect_err("should fail");
        assert_eq!(err.store_error(), Some(&StoreError::System(-34018)));
        let err = keychain
            .add(token("a"), Secret::from_slice(b"k"))
            .expect_err("should fail");
        assert_eq!(err.store_error(), Some(&StoreError::System(-34018)));
    }

    #[test]
    fn test_reporting_enumeration_lists_failures() {
        let (store, keychain) = keychain();
        let good = keychain.add(token("good"), Secret::from_slice(b"k")).expect("add");
        store.insert_raw(
            keychain.service(),
            "no-metadata",
            ItemAttributes::from([(SECRET_ATTRIBUTE.to_owned(), b"k".to_vec())]),
        );

        let enumeration = keychain.all_persistent_tokens_reporting().expect("enumerate");
        assert_eq!(enumeration.tokens, HashSet::from([good.clone()]));
        assert_eq!(
            enumeration.failures,
            vec![("no-metadata".to_owned(), DecodeError::MissingMetadata)]
        );
        assert_eq!(keychain.all_persistent_tokens().expect("enumerate"), HashSet::from([good]));
    }

    /// Store that reports every added identifier as already taken.
    #[derive(Default)]
    struct CollidingStore {
        adds: AtomicUsize,
    }

    impl SecureItemStore for CollidingStore {
        fn add_item(&self, _: String, _: String, _: HashMap<String, Vec<u8>>) -> i32 {
            self.adds.fetch_add(1, Ordering::SeqCst);
            ERR_SEC_DUPLICATE_ITEM
        }
        fn update_item(&self, _: String, _: String, _: HashMap<String, Vec<u8>>) -> i32 {
            ERR_SEC_SUCCESS
        }
        fn delete_item(&self, _: String, _: String) -> i32 {
            ERR_SEC_SUCCESS
        }
        fn copy_item(&self, _: String, _: String) -> ItemLookup {
            ItemLookup::failed(ERR_SEC_ITEM_NOT_FOUND)
        }
        fn copy_all_items(&self, _: String) -> ItemLookup {
            ItemLookup::found(Vec::new())
        }
    }

    #[test]
    fn test_add_identifier_collision_is_fatal() {
        let store = Arc::new(CollidingStore::default());
        let keychain = Keychain::new(&KeychainConfig::new("test.repository"), store.clone())
            .expect("keychain");
        match keychain.add(token("a"), Secret::from_slice(b"k")) {
            Err(KeychainError::Store(StoreError::System(code))) => {
                assert_eq!(code, ERR_SEC_DUPLICATE_ITEM);
            }
            Err(err) => panic!("unexpected error: {err}"),
            Ok(_) => panic!("expected error"),
        }
        assert_eq!(store.adds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_entries_without_identifier_do_not_block_bulk_calls() {
        let (store, keychain) = keychain();
        let good = keychain.add(token("good"), Secret::from_slice(b"k")).expect("add");
        store.insert_orphan(
            keychain.service(),
            ItemAttributes::from([(SECRET_ATTRIBUTE.to_owned(), b"k".to_vec())]),
        );

        assert_eq!(
            keychain.all_persistent_tokens().expect("enumerate"),
            HashSet::from([good.clone()])
        );
        let report = keychain.all_persistent_tokens_reporting().expect("enumerate");
        assert_eq!(report.tokens, HashSet::from([good]));
        assert!(report.failures.is_empty());
        assert_eq!(report.unaddressable.len(), 1);

        assert_eq!(keychain.delete_all().expect("delete_all"), 1);
        assert!(store.is_empty(keychain.service()));
    }
}
