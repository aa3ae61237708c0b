//! In-memory secure item store for testing.
//!
//! This implementation is NOT secure for production use. It keeps entries in
//! a process-local map and mirrors the status codes a platform keychain
//! returns, so the keychain layer can be exercised without a device.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};

use super::{
    ItemLookup, SecureItemStore, ERR_SEC_DUPLICATE_ITEM, ERR_SEC_ITEM_NOT_FOUND,
    ERR_SEC_SUCCESS,
};
use crate::keychain::{ACCOUNT_ATTRIBUTE, SERVICE_ATTRIBUTE};

type EntryKey = (String, String);

/// In-memory secure item store backed by a `HashMap`.
///
/// Besides the [`SecureItemStore`] operations it offers hooks for fault
/// injection: raw entries that skip validation, entries the store cannot
/// attribute to an account, and a forced status code for every call.
#[derive(Default)]
pub struct MemoryItemStore {
    entries: RwLock<HashMap<EntryKey, HashMap<String, Vec<u8>>>>,
    orphans: RwLock<HashMap<String, Vec<HashMap<String, Vec<u8>>>>>,
    forced_status: Mutex<Option<i32>>,
}

impl MemoryItemStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries under `service`.
    #[must_use]
    pub fn len(&self, service: &str) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|(entry_service, _)| entry_service == service)
            .count()
    }

    /// Returns `true` if no entries exist under `service`.
    #[must_use]
    pub fn is_empty(&self, service: &str) -> bool {
        self.len(service) == 0
    }

    /// Stores `attributes` verbatim under `(service, account)`, replacing any
    /// existing entry.
    pub fn insert_raw(
        &self,
        service: &str,
        account: &str,
        mut attributes: HashMap<String, Vec<u8>>,
    ) {
        attributes.insert(ACCOUNT_ATTRIBUTE.to_owned(), account.as_bytes().to_vec());
        attributes.insert(SERVICE_ATTRIBUTE.to_owned(), service.as_bytes().to_vec());
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((service.to_owned(), account.to_owned()), attributes);
    }

    /// Adds an entry to bulk results for `service` exactly as given, with no
    /// account attached.
    pub fn insert_orphan(&self, service: &str, attributes: HashMap<String, Vec<u8>>) {
        self.orphans
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(service.to_owned())
            .or_default()
            .push(attributes);
    }

    /// Makes every subsequent call return `status` until cleared with `None`.
    pub fn force_status(&self, status: Option<i32>) {
        *self
            .forced_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = status;
    }

    fn forced(&self) -> Option<i32> {
        *self
            .forced_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl SecureItemStore for MemoryItemStore {
    fn add_item(
        &self,
        service: String,
        account: String,
        attributes: HashMap<String, Vec<u8>>,
    ) -> i32 {
        if let Some(status) = self.forced() {
            return status;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.entry((service, account)) {
            Entry::Occupied(_) => ERR_SEC_DUPLICATE_ITEM,
            Entry::Vacant(slot) => {
                slot.insert(attributes);
                ERR_SEC_SUCCESS
            }
        }
    }

    fn update_item(
        &self,
        service: String,
        account: String,
        attributes: HashMap<String, Vec<u8>>,
    ) -> i32 {
        if let Some(status) = self.forced() {
            return status;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(&(service, account)) {
            Some(existing) => {
                existing.extend(attributes);
                ERR_SEC_SUCCESS
            }
            None => ERR_SEC_ITEM_NOT_FOUND,
        }
    }

    fn delete_item(&self, service: String, account: String) -> i32 {
        if let Some(status) = self.forced() {
            return status;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(&(service, account)).is_some() {
            ERR_SEC_SUCCESS
        } else {
            ERR_SEC_ITEM_NOT_FOUND
        }
    }

    fn copy_item(&self, service: String, account: String) -> ItemLookup {
        if let Some(status) = self.forced() {
            return ItemLookup::failed(status);
        }
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&(service, account)).map_or_else(
            || ItemLookup::failed(ERR_SEC_ITEM_NOT_FOUND),
            |attributes| ItemLookup::found(vec![attributes.clone()]),
        )
    }

    fn copy_all_items(&self, service: String) -> ItemLookup {
        if let Some(status) = self.forced() {
            return ItemLookup::failed(status);
        }
        let mut items: Vec<_> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|((entry_service, _), _)| *entry_service == service)
            .map(|(_, attributes)| attributes.clone())
            .collect();
        if let Some(orphans) = self
            .orphans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&service)
        {
            items.extend(orphans.iter().cloned());
        }
        if items.is_empty() {
            ItemLookup::failed(ERR_SEC_ITEM_NOT_FOUND)
        } else {
            ItemLookup::found(items)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(value: &[u8]) -> HashMap<String, Vec<u8>> {
        HashMap::from([("secret".to_owned(), value.to_vec())])
    }

    #[test]
    fn test_status_codes_follow_platform() {
        let store = MemoryItemStore::new();
        let add = |account: &str| store.add_item("svc".into(), account.into(), attrs(b"a"));
        assert_eq!(add("one"), ERR_SEC_SUCCESS);
        assert_eq!(add("one"), ERR_SEC_DUPLICATE_ITEM);
        assert_eq!(
            store.update_item("svc".into(), "two".into(), attrs(b"b")),
            ERR_SEC_ITEM_NOT_FOUND
        );
        assert_eq!(store.delete_item("svc".into(), "one".into()), ERR_SEC_SUCCESS);
        assert_eq!(store.delete_item("svc".into(), "one".into()), ERR_SEC_ITEM_NOT_FOUND);
        assert_eq!(
            store.copy_all_items("svc".into()).status,
            ERR_SEC_ITEM_NOT_FOUND
        );
    }

    #[test]
    fn test_services_are_isolated() {
        let store = MemoryItemStore::new();
        store.add_item("a".into(), "id".into(), attrs(b"1"));
        store.add_item("b".into(), "id".into(), attrs(b"2"));
        assert_eq!(store.len("a"), 1);
        assert_eq!(store.len("b"), 1);
        let lookup = store.copy_item("b".into(), "id".into());
        assert_eq!(lookup.items[0]["secret"], b"2".to_vec());
    }

    #[test]
    fn test_forced_status_overrides_every_call() {
        let store = MemoryItemStore::new();
        store.force_status(Some(-34018));
        assert_eq!(store.add_item("svc".into(), "id".into(), attrs(b"a")), -34018);
        assert_eq!(store.copy_all_items("svc".into()).status, -34018);
        store.force_status(None);
        assert_eq!(store.add_item("svc".into(), "id".into(), attrs(b"a")), ERR_SEC_SUCCESS);
    }
}
