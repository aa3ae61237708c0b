//! Status-code translation over a [`SecureItemStore`] bound to one service.

use std::fmt;
use std::sync::Arc;

use super::error::StoreError;
use super::platform::{
    ItemAttributes, ItemLookup, SecureItemStore, ERR_SEC_DUPLICATE_ITEM, ERR_SEC_ITEM_NOT_FOUND,
    ERR_SEC_SUCCESS,
};
use super::{ACCOUNT_ATTRIBUTE, SERVICE_ATTRIBUTE};

/// One entry returned by a bulk fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredItem {
    /// The entry's account (the record identifier).
    pub account: String,
    /// Every attribute the store returned for the entry.
    pub attributes: ItemAttributes,
}

/// Result of a bulk fetch.
///
/// Entries the store returns without a usable `account` cannot be addressed
/// by any later call, so they are listed separately instead of failing the
/// whole fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemListing {
    /// Entries with a readable account.
    pub items: Vec<StoredItem>,
    /// Why each remaining entry could not be addressed.
    pub unaddressable: Vec<StoreError>,
}

/// Stateless adapter between attribute maps and platform store calls.
///
/// The adapter only looks at attribute names; it never interprets their
/// contents beyond reading the `account` back out of fetched entries.
#[derive(Clone)]
pub struct ItemAdapter {
    service: String,
    store: Arc<dyn SecureItemStore>,
}

impl fmt::Debug for ItemAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemAdapter")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl ItemAdapter {
    /// Binds `store` to the `service` namespace.
    #[must_use]
    pub fn new(service: impl Into<String>, store: Arc<dyn SecureItemStore>) -> Self {
        Self {
            service: service.into(),
            store,
        }
    }

    /// The namespace every entry of this adapter lives in.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Inserts a new entry for `account`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateIdentifier`] if the entry exists, or
    /// [`StoreError::System`] for any other failure.
    pub fn add(&self, account: &str, attributes: ItemAttributes) -> Result<(), StoreError> {
        let status = self.store.add_item(
            self.service.clone(),
            account.to_owned(),
            self.tagged(account, attributes),
        );
        match status {
            ERR_SEC_SUCCESS => Ok(()),
            ERR_SEC_DUPLICATE_ITEM => Err(StoreError::DuplicateIdentifier),
            code => Err(StoreError::System(code)),
        }
    }

    /// Replaces the attributes of the existing entry for `account`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no entry exists, or
    /// [`StoreError::System`] for any other failure.
    pub fn update(&self, account: &str, attributes: ItemAttributes) -> Result<(), StoreError> {
        let status = self.store.update_item(
            self.service.clone(),
            account.to_owned(),
            self.tagged(account, attributes),
        );
        match status {
            ERR_SEC_SUCCESS => Ok(()),
            ERR_SEC_ITEM_NOT_FOUND => Err(StoreError::NotFound),
            code => Err(StoreError::System(code)),
        }
    }

    /// Makes sure an entry for `account` holds `attributes`.
    ///
    /// Tries `add` first and falls back to `update` when the entry exists. The
    /// two calls are not atomic: if the entry disappears in between, the add is
    /// retried once before the `NotFound` is reported.
    ///
    /// # Arguments
    ///
    /// * `account` - Identifier of the entry to create or overwrite.
    /// * `attributes` - Attributes to store. `account` and `service` are added
    ///   by the adapter.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying calls other than the duplicate
    /// that triggers the fallback.
    pub fn add_or_update(
        &self,
        account: &str,
        attributes: ItemAttributes,
    ) -> Result<(), StoreError> {
        match self.add(account, attributes.clone()) {
            Err(StoreError::DuplicateIdentifier) => {}
            other => return other,
        }
        match self.update(account, attributes.clone()) {
            Err(StoreError::NotFound) => {
                log::debug!("entry {account} vanished between add and update, retrying add");
                self.add(account, attributes)
            }
            other => other,
        }
    }

    /// Removes the entry for `account`. Removing a missing entry succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::System`] for any failure other than "not found".
    pub fn delete(&self, account: &str) -> Result<(), StoreError> {
        match self
            .store
            .delete_item(self.service.clone(), account.to_owned())
        {
            ERR_SEC_SUCCESS | ERR_SEC_ITEM_NOT_FOUND => Ok(()),
            code => Err(StoreError::System(code)),
        }
    }

    /// Looks up the entry for `account`.
    ///
    /// # Returns
    ///
    /// Every attribute the store holds for the entry, including `account`, or
    /// `None` if there is no such entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::System`] if the lookup fails, or
    /// [`StoreError::UnexpectedReturnShape`] if the store answers with anything
    /// other than exactly one entry for `account`.
    pub fn fetch(&self, account: &str) -> Result<Option<ItemAttributes>, StoreError> {
        let ItemLookup { status, items } = self
            .store
            .copy_item(self.service.clone(), account.to_owned());
        match status {
            ERR_SEC_SUCCESS => {}
            ERR_SEC_ITEM_NOT_FOUND => return Ok(None),
            code => return Err(StoreError::System(code)),
        }

        let mut items = items.into_iter();
        let item = match (items.next(), items.next()) {
            (Some(item), None) => item,
            (None, _) => {
                return Err(StoreError::UnexpectedReturnShape(
                    "lookup succeeded without returning an entry".to_owned(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(StoreError::UnexpectedReturnShape(
                    "lookup returned more than one entry".to_owned(),
                ))
            }
        };
        if item.contains_key(ACCOUNT_ATTRIBUTE) && account_of(&item)? != account {
            return Err(StoreError::UnexpectedReturnShape(
                "lookup returned an entry for a different account".to_owned(),
            ));
        }
        Ok(Some(item))
    }

    /// Returns every entry in the service.
    ///
    /// An empty service yields an empty listing. Entries without a readable
    /// `account` go to [`ItemListing::unaddressable`] and do not affect the
    /// others.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::System`] if the lookup itself fails.
    pub fn fetch_all(&self) -> Result<ItemListing, StoreError> {
        let ItemLookup { status, items } = self.store.copy_all_items(self.service.clone());
        match status {
            ERR_SEC_SUCCESS => {}
            ERR_SEC_ITEM_NOT_FOUND => return Ok(ItemListing::default()),
            code => return Err(StoreError::System(code)),
        }

        let mut listing = ItemListing::default();
        for attributes in items {
            match account_of(&attributes) {
                Ok(account) => listing.items.push(StoredItem {
                    account,
                    attributes,
                }),
                Err(err) => listing.unaddressable.push(err),
            }
        }
        Ok(listing)
    }

    /// Adds the `account` and `service` attributes every stored entry carries.
    fn tagged(&self, account: &str, mut attributes: ItemAttributes) -> ItemAttributes {
        attributes.insert(ACCOUNT_ATTRIBUTE.to_owned(), account.as_bytes().to_vec());
        attributes.insert(SERVICE_ATTRIBUTE.to_owned(), self.service.as_bytes().to_vec());
        attributes
    }
}

fn account_of(attributes: &ItemAttributes) -> Result<String, StoreError> {
    let bytes = attributes.get(ACCOUNT_ATTRIBUTE).ok_or_else(|| {
        StoreError::UnexpectedReturnShape("entry has no account attribute".to_owned())
    })?;
    String::from_utf8(bytes.clone()).map_err(|_| {
        StoreError::UnexpectedReturnShape("entry account is not valid UTF-8".to_owned())
    })
}
