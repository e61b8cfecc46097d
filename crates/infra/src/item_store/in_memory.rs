use std::sync::RwLock;

use bazaar_core::{AggregateRoot, ExpectedVersion, ItemId};
use bazaar_market::Item;

use super::r#trait::{ItemStore, StoreError};

/// In-memory append-only item store.
///
/// Intended for tests and embedding. Items live for the lifetime of the store.
#[derive(Debug, Default)]
pub struct InMemoryItemStore {
    items: RwLock<Vec<Item>>,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ItemStore for InMemoryItemStore {
    fn len(&self) -> Result<u64, StoreError> {
        let items = self.items.read().map_err(|_| StoreError::Poisoned)?;
        Ok(items.len() as u64)
    }

    fn append(&self, item: Item) -> Result<ItemId, StoreError> {
        if !item.is_listed() {
            return Err(StoreError::InvalidAppend(format!(
                "item {} has not been listed",
                item.id_typed()
            )));
        }

        let mut items = self.items.write().map_err(|_| StoreError::Poisoned)?;

        let next = items.len() as u64;
        let id = item.id_typed();
        if id.get() != next {
            return Err(StoreError::Concurrency(format!(
                "expected next id {next}, found {id}"
            )));
        }

        items.push(item);
        Ok(id)
    }

    fn load(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let items = self.items.read().map_err(|_| StoreError::Poisoned)?;
        Ok(id.index().and_then(|i| items.get(i)).cloned())
    }

    fn save(&self, item: Item, expected_version: ExpectedVersion) -> Result<(), StoreError> {
        let mut items = self.items.write().map_err(|_| StoreError::Poisoned)?;

        let id = item.id_typed();
        let slot = id
            .index()
            .and_then(|i| items.get_mut(i))
            .ok_or(StoreError::NotFound(id))?;

        let current = slot.version();
        if !expected_version.matches(current) {
            return Err(StoreError::Concurrency(format!(
                "item {id}: expected {expected_version:?}, found {current}"
            )));
        }

        *slot = item;
        Ok(())
    }

    fn last(&self) -> Result<Option<Item>, StoreError> {
        let items = self.items.read().map_err(|_| StoreError::Poisoned)?;
        Ok(items.last().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::{Address, Aggregate, Amount};
    use bazaar_market::{ItemCommand, ListItem, PurchaseItem};
    use chrono::Utc;

    fn listed(id: u64) -> Item {
        let id = ItemId::new(id);
        let item = Item::empty(id);
        let events = item
            .handle(&ItemCommand::ListItem(ListItem {
                item_id: id,
                name: format!("item-{id}"),
                price: Amount::new(5),
                caller: Address::new(),
                attached: Amount::ZERO,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        item.applied(&events)
    }

    fn sold(item: &Item) -> Item {
        let events = item
            .handle(&ItemCommand::PurchaseItem(PurchaseItem {
                item_id: item.id_typed(),
                caller: Address::new(),
                attached: Amount::new(5),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        item.applied(&events)
    }

    #[test]
    fn append_assigns_dense_ids() {
        let store = InMemoryItemStore::new();
        assert!(store.is_empty().unwrap());

        assert_eq!(store.append(listed(0)).unwrap(), ItemId::new(0));
        assert_eq!(store.append(listed(1)).unwrap(), ItemId::new(1));
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.last().unwrap().unwrap().id_typed(), ItemId::new(1));
    }

    #[test]
    fn append_out_of_sequence_is_a_concurrency_error() {
        let store = InMemoryItemStore::new();
        store.append(listed(0)).unwrap();

        let err = store.append(listed(0)).unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn append_rejects_unlisted_items() {
        let store = InMemoryItemStore::new();
        let err = store.append(Item::empty(ItemId::new(0))).unwrap_err();
        assert!(matches!(err, StoreError::InvalidAppend(_)));
    }

    #[test]
    fn save_checks_expected_version() {
        let store = InMemoryItemStore::new();
        let item = listed(0);
        store.append(item.clone()).unwrap();

        let err = store.save(sold(&item), ExpectedVersion::Exact(7)).unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));

        store.save(sold(&item), ExpectedVersion::Exact(1)).unwrap();
        assert_eq!(store.load(ItemId::new(0)).unwrap().unwrap().version(), 2);
    }

    #[test]
    fn save_any_restores_an_older_snapshot() {
        let store = InMemoryItemStore::new();
        let item = listed(0);
        store.append(item.clone()).unwrap();
        store.save(sold(&item), ExpectedVersion::Exact(1)).unwrap();

        store.save(item.clone(), ExpectedVersion::Any).unwrap();
        assert_eq!(store.load(ItemId::new(0)).unwrap(), Some(item));
    }

    #[test]
    fn unknown_items_load_as_none_and_cannot_be_saved() {
        let store = InMemoryItemStore::new();
        assert_eq!(store.load(ItemId::new(3)).unwrap(), None);
        assert_eq!(store.last().unwrap(), None);

        let err = store.save(listed(3), ExpectedVersion::Any).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == ItemId::new(3)));
    }

    #[test]
    fn ids_beyond_the_address_space_are_unknown() {
        let store = InMemoryItemStore::new();
        store.append(listed(0)).unwrap();

        let far = ItemId::new(u64::MAX);
        assert_eq!(store.load(far).unwrap(), None);
        assert_eq!(store.load(ItemId::new(1 << 32)).unwrap(), None);
        let first = store.load(ItemId::new(0)).unwrap().map(|i| i.id_typed());
        assert_eq!(first, Some(ItemId::new(0)));
    }
}
