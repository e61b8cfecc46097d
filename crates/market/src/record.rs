//! External shape of an item as seen by callers.

use serde::{Deserialize, Serialize};

use bazaar_core::{Address, Amount, ItemId};

use crate::item::{Item, ItemState};

/// Read-only projection of an [`Item`] returned by the ledger's accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub name: String,
    pub id: ItemId,
    pub price: Amount,
    pub state: ItemState,
    pub seller: Address,
    pub buyer: Address,
}

impl ItemRecord {
    /// Ordered tuple `(name, id, price, state, seller, buyer)` with the state
    /// encoded as its integer code.
    pub fn into_tuple(self) -> (String, u64, u64, u8, Address, Address) {
        (
            self.name,
            self.id.get(),
            self.price.units(),
            self.state.code(),
            self.seller,
            self.buyer,
        )
    }
}

impl From<&Item> for ItemRecord {
    fn from(item: &Item) -> Self {
        Self {
            name: item.name().to_string(),
            id: item.id_typed(),
            price: item.price(),
            state: item.state(),
            seller: item.seller(),
            buyer: item.buyer(),
        }
    }
}
