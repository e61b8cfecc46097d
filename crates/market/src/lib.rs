//! Marketplace item domain module.
//!
//! This crate contains the item lifecycle rules, implemented purely as
//! deterministic domain logic (no IO, no storage, no value movement).

pub mod item;
pub mod policy;
pub mod record;

pub use item::{
    AGGREGATE_TYPE, Item, ItemCommand, ItemEvent, ItemListed, ItemReceived, ItemShipped, ItemSold,
    ItemState, ListItem, PurchaseItem, ReceiveItem, ShipItem,
};
pub use policy::RolePolicy;
pub use record::ItemRecord;
