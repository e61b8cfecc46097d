//! Infrastructure layer: item storage, value transfer, and the ledger service
//! that ties them to the market domain.

pub mod config;
pub mod item_store;
pub mod ledger;
pub mod settlement;
pub mod value_transfer;


pub use config::LedgerConfig;
pub use item_store::{InMemoryItemStore, ItemStore, StoreError};
pub use ledger::{ItemLedger, LedgerError};
pub use settlement::Settlement;
pub use value_transfer::{InMemoryBank, ReceiveHook, Transfer, TransferError, ValueTransfer};
