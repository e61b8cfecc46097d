//! Native value-transfer capability.
//!
//! The ledger never touches balances directly. It moves value through an
//! injected [`ValueTransfer`], which stands in for the execution environment's
//! transfer primitive.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryBank;
pub use r#trait::{ReceiveHook, Transfer, TransferError, ValueTransfer};
