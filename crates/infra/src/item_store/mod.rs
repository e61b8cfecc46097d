//! Append-only item registry boundary.
//!
//! The ledger owns its registry through this abstraction instead of reaching
//! for process-wide state, so every test can run against an isolated store.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryItemStore;
pub use r#trait::{ItemStore, StoreError};
