//! Lifecycle events and their distribution.
//!
//! Domain crates emit typed events; the ledger wraps committed events in
//! envelopes and fans them out over an [`EventBus`].

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
