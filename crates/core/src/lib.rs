//! `bazaar-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod amount;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use amount::Amount;
pub use error::{DomainError, DomainResult};
pub use id::{Address, ItemId};
pub use value_object::ValueObject;
