//! Domain error model.

use thiserror::Error;

use crate::amount::Amount;
use crate::id::ItemId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is a deterministic rejection: the operation that produced it
/// had no effect on the ledger. Infrastructure failures (storage, value
/// transfer) are modelled in `bazaar-infra`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Value was attached to an operation that does not accept any.
    #[error("value not accepted (attached {attached})")]
    ValueNotAccepted { attached: Amount },

    /// Attached value is below the item's price.
    #[error("insufficient payment: price {price}, attached {attached}")]
    InsufficientPayment { price: Amount, attached: Amount },

    /// No item exists under the given identifier.
    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    /// The requested transition is not legal from the item's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A read was attempted on a ledger with no items.
    #[error("ledger is empty")]
    EmptyLedger,

    /// The seller attempted to purchase their own item.
    #[error("seller cannot purchase their own item")]
    SelfPurchase,

    /// The caller is not allowed to perform this transition.
    #[error("unauthorized")]
    Unauthorized,

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A value failed validation (e.g. arithmetic overflow).
    #[error("validation failed: {0}")]
    Validation(String),
}

impl DomainError {
    pub fn value_not_accepted(attached: Amount) -> Self {
        Self::ValueNotAccepted { attached }
    }

    pub fn insufficient_payment(price: Amount, attached: Amount) -> Self {
        Self::InsufficientPayment { price, attached }
    }

    pub fn not_found(id: ItemId) -> Self {
        Self::ItemNotFound(id)
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
