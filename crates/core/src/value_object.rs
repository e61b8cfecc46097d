//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. To
/// "modify" one, build a new value. `Amount` is the ledger's value object;
/// `Item` is an aggregate with identity.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
