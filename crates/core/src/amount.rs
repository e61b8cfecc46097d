//! Native value amounts.

use serde::{Deserialize, Serialize};

use crate::value_object::ValueObject;

/// Non-negative amount in the ledger's native value unit.
///
/// Arithmetic is checked; the ledger never wraps or saturates balances.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl ValueObject for Amount {}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    pub const fn units(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn checked_sub_refuses_to_go_negative() {
        assert_eq!(Amount::new(1).checked_sub(Amount::new(2)), None);
        assert_eq!(Amount::new(5).checked_sub(Amount::new(2)), Some(Amount::new(3)));
    }

    #[test]
    fn checked_add_detects_overflow() {
        assert_eq!(Amount::new(u64::MAX).checked_add(Amount::new(1)), None);
    }

    proptest! {
        #[test]
        fn add_then_sub_is_identity(a in 0u64..u64::MAX / 2, b in 0u64..u64::MAX / 2) {
            let sum = Amount::new(a).checked_add(Amount::new(b)).unwrap();
            prop_assert_eq!(sum.checked_sub(Amount::new(b)), Some(Amount::new(a)));
        }
    }
}
