//! Ledger configuration.

use serde::{Deserialize, Serialize};

use bazaar_core::Address;
use bazaar_market::RolePolicy;

/// Settings the embedder supplies when constructing an [`ItemLedger`].
///
/// [`ItemLedger`]: crate::ledger::ItemLedger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// The ledger's own account; holds attached value during a purchase.
    pub escrow: Address,
    /// Caller restrictions for ship/receive.
    pub role_policy: RolePolicy,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            escrow: Address::new(),
            role_policy: RolePolicy::default(),
        }
    }
}

impl LedgerConfig {
    pub fn with_escrow(mut self, escrow: Address) -> Self {
        self.escrow = escrow;
        self
    }

    pub fn with_role_policy(mut self, role_policy: RolePolicy) -> Self {
        self.role_policy = role_policy;
        self
    }
}
