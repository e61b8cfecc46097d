//! Who may drive the fulfillment half of the lifecycle.

use serde::{Deserialize, Serialize};

use bazaar_core::{DomainError, DomainResult};

use crate::item::{Item, ItemCommand};

/// Caller restrictions for Ship and Receive.
///
/// List and Purchase are open to any caller under every policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolePolicy {
    /// Any caller may ship or receive once the item is in the right state.
    #[default]
    Permissive,
    /// Only the seller may ship and only the buyer may receive.
    Participants,
}

impl RolePolicy {
    /// Check `command` against `item` as it was before the command.
    pub fn authorize(self, item: &Item, command: &ItemCommand) -> DomainResult<()> {
        if self == RolePolicy::Permissive {
            return Ok(());
        }

        let allowed = match command {
            ItemCommand::ShipItem(cmd) => cmd.caller == item.seller(),
            ItemCommand::ReceiveItem(cmd) => cmd.caller == item.buyer(),
            ItemCommand::ListItem(_) | ItemCommand::PurchaseItem(_) => true,
        };

        if allowed {
            Ok(())
        } else {
            Err(DomainError::Unauthorized)
        }
    }
}
