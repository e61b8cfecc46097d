//! The item ledger: runs every marketplace operation end to end.
//!
//! ```text
//! operation
//!   ↓
//! 1. Load the item snapshot (or start an empty one for List)
//!   ↓
//! 2. Decide events (pure aggregate logic) and check the role policy
//!   ↓
//! 3. Purchase only: collect the attached value into escrow
//!   ↓
//! 4. Commit the new snapshot (optimistic version check)
//!   ↓
//! 5. Purchase only: pay the seller, refund any excess
//!   ↓
//! 6. Publish committed events (best effort)
//! ```
//!
//! Step 4 always happens before step 5. A payout can run recipient code that
//! calls back into the ledger; by then the item is already `Sold`, so a
//! re-entrant purchase is rejected by the ordinary state check.
//!
//! Every operation either completes or leaves the store and all balances
//! exactly as they were. When a payout fails, the journaled transfers are
//! reverted and the pre-purchase snapshot is restored. Once step 4 has
//! happened the operation succeeds: a bus failure in step 6 is logged and
//! never turned into an error.

use chrono::Utc;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use bazaar_core::{
    Address, Aggregate, AggregateRoot, Amount, DomainError, DomainResult, ExpectedVersion,
    ItemId,
};
use bazaar_events::{Event, EventBus, EventEnvelope};
use bazaar_market::{
    AGGREGATE_TYPE, Item, ItemCommand, ItemEvent, ItemRecord, ListItem, PurchaseItem, ReceiveItem,
    ShipItem,
};

use crate::config::LedgerConfig;
use crate::item_store::{ItemStore, StoreError};
use crate::settlement::Settlement;
use crate::value_transfer::{Transfer, TransferError, ValueTransfer};

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Deterministic rejection; nothing changed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The item store failed or a concurrent writer won; nothing changed.
    #[error("item store: {0}")]
    Store(#[from] StoreError),

    /// A value transfer failed; the operation was unwound.
    #[error("value transfer: {0}")]
    Transfer(#[from] TransferError),

    /// A transfer failed and the unwind could not fully restore the prior state.
    #[error("settlement unwind incomplete: {0}")]
    Settlement(String),
}

impl LedgerError {
    /// The domain rejection behind this error, if that is what it is.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            LedgerError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

/// Marketplace escrow ledger over an injected store, bank and event bus.
///
/// - `S`: item registry ([`ItemStore`])
/// - `V`: native value transfer ([`ValueTransfer`])
/// - `B`: event bus receiving one envelope per committed transition
///
/// Caller identity and attached value are explicit parameters on every
/// operation; the ledger trusts them as supplied by the environment.
#[derive(Debug)]
pub struct ItemLedger<S, V, B> {
    store: S,
    bank: V,
    bus: B,
    config: LedgerConfig,
}

impl<S, V, B> ItemLedger<S, V, B> {
    pub fn new(store: S, bank: V, bus: B, config: LedgerConfig) -> Self {
        Self {
            store,
            bank,
            bus,
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// The ledger's own account in the value-transfer system.
    pub fn escrow(&self) -> Address {
        self.config.escrow
    }

}

impl<S, V, B> ItemLedger<S, V, B>
where
    S: ItemStore,
    V: ValueTransfer,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// List a new item for sale. The caller becomes its seller.
    #[instrument(skip_all, fields(caller = %caller, price = %price))]
    pub fn list_item(
        &self,
        name: impl Into<String>,
        price: Amount,
        caller: Address,
        attached: Amount,
    ) -> Result<ItemId, LedgerError> {
        let item_id = ItemId::new(self.store.len()?);
        let item = Item::empty(item_id);
        let command = ItemCommand::ListItem(ListItem {
            item_id,
            name: name.into(),
            price,
            caller,
            attached,
            occurred_at: Utc::now(),
        });

        let events = self.decide(&item, &command)?;
        let listed = item.applied(&events);
        self.store.append(listed)?;

        info!(item_id = %item_id, "item listed");
        self.publish(item_id, item.version(), &events);
        Ok(item_id)
    }

    /// Buy an item. `attached` must cover the price; any excess is refunded.
    #[instrument(skip_all, fields(item_id = %item_id, caller = %caller, attached = %attached))]
    pub fn purchase(
        &self,
        item_id: ItemId,
        caller: Address,
        attached: Amount,
    ) -> Result<(), LedgerError> {
        let item = self.load(item_id)?;
        let command = ItemCommand::PurchaseItem(PurchaseItem {
            item_id,
            caller,
            attached,
            occurred_at: Utc::now(),
        });
        let events = self.decide(&item, &command)?;

        let (price, refund) = events
            .iter()
            .find_map(|e| match e {
                ItemEvent::ItemSold(sold) => Some((sold.price, sold.refund)),
                _ => None,
            })
            .ok_or_else(|| DomainError::conflict("purchase decided without a sale"))?;

        let escrow = self.config.escrow;
        let mut settlement = Settlement::new(&self.bank);

        // Nothing is committed yet; a caller who cannot fund the call is a
        // plain rejection.
        settlement.execute(Transfer::new(caller, escrow, attached))?;

        // Effects before interactions.
        let sold = item.applied(&events);
        if let Err(e) = self.store.save(sold, ExpectedVersion::Exact(item.version())) {
            self.unwind(settlement)?;
            return Err(e.into());
        }

        if let Err(e) = Self::pay_out(&mut settlement, escrow, item.seller(), price, caller, refund) {
            warn!(error = %e, "payout failed; reverting purchase");
            self.revert_purchase(&item, settlement)?;
            return Err(e.into());
        }

        info!(buyer = %caller, price = %price, refund = %refund, "item sold");
        self.publish(item_id, item.version(), &events);
        Ok(())
    }

    /// Mark a sold item as shipped.
    #[instrument(skip_all, fields(item_id = %item_id, caller = %caller))]
    pub fn ship(&self, item_id: ItemId, caller: Address, attached: Amount) -> Result<(), LedgerError> {
        self.transition(ItemCommand::ShipItem(ShipItem {
            item_id,
            caller,
            attached,
            occurred_at: Utc::now(),
        }))
    }

    /// Mark a shipped item as received. Terminal.
    #[instrument(skip_all, fields(item_id = %item_id, caller = %caller))]
    pub fn receive(
        &self,
        item_id: ItemId,
        caller: Address,
        attached: Amount,
    ) -> Result<(), LedgerError> {
        self.transition(ItemCommand::ReceiveItem(ReceiveItem {
            item_id,
            caller,
            attached,
            occurred_at: Utc::now(),
        }))
    }

    pub fn fetch_one(&self, item_id: ItemId) -> Result<ItemRecord, LedgerError> {
        Ok(self.load(item_id)?.record())
    }

    pub fn fetch_last(&self) -> Result<ItemRecord, LedgerError> {
        let item = self.store.last()?.ok_or(DomainError::EmptyLedger)?;
        Ok(item.record())
    }

    /// Number of items ever listed.
    pub fn item_count(&self) -> Result<u64, LedgerError> {
        Ok(self.store.len()?)
    }

    fn load(&self, item_id: ItemId) -> Result<Item, LedgerError> {
        let item = self
            .store
            .load(item_id)?
            .ok_or(DomainError::not_found(item_id))?;
        Ok(item)
    }

    fn decide(&self, item: &Item, command: &ItemCommand) -> Result<Vec<ItemEvent>, LedgerError> {
        let decided = item.handle(command).and_then(|events| {
            self.config.role_policy.authorize(item, command)?;
            self.reject_escrow_caller(command)?;
            Ok(events)
        });

        if let Err(e) = &decided {
            debug!(
                operation = command.operation(),
                item_id = %command.item_id(),
                caller = %command.caller(),
                error = %e,
                "operation rejected"
            );
        }
        Ok(decided?)
    }

    /// The escrow account may neither sell nor buy. During a payout it holds
    /// pooled value, and a purchase made under its identity would spend it.
    fn reject_escrow_caller(&self, command: &ItemCommand) -> DomainResult<()> {
        let moves_value = matches!(
            command,
            ItemCommand::ListItem(_) | ItemCommand::PurchaseItem(_)
        );
        if moves_value && command.caller() == self.config.escrow {
            return Err(DomainError::Unauthorized);
        }
        Ok(())
    }

    /// Ship and receive: no value moves, so commit and publish.
    fn transition(&self, command: ItemCommand) -> Result<(), LedgerError> {
        let item_id = command.item_id();
        let item = self.load(item_id)?;
        let events = self.decide(&item, &command)?;

        let next = item.applied(&events);
        let state = next.state();
        self.store
            .save(next, ExpectedVersion::Exact(item.version()))?;

        info!(operation = command.operation(), state = %state, "item transitioned");
        self.publish(item_id, item.version(), &events);
        Ok(())
    }

    fn pay_out(
        settlement: &mut Settlement<'_, V>,
        escrow: Address,
        seller: Address,
        price: Amount,
        buyer: Address,
        refund: Amount,
    ) -> Result<(), TransferError> {
        settlement.execute(Transfer::new(escrow, seller, price))?;
        settlement.execute(Transfer::new(escrow, buyer, refund))?;
        Ok(())
    }

    /// Put back the pre-purchase snapshot and every balance.
    ///
    /// Anything a re-entrant call did to this item during the failed payout is
    /// discarded along with the purchase.
    fn revert_purchase(&self, before: &Item, settlement: Settlement<'_, V>) -> Result<(), LedgerError> {
        let restored = self.store.save(before.clone(), ExpectedVersion::Any);
        if let Err(e) = &restored {
            error!(item_id = %before.id_typed(), error = %e, "failed to restore item snapshot");
        }
        self.unwind(settlement)?;
        restored.map_err(|e| LedgerError::Settlement(format!("snapshot restore failed: {e}")))
    }

    fn unwind(&self, settlement: Settlement<'_, V>) -> Result<(), LedgerError> {
        settlement
            .unwind()
            .map_err(|e| LedgerError::Settlement(e.to_string()))
    }

    /// Hand committed events to the bus.
    ///
    /// Runs after the commit, so failures are logged and dropped; the store
    /// remains the source of truth for anything the bus missed.
    fn publish(&self, item_id: ItemId, base_version: u64, events: &[ItemEvent]) {
        for (offset, event) in events.iter().enumerate() {
            let sequence_number = base_version + offset as u64 + 1;
            let envelope = match EventEnvelope::from_typed(
                Uuid::now_v7(),
                AGGREGATE_TYPE,
                sequence_number,
                event,
            ) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(
                        item_id = %item_id,
                        sequence_number,
                        error = %e,
                        "event payload serialization failed"
                    );
                    continue;
                }
            };

            if let Err(e) = self.bus.publish(envelope) {
                warn!(
                    item_id = %item_id,
                    sequence_number,
                    event_type = event.event_type(),
                    error = ?e,
                    "event publication failed; operation stays committed"
                );
            }
        }
    }
}
