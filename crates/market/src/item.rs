use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{Address, Aggregate, AggregateRoot, Amount, DomainError, DomainResult, ItemId};
use bazaar_events::Event;

use crate::record::ItemRecord;

/// Aggregate type tag used on published envelopes.
pub const AGGREGATE_TYPE: &str = "market.item";

/// Item lifecycle state.
///
/// Transitions only move forward:
/// `ForSale → Sold → Shipped → Received`. `Received` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    ForSale,
    Sold,
    Shipped,
    Received,
}

impl ItemState {
    pub const ALL: [ItemState; 4] = [
        ItemState::ForSale,
        ItemState::Sold,
        ItemState::Shipped,
        ItemState::Received,
    ];

    /// External integer encoding (0 = for sale ... 3 = received).
    pub fn code(self) -> u8 {
        match self {
            ItemState::ForSale => 0,
            ItemState::Sold => 1,
            ItemState::Shipped => 2,
            ItemState::Received => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ItemState::Received)
    }

    fn as_str(self) -> &'static str {
        match self {
            ItemState::ForSale => "for_sale",
            ItemState::Sold => "sold",
            ItemState::Shipped => "shipped",
            ItemState::Received => "received",
        }
    }
}

impl core::fmt::Display for ItemState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate root: Item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    id: ItemId,
    name: String,
    price: Amount,
    state: ItemState,
    seller: Address,
    buyer: Address,
    version: u64,
    listed: bool,
}

impl Item {
    /// Create an empty, not-yet-listed aggregate instance.
    pub fn empty(id: ItemId) -> Self {
        Self {
            id,
            name: String::new(),
            price: Amount::ZERO,
            state: ItemState::ForSale,
            seller: Address::nil(),
            buyer: Address::nil(),
            version: 0,
            listed: false,
        }
    }

    pub fn id_typed(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Amount {
        self.price
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    pub fn seller(&self) -> Address {
        self.seller
    }

    /// Equal to `seller` until the item is purchased.
    pub fn buyer(&self) -> Address {
        self.buyer
    }

    pub fn is_listed(&self) -> bool {
        self.listed
    }

    pub fn record(&self) -> ItemRecord {
        ItemRecord::from(self)
    }
}

impl AggregateRoot for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: ListItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub item_id: ItemId,
    pub name: String,
    pub price: Amount,
    pub caller: Address,
    pub attached: Amount,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PurchaseItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseItem {
    pub item_id: ItemId,
    pub caller: Address,
    pub attached: Amount,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ShipItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipItem {
    pub item_id: ItemId,
    pub caller: Address,
    pub attached: Amount,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReceiveItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveItem {
    pub item_id: ItemId,
    pub caller: Address,
    pub attached: Amount,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemCommand {
    ListItem(ListItem),
    PurchaseItem(PurchaseItem),
    ShipItem(ShipItem),
    ReceiveItem(ReceiveItem),
}

impl ItemCommand {
    /// Short operation name, used in logs and error messages.
    pub fn operation(&self) -> &'static str {
        match self {
            ItemCommand::ListItem(_) => "list",
            ItemCommand::PurchaseItem(_) => "purchase",
            ItemCommand::ShipItem(_) => "ship",
            ItemCommand::ReceiveItem(_) => "receive",
        }
    }

    pub fn item_id(&self) -> ItemId {
        match self {
            ItemCommand::ListItem(c) => c.item_id,
            ItemCommand::PurchaseItem(c) => c.item_id,
            ItemCommand::ShipItem(c) => c.item_id,
            ItemCommand::ReceiveItem(c) => c.item_id,
        }
    }

    pub fn caller(&self) -> Address {
        match self {
            ItemCommand::ListItem(c) => c.caller,
            ItemCommand::PurchaseItem(c) => c.caller,
            ItemCommand::ShipItem(c) => c.caller,
            ItemCommand::ReceiveItem(c) => c.caller,
        }
    }

    pub fn attached(&self) -> Amount {
        match self {
            ItemCommand::ListItem(c) => c.attached,
            ItemCommand::PurchaseItem(c) => c.attached,
            ItemCommand::ShipItem(c) => c.attached,
            ItemCommand::ReceiveItem(c) => c.attached,
        }
    }
}

/// Event: ItemListed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemListed {
    pub item_id: ItemId,
    pub name: String,
    pub price: Amount,
    pub seller: Address,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemSold.
///
/// `refund` is the excess over `price` returned to the buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSold {
    pub item_id: ItemId,
    pub buyer: Address,
    pub price: Amount,
    pub refund: Amount,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemShipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemShipped {
    pub item_id: ItemId,
    pub shipper: Address,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReceived {
    pub item_id: ItemId,
    pub receiver: Address,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemEvent {
    ItemListed(ItemListed),
    ItemSold(ItemSold),
    ItemShipped(ItemShipped),
    ItemReceived(ItemReceived),
}

impl Event for ItemEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ItemEvent::ItemListed(_) => "market.item.listed",
            ItemEvent::ItemSold(_) => "market.item.sold",
            ItemEvent::ItemShipped(_) => "market.item.shipped",
            ItemEvent::ItemReceived(_) => "market.item.received",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn item_id(&self) -> ItemId {
        match self {
            ItemEvent::ItemListed(e) => e.item_id,
            ItemEvent::ItemSold(e) => e.item_id,
            ItemEvent::ItemShipped(e) => e.item_id,
            ItemEvent::ItemReceived(e) => e.item_id,
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ItemEvent::ItemListed(e) => e.occurred_at,
            ItemEvent::ItemSold(e) => e.occurred_at,
            ItemEvent::ItemShipped(e) => e.occurred_at,
            ItemEvent::ItemReceived(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Item {
    type Command = ItemCommand;
    type Event = ItemEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ItemEvent::ItemListed(e) => {
                self.id = e.item_id;
                self.name = e.name.clone();
                self.price = e.price;
                self.seller = e.seller;
                self.buyer = e.seller;
                self.state = ItemState::ForSale;
                self.listed = true;
            }
            ItemEvent::ItemSold(e) => {
                self.buyer = e.buyer;
                self.state = ItemState::Sold;
            }
            ItemEvent::ItemShipped(_) => {
                self.state = ItemState::Shipped;
            }
            ItemEvent::ItemReceived(_) => {
                self.state = ItemState::Received;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ItemCommand::ListItem(cmd) => self.handle_list(cmd),
            ItemCommand::PurchaseItem(cmd) => self.handle_purchase(cmd),
            ItemCommand::ShipItem(cmd) => self.handle_ship(cmd),
            ItemCommand::ReceiveItem(cmd) => self.handle_receive(cmd),
        }
    }
}

impl Item {
    fn ensure_listed(&self, item_id: ItemId) -> DomainResult<()> {
        if !self.listed || self.id != item_id {
            return Err(DomainError::not_found(item_id));
        }
        Ok(())
    }

    fn ensure_no_value(attached: Amount) -> DomainResult<()> {
        if !attached.is_zero() {
            return Err(DomainError::value_not_accepted(attached));
        }
        Ok(())
    }

    fn ensure_state(&self, required: ItemState, operation: &str) -> DomainResult<()> {
        if self.state != required {
            return Err(DomainError::invalid_state(format!(
                "cannot {operation} item {} in state {}; requires {required}",
                self.id, self.state
            )));
        }
        Ok(())
    }

    fn handle_list(&self, cmd: &ListItem) -> DomainResult<Vec<ItemEvent>> {
        if self.listed {
            return Err(DomainError::conflict(format!("item {} already listed", self.id)));
        }
        if self.id != cmd.item_id {
            return Err(DomainError::conflict("item_id mismatch"));
        }
        Self::ensure_no_value(cmd.attached)?;

        Ok(vec![ItemEvent::ItemListed(ItemListed {
            item_id: cmd.item_id,
            name: cmd.name.clone(),
            price: cmd.price,
            seller: cmd.caller,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_purchase(&self, cmd: &PurchaseItem) -> DomainResult<Vec<ItemEvent>> {
        self.ensure_listed(cmd.item_id)?;
        self.ensure_state(ItemState::ForSale, "purchase")?;

        // buyer == seller is the "unsold" sentinel.
        if cmd.caller == self.seller {
            return Err(DomainError::SelfPurchase);
        }

        let refund = cmd
            .attached
            .checked_sub(self.price)
            .ok_or_else(|| DomainError::insufficient_payment(self.price, cmd.attached))?;

        Ok(vec![ItemEvent::ItemSold(ItemSold {
            item_id: cmd.item_id,
            buyer: cmd.caller,
            price: self.price,
            refund,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_ship(&self, cmd: &ShipItem) -> DomainResult<Vec<ItemEvent>> {
        self.ensure_listed(cmd.item_id)?;
        Self::ensure_no_value(cmd.attached)?;
        self.ensure_state(ItemState::Sold, "ship")?;

        Ok(vec![ItemEvent::ItemShipped(ItemShipped {
            item_id: cmd.item_id,
            shipper: cmd.caller,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_receive(&self, cmd: &ReceiveItem) -> DomainResult<Vec<ItemEvent>> {
        self.ensure_listed(cmd.item_id)?;
        Self::ensure_no_value(cmd.attached)?;
        self.ensure_state(ItemState::Shipped, "receive")?;

        Ok(vec![ItemEvent::ItemReceived(ItemReceived {
            item_id: cmd.item_id,
            receiver: cmd.caller,
            occurred_at: cmd.occurred_at,
        })])
    }
}
