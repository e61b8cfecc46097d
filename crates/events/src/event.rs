use chrono::{DateTime, Utc};

use bazaar_core::ItemId;

/// A committed item lifecycle fact.
///
/// Each event names the item it belongs to, so an envelope can be built from
/// the event alone. Events are emitted only for transitions that were
/// committed; rejected operations produce none.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "market.item.sold").
    fn event_type(&self) -> &'static str;

    /// Payload schema version.
    fn version(&self) -> u32;

    /// The item this event moved.
    fn item_id(&self) -> ItemId;

    fn occurred_at(&self) -> DateTime<Utc>;
}
