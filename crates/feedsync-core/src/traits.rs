use crate::item::{ItemId, Sequence};
use crate::result::FeedResult;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Supplier of the feed's ordered items.
///
/// Implementations own the sequence; the sync layer only reads snapshots and
/// issues commands that may eventually produce a new snapshot.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Synchronous read of the current snapshot.
    fn current_sequence(&self) -> Sequence;

    /// Subscribe to snapshot changes
    /// Returns a broadcast receiver that yields every new `Sequence`
    fn subscribe(&self) -> broadcast::Receiver<Sequence>;

    fn is_loading_more(&self) -> bool;

    fn has_more_items(&self) -> bool;

    /// Request the next page. A successful load publishes a new snapshot.
    async fn load_more(&self) -> FeedResult<()>;

    /// Best-effort warm-up of an item's assets.
    async fn preload(&self, item_id: ItemId) -> FeedResult<()>;
}
