use crate::item::ItemId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed has no items")]
    EmptySequence,

    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("Duplicate item in sequence: {0}")]
    DuplicateItem(ItemId),

    #[error("Prefetch of {item_id} failed: {reason}")]
    PrefetchFailure { item_id: ItemId, reason: String },

    #[error("Could not load more items: {0}")]
    PaginationFailure(String),

    #[error("View controller is not attached to a surface")]
    ViewDetached,

    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl FeedError {
    /// Whether this error should ever reach the user.
    ///
    /// Only pagination failures are shown; everything else is absorbed by the
    /// sync layer and logged.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Self::PaginationFailure(_))
    }
}
