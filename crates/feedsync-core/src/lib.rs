pub mod config;
pub mod error;
pub mod item;
pub mod locator;
pub mod notice;
pub mod result;
pub mod traits;

pub use config::{FeedConfig, MissingItemPolicy};
pub use error::FeedError;
pub use item::{ItemId, Sequence};
pub use locator::{FeedRoute, Locator};
pub use notice::{Notice, NoticeBoard};
pub use result::FeedResult;
pub use traits::ItemSource;
