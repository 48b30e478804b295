pub mod controller;
pub mod source;
pub mod view;

pub use controller::{Completion, FeedController, HostEvent, HostUpdate};
pub use source::MemoryItemSource;
pub use view::{ScrollSurface, ViewPositionController};
