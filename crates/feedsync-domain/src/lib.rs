pub mod decision;
pub mod pagination;
pub mod prefetch;
pub mod state;
pub mod translator;

pub use decision::{should_force_reposition, Evaluation, SyncDecision, SyncDecisionEngine, Trigger};
pub use pagination::{should_load_more, PaginationTrigger};
pub use prefetch::{window_for, PrefetchScheduler};
pub use state::{Effect, FeedContext, Step, SyncEvent, SyncMachine, SyncState};
pub use translator::{build_locator_for_index, resolve, PositionTranslator, Resolution};
