//! Reposition decisions.
//!
//! Compares a freshly resolved target index with what the controller last
//! observed and with the item the user is actually looking at, and picks
//! exactly one of three outcomes. The outcomes are mutually exclusive so
//! a single external event converges in one pass.

use feedsync_core::{ItemId, Sequence};
use serde::Serialize;

/// What caused an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// The host's address changed (back/forward, deep link, programmatic).
    LocatorChanged,
    /// The item source published a new snapshot.
    SequenceChanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncDecision {
    NoOp,
    /// Move the view to `index` without animation.
    ForceReposition { index: usize },
    /// The viewed item moved inside the list; rewrite the address to follow
    /// it and leave the view alone.
    SilentRelocate { index: usize, item_id: ItemId },
}

/// Inputs to a single evaluation.
#[derive(Debug, Clone, Copy)]
pub struct Evaluation<'a> {
    pub trigger: Trigger,
    pub target_index: usize,
    pub last_observed: Option<usize>,
    pub tracked_item: Option<&'a ItemId>,
    pub sequence: &'a Sequence,
}

/// True on first resolution, or when the address now resolves somewhere else
/// than it did last time.
///
/// The view's current index is not an input here. It is checked at jump time:
/// `ViewPositionController::jump_to` in feedsync-runtime drops a jump to the
/// page the view already shows.
pub fn should_force_reposition(target_index: usize, last_observed: Option<usize>) -> bool {
    last_observed != Some(target_index)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncDecisionEngine;

impl SyncDecisionEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, eval: &Evaluation<'_>) -> SyncDecision {
        if eval.trigger == Trigger::SequenceChanged {
            if let Some(decision) = Self::relocation(eval) {
                return decision;
            }
        }

        if should_force_reposition(eval.target_index, eval.last_observed) {
            SyncDecision::ForceReposition {
                index: eval.target_index,
            }
        } else {
            SyncDecision::NoOp
        }
    }

    fn relocation(eval: &Evaluation<'_>) -> Option<SyncDecision> {
        let item_id = eval.tracked_item?;
        let index = eval.sequence.position(item_id)?;
        (index != eval.target_index).then(|| SyncDecision::SilentRelocate {
            index,
            item_id: item_id.clone(),
        })
    }
}
