//! Event-driven sync state machine.
//!
//! [`SyncMachine::apply`] consumes the current [`SyncState`] together with one
//! [`SyncEvent`] and returns the next state plus the [`Effect`]s the runtime
//! must carry out. No I/O happens here; the runtime owns the view handle, the
//! item source and the background tasks.

use crate::decision::{Evaluation, SyncDecision, SyncDecisionEngine, Trigger};
use crate::pagination::PaginationTrigger;
use crate::prefetch::PrefetchScheduler;
use crate::translator::{build_locator_for_index, PositionTranslator};
use feedsync_core::{FeedConfig, ItemId, Locator, Sequence};
use serde::Serialize;
use std::collections::HashSet;

/// Everything the controller remembers between events for one screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    /// The external locator as last published or received.
    pub locator: Locator,
    /// Index the locator resolved to at the last observation.
    pub last_observed_index: Option<usize>,
    /// Item the user is looking at, tracked by identity.
    pub tracked_item: Option<ItemId>,
    /// Index of the last computed prefetch window.
    pub last_prefetch_index: Option<usize>,
    /// Items a preload was already issued for.
    pub requested: HashSet<ItemId>,
    /// A load-more was issued and has not reported back.
    pub load_in_flight: bool,
    /// The last load failed; pagination waits for an explicit retry.
    pub load_failed: bool,
    /// The host was told the feed is empty.
    pub showing_empty: bool,
}

impl SyncState {
    pub fn new(locator: Locator) -> Self {
        Self {
            locator,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// The host's address changed.
    LocatorChanged(Locator),
    /// A new snapshot is in [`FeedContext::sequence`].
    SequenceChanged,
    /// The user's swipe settled on this index.
    UserNavigated(usize),
    /// A load-more request completed; `error` is set on failure.
    LoadMoreFinished { error: Option<String> },
    /// A preload failed; the item may be requested again later.
    PreloadFailed(ItemId),
    /// The user asked to retry a failed load.
    RetryLoadMore,
}

/// Read-only view of the item source at the moment an event is applied.
#[derive(Debug, Clone, Copy)]
pub struct FeedContext<'a> {
    pub sequence: &'a Sequence,
    pub source_loading: bool,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    /// Tell the host there is nothing to show.
    ShowEmpty,
    /// Content is available again after [`Effect::ShowEmpty`].
    ShowContent,
    /// Move the view to `index` instantly, creating the view if needed.
    JumpTo { index: usize },
    /// The view sits at `index` already; record it without driving the surface.
    SyncView { index: usize },
    /// Rewrite the host address in place (no new history entry).
    ReplaceLocator { locator: Locator },
    /// Push a new host address.
    PushLocator { locator: Locator },
    Prefetch { items: Vec<ItemId> },
    LoadMore,
    ReportLoadFailure { message: String },
}

/// Result of applying one event.
#[derive(Debug, Clone)]
pub struct Step {
    pub state: SyncState,
    pub decision: Option<SyncDecision>,
    pub effects: Vec<Effect>,
    /// Set when a `ByItem` locator referenced an item absent from the snapshot.
    pub missing_item: Option<ItemId>,
    /// Set when the event was dropped, with the reason.
    pub ignored: Option<&'static str>,
}

impl Step {
    fn new(state: SyncState) -> Self {
        Self {
            state,
            decision: None,
            effects: Vec::new(),
            missing_item: None,
            ignored: None,
        }
    }
}

/// The pure rules, configured once per screen.
#[derive(Debug, Clone, Copy)]
pub struct SyncMachine {
    translator: PositionTranslator,
    engine: SyncDecisionEngine,
    prefetch: PrefetchScheduler,
    pagination: PaginationTrigger,
}

impl SyncMachine {
    pub fn new(
        translator: PositionTranslator,
        prefetch: PrefetchScheduler,
        pagination: PaginationTrigger,
    ) -> Self {
        Self {
            translator,
            engine: SyncDecisionEngine::new(),
            prefetch,
            pagination,
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(
            PositionTranslator::new(config.missing_item_policy),
            PrefetchScheduler::new(config.prefetch_radius),
            PaginationTrigger::new(config.load_more_threshold),
        )
    }

    pub fn translator(&self) -> &PositionTranslator {
        &self.translator
    }

    pub fn apply(&self, state: SyncState, event: SyncEvent, ctx: &FeedContext<'_>) -> Step {
        let mut step = Step::new(state);
        match event {
            SyncEvent::LocatorChanged(locator) => {
                step.state.locator = locator;
                self.reconcile(&mut step, Trigger::LocatorChanged, ctx);
            }
            SyncEvent::SequenceChanged => {
                self.reconcile(&mut step, Trigger::SequenceChanged, ctx);
            }
            SyncEvent::UserNavigated(index) => self.navigated(&mut step, index, ctx),
            SyncEvent::LoadMoreFinished { error } => {
                step.state.load_in_flight = false;
                if let Some(message) = error {
                    step.state.load_failed = true;
                    step.effects.push(Effect::ReportLoadFailure { message });
                }
            }
            SyncEvent::PreloadFailed(item_id) => {
                step.state.requested.remove(&item_id);
            }
            SyncEvent::RetryLoadMore => {
                if Self::is_loading(&step.state, ctx) {
                    step.ignored = Some("load already in flight");
                } else if !ctx.has_more {
                    step.ignored = Some("source has no more items");
                } else {
                    step.state.load_failed = false;
                    step.state.load_in_flight = true;
                    step.effects.push(Effect::LoadMore);
                }
            }
        }
        step
    }

    /// Re-resolve the locator and decide whether the view has to move.
    fn reconcile(&self, step: &mut Step, trigger: Trigger, ctx: &FeedContext<'_>) {
        let sequence = ctx.sequence;
        let resolution = self.translator.resolve(
            &step.state.locator,
            sequence,
            step.state.last_observed_index,
        );

        let Some(resolution) = resolution else {
            if !step.state.showing_empty {
                step.state.showing_empty = true;
                step.effects.push(Effect::ShowEmpty);
            }
            return;
        };

        if step.state.showing_empty {
            step.state.showing_empty = false;
            step.effects.push(Effect::ShowContent);
        }
        if resolution.is_fallback() {
            step.missing_item = step.state.locator.item_id().cloned();
        }

        let decision = self.engine.evaluate(&Evaluation {
            trigger,
            target_index: resolution.index(),
            last_observed: step.state.last_observed_index,
            tracked_item: step.state.tracked_item.as_ref(),
            sequence,
        });

        match &decision {
            SyncDecision::NoOp => {}
            SyncDecision::ForceReposition { index } => {
                let index = *index;
                step.state.last_observed_index = Some(index);
                step.state.tracked_item = sequence.get(index).cloned();
                step.effects.push(Effect::JumpTo { index });
                self.prefetch_around(step, index, sequence);
            }
            SyncDecision::SilentRelocate { index, item_id } => {
                let index = *index;
                step.state.last_observed_index = Some(index);
                let locator = Locator::ByItem(item_id.clone());
                if step.state.locator != locator {
                    step.state.locator = locator.clone();
                    step.effects.push(Effect::ReplaceLocator { locator });
                }
                step.effects.push(Effect::SyncView { index });
                self.prefetch_around(step, index, sequence);
            }
        }
        step.decision = Some(decision);
    }

    fn navigated(&self, step: &mut Step, index: usize, ctx: &FeedContext<'_>) {
        let sequence = ctx.sequence;
        if index >= sequence.len() {
            step.ignored = Some("navigation outside the feed");
            return;
        }

        let locator = build_locator_for_index(index, sequence);
        if step.state.locator != locator {
            step.state.locator = locator.clone();
            step.effects.push(Effect::PushLocator { locator });
        }
        step.state.last_observed_index = Some(index);
        step.state.tracked_item = sequence.get(index).cloned();
        step.effects.push(Effect::SyncView { index });

        self.prefetch_around(step, index, sequence);

        if step.state.load_failed {
            return;
        }
        if self.pagination.should_load_more(
            index,
            sequence.len(),
            Self::is_loading(&step.state, ctx),
            ctx.has_more,
        ) {
            step.state.load_in_flight = true;
            step.effects.push(Effect::LoadMore);
        }
    }

    fn prefetch_around(&self, step: &mut Step, index: usize, sequence: &Sequence) {
        let plan = self.prefetch.plan(
            index,
            sequence,
            step.state.last_prefetch_index,
            &step.state.requested,
        );
        let Some(items) = plan else {
            return;
        };
        step.state.last_prefetch_index = Some(index);
        if !items.is_empty() {
            step.state.requested.extend(items.iter().cloned());
            step.effects.push(Effect::Prefetch { items });
        }
    }

    fn is_loading(state: &SyncState, ctx: &FeedContext<'_>) -> bool {
        ctx.source_loading || state.load_in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_core::MissingItemPolicy;

    fn seq(ids: &[&str]) -> Sequence {
        Sequence::from_ids(ids.iter().copied()).unwrap()
    }

    fn machine(radius: usize, threshold: usize) -> SyncMachine {
        SyncMachine::new(
            PositionTranslator::new(MissingItemPolicy::Head),
            PrefetchScheduler::new(radius),
            PaginationTrigger::new(threshold),
        )
    }

    fn ctx(sequence: &Sequence) -> FeedContext<'_> {
        FeedContext {
            sequence,
            source_loading: false,
            has_more: true,
        }
    }

    fn has_jump(step: &Step) -> bool {
        step.effects
            .iter()
            .any(|e| matches!(e, Effect::JumpTo { .. }))
    }

    #[test]
    fn test_first_snapshot_jumps_to_locator() {
        let m = machine(1, 2);
        let s = seq(&["v1", "v2", "v3"]);
        let step = m.apply(
            SyncState::new(Locator::item("v2")),
            SyncEvent::SequenceChanged,
            &ctx(&s),
        );

        assert_eq!(step.decision, Some(SyncDecision::ForceReposition { index: 1 }));
        assert_eq!(step.effects[0], Effect::JumpTo { index: 1 });
        assert_eq!(step.state.last_observed_index, Some(1));
        assert_eq!(step.state.tracked_item, Some(ItemId::from("v2")));
    }

    #[test]
    fn test_empty_feed_shows_empty_once() {
        let m = machine(1, 2);
        let empty = Sequence::empty();
        let step = m.apply(SyncState::default(), SyncEvent::SequenceChanged, &ctx(&empty));
        assert_eq!(step.effects, vec![Effect::ShowEmpty]);
        assert!(step.decision.is_none());

        let step = m.apply(step.state, SyncEvent::SequenceChanged, &ctx(&empty));
        assert!(step.effects.is_empty());

        let s = seq(&["v1"]);
        let step = m.apply(step.state, SyncEvent::SequenceChanged, &ctx(&s));
        assert_eq!(step.effects[0], Effect::ShowContent);
        assert_eq!(step.effects[1], Effect::JumpTo { index: 0 });
    }

    #[test]
    fn test_append_keeps_position() {
        let m = machine(1, 2);
        let s = seq(&["v0", "v1", "v2", "v3"]);
        let step = m.apply(
            SyncState::new(Locator::ByIndex(3)),
            SyncEvent::SequenceChanged,
            &ctx(&s),
        );
        assert_eq!(step.state.last_observed_index, Some(3));

        let grown = seq(&["v0", "v1", "v2", "v3", "v4", "v5"]);
        let step = m.apply(step.state, SyncEvent::SequenceChanged, &ctx(&grown));
        assert_eq!(step.decision, Some(SyncDecision::NoOp));
        assert!(!has_jump(&step));
    }

    #[test]
    fn test_reorder_under_user_relocates_silently() {
        let m = machine(1, 2);
        let s = seq(&["v1", "v2", "v7", "v8"]);
        let step = m.apply(
            SyncState::new(Locator::ByIndex(2)),
            SyncEvent::SequenceChanged,
            &ctx(&s),
        );
        assert_eq!(step.state.tracked_item, Some(ItemId::from("v7")));

        let reranked = seq(&["v1", "v2", "v8", "v3", "v4", "v7"]);
        let step = m.apply(step.state, SyncEvent::SequenceChanged, &ctx(&reranked));
        assert_eq!(
            step.decision,
            Some(SyncDecision::SilentRelocate {
                index: 5,
                item_id: ItemId::from("v7"),
            })
        );
        assert!(!has_jump(&step));
        assert!(step.effects.contains(&Effect::ReplaceLocator {
            locator: Locator::item("v7"),
        }));
        assert!(step.effects.contains(&Effect::SyncView { index: 5 }));
        assert_eq!(step.state.locator, Locator::item("v7"));
        assert_eq!(step.state.last_observed_index, Some(5));
    }

    #[test]
    fn test_user_navigation_pushes_locator_once() {
        let m = machine(1, 1);
        let s = seq(&["v1", "v2", "v3", "v4", "v5"]);
        let step = m.apply(SyncState::default(), SyncEvent::SequenceChanged, &ctx(&s));

        let step = m.apply(step.state, SyncEvent::UserNavigated(1), &ctx(&s));
        assert!(step.effects.contains(&Effect::PushLocator {
            locator: Locator::item("v2"),
        }));

        // Host echoes the pushed address back: nothing happens
        let step = m.apply(
            step.state,
            SyncEvent::LocatorChanged(Locator::item("v2")),
            &ctx(&s),
        );
        assert_eq!(step.decision, Some(SyncDecision::NoOp));
        assert!(step.effects.is_empty());

        // Settling again on the same page publishes nothing new
        let step = m.apply(step.state, SyncEvent::UserNavigated(1), &ctx(&s));
        assert!(!step
            .effects
            .iter()
            .any(|e| matches!(e, Effect::PushLocator { .. } | Effect::Prefetch { .. })));
    }

    #[test]
    fn test_back_navigation_forces_jump() {
        let m = machine(1, 1);
        let s = seq(&["v1", "v2", "v3"]);
        let step = m.apply(
            SyncState::new(Locator::item("v3")),
            SyncEvent::SequenceChanged,
            &ctx(&s),
        );
        let step = m.apply(
            step.state,
            SyncEvent::LocatorChanged(Locator::item("v1")),
            &ctx(&s),
        );
        assert_eq!(step.decision, Some(SyncDecision::ForceReposition { index: 0 }));
        assert!(step.effects.contains(&Effect::JumpTo { index: 0 }));
        assert_eq!(step.state.tracked_item, Some(ItemId::from("v1")));
    }

    #[test]
    fn test_load_more_suppressed_while_in_flight() {
        let m = machine(0, 2);
        let s = seq(&["v1", "v2", "v3"]);
        let step = m.apply(SyncState::default(), SyncEvent::SequenceChanged, &ctx(&s));

        let step = m.apply(step.state, SyncEvent::UserNavigated(1), &ctx(&s));
        assert!(step.effects.contains(&Effect::LoadMore));
        assert!(step.state.load_in_flight);

        let step = m.apply(step.state, SyncEvent::UserNavigated(2), &ctx(&s));
        assert!(!step.effects.contains(&Effect::LoadMore));

        let step = m.apply(
            step.state,
            SyncEvent::LoadMoreFinished { error: None },
            &ctx(&s),
        );
        assert!(!step.state.load_in_flight);
    }

    #[test]
    fn test_load_more_respects_source_loading_flag() {
        let m = machine(0, 2);
        let s = seq(&["v1", "v2", "v3"]);
        let busy = FeedContext {
            sequence: &s,
            source_loading: true,
            has_more: true,
        };
        let step = m.apply(SyncState::default(), SyncEvent::SequenceChanged, &busy);
        let step = m.apply(step.state, SyncEvent::UserNavigated(2), &busy);
        assert!(!step.effects.contains(&Effect::LoadMore));
    }

    #[test]
    fn test_failed_load_reports_and_does_not_retry() {
        let m = machine(0, 2);
        let s = seq(&["v1", "v2", "v3"]);
        let step = m.apply(SyncState::default(), SyncEvent::SequenceChanged, &ctx(&s));
        let step = m.apply(step.state, SyncEvent::UserNavigated(2), &ctx(&s));
        assert!(step.effects.contains(&Effect::LoadMore));

        let step = m.apply(
            step.state,
            SyncEvent::LoadMoreFinished {
                error: Some("offline".to_string()),
            },
            &ctx(&s),
        );
        assert_eq!(
            step.effects,
            vec![Effect::ReportLoadFailure {
                message: "offline".to_string(),
            }]
        );

        // Swiping around the tail does not retry on its own
        let step = m.apply(step.state, SyncEvent::UserNavigated(1), &ctx(&s));
        let step = m.apply(step.state, SyncEvent::UserNavigated(2), &ctx(&s));
        assert!(!step.effects.contains(&Effect::LoadMore));

        let step = m.apply(step.state, SyncEvent::RetryLoadMore, &ctx(&s));
        assert_eq!(step.effects, vec![Effect::LoadMore]);
        assert!(!step.state.load_failed);

        let step = m.apply(step.state, SyncEvent::RetryLoadMore, &ctx(&s));
        assert!(step.effects.is_empty());
        assert_eq!(step.ignored, Some("load already in flight"));
    }

    #[test]
    fn test_prefetch_dedups_and_forgets_failures() {
        let m = machine(1, 1);
        let s = seq(&["v0", "v1", "v2", "v3"]);
        let step = m.apply(SyncState::default(), SyncEvent::SequenceChanged, &ctx(&s));
        assert!(step.effects.contains(&Effect::Prefetch {
            items: vec![ItemId::from("v1")],
        }));

        let step = m.apply(step.state, SyncEvent::UserNavigated(1), &ctx(&s));
        // v1 is the current item and was already requested from index 0
        assert!(step.effects.contains(&Effect::Prefetch {
            items: vec![ItemId::from("v2"), ItemId::from("v0")],
        }));

        let step = m.apply(
            step.state,
            SyncEvent::PreloadFailed(ItemId::from("v2")),
            &ctx(&s),
        );
        assert!(!step.state.requested.contains(&ItemId::from("v2")));

        let step = m.apply(step.state, SyncEvent::UserNavigated(3), &ctx(&s));
        assert!(step.effects.contains(&Effect::Prefetch {
            items: vec![ItemId::from("v2")],
        }));
    }

    #[test]
    fn test_navigation_outside_feed_is_ignored() {
        let m = machine(1, 1);
        let s = seq(&["v1"]);
        let step = m.apply(SyncState::default(), SyncEvent::UserNavigated(4), &ctx(&s));
        assert!(step.effects.is_empty());
        assert!(step.ignored.is_some());
    }

    #[test]
    fn test_missing_item_is_reported() {
        let m = machine(1, 1);
        let s = seq(&["v1", "v2"]);
        let step = m.apply(
            SyncState::new(Locator::item("deleted")),
            SyncEvent::SequenceChanged,
            &ctx(&s),
        );
        assert_eq!(step.missing_item, Some(ItemId::from("deleted")));
        assert_eq!(step.effects[0], Effect::JumpTo { index: 0 });
    }

    #[test]
    fn test_end_to_end_scenario() {
        let m = machine(1, 2);
        let s = seq(&["v1", "v2", "v3"]);

        let step = m.apply(
            SyncState::new(Locator::item("v2")),
            SyncEvent::SequenceChanged,
            &ctx(&s),
        );
        assert_eq!(step.effects[0], Effect::JumpTo { index: 1 });

        let step = m.apply(step.state, SyncEvent::UserNavigated(2), &ctx(&s));
        assert_eq!(step.state.locator, Locator::item("v3"));
        assert!(step.effects.contains(&Effect::LoadMore));

        let grown = seq(&["v1", "v2", "v3", "v4"]);
        let step = m.apply(step.state, SyncEvent::SequenceChanged, &ctx(&grown));
        assert_eq!(step.decision, Some(SyncDecision::NoOp));
        assert!(step.effects.is_empty());
    }
}
