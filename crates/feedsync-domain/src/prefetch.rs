//! Neighbour prefetch windows.

use feedsync_core::{ItemId, Sequence};
use std::collections::HashSet;

/// Items within `radius` of `index`, clamped to the snapshot, excluding the
/// item at `index` (the view loads that one itself).
///
/// Ordered nearest first; at equal distance the next item precedes the
/// previous one, since forward swipes are the common case.
pub fn window_for(index: usize, sequence: &Sequence, radius: usize) -> Vec<ItemId> {
    // No neighbour lies further away than the feed is long
    let reach = radius.min(sequence.len());
    let mut window = Vec::with_capacity(reach.saturating_mul(2));
    for distance in 1..=reach {
        if let Some(id) = index.checked_add(distance).and_then(|i| sequence.get(i)) {
            window.push(id.clone());
        }
        if let Some(id) = index.checked_sub(distance).and_then(|i| sequence.get(i)) {
            window.push(id.clone());
        }
    }
    window
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchScheduler {
    radius: usize,
}

impl PrefetchScheduler {
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Items to preload after settling on `index`.
    ///
    /// Returns `None` when a window was already computed for this exact index,
    /// so rebuilds that do not move the user issue nothing. Otherwise returns
    /// the window minus anything in `requested`.
    pub fn plan(
        &self,
        index: usize,
        sequence: &Sequence,
        last_prefetch_index: Option<usize>,
        requested: &HashSet<ItemId>,
    ) -> Option<Vec<ItemId>> {
        if last_prefetch_index == Some(index) {
            return None;
        }
        let fresh = window_for(index, sequence, self.radius)
            .into_iter()
            .filter(|id| !requested.contains(id))
            .collect();
        Some(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten() -> Sequence {
        Sequence::from_ids((0..10).map(|i| format!("v{}", i))).unwrap()
    }

    fn ids(items: &[ItemId]) -> HashSet<&str> {
        items.iter().map(ItemId::as_str).collect()
    }

    #[test]
    fn test_window_at_head() {
        let window = window_for(0, &ten(), 2);
        assert_eq!(ids(&window), HashSet::from(["v1", "v2"]));
    }

    #[test]
    fn test_window_at_tail() {
        let window = window_for(9, &ten(), 2);
        assert_eq!(ids(&window), HashSet::from(["v7", "v8"]));
    }

    #[test]
    fn test_window_in_middle_is_nearest_first() {
        let window = window_for(5, &ten(), 2);
        let order: Vec<&str> = window.iter().map(ItemId::as_str).collect();
        assert_eq!(order, vec!["v6", "v4", "v7", "v3"]);
    }

    #[test]
    fn test_zero_radius_is_empty() {
        assert!(window_for(5, &ten(), 0).is_empty());
    }

    #[test]
    fn test_huge_radius_covers_whole_feed() {
        let s = Sequence::from_ids(["a", "b", "c"]).unwrap();
        let window = window_for(1, &s, usize::MAX);
        let order: Vec<&str> = window.iter().map(ItemId::as_str).collect();
        assert_eq!(order, vec!["c", "a"]);

        let window = window_for(1, &s, usize::MAX / 2 + 1);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_plan_skips_same_index() {
        let scheduler = PrefetchScheduler::new(2);
        let requested = HashSet::new();
        assert!(scheduler.plan(4, &ten(), Some(4), &requested).is_none());
        assert!(scheduler.plan(5, &ten(), Some(4), &requested).is_some());
    }

    #[test]
    fn test_plan_dedups_requested() {
        let scheduler = PrefetchScheduler::new(1);
        let requested = HashSet::from([ItemId::from("v5")]);
        let plan = scheduler.plan(4, &ten(), Some(3), &requested).unwrap();
        assert_eq!(plan, vec![ItemId::from("v3")]);
    }
}
