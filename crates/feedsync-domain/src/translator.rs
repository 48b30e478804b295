//! Locator to index resolution.
//!
//! Pure functions over a single [`Sequence`] snapshot: no I/O, same answer
//! for the same inputs.

use feedsync_core::{Locator, MissingItemPolicy, Sequence};

/// Outcome of resolving a locator against a non-empty snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The locator pointed at something present in the snapshot.
    Found(usize),
    /// The referenced item is gone; the missing-item policy picked an index.
    Fallback(usize),
}

impl Resolution {
    pub fn index(self) -> usize {
        match self {
            Self::Found(index) | Self::Fallback(index) => index,
        }
    }

    pub fn is_fallback(self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PositionTranslator {
    policy: MissingItemPolicy,
}

impl PositionTranslator {
    pub fn new(policy: MissingItemPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MissingItemPolicy {
        self.policy
    }

    /// Resolve `locator` against `sequence`.
    ///
    /// `last_observed` is only consulted by [`MissingItemPolicy::KeepPosition`]
    /// when a `ByItem` locator no longer matches anything. Returns `None` for
    /// an empty snapshot.
    pub fn resolve(
        &self,
        locator: &Locator,
        sequence: &Sequence,
        last_observed: Option<usize>,
    ) -> Option<Resolution> {
        let last = sequence.last_index()?;
        let resolution = match locator {
            Locator::ByItem(id) => match sequence.position(id) {
                Some(index) => Resolution::Found(index),
                None => Resolution::Fallback(self.fallback_index(last, last_observed)),
            },
            Locator::ByIndex(index) => Resolution::Found((*index).min(last)),
            Locator::Head => Resolution::Found(0),
        };
        Some(resolution)
    }

    fn fallback_index(&self, last: usize, last_observed: Option<usize>) -> usize {
        match (self.policy, last_observed) {
            (MissingItemPolicy::KeepPosition, Some(index)) => index.min(last),
            _ => 0,
        }
    }
}

/// Resolve with the default head-fallback policy and no history.
pub fn resolve(locator: &Locator, sequence: &Sequence) -> Option<usize> {
    PositionTranslator::default()
        .resolve(locator, sequence, None)
        .map(Resolution::index)
}

/// Locator to publish after the user lands on `index`.
///
/// Prefers the stable `ByItem` form; an index outside the snapshot can only be
/// expressed as `ByIndex`.
pub fn build_locator_for_index(index: usize, sequence: &Sequence) -> Locator {
    match sequence.get(index) {
        Some(id) => Locator::ByItem(id.clone()),
        None => Locator::ByIndex(index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_core::ItemId;

    fn seq(ids: &[&str]) -> Sequence {
        Sequence::from_ids(ids.iter().copied()).unwrap()
    }

    #[test]
    fn test_empty_sequence_is_undefined() {
        let empty = Sequence::empty();
        assert_eq!(resolve(&Locator::Head, &empty), None);
        assert_eq!(resolve(&Locator::ByIndex(3), &empty), None);
        assert_eq!(resolve(&Locator::item("v1"), &empty), None);
    }

    #[test]
    fn test_by_item() {
        let s = seq(&["v1", "v2", "v3"]);
        assert_eq!(resolve(&Locator::item("v3"), &s), Some(2));
    }

    #[test]
    fn test_missing_item_falls_back_to_head() {
        let s = seq(&["v1", "v2", "v3"]);
        assert_eq!(resolve(&Locator::item("missing"), &s), Some(0));

        let resolution = PositionTranslator::default()
            .resolve(&Locator::item("missing"), &s, Some(2))
            .unwrap();
        assert_eq!(resolution, Resolution::Fallback(0));
    }

    #[test]
    fn test_by_index_clamps() {
        let s = seq(&["v1", "v2", "v3"]);
        assert_eq!(resolve(&Locator::ByIndex(1), &s), Some(1));
        assert_eq!(resolve(&Locator::ByIndex(42), &s), Some(2));
    }

    #[test]
    fn test_head_is_zero() {
        let s = seq(&["v1", "v2"]);
        assert_eq!(resolve(&Locator::Head, &s), Some(0));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let s = seq(&["a", "b", "c", "d"]);
        let locators = [
            Locator::Head,
            Locator::ByIndex(2),
            Locator::ByIndex(100),
            Locator::item("c"),
            Locator::item("gone"),
        ];
        for locator in &locators {
            assert_eq!(resolve(locator, &s), resolve(locator, &s));
        }
    }

    #[test]
    fn test_keep_position_policy() {
        let translator = PositionTranslator::new(MissingItemPolicy::KeepPosition);
        let s = seq(&["v1", "v2", "v3"]);

        let resolution = translator
            .resolve(&Locator::item("gone"), &s, Some(1))
            .unwrap();
        assert_eq!(resolution, Resolution::Fallback(1));

        // Clamped to the shrunken feed
        let resolution = translator
            .resolve(&Locator::item("gone"), &s, Some(10))
            .unwrap();
        assert_eq!(resolution.index(), 2);

        // Nothing observed yet
        let resolution = translator.resolve(&Locator::item("gone"), &s, None).unwrap();
        assert_eq!(resolution.index(), 0);
    }

    #[test]
    fn test_build_locator_prefers_item() {
        let s = seq(&["v1", "v2", "v3"]);
        assert_eq!(
            build_locator_for_index(2, &s),
            Locator::ByItem(ItemId::from("v3"))
        );
        assert_eq!(build_locator_for_index(7, &s), Locator::ByIndex(7));
    }
}
