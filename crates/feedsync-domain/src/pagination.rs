//! Load-more trigger.
//!
//! Decides when the feed is close enough to its tail that the next page
//! should be requested. Safe to evaluate on every page change: a request
//! already in flight suppresses another one.

/// `true` iff nothing is loading, the source has more, and `index` is within
/// `threshold` of the end (`index >= len - threshold`).
pub fn should_load_more(
    index: usize,
    sequence_len: usize,
    threshold: usize,
    is_already_loading: bool,
    has_more: bool,
) -> bool {
    !is_already_loading && has_more && index.saturating_add(threshold) >= sequence_len
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationTrigger {
    threshold: usize,
}

impl PaginationTrigger {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn should_load_more(
        &self,
        index: usize,
        sequence_len: usize,
        is_already_loading: bool,
        has_more: bool,
    ) -> bool {
        should_load_more(
            index,
            sequence_len,
            self.threshold,
            is_already_loading,
            has_more,
        )
    }
}
