use crate::handlers::sequence_from_args;
use crate::output;
use feedsync_core::{FeedConfig, ItemId};
use feedsync_domain::window_for;
use serde::Serialize;

#[derive(Serialize)]
pub struct WindowReport {
    pub index: usize,
    pub radius: usize,
    pub items: Vec<ItemId>,
    pub count: usize,
}

pub fn handle(config: &FeedConfig, index: usize, items: Vec<String>) -> anyhow::Result<()> {
    let sequence = sequence_from_args(items);
    if index >= sequence.len() {
        return output::output_error(&format!(
            "Index {} is outside a feed of {} items",
            index,
            sequence.len()
        ));
    }

    let window = window_for(index, &sequence, config.prefetch_radius);
    output::output_success(WindowReport {
        index,
        radius: config.prefetch_radius,
        count: window.len(),
        items: window,
    });
    Ok(())
}
