use crate::handlers::sequence_from_args;
use crate::output;
use feedsync_core::{FeedConfig, FeedRoute, Locator};
use feedsync_domain::{build_locator_for_index, PositionTranslator};
use serde::Serialize;

#[derive(Serialize)]
pub struct ResolveReport {
    pub route: String,
    pub locator: Locator,
    pub index: Option<usize>,
    pub fallback: bool,
    /// Route rewritten to name the resolved item.
    pub canonical: Option<String>,
}

pub fn handle(config: &FeedConfig, route: &str, items: Vec<String>) -> anyhow::Result<()> {
    let route: FeedRoute = match route.parse() {
        Ok(route) => route,
        Err(e) => return output::output_error(&e.to_string()),
    };
    let sequence = sequence_from_args(items);

    let translator = PositionTranslator::new(config.missing_item_policy);
    let resolution = translator.resolve(&route.locator, &sequence, None);
    tracing::debug!("Resolved {} to {:?}", route, resolution);

    let index = resolution.map(|r| r.index());
    let canonical =
        index.map(|index| route.with_locator(build_locator_for_index(index, &sequence)).path());

    output::output_success(ResolveReport {
        route: route.path(),
        locator: route.locator,
        index,
        fallback: resolution.is_some_and(|r| r.is_fallback()),
        canonical,
    });
    Ok(())
}
