use crate::output;
use anyhow::Context;
use feedsync_core::{FeedConfig, FeedRoute, ItemId, ItemSource};
use feedsync_runtime::{FeedController, HostUpdate, MemoryItemSource, ScrollSurface};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// A scripted session: the starting feed, the pages behind it and what
/// happens to it.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub route: String,
    pub items: Vec<ItemId>,
    #[serde(default)]
    pub pages: Vec<Vec<ItemId>>,
    #[serde(default)]
    pub steps: Vec<Action>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    /// The user swiped to a page.
    Swipe { index: usize },
    /// The address changed from outside (back button, deep link).
    Route { path: String },
    Append { items: Vec<ItemId> },
    Prepend { items: Vec<ItemId> },
    Replace { items: Vec<ItemId> },
    Remove { item: ItemId },
    FailNextLoads { count: usize },
    FailPreload { item: ItemId },
    Retry,
    /// Let background loads and preloads finish.
    Wait,
    Detach,
    Attach,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum SurfaceMove {
    Jump(usize),
    Animate(usize),
}

/// Surface that only remembers how it was driven.
#[derive(Clone, Default)]
struct RecordingSurface {
    moves: Arc<Mutex<Vec<SurfaceMove>>>,
}

impl RecordingSurface {
    fn drain(&self) -> Vec<SurfaceMove> {
        std::mem::take(&mut *self.moves.lock())
    }
}

impl ScrollSurface for RecordingSurface {
    fn jump_to_page(&mut self, index: usize) {
        self.moves.lock().push(SurfaceMove::Jump(index));
    }

    fn animate_to_page(&mut self, index: usize) {
        self.moves.lock().push(SurfaceMove::Animate(index));
    }
}

#[derive(Debug, Serialize)]
pub struct StepReport {
    pub step: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    pub updates: Vec<HostUpdate>,
    pub surface: Vec<SurfaceMove>,
    pub route: String,
    pub index: Option<usize>,
    pub items: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub screen_id: String,
    pub steps: Vec<StepReport>,
    pub route: String,
    pub index: Option<usize>,
    pub items: Vec<ItemId>,
    pub load_calls: usize,
    pub preloaded: Vec<ItemId>,
    pub notices: Vec<String>,
}

struct Session {
    source: Arc<MemoryItemSource>,
    controller: FeedController,
    surface: RecordingSurface,
    route: FeedRoute,
    steps: Vec<StepReport>,
}

impl Session {
    fn record(&mut self, action: Option<Action>, updates: Vec<HostUpdate>, error: Option<String>) {
        for update in &updates {
            if let HostUpdate::Navigate(locator) | HostUpdate::Replace(locator) = update {
                self.route = self.route.with_locator(locator.clone());
            }
        }
        let report = StepReport {
            step: self.steps.len(),
            action,
            updates,
            surface: self.surface.drain(),
            route: self.route.path(),
            index: self.controller.current_index(),
            items: self.controller.sequence().len(),
            error,
        };
        self.steps.push(report);
    }

    async fn perform(&mut self, action: &Action) -> (Vec<HostUpdate>, Option<String>) {
        let mutation = match action {
            Action::Swipe { index } => return (self.controller.on_user_navigated(*index), None),
            Action::Route { path } => {
                return match path.parse::<FeedRoute>() {
                    Ok(route) => {
                        self.route = route.clone();
                        (self.controller.on_locator_changed(route.locator), None)
                    }
                    Err(e) => (Vec::new(), Some(e.to_string())),
                };
            }
            Action::Append { items } => self.source.append(items.clone()).map(|_| ()),
            Action::Prepend { items } => self.source.prepend(items.clone()).map(|_| ()),
            Action::Replace { items } => self.source.replace(items.clone()).map(|_| ()),
            Action::Remove { item } => self.source.remove(item).map(|_| ()),
            Action::FailNextLoads { count } => {
                self.source.fail_next_loads(*count);
                Ok(())
            }
            Action::FailPreload { item } => {
                self.source.fail_preload_of(item.clone());
                Ok(())
            }
            Action::Retry => return (self.controller.retry_load_more(), None),
            Action::Wait => return (self.controller.wait_idle().await, None),
            Action::Detach => {
                self.controller.detach_surface();
                Ok(())
            }
            Action::Attach => {
                self.surface = RecordingSurface::default();
                self.controller
                    .attach_surface(Box::new(self.surface.clone()))
            }
        };

        match mutation {
            Ok(()) => (self.controller.pump(), None),
            Err(e) => {
                tracing::warn!("Step {} failed: {}", self.steps.len(), e);
                (self.controller.pump(), Some(e.to_string()))
            }
        }
    }
}

pub async fn handle(config: FeedConfig, script: &Path) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(script)
        .await
        .with_context(|| format!("Failed to read scenario {}", script.display()))?;
    let scenario: Scenario = match serde_json::from_str(&content) {
        Ok(scenario) => scenario,
        Err(e) => return output::output_error(&format!("Invalid scenario: {}", e)),
    };
    let route: FeedRoute = match scenario.route.parse() {
        Ok(route) => route,
        Err(e) => return output::output_error(&format!("Invalid scenario: {}", e)),
    };

    let source = match MemoryItemSource::new(scenario.items) {
        Ok(source) => Arc::new(
            source
                .with_pages(scenario.pages)
                .with_latency(config.simulated_latency()),
        ),
        Err(e) => return output::output_error(&format!("Invalid scenario: {}", e)),
    };

    let mut controller = FeedController::new(source.clone(), config, route.locator.clone());
    tracing::info!("Replaying {} steps on {}", scenario.steps.len(), route);
    let mounted = controller.start();

    let mut session = Session {
        source,
        controller,
        surface: RecordingSurface::default(),
        route,
        steps: Vec::with_capacity(scenario.steps.len() + 1),
    };
    let attached = session
        .controller
        .attach_surface(Box::new(session.surface.clone()))
        .err()
        .map(|e| e.to_string());
    session.record(None, mounted, attached);

    for action in scenario.steps {
        let (updates, error) = session.perform(&action).await;
        session.record(Some(action), updates, error);
    }

    // Settle outstanding work so the summary reflects it
    let trailing = session.controller.wait_idle().await;
    if !trailing.is_empty() {
        session.record(None, trailing, None);
    }

    let report = ReplayReport {
        screen_id: session.controller.screen_id().to_string(),
        route: session.route.path(),
        index: session.controller.current_index(),
        items: session.source.current_sequence().to_vec(),
        load_calls: session.source.load_calls(),
        preloaded: session.source.preloaded(),
        notices: session
            .controller
            .notices()
            .visible()
            .iter()
            .map(|notice| notice.message.clone())
            .collect(),
        steps: session.steps,
    };
    session.controller.shutdown();
    output::output_success(report);
    Ok(())
}
