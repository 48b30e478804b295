use crate::view::{ScrollSurface, ViewPositionController};
use feedsync_core::{
    FeedConfig, FeedError, FeedResult, ItemId, ItemSource, Locator, Notice, NoticeBoard, Sequence,
};
use feedsync_domain::{Effect, FeedContext, SyncDecision, SyncEvent, SyncMachine, SyncState};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinError, JoinSet};
use uuid::Uuid;

/// What the host has to do in response to an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "update", content = "value", rename_all = "snake_case")]
pub enum HostUpdate {
    /// Push a new address (new history entry).
    Navigate(Locator),
    /// Rewrite the current address in place.
    Replace(Locator),
    ShowEmpty,
    ShowContent,
    Notice(Notice),
}

/// Inputs the host feeds into [`FeedController::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    LocatorChanged(Locator),
    UserNavigated(usize),
    RetryLoadMore,
    DismissNotice(Uuid),
    Shutdown,
}

/// Message a background task sends back when it finishes.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    LoadMore(Result<(), String>),
    Preload {
        item_id: ItemId,
        error: Option<String>,
    },
}

/// Coordinates one screen's locator, view and feed.
///
/// All state transitions go through `&mut self`, so they are serialized.
/// Loads and preloads run as tokio tasks that never touch the sync state;
/// they report a [`Completion`] which is applied like any other event.
/// After [`shutdown`](Self::shutdown) late completions are dropped.
///
/// Must be used from within a tokio runtime.
pub struct FeedController {
    screen_id: Uuid,
    source: Arc<dyn ItemSource>,
    config: FeedConfig,
    machine: SyncMachine,
    state: SyncState,
    sequence: Sequence,
    view: Option<ViewPositionController>,
    notices: NoticeBoard,
    alive: Arc<AtomicBool>,
    tasks: JoinSet<()>,
    snapshots: broadcast::Receiver<Sequence>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
}

impl FeedController {
    /// Create a controller for a freshly mounted screen. Nothing is resolved
    /// until [`start`](Self::start).
    pub fn new(source: Arc<dyn ItemSource>, config: FeedConfig, locator: Locator) -> Self {
        let machine = SyncMachine::from_config(&config);
        Self::with_machine(source, config, machine, locator)
    }

    /// Like [`new`](Self::new) with explicitly built sync components.
    pub fn with_machine(
        source: Arc<dyn ItemSource>,
        config: FeedConfig,
        machine: SyncMachine,
        locator: Locator,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let snapshots = source.subscribe();
        let screen_id = Uuid::new_v4();
        tracing::info!(%screen_id, %locator, "Mounted feed controller");

        Self {
            screen_id,
            machine,
            source,
            config,
            state: SyncState::new(locator),
            sequence: Sequence::empty(),
            view: None,
            notices: NoticeBoard::new(),
            alive: Arc::new(AtomicBool::new(true)),
            tasks: JoinSet::new(),
            snapshots,
            completion_tx,
            completion_rx,
        }
    }

    /// Resolve the initial locator against the source's current snapshot.
    pub fn start(&mut self) -> Vec<HostUpdate> {
        let sequence = self.source.current_sequence();
        self.on_sequence_changed(sequence)
    }

    pub fn screen_id(&self) -> Uuid {
        self.screen_id
    }

    pub fn current_locator(&self) -> &Locator {
        &self.state.locator
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    /// Index of the attached view, `None` before a view exists or is attached.
    pub fn current_index(&self) -> Option<usize> {
        self.view.as_ref().and_then(ViewPositionController::current_index)
    }

    pub fn view(&self) -> Option<&ViewPositionController> {
        self.view.as_ref()
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Attach the host's page surface. Fails while there is no content to
    /// show, since the view only exists once an index has been resolved.
    pub fn attach_surface(&mut self, surface: Box<dyn ScrollSurface>) -> FeedResult<()> {
        match self.view.as_mut() {
            Some(view) => {
                view.attach(surface);
                Ok(())
            }
            None => Err(FeedError::EmptySequence),
        }
    }

    pub fn detach_surface(&mut self) -> Option<Box<dyn ScrollSurface>> {
        self.view.as_mut().and_then(ViewPositionController::detach)
    }

    pub fn on_locator_changed(&mut self, locator: Locator) -> Vec<HostUpdate> {
        self.dispatch(SyncEvent::LocatorChanged(locator))
    }

    pub fn on_user_navigated(&mut self, index: usize) -> Vec<HostUpdate> {
        self.dispatch(SyncEvent::UserNavigated(index))
    }

    pub fn on_sequence_changed(&mut self, sequence: Sequence) -> Vec<HostUpdate> {
        if !self.is_alive() {
            return Vec::new();
        }
        self.sequence = sequence;
        self.dispatch(SyncEvent::SequenceChanged)
    }

    /// Explicit user retry after a failed load.
    pub fn retry_load_more(&mut self) -> Vec<HostUpdate> {
        self.dispatch(SyncEvent::RetryLoadMore)
    }

    pub fn dismiss_notice(&mut self, id: Uuid) -> bool {
        self.notices.dismiss(id)
    }

    pub fn on_completion(&mut self, completion: Completion) -> Vec<HostUpdate> {
        match completion {
            Completion::LoadMore(Ok(())) => {
                tracing::debug!(screen_id = %self.screen_id, "Load more finished");
                self.dispatch(SyncEvent::LoadMoreFinished { error: None })
            }
            Completion::LoadMore(Err(message)) => {
                tracing::warn!(screen_id = %self.screen_id, "Load more failed: {}", message);
                self.dispatch(SyncEvent::LoadMoreFinished {
                    error: Some(message),
                })
            }
            Completion::Preload {
                item_id,
                error: None,
            } => {
                tracing::trace!(screen_id = %self.screen_id, %item_id, "Preloaded");
                Vec::new()
            }
            Completion::Preload {
                item_id,
                error: Some(reason),
            } => {
                let err = FeedError::PrefetchFailure {
                    item_id: item_id.clone(),
                    reason,
                };
                tracing::warn!(screen_id = %self.screen_id, "{}", err);
                self.dispatch(SyncEvent::PreloadFailed(item_id))
            }
        }
    }

    /// Apply every snapshot and completion that has already arrived, without
    /// waiting. Snapshots go first: a load publishes its page before it
    /// reports completion.
    pub fn pump(&mut self) -> Vec<HostUpdate> {
        while let Some(joined) = self.tasks.try_join_next() {
            self.log_join_error(joined);
        }

        let mut updates = Vec::new();
        loop {
            match self.snapshots.try_recv() {
                Ok(sequence) => updates.extend(self.on_sequence_changed(sequence)),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(screen_id = %self.screen_id, "Skipped {} snapshots", skipped);
                    let sequence = self.source.current_sequence();
                    updates.extend(self.on_sequence_changed(sequence));
                }
                Err(_) => break,
            }
        }
        while let Ok(completion) = self.completion_rx.try_recv() {
            updates.extend(self.on_completion(completion));
        }
        updates
    }

    /// Wait for all background work to finish, then [`pump`](Self::pump).
    pub async fn wait_idle(&mut self) -> Vec<HostUpdate> {
        while let Some(joined) = self.tasks.join_next().await {
            self.log_join_error(joined);
        }
        self.pump()
    }

    /// Tear the screen down: later completions are ignored, outstanding
    /// tasks are aborted and the view handle is released.
    pub fn shutdown(&mut self) {
        if !self.alive.swap(false, Ordering::AcqRel) {
            return;
        }
        self.tasks.abort_all();
        self.view = None;
        tracing::info!(screen_id = %self.screen_id, "Feed controller shut down");
    }

    /// Drive the controller until the host sends [`HostEvent::Shutdown`] or
    /// drops either channel.
    pub async fn run(
        mut self,
        mut host_events: mpsc::Receiver<HostEvent>,
        updates: mpsc::Sender<HostUpdate>,
    ) -> FeedResult<()> {
        let mut source_open = true;
        let initial = self.start();
        if !Self::forward(&updates, initial).await {
            self.shutdown();
            return Ok(());
        }

        loop {
            let batch = tokio::select! {
                event = host_events.recv() => match event {
                    Some(HostEvent::Shutdown) | None => break,
                    Some(event) => self.handle_host_event(event),
                },
                snapshot = self.snapshots.recv(), if source_open => match snapshot {
                    Ok(sequence) => self.on_sequence_changed(sequence),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(screen_id = %self.screen_id, "Skipped {} snapshots", skipped);
                        let sequence = self.source.current_sequence();
                        self.on_sequence_changed(sequence)
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!(screen_id = %self.screen_id, "Item source closed");
                        source_open = false;
                        Vec::new()
                    }
                },
                Some(completion) = self.completion_rx.recv() => self.on_completion(completion),
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    self.log_join_error(joined);
                    Vec::new()
                }
            };

            if !Self::forward(&updates, batch).await {
                tracing::debug!(screen_id = %self.screen_id, "Host stopped listening");
                break;
            }
        }

        self.shutdown();
        Ok(())
    }

    fn log_join_error(&self, joined: Result<(), JoinError>) {
        if let Err(e) = joined {
            if !e.is_cancelled() {
                tracing::error!(screen_id = %self.screen_id, "Background task panicked: {}", e);
            }
        }
    }

    fn handle_host_event(&mut self, event: HostEvent) -> Vec<HostUpdate> {
        match event {
            HostEvent::LocatorChanged(locator) => self.on_locator_changed(locator),
            HostEvent::UserNavigated(index) => self.on_user_navigated(index),
            HostEvent::RetryLoadMore => self.retry_load_more(),
            HostEvent::DismissNotice(id) => {
                self.dismiss_notice(id);
                Vec::new()
            }
            HostEvent::Shutdown => Vec::new(),
        }
    }

    async fn forward(updates: &mpsc::Sender<HostUpdate>, batch: Vec<HostUpdate>) -> bool {
        for update in batch {
            if updates.send(update).await.is_err() {
                return false;
            }
        }
        true
    }

    fn dispatch(&mut self, event: SyncEvent) -> Vec<HostUpdate> {
        if !self.is_alive() {
            tracing::debug!(screen_id = %self.screen_id, ?event, "Dropping event after shutdown");
            return Vec::new();
        }

        let ctx = FeedContext {
            sequence: &self.sequence,
            source_loading: self.source.is_loading_more(),
            has_more: self.source.has_more_items(),
        };
        let state = std::mem::take(&mut self.state);
        let step = self.machine.apply(state, event, &ctx);
        self.state = step.state;

        if let Some(item_id) = step.missing_item {
            let err = FeedError::ItemNotFound(item_id);
            tracing::debug!(screen_id = %self.screen_id, "{}, using fallback position", err);
        }
        if let Some(reason) = step.ignored {
            tracing::debug!(screen_id = %self.screen_id, "Event ignored: {}", reason);
        }
        match &step.decision {
            Some(SyncDecision::NoOp) | None => {}
            Some(decision) => {
                tracing::debug!(screen_id = %self.screen_id, ?decision, "Sync decision");
            }
        }

        let mut updates = Vec::new();
        for effect in step.effects {
            self.execute(effect, &mut updates);
        }
        updates
    }

    fn execute(&mut self, effect: Effect, updates: &mut Vec<HostUpdate>) {
        match effect {
            Effect::ShowEmpty => {
                tracing::debug!(screen_id = %self.screen_id, "{}", FeedError::EmptySequence);
                updates.push(HostUpdate::ShowEmpty);
            }
            Effect::ShowContent => updates.push(HostUpdate::ShowContent),
            Effect::JumpTo { index } => {
                if let Some(view) = self.view.as_mut() {
                    if let Err(e) = view.jump_to(index) {
                        tracing::debug!(screen_id = %self.screen_id, "Jump to {} skipped: {}", index, e);
                    }
                } else {
                    tracing::debug!(screen_id = %self.screen_id, "Creating view at page {}", index);
                    self.view = Some(ViewPositionController::new(index));
                }
            }
            Effect::SyncView { index } => {
                if let Some(view) = self.view.as_mut() {
                    view.sync_to(index);
                }
            }
            Effect::ReplaceLocator { locator } => updates.push(HostUpdate::Replace(locator)),
            Effect::PushLocator { locator } => updates.push(HostUpdate::Navigate(locator)),
            Effect::Prefetch { items } => {
                for item_id in items {
                    self.spawn_preload(item_id);
                }
            }
            Effect::LoadMore => self.spawn_load_more(),
            Effect::ReportLoadFailure { message } => {
                let notice = Notice::new(
                    FeedError::PaginationFailure(message).to_string(),
                    self.config.notice_ttl(),
                );
                self.notices.push(notice.clone());
                updates.push(HostUpdate::Notice(notice));
            }
        }
    }

    fn spawn_load_more(&mut self) {
        let source = Arc::clone(&self.source);
        let tx = self.completion_tx.clone();
        let alive = Arc::clone(&self.alive);
        tracing::debug!(screen_id = %self.screen_id, "Requesting more items");

        self.tasks.spawn(async move {
            let result = source.load_more().await.map_err(|e| match e {
                FeedError::PaginationFailure(reason) => reason,
                other => other.to_string(),
            });
            if alive.load(Ordering::Acquire) {
                let _ = tx.send(Completion::LoadMore(result));
            }
        });
    }

    fn spawn_preload(&mut self, item_id: ItemId) {
        let source = Arc::clone(&self.source);
        let tx = self.completion_tx.clone();
        let alive = Arc::clone(&self.alive);

        self.tasks.spawn(async move {
            if !alive.load(Ordering::Acquire) {
                return;
            }
            let error = source
                .preload(item_id.clone())
                .await
                .err()
                .map(|e| match e {
                    FeedError::PrefetchFailure { reason, .. } => reason,
                    other => other.to_string(),
                });
            if alive.load(Ordering::Acquire) {
                let _ = tx.send(Completion::Preload { item_id, error });
            }
        });
    }
}

impl Drop for FeedController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
