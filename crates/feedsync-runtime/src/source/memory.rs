use async_trait::async_trait;
use feedsync_core::{FeedError, FeedResult, ItemId, ItemSource, Sequence};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;

struct Inner {
    sequence: Sequence,
    /// Pages handed out by successive `load_more` calls.
    pages: VecDeque<Vec<ItemId>>,
    failing_loads: usize,
    failing_preloads: HashSet<ItemId>,
    preloaded: Vec<ItemId>,
    load_calls: usize,
}

/// Clears the loading flag when a load ends, including when its task is
/// aborted mid-flight.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// In-process item source backed by a vector and a backlog of pages.
///
/// Every mutation publishes the new snapshot to subscribers. Loads and
/// preloads can be made to fail and to take time, which is what the CLI
/// scenarios and the runtime tests use it for.
pub struct MemoryItemSource {
    inner: Mutex<Inner>,
    tx: broadcast::Sender<Sequence>,
    loading: AtomicBool,
    latency: Duration,
}

impl MemoryItemSource {
    /// Create a source with an initial snapshot.
    /// The broadcast channel has a buffer size of 32
    pub fn new<I, S>(initial: I) -> FeedResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<ItemId>,
    {
        let (tx, _) = broadcast::channel(32);
        Ok(Self {
            inner: Mutex::new(Inner {
                sequence: Sequence::from_ids(initial)?,
                pages: VecDeque::new(),
                failing_loads: 0,
                failing_preloads: HashSet::new(),
                preloaded: Vec::new(),
                load_calls: 0,
            }),
            tx,
            loading: AtomicBool::new(false),
            latency: Duration::ZERO,
        })
    }

    pub fn with_pages(self, pages: Vec<Vec<ItemId>>) -> Self {
        self.inner.lock().pages = pages.into();
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn append(&self, ids: Vec<ItemId>) -> FeedResult<Sequence> {
        self.mutate(|current| {
            let mut next = current.to_vec();
            next.extend(ids);
            next
        })
    }

    pub fn prepend(&self, ids: Vec<ItemId>) -> FeedResult<Sequence> {
        self.mutate(|current| {
            let mut next = ids;
            next.extend(current.iter().cloned());
            next
        })
    }

    /// Replace the whole ordering (re-ranking, refresh).
    pub fn replace(&self, ids: Vec<ItemId>) -> FeedResult<Sequence> {
        self.mutate(|_| ids)
    }

    pub fn remove(&self, id: &ItemId) -> FeedResult<Sequence> {
        if !self.inner.lock().sequence.contains(id) {
            return Err(FeedError::ItemNotFound(id.clone()));
        }
        self.mutate(|current| current.iter().filter(|item| *item != id).cloned().collect())
    }

    /// Make the next `count` loads fail.
    pub fn fail_next_loads(&self, count: usize) {
        self.inner.lock().failing_loads = count;
    }

    pub fn fail_preload_of(&self, id: ItemId) {
        self.inner.lock().failing_preloads.insert(id);
    }

    /// Items successfully preloaded, in completion order.
    pub fn preloaded(&self) -> Vec<ItemId> {
        self.inner.lock().preloaded.clone()
    }

    pub fn load_calls(&self) -> usize {
        self.inner.lock().load_calls
    }

    fn mutate<F>(&self, build: F) -> FeedResult<Sequence>
    where
        F: FnOnce(&Sequence) -> Vec<ItemId>,
    {
        let next = {
            let mut inner = self.inner.lock();
            let next = Sequence::new(build(&inner.sequence))?;
            inner.sequence = next.clone();
            next
        };
        self.publish(next.clone());
        Ok(next)
    }

    fn publish(&self, sequence: Sequence) {
        // No subscribers is fine
        let _ = self.tx.send(sequence);
    }
}

#[async_trait]
impl ItemSource for MemoryItemSource {
    fn current_sequence(&self) -> Sequence {
        self.inner.lock().sequence.clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<Sequence> {
        self.tx.subscribe()
    }

    fn is_loading_more(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    fn has_more_items(&self) -> bool {
        !self.inner.lock().pages.is_empty()
    }

    async fn load_more(&self) -> FeedResult<()> {
        if self.loading.swap(true, Ordering::AcqRel) {
            tracing::debug!("load_more called while a load is running");
            return Ok(());
        }
        let guard = LoadingGuard(&self.loading);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let outcome = {
            let mut inner = self.inner.lock();
            inner.load_calls += 1;
            if inner.failing_loads > 0 {
                inner.failing_loads -= 1;
                Err(FeedError::PaginationFailure(
                    "source unavailable".to_string(),
                ))
            } else if let Some(page) = inner.pages.pop_front() {
                let mut next = inner.sequence.to_vec();
                next.extend(page);
                Sequence::new(next).map(|sequence| {
                    inner.sequence = sequence.clone();
                    Some(sequence)
                })
            } else {
                Ok(None)
            }
        };

        drop(guard);

        if let Some(sequence) = outcome? {
            tracing::debug!("Loaded more items, feed now has {}", sequence.len());
            self.publish(sequence);
        }
        Ok(())
    }

    async fn preload(&self, item_id: ItemId) -> FeedResult<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut inner = self.inner.lock();
        if inner.failing_preloads.contains(&item_id) {
            return Err(FeedError::PrefetchFailure {
                item_id,
                reason: "asset unavailable".to_string(),
            });
        }
        inner.preloaded.push(item_id);
        Ok(())
    }
}
