use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// A transient, dismissible message shown to the user.
///
/// Only pagination failures produce notices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: Uuid,
    pub raised_at: DateTime<Utc>,
    pub message: String,
    pub ttl_secs: u64,
}

impl Notice {
    pub fn new(message: String, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            raised_at: Utc::now(),
            message,
            ttl_secs: ttl.as_secs(),
        }
    }

    /// A ttl too large to represent never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        i64::try_from(self.ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|ttl| self.raised_at.checked_add_signed(ttl))
            .is_some_and(|expires_at| now >= expires_at)
    }
}

/// Notices currently visible on a screen.
#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    notices: Vec<Notice>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Remove a notice by id, returning whether it was present.
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.id != id);
        self.notices.len() != before
    }

    pub fn prune_expired(&mut self, now: DateTime<Utc>) {
        self.notices.retain(|n| !n.is_expired(now));
    }

    pub fn visible(&self) -> &[Notice] {
        &self.notices
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }
}
