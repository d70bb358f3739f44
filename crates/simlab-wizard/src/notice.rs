//! User-visible notices and the notifiers that deliver them.
//!
//! Validation failures and backend errors reach the user as [`Notice`]s.
//! Components emit them through a [`Notifier`]; the front end decides how to
//! show them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
  Success,
  Info,
  Warning,
  Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
  pub kind: NoticeKind,
  pub message: String,
}

impl Notice {
  pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
    Self {
      kind,
      message: message.into(),
    }
  }

  pub fn success(message: impl Into<String>) -> Self {
    Self::new(NoticeKind::Success, message)
  }

  pub fn info(message: impl Into<String>) -> Self {
    Self::new(NoticeKind::Info, message)
  }

  pub fn warning(message: impl Into<String>) -> Self {
    Self::new(NoticeKind::Warning, message)
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self::new(NoticeKind::Error, message)
  }
}

/// Receives notices as they are raised.
pub trait Notifier: Send + Sync {
  fn notify(&self, notice: Notice);
}

/// Discards every notice.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
  fn notify(&self, _notice: Notice) {}
}

/// Forwards notices to an unbounded channel for asynchronous consumers.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<Notice>) -> Self {
    Self { sender }
  }
}

impl Notifier for ChannelNotifier {
  fn notify(&self, notice: Notice) {
    // receiver may have been dropped
    let _ = self.sender.send(notice);
  }
}

#[derive(Debug, Clone)]
struct Posted {
  id: u64,
  notice: Notice,
  posted_at: Instant,
}

/// Holds notices until they are dismissed or their time-to-live elapses.
#[derive(Debug)]
pub struct NoticeBoard {
  ttl: Duration,
  next_id: AtomicU64,
  posted: Mutex<Vec<Posted>>,
}

impl NoticeBoard {
  pub fn new(ttl: Duration) -> Self {
    Self {
      ttl,
      next_id: AtomicU64::new(1),
      posted: Mutex::new(Vec::new()),
    }
  }

  /// Post a notice at `now` and return its id.
  pub fn post_at(&self, notice: Notice, now: Instant) -> u64 {
    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    self.lock().push(Posted {
      id,
      notice,
      posted_at: now,
    });
    id
  }

  /// Notices still visible at `now`, oldest first. Expired ones are dropped.
  pub fn visible_at(&self, now: Instant) -> Vec<(u64, Notice)> {
    let mut posted = self.lock();
    posted.retain(|p| now.saturating_duration_since(p.posted_at) < self.ttl);
    posted.iter().map(|p| (p.id, p.notice.clone())).collect()
  }

  pub fn visible(&self) -> Vec<(u64, Notice)> {
    self.visible_at(Instant::now())
  }

  /// Close a notice. Returns `false` if it was already gone.
  pub fn dismiss(&self, id: u64) -> bool {
    let mut posted = self.lock();
    let before = posted.len();
    posted.retain(|p| p.id != id);
    posted.len() != before
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Posted>> {
    self.posted.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl Notifier for NoticeBoard {
  fn notify(&self, notice: Notice) {
    self.post_at(notice, Instant::now());
  }
}
