//! SimLab Session
//!
//! The single process-wide holder of the authenticated identity. The store is
//! initialised from the persisted session file, writes through to it on every
//! change, and publishes changes to subscribers. Nothing else keeps a copy of
//! the identity.

mod error;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

pub use error::SessionError;

/// The authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub username: String,
}

impl User {
  pub fn new(username: impl Into<String>) -> Self {
    Self {
      username: username.into(),
    }
  }
}

/// On-disk shape of the session file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct SessionFile {
  #[serde(default)]
  user: Option<User>,
  /// Opaque server-set session cookie (`name=value`).
  #[serde(default)]
  cookie: Option<String>,
}

pub struct SessionStore {
  path: PathBuf,
  state: Mutex<SessionFile>,
  sender: watch::Sender<Option<User>>,
}

impl SessionStore {
  /// Open the store backed by `path`. A missing file is an empty session.
  pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
    let path = path.into();
    let state = if path.exists() {
      let content = std::fs::read_to_string(&path).map_err(|source| SessionError::Read {
        path: path.clone(),
        source,
      })?;
      serde_json::from_str(&content).map_err(|source| SessionError::Corrupt {
        path: path.clone(),
        source,
      })?
    } else {
      SessionFile::default()
    };

    debug!(path = %path.display(), user = ?state.user, "session loaded");
    let (sender, _) = watch::channel(state.user.clone());

    Ok(Self {
      path,
      state: Mutex::new(state),
      sender,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn current_user(&self) -> Option<User> {
    self.lock().user.clone()
  }

  /// Replace the identity. Persists first; subscribers are notified only if
  /// the identity actually changed.
  pub fn set_current_user(&self, user: Option<User>) -> Result<(), SessionError> {
    self.update(|state| state.user = user)
  }

  pub fn cookie(&self) -> Option<String> {
    self.lock().cookie.clone()
  }

  pub fn set_cookie(&self, cookie: Option<String>) -> Result<(), SessionError> {
    self.update(|state| state.cookie = cookie)
  }

  /// Record a successful login: identity and cookie in one write.
  pub fn sign_in(&self, user: User, cookie: Option<String>) -> Result<(), SessionError> {
    info!(username = %user.username, "signed in");
    self.update(|state| {
      state.user = Some(user);
      state.cookie = cookie;
    })
  }

  /// Forget the identity and the cookie.
  pub fn sign_out(&self) -> Result<(), SessionError> {
    info!("signed out");
    self.update(|state| *state = SessionFile::default())
  }

  /// Receive the identity whenever it changes.
  pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
    self.sender.subscribe()
  }

  fn update(&self, change: impl FnOnce(&mut SessionFile)) -> Result<(), SessionError> {
    let user = {
      let mut state = self.lock();
      let mut next = state.clone();
      change(&mut next);
      if next == *state {
        return Ok(());
      }
      self.persist(&next)?;
      *state = next;
      state.user.clone()
    };

    self.sender.send_if_modified(|current| {
      if *current == user {
        return false;
      }
      *current = user;
      true
    });
    Ok(())
  }

  fn persist(&self, state: &SessionFile) -> Result<(), SessionError> {
    let write_err = |source| SessionError::Write {
      path: self.path.clone(),
      source,
    };

    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let content = serde_json::to_string_pretty(state).map_err(|e| SessionError::Write {
      path: self.path.clone(),
      source: std::io::Error::other(e),
    })?;

    // write-then-rename
    let tmp = self.path.with_extension("json.tmp");
    std::fs::write(&tmp, content).map_err(write_err)?;
    std::fs::rename(&tmp, &self.path).map_err(write_err)?;
    Ok(())
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, SessionFile> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_file_is_signed_out() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::open(dir.path().join("session.json")).unwrap();
    assert_eq!(store.current_user(), None);
    assert_eq!(store.cookie(), None);
  }

  #[test]
  fn test_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("session.json");

    let store = SessionStore::open(&path).unwrap();
    store
      .sign_in(User::new("alice"), Some("session=abc".to_string()))
      .unwrap();
    drop(store);

    let reopened = SessionStore::open(&path).unwrap();
    assert_eq!(reopened.current_user(), Some(User::new("alice")));
    assert_eq!(reopened.cookie().as_deref(), Some("session=abc"));
  }

  #[test]
  fn test_sign_out_clears_everything() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let store = SessionStore::open(&path).unwrap();
    store.sign_in(User::new("alice"), Some("c=1".to_string())).unwrap();
    store.sign_out().unwrap();

    let reopened = SessionStore::open(&path).unwrap();
    assert_eq!(reopened.current_user(), None);
    assert_eq!(reopened.cookie(), None);
  }

  #[test]
  fn test_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{{{").unwrap();

    assert!(matches!(
      SessionStore::open(&path),
      Err(SessionError::Corrupt { .. })
    ));
  }

  #[tokio::test]
  async fn test_subscribers_notified_on_change() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::open(dir.path().join("session.json")).unwrap();
    let mut rx = store.subscribe();
    assert_eq!(*rx.borrow(), None);

    store.set_current_user(Some(User::new("bob"))).unwrap();
    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow_and_update(), Some(User::new("bob")));

    // Same identity again: no notification.
    store.set_current_user(Some(User::new("bob"))).unwrap();
    assert!(!rx.has_changed().unwrap());

    // Cookie-only changes do not touch the identity.
    store.set_cookie(Some("session=new".to_string())).unwrap();
    assert!(!rx.has_changed().unwrap());

    store.set_current_user(None).unwrap();
    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), None);
  }
}
