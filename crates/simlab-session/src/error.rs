use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or persisting the session file.
#[derive(Debug, Error)]
pub enum SessionError {
  #[error("failed to read session file {}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write session file {}", .path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The session file is not valid JSON.
  #[error("corrupt session file {}", .path.display())]
  Corrupt {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}
