use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while talking to the SimLab backend.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Transport failure: connection refused, timeout, TLS, ...
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The configured base URL or a derived endpoint URL is unusable.
  #[error("invalid url '{url}': {message}")]
  InvalidUrl { url: String, message: String },

  /// The backend answered with a non-success status.
  #[error("{path} returned {status}{}", suffix(.message))]
  Status {
    path: String,
    status: u16,
    /// The backend's `message` (or `error`) field, when the body carried one.
    message: Option<String>,
  },

  /// The body could not be decoded into the expected shape.
  #[error("failed to decode response from {path}: {message}")]
  Decode { path: String, message: String },

  #[error("i/o error on {}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

fn suffix(message: &Option<String>) -> String {
  message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

impl ApiError {
  /// The backend-provided message, if any.
  pub fn backend_message(&self) -> Option<&str> {
    match self {
      ApiError::Status { message, .. } => message.as_deref(),
      _ => None,
    }
  }

  /// HTTP status, when the backend answered at all.
  pub fn status(&self) -> Option<u16> {
    match self {
      ApiError::Status { status, .. } => Some(*status),
      ApiError::Http(e) => e.status().map(|s| s.as_u16()),
      _ => None,
    }
  }
}
