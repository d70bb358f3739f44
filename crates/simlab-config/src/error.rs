use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading the portal configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// The configuration file exists but could not be read.
  #[error("failed to read config file {}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The configuration file is not valid JSON for [`crate::PortalConfig`].
  #[error("failed to parse config file {}", .path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  /// A field has an unusable value.
  #[error("invalid config value '{field}': {message}")]
  Invalid { field: String, message: String },
}
