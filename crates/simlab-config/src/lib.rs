//! SimLab Config
//!
//! Serializable configuration for the SimLab portal client. A configuration is
//! resolved in three layers, later layers winning:
//!
//! 1. Built-in defaults (see [`PortalConfig::default`])
//! 2. A JSON file, usually `~/.simlab/config.json`
//! 3. Environment overrides (`SIMLAB_BASE_URL`, `SIMLAB_ACCEPT_INVALID_CERTS`)
//!
//! ```json
//! {
//!   "base_url": "https://simlab.example.org/api",
//!   "request_timeout_ms": 10000,
//!   "notice_ttl_ms": 5000
//! }
//! ```

mod error;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use error::ConfigError;

/// Environment variable overriding [`PortalConfig::base_url`].
pub const ENV_BASE_URL: &str = "SIMLAB_BASE_URL";

/// Environment variable overriding [`PortalConfig::accept_invalid_certs`].
pub const ENV_ACCEPT_INVALID_CERTS: &str = "SIMLAB_ACCEPT_INVALID_CERTS";

/// Default API root of a local SimLab deployment.
pub const DEFAULT_BASE_URL: &str = "https://127.0.0.1/api";

/// Configuration for talking to a SimLab backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
  /// API root, e.g. "https://127.0.0.1/api". Endpoint paths are appended to it.
  pub base_url: String,

  /// Per-request timeout.
  pub request_timeout_ms: u64,

  /// Accept self-signed certificates (local deployments).
  pub accept_invalid_certs: bool,

  /// How long a transient notice stays visible before it auto-hides.
  pub notice_ttl_ms: u64,

  /// Number of entries per page when listing catalogs.
  pub page_size: usize,
}

impl Default for PortalConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      request_timeout_ms: 30_000,
      accept_invalid_certs: false,
      notice_ttl_ms: 5_000,
      page_size: 20,
    }
  }
}

impl PortalConfig {
  /// Load the configuration from a JSON file.
  ///
  /// A missing file is not an error: the defaults are returned. Fields absent
  /// from the file keep their default values.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    if !path.exists() {
      return Ok(Self::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    let config: PortalConfig =
      serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
      })?;

    config.validate()?;
    Ok(config)
  }

  /// Apply overrides from the process environment.
  pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
    self.with_overrides(|key| std::env::var(key).ok())
  }

  /// Apply overrides from an arbitrary variable lookup.
  pub fn with_overrides(
    mut self,
    lookup: impl Fn(&str) -> Option<String>,
  ) -> Result<Self, ConfigError> {
    if let Some(url) = lookup(ENV_BASE_URL)
      && !url.trim().is_empty()
    {
      self.base_url = url.trim().to_string();
    }

    if let Some(raw) = lookup(ENV_ACCEPT_INVALID_CERTS) {
      self.accept_invalid_certs = parse_flag(ENV_ACCEPT_INVALID_CERTS, &raw)?;
    }

    self.validate()?;
    Ok(self)
  }

  /// Request timeout as a [`Duration`].
  pub fn request_timeout(&self) -> Duration {
    Duration::from_millis(self.request_timeout_ms)
  }

  /// Notice lifetime as a [`Duration`].
  pub fn notice_ttl(&self) -> Duration {
    Duration::from_millis(self.notice_ttl_ms)
  }

  fn validate(&self) -> Result<(), ConfigError> {
    if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
      return Err(ConfigError::Invalid {
        field: "base_url".to_string(),
        message: format!("expected an http(s) URL, got '{}'", self.base_url),
      });
    }
    if self.page_size == 0 {
      return Err(ConfigError::Invalid {
        field: "page_size".to_string(),
        message: "must be at least 1".to_string(),
      });
    }
    Ok(())
  }
}

fn parse_flag(field: &str, raw: &str) -> Result<bool, ConfigError> {
  match raw.trim().to_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Ok(true),
    "0" | "false" | "no" | "off" | "" => Ok(false),
    other => Err(ConfigError::Invalid {
      field: field.to_string(),
      message: format!("expected a boolean, got '{}'", other),
    }),
  }
}
