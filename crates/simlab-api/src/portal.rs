use async_trait::async_trait;
use serde_json::Value;
use simlab_catalog::CatalogKind;

use crate::error::ApiError;
use crate::types::{ApiReply, ImageMetadata};

/// The slice of the backend the run wizard depends on.
///
/// Implemented over HTTP by [`crate::HttpPortalApi`]; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait PortalApi: Send + Sync {
  /// Fetch the raw catalog document for `kind` (`GET /<kind>`).
  async fn fetch_catalog(&self, kind: CatalogKind) -> Result<Value, ApiError>;

  /// Submit a run request (`POST /run-request`).
  ///
  /// Non-success statuses are returned as an [`ApiReply`], not an error, so
  /// the caller can surface the backend's message. Only transport failures
  /// are errors. Never retried.
  async fn submit_run(&self, payload: &Value) -> Result<ApiReply, ApiError>;

  /// Resolve metadata for a registered image (`POST /image`).
  async fn resolve_image(&self, image: &str) -> Result<ImageMetadata, ApiError>;
}
