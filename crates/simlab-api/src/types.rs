use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw answer to a request whose non-success statuses are meaningful to the
/// caller (run submission).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
  pub status: u16,
  /// Parsed JSON body; `None` when the body was empty or not JSON.
  pub body: Option<Value>,
}

impl ApiReply {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// The backend's `message` field, falling back to `error`.
  pub fn message(&self) -> Option<&str> {
    self.body.as_ref().and_then(backend_message)
  }
}

/// Extract the human-readable message from a backend JSON body.
pub fn backend_message(body: &Value) -> Option<&str> {
  body
    .get("message")
    .and_then(Value::as_str)
    .or_else(|| body.get("error").and_then(Value::as_str))
    .filter(|m| !m.trim().is_empty())
}

/// Metadata resolved for a registered Docker image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
  #[serde(default)]
  pub class_name: Option<String>,
  #[serde(default)]
  pub arguments: Map<String, Value>,
  /// `repository:tag`
  #[serde(default)]
  pub image: String,
  #[serde(default)]
  pub description: String,
}

impl ImageMetadata {
  /// The participant id carried in the image labels.
  pub fn system_id(&self) -> Option<&str> {
    self.arguments.get("id").and_then(Value::as_str)
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
  pub username: String,
  pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
  pub email: String,
  pub username: String,
  pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordReset {
  pub email: String,
  pub password: String,
}

/// 202 answer to an image upload: processing continues in the background.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadAccepted {
  #[serde(default)]
  pub message: String,
  pub task_id: String,
}

/// Progress of a background image upload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadStatus {
  /// Worker state: `PENDING`, `STARTED`, `SUCCESS`, `FAILURE`, ...
  pub status: String,
  #[serde(default)]
  pub message: Option<String>,
  #[serde(default)]
  pub error: Option<String>,
}

impl UploadStatus {
  pub fn is_success(&self) -> bool {
    self.status.eq_ignore_ascii_case("SUCCESS")
  }

  pub fn is_failure(&self) -> bool {
    self.status.eq_ignore_ascii_case("FAILURE")
  }

  pub fn is_finished(&self) -> bool {
    self.is_success() || self.is_failure()
  }
}

/// Result of an image download.
#[derive(Debug, Clone, PartialEq)]
pub enum Download {
  /// The backend answered with a JSON document instead of a file.
  Json(Value),
  /// An attachment; `filename` comes from `Content-Disposition`.
  File { filename: String, bytes: Vec<u8> },
}

/// Pull the filename out of a `Content-Disposition` header value.
pub(crate) fn disposition_filename(header: &str) -> Option<String> {
  header
    .split(';')
    .map(str::trim)
    .find_map(|part| part.strip_prefix("filename="))
    .map(|name| name.trim_matches('"').to_string())
    .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_reply_message_prefers_message() {
    let reply = ApiReply {
      status: 500,
      body: Some(json!({"message": "db down", "error": "trace"})),
    };
    assert_eq!(reply.message(), Some("db down"));
    assert!(!reply.is_success());
  }

  #[test]
  fn test_reply_message_falls_back_to_error() {
    let reply = ApiReply {
      status: 400,
      body: Some(json!({"error": "Image not found"})),
    };
    assert_eq!(reply.message(), Some("Image not found"));
  }

  #[test]
  fn test_reply_without_body_has_no_message() {
    let reply = ApiReply {
      status: 201,
      body: None,
    };
    assert_eq!(reply.message(), None);
    assert!(reply.is_success());
  }

  #[test]
  fn test_disposition_filename() {
    assert_eq!(
      disposition_filename("attachment; filename=agent:latest.tar").as_deref(),
      Some("agent:latest.tar")
    );
    assert_eq!(
      disposition_filename(r#"attachment; filename="sim.tar""#).as_deref(),
      Some("sim.tar")
    );
    assert_eq!(disposition_filename("inline"), None);
  }

  #[test]
  fn test_image_metadata_system_id() {
    let meta: ImageMetadata = serde_json::from_value(json!({
      "class_name": "WrapperAgent",
      "arguments": {"id": "agent-1"},
      "image": "agent:latest",
      "description": "An agent"
    }))
    .unwrap();
    assert_eq!(meta.system_id(), Some("agent-1"));
    assert_eq!(meta.class_name.as_deref(), Some("WrapperAgent"));
  }

  #[test]
  fn test_upload_status_states() {
    let status: UploadStatus = serde_json::from_value(json!({"status": "PENDING"})).unwrap();
    assert!(!status.is_finished());
    let status: UploadStatus =
      serde_json::from_value(json!({"status": "FAILURE", "message": "Failed to upload image"}))
        .unwrap();
    assert!(status.is_failure());
    assert!(status.is_finished());
  }
}
