use std::sync::Arc;

use serde::Serialize;
use simlab_api::PortalApi;
use tracing::{error, info, instrument};

use crate::notice::{Notice, Notifier};

/// Shown when a failed submission carries no message from the backend.
pub const GENERIC_SUBMIT_FAILURE: &str = "Error submitting run. Please reach out to the admin.";

const SUBMIT_SUCCESS: &str = "Run submitted successfully.";

/// How a submission ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
  /// Stopped by local validation; nothing was sent.
  Rejected { message: String },
  /// The backend answered 2xx.
  Accepted { status: u16, message: String },
  /// The backend answered with another status, or the call itself failed.
  Failed { status: Option<u16>, message: String },
}

impl SubmitOutcome {
  pub fn is_accepted(&self) -> bool {
    matches!(self, SubmitOutcome::Accepted { .. })
  }

  pub fn message(&self) -> &str {
    match self {
      SubmitOutcome::Rejected { message }
      | SubmitOutcome::Accepted { message, .. }
      | SubmitOutcome::Failed { message, .. } => message,
    }
  }
}

/// Sends assembled run requests and reports how they ended.
///
/// One call per submit, never retried. The outcome is also raised as a
/// notice.
#[derive(Clone)]
pub struct SubmissionGateway {
  api: Arc<dyn PortalApi>,
  notifier: Arc<dyn Notifier>,
}

impl SubmissionGateway {
  pub fn new(api: Arc<dyn PortalApi>, notifier: Arc<dyn Notifier>) -> Self {
    Self { api, notifier }
  }

  #[instrument(skip_all)]
  pub async fn submit<R: Serialize + Sync>(&self, request: &R) -> SubmitOutcome {
    let payload = match serde_json::to_value(request) {
      Ok(payload) => payload,
      Err(e) => {
        error!(error = %e, "failed to encode run request");
        return self.failed(None, None);
      }
    };

    match self.api.submit_run(&payload).await {
      Ok(reply) if reply.is_success() => {
        info!(status = reply.status, "run submitted");
        let message = reply.message().unwrap_or(SUBMIT_SUCCESS).to_string();
        self.notifier.notify(Notice::success(message.clone()));
        SubmitOutcome::Accepted {
          status: reply.status,
          message,
        }
      }
      Ok(reply) => {
        error!(status = reply.status, backend_message = ?reply.message(), "run submission refused");
        self.failed(Some(reply.status), reply.message())
      }
      Err(e) => {
        error!(error = %e, "run submission failed");
        self.failed(e.status(), e.backend_message())
      }
    }
  }

  fn failed(&self, status: Option<u16>, backend_message: Option<&str>) -> SubmitOutcome {
    let message = backend_message.unwrap_or(GENERIC_SUBMIT_FAILURE).to_string();
    self.notifier.notify(Notice::error(message.clone()));
    SubmitOutcome::Failed { status, message }
  }
}
