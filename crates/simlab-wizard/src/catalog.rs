use std::sync::Arc;

use simlab_api::PortalApi;
use simlab_catalog::{Catalog, CatalogError, CatalogKind, normalize};
use tracing::{error, info, instrument};

use crate::error::WizardError;
use crate::notice::{Notice, Notifier};

pub fn fetch_failure_message(kind: CatalogKind) -> String {
  WizardError::CatalogUnavailable { kind }.to_string()
}

/// Fetches and normalizes catalogs for the wizard steps.
///
/// Every problem is reported through the notifier. A backend answer saying
/// there are no entries is an empty catalog; anything else that goes wrong
/// is [`WizardError::CatalogUnavailable`] so the caller can try again.
#[derive(Clone)]
pub struct CatalogClient {
  api: Arc<dyn PortalApi>,
  notifier: Arc<dyn Notifier>,
}

impl CatalogClient {
  pub fn new(api: Arc<dyn PortalApi>, notifier: Arc<dyn Notifier>) -> Self {
    Self { api, notifier }
  }

  #[instrument(skip(self))]
  pub async fn fetch(&self, kind: CatalogKind) -> Result<Catalog, WizardError> {
    let raw = match self.api.fetch_catalog(kind).await {
      Ok(raw) => raw,
      Err(e) => {
        error!(error = %e, "catalog fetch failed");
        return Err(self.unavailable(kind));
      }
    };

    match normalize(kind, &raw) {
      Ok(catalog) => {
        info!(entries = catalog.len(), "catalog loaded");
        Ok(catalog)
      }
      Err(CatalogError::NoEntries { message, .. }) => {
        info!(%message, "catalog has no entries");
        self.notifier.notify(Notice::info(message));
        Ok(Catalog::empty(kind))
      }
      Err(e) => {
        error!(error = %e, "catalog document rejected");
        Err(self.unavailable(kind))
      }
    }
  }

  fn unavailable(&self, kind: CatalogKind) -> WizardError {
    self.notifier.notify(Notice::error(fetch_failure_message(kind)));
    WizardError::CatalogUnavailable { kind }
  }
}
