use std::sync::Arc;

use simlab_api::PortalApi;
use simlab_catalog::SystemType;
use tracing::{error, instrument};

use crate::catalog::CatalogClient;
use crate::error::WizardError;
use crate::gateway::{SubmissionGateway, SubmitOutcome};
use crate::leaderboard::{LeaderboardStep, LeaderboardWizard};
use crate::notice::{Notice, Notifier};
use crate::step::{FetchApplied, FetchTicket, Step, Transition};
use crate::wizard::RunWizard;

const IMAGE_LOOKUP_FAILURE: &str = "Error fetching image details. Please contact the admin.";

/// Runs the I/O the wizard controllers ask for.
///
/// Controllers stay synchronous and hand out tickets; the driver performs
/// the fetches, feeds results back and sends the finished request.
#[derive(Clone)]
pub struct WizardDriver {
  api: Arc<dyn PortalApi>,
  catalogs: CatalogClient,
  gateway: SubmissionGateway,
  notifier: Arc<dyn Notifier>,
}

impl WizardDriver {
  pub fn new(api: Arc<dyn PortalApi>, notifier: Arc<dyn Notifier>) -> Self {
    Self {
      catalogs: CatalogClient::new(api.clone(), notifier.clone()),
      gateway: SubmissionGateway::new(api.clone(), notifier.clone()),
      api,
      notifier,
    }
  }

  pub fn catalogs(&self) -> &CatalogClient {
    &self.catalogs
  }

  pub async fn start(&self, wizard: &mut RunWizard) {
    if let Some(ticket) = wizard.start() {
      self.load(wizard, ticket).await;
    }
  }

  pub async fn next(&self, wizard: &mut RunWizard) -> Transition<Step> {
    let transition = wizard.next();
    if let Some(ticket) = transition.fetch.clone() {
      self.load(wizard, ticket).await;
    }
    transition
  }

  pub async fn back(&self, wizard: &mut RunWizard) -> Transition<Step> {
    let transition = wizard.back();
    if let Some(ticket) = transition.fetch.clone() {
      self.load(wizard, ticket).await;
    }
    transition
  }

  /// Fetch the current step's catalog again after a failure.
  pub async fn retry(&self, wizard: &mut RunWizard) -> Option<FetchApplied> {
    let ticket = wizard.retry()?;
    Some(self.load(wizard, ticket).await)
  }

  /// Validate and send the full-flow request. The step never changes.
  pub async fn submit(&self, wizard: &RunWizard) -> SubmitOutcome {
    match wizard.build_request() {
      Ok(request) => self.gateway.submit(&request).await,
      Err(e) => SubmitOutcome::Rejected { message: e.to_string() },
    }
  }

  pub async fn choose_type(&self, wizard: &mut LeaderboardWizard, system_type: SystemType) {
    if let Some(ticket) = wizard.choose_type(system_type) {
      self.load_systems(wizard, ticket).await;
    }
  }

  pub async fn next_leaderboard(&self, wizard: &mut LeaderboardWizard) -> Transition<LeaderboardStep> {
    let transition = wizard.next();
    if let Some(ticket) = transition.fetch.clone() {
      self.load_systems(wizard, ticket).await;
    }
    transition
  }

  /// Fetch the system catalog again after a failure.
  pub async fn retry_leaderboard(&self, wizard: &mut LeaderboardWizard) -> Option<FetchApplied> {
    let ticket = wizard.retry()?;
    Some(self.load_systems(wizard, ticket).await)
  }

  /// Choose an image and fill the draft from its metadata.
  #[instrument(skip(self, wizard))]
  pub async fn resolve_image(&self, wizard: &mut LeaderboardWizard, image: &str) -> Result<FetchApplied, WizardError> {
    let ticket = wizard.select_image(image)?;
    match self.api.resolve_image(ticket.image()).await {
      Ok(metadata) => Ok(wizard.apply_image_metadata(&ticket, metadata)),
      Err(e) => {
        error!(error = %e, "image lookup failed");
        wizard.image_lookup_failed(&ticket);
        let message = e.backend_message().unwrap_or(IMAGE_LOOKUP_FAILURE).to_string();
        self.notifier.notify(Notice::error(message.clone()));
        Err(WizardError::ImageLookup {
          image: image.to_string(),
          message,
        })
      }
    }
  }

  pub async fn submit_leaderboard(&self, wizard: &LeaderboardWizard) -> SubmitOutcome {
    match wizard.build_request() {
      Ok(request) => self.gateway.submit(&request).await,
      Err(e) => SubmitOutcome::Rejected { message: e.to_string() },
    }
  }

  async fn load(&self, wizard: &mut RunWizard, ticket: FetchTicket) -> FetchApplied {
    match self.catalogs.fetch(ticket.kind()).await {
      Ok(catalog) => wizard.apply_fetch(&ticket, catalog),
      Err(_) => wizard.fetch_failed(&ticket),
    }
  }

  async fn load_systems(&self, wizard: &mut LeaderboardWizard, ticket: FetchTicket) -> FetchApplied {
    match self.catalogs.fetch(ticket.kind()).await {
      Ok(catalog) => wizard.apply_fetch(&ticket, catalog),
      Err(_) => wizard.fetch_failed(&ticket),
    }
  }
}
