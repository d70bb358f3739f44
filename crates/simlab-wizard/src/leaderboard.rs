use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use simlab_api::ImageMetadata;
use simlab_catalog::{Catalog, CatalogKind, SystemType, Task};
use tracing::{debug, info, warn};

use crate::error::{ValidationError, WizardError};
use crate::notice::{Notice, Notifier};
use crate::payload::{LeaderboardRequest, SystemPayload};
use crate::step::{CatalogSlot, FetchApplied, FetchTicket, Transition};

/// Steps of the public-leaderboard flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LeaderboardStep {
  /// Run name and system type.
  Details = 1,
  /// System catalog, image, system id and configuration.
  System = 2,
}

impl LeaderboardStep {
  pub fn number(self) -> u8 {
    self as u8
  }
}

/// The system being assembled for submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemDraft {
  pub system_type: Option<SystemType>,
  pub image: String,
  pub id: String,
  pub class_name: Option<String>,
  pub arguments: Option<Map<String, Value>>,
  /// Raw configuration, parsed as JSON only when the request is built.
  pub config_text: String,
}

/// Permission to apply one image lookup result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTicket {
  image: String,
  system_type: SystemType,
  generation: u64,
}

impl ImageTicket {
  pub fn image(&self) -> &str {
    &self.image
  }

  pub fn system_type(&self) -> SystemType {
    self.system_type
  }
}

/// Controller of the two-step public-leaderboard flow.
pub struct LeaderboardWizard {
  step: LeaderboardStep,
  run_name: String,
  task: Task,
  draft: SystemDraft,
  catalogs: HashMap<CatalogKind, CatalogSlot>,
  pending_image: Option<u64>,
  generation: u64,
  notifier: Arc<dyn Notifier>,
}

impl LeaderboardWizard {
  /// Start the flow for the task carried over from the task listing.
  pub fn new(task: Option<Task>, notifier: Arc<dyn Notifier>) -> Result<Self, WizardError> {
    let Some(task) = task else {
      notifier.notify(Notice::error(WizardError::NoTaskSelected.to_string()));
      return Err(WizardError::NoTaskSelected);
    };

    Ok(Self {
      step: LeaderboardStep::Details,
      run_name: String::new(),
      task,
      draft: SystemDraft::default(),
      catalogs: HashMap::new(),
      pending_image: None,
      generation: 0,
      notifier,
    })
  }

  pub fn step(&self) -> LeaderboardStep {
    self.step
  }

  pub fn task(&self) -> &Task {
    &self.task
  }

  pub fn run_name(&self) -> &str {
    &self.run_name
  }

  pub fn draft(&self) -> &SystemDraft {
    &self.draft
  }

  /// The loaded catalog for the chosen system type.
  pub fn catalog(&self) -> Option<&Catalog> {
    let kind = self.draft.system_type?.catalog();
    self.catalogs.get(&kind).and_then(CatalogSlot::loaded)
  }

  pub fn is_loading(&self) -> bool {
    self.step == LeaderboardStep::System
      && self
        .draft
        .system_type
        .and_then(|t| self.catalogs.get(&t.catalog()))
        .is_some_and(CatalogSlot::is_loading)
  }

  /// Whether the system catalog for the chosen type could not be fetched.
  pub fn load_failed(&self) -> bool {
    self
      .draft
      .system_type
      .and_then(|t| self.catalogs.get(&t.catalog()))
      .is_some_and(CatalogSlot::is_failed)
  }

  pub fn is_resolving_image(&self) -> bool {
    self.pending_image.is_some()
  }

  pub fn set_run_name(&mut self, name: impl Into<String>) {
    self.run_name = name.into();
  }

  /// Choose the system type. A different type starts the system over: the
  /// draft is cleared and anything in flight for the old type is dropped.
  pub fn choose_type(&mut self, system_type: SystemType) -> Option<FetchTicket> {
    let previous = self.draft.system_type;
    if previous == Some(system_type) {
      return None;
    }

    if let Some(previous) = previous {
      self.abandon_loading(previous.catalog());
    }
    self.pending_image = None;
    self.draft = SystemDraft {
      system_type: Some(system_type),
      ..SystemDraft::default()
    };
    info!(system_type = %system_type, "system type chosen");

    match self.step {
      LeaderboardStep::System => self.enter_catalog(),
      LeaderboardStep::Details => None,
    }
  }

  pub fn next(&mut self) -> Transition<LeaderboardStep> {
    let from = self.step;
    if from == LeaderboardStep::System {
      return Transition {
        from,
        to: from,
        fetch: None,
      };
    }
    self.step = LeaderboardStep::System;
    let fetch = self.enter_catalog();
    info!(from = from.number(), to = self.step.number(), "leaderboard wizard advanced");
    Transition {
      from,
      to: self.step,
      fetch,
    }
  }

  pub fn back(&mut self) -> Transition<LeaderboardStep> {
    let from = self.step;
    if from == LeaderboardStep::Details {
      return Transition {
        from,
        to: from,
        fetch: None,
      };
    }
    if let Some(system_type) = self.draft.system_type {
      self.abandon_loading(system_type.catalog());
    }
    if self.pending_image.take().is_some() {
      self.clear_image();
    }
    self.step = LeaderboardStep::Details;
    info!(from = from.number(), to = self.step.number(), "leaderboard wizard went back");
    Transition {
      from,
      to: self.step,
      fetch: None,
    }
  }

  /// Deliver a fetched system catalog.
  pub fn apply_fetch(&mut self, ticket: &FetchTicket, catalog: Catalog) -> FetchApplied {
    let kind = ticket.kind();
    let current = self.step == LeaderboardStep::System
      && self.draft.system_type.map(|t| t.catalog()) == Some(kind)
      && catalog.kind() == kind;
    let slot = self.catalogs.entry(kind).or_default();

    if !current || !slot.awaits(ticket.generation()) {
      warn!(%kind, generation = ticket.generation(), "discarding stale system catalog");
      return FetchApplied::Stale;
    }

    debug!(%kind, entries = catalog.len(), "system catalog applied");
    *slot = CatalogSlot::Loaded(catalog);
    FetchApplied::Applied
  }

  /// Record that the system catalog fetch behind `ticket` failed.
  pub fn fetch_failed(&mut self, ticket: &FetchTicket) -> FetchApplied {
    let kind = ticket.kind();
    let slot = self.catalogs.entry(kind).or_default();
    if !slot.awaits(ticket.generation()) {
      return FetchApplied::Stale;
    }
    warn!(%kind, generation = ticket.generation(), "system catalog fetch failed");
    *slot = CatalogSlot::Failed;
    FetchApplied::Applied
  }

  /// Ticket for fetching the system catalog again after a failure.
  pub fn retry(&mut self) -> Option<FetchTicket> {
    if self.step != LeaderboardStep::System || !self.load_failed() {
      return None;
    }
    self.enter_catalog()
  }

  /// Choose an image. Clears everything derived from the previous image and
  /// returns a ticket for its metadata lookup.
  pub fn select_image(&mut self, image: impl Into<String>) -> Result<ImageTicket, WizardError> {
    let system_type = self.draft.system_type.ok_or(WizardError::NoSystemType)?;
    let image = image.into();

    self.clear_image();
    self.draft.image = image.clone();

    self.generation += 1;
    self.pending_image = Some(self.generation);
    Ok(ImageTicket {
      image,
      system_type,
      generation: self.generation,
    })
  }

  /// Deliver resolved image metadata. Fills the class name and arguments,
  /// and the system id unless the user already typed one.
  pub fn apply_image_metadata(&mut self, ticket: &ImageTicket, metadata: ImageMetadata) -> FetchApplied {
    if !self.awaits_image(ticket) {
      warn!(image = %ticket.image, "discarding stale image metadata");
      return FetchApplied::Stale;
    }

    self.pending_image = None;
    if self.draft.id.trim().is_empty()
      && let Some(id) = metadata.system_id()
    {
      self.draft.id = id.to_string();
    }
    self.draft.class_name = metadata.class_name;
    self.draft.arguments = Some(metadata.arguments);
    debug!(image = %ticket.image, "image metadata applied");
    FetchApplied::Applied
  }

  /// Clear the pending lookup after it failed.
  pub fn image_lookup_failed(&mut self, ticket: &ImageTicket) {
    if self.awaits_image(ticket) {
      self.pending_image = None;
    }
  }

  pub fn set_system_id(&mut self, id: impl Into<String>) {
    self.draft.id = id.into();
  }

  pub fn set_config_text(&mut self, text: impl Into<String>) {
    self.draft.config_text = text.into();
  }

  /// Validate and assemble the request body. Only available on the system
  /// step; validation failures raise a notice.
  pub fn build_request(&self) -> Result<LeaderboardRequest, WizardError> {
    if self.step != LeaderboardStep::System {
      return Err(WizardError::NotOnFinalStep {
        step: self.step.number(),
      });
    }

    self.assemble().map_err(|e| {
      warn!(error = %e, "leaderboard request rejected");
      self.notifier.notify(Notice::warning(e.to_string()));
      WizardError::Validation(e)
    })
  }

  fn assemble(&self) -> Result<LeaderboardRequest, ValidationError> {
    if self.run_name.trim().is_empty() {
      return Err(ValidationError::MissingRunName);
    }
    let system_type = self.draft.system_type.ok_or(ValidationError::MissingSystemType)?;
    if self.draft.image.trim().is_empty() {
      return Err(ValidationError::MissingImage);
    }
    if self.draft.id.trim().is_empty() {
      return Err(ValidationError::MissingSystemId);
    }

    let config = self.draft.config_text.trim();
    let parameters = if config.is_empty() {
      None
    } else {
      let value = serde_json::from_str::<Value>(config).map_err(|e| ValidationError::MalformedConfiguration {
        message: e.to_string(),
      })?;
      Some(value)
    };

    Ok(LeaderboardRequest {
      run_name: self.run_name.trim().to_string(),
      task_id: self.task.resource.id.clone(),
      system: SystemPayload {
        id: self.draft.id.trim().to_string(),
        system_type,
        image: self.draft.image.clone(),
        class_name: self.draft.class_name.clone(),
        arguments: self.draft.arguments.clone(),
        parameters,
      },
    })
  }

  fn awaits_image(&self, ticket: &ImageTicket) -> bool {
    self.pending_image == Some(ticket.generation)
      && self.draft.system_type == Some(ticket.system_type)
      && self.draft.image == ticket.image
  }

  /// Drop the image and everything derived from it.
  fn clear_image(&mut self) {
    self.draft.image.clear();
    self.draft.id.clear();
    self.draft.class_name = None;
    self.draft.arguments = None;
  }

  fn abandon_loading(&mut self, kind: CatalogKind) {
    if let Some(slot) = self.catalogs.get_mut(&kind)
      && slot.is_loading()
    {
      *slot = CatalogSlot::Idle;
    }
  }

  fn enter_catalog(&mut self) -> Option<FetchTicket> {
    let kind = self.draft.system_type?.catalog();
    let slot = self.catalogs.entry(kind).or_default();
    if !slot.needs_fetch() {
      return None;
    }
    self.generation += 1;
    *slot = CatalogSlot::Loading {
      generation: self.generation,
    };
    Some(FetchTicket::new(kind, self.generation))
  }
}
