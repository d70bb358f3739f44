use std::collections::HashMap;
use std::sync::Arc;

use simlab_catalog::{Argument, Catalog, CatalogKind, Resource, Task};
use tracing::{debug, info, warn};

use crate::editor::{ArgumentEditor, CommitRejected};
use crate::error::{ValidationError, WizardError};
use crate::notice::{Notice, Notifier};
use crate::payload::{RunRequest, SelectedItem};
use crate::selection::{MultiSelection, SelectionList, SingleSelection};
use crate::step::{CatalogSlot, FetchApplied, FetchTicket, Step, Transition};

/// The multi-selection lists of the full flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
  Metrics,
  Agents,
  Simulators,
}

impl ListKind {
  pub fn catalog(self) -> CatalogKind {
    match self {
      ListKind::Metrics => CatalogKind::Metrics,
      ListKind::Agents => CatalogKind::Agents,
      ListKind::Simulators => CatalogKind::Simulators,
    }
  }
}

/// Controller of the five-step run submission flow.
///
/// Owns the whole session. Widgets change it only through the setters
/// below, and every change lands in the session immediately.
pub struct RunWizard {
  step: Step,
  run_name: String,
  task: SingleSelection<Task>,
  metrics: MultiSelection<Resource>,
  agents: MultiSelection<Resource>,
  simulators: MultiSelection<Resource>,
  catalogs: HashMap<CatalogKind, CatalogSlot>,
  generation: u64,
  notifier: Arc<dyn Notifier>,
}

impl RunWizard {
  pub fn new(notifier: Arc<dyn Notifier>) -> Self {
    Self {
      step: Step::FIRST,
      run_name: String::new(),
      task: SingleSelection::new(),
      metrics: MultiSelection::new(),
      agents: MultiSelection::new(),
      simulators: MultiSelection::new(),
      catalogs: HashMap::new(),
      generation: 0,
      notifier,
    }
  }

  pub fn step(&self) -> Step {
    self.step
  }

  pub fn run_name(&self) -> &str {
    &self.run_name
  }

  pub fn task(&self) -> Option<&Task> {
    self.task.get()
  }

  pub fn selection(&self, list: ListKind) -> &MultiSelection<Resource> {
    match list {
      ListKind::Metrics => &self.metrics,
      ListKind::Agents => &self.agents,
      ListKind::Simulators => &self.simulators,
    }
  }

  /// A catalog loaded during this session.
  pub fn catalog(&self, kind: CatalogKind) -> Option<&Catalog> {
    self.catalogs.get(&kind).and_then(CatalogSlot::loaded)
  }

  /// Whether the current step's list is still waiting for its catalog.
  pub fn is_loading(&self) -> bool {
    self
      .step
      .catalog()
      .and_then(|kind| self.catalogs.get(&kind))
      .is_some_and(CatalogSlot::is_loading)
  }

  /// Whether the current step's catalog could not be fetched.
  pub fn load_failed(&self) -> bool {
    self
      .step
      .catalog()
      .and_then(|kind| self.catalogs.get(&kind))
      .is_some_and(CatalogSlot::is_failed)
  }

  /// Ticket for the initial step's catalog. `None` once it is loading or
  /// loaded.
  pub fn start(&mut self) -> Option<FetchTicket> {
    self.enter(self.step)
  }

  /// Ticket for fetching the current step's catalog again after a failure.
  pub fn retry(&mut self) -> Option<FetchTicket> {
    if !self.load_failed() {
      return None;
    }
    info!(step = self.step.number(), "retrying catalog fetch");
    self.enter(self.step)
  }

  /// Advance one step. A no-op on the last step.
  pub fn next(&mut self) -> Transition<Step> {
    let from = self.step;
    let Some(to) = from.next() else {
      return Transition {
        from,
        to: from,
        fetch: None,
      };
    };
    self.leave(from);
    self.step = to;
    let fetch = self.enter(to);
    info!(from = from.number(), to = to.number(), "wizard advanced");
    Transition { from, to, fetch }
  }

  /// Go back one step. A no-op on the first step. Nothing entered is lost.
  pub fn back(&mut self) -> Transition<Step> {
    let from = self.step;
    let Some(to) = from.prev() else {
      return Transition {
        from,
        to: from,
        fetch: None,
      };
    };
    self.leave(from);
    self.step = to;
    let fetch = self.enter(to);
    info!(from = from.number(), to = to.number(), "wizard went back");
    Transition { from, to, fetch }
  }

  /// Deliver a fetched catalog. Applied only if the wizard is still on the
  /// ticket's step and the ticket is the latest for that catalog.
  pub fn apply_fetch(&mut self, ticket: &FetchTicket, catalog: Catalog) -> FetchApplied {
    let kind = ticket.kind();
    let current = self.step.catalog() == Some(kind) && catalog.kind() == kind;
    let slot = self.catalogs.entry(kind).or_default();

    if !current || !slot.awaits(ticket.generation()) {
      warn!(%kind, generation = ticket.generation(), step = self.step.number(), "discarding stale catalog");
      return FetchApplied::Stale;
    }

    debug!(%kind, entries = catalog.len(), "catalog applied");
    *slot = CatalogSlot::Loaded(catalog);
    FetchApplied::Applied
  }

  /// Record that the fetch behind `ticket` failed. The step fetches again
  /// when it is re-entered or retried.
  pub fn fetch_failed(&mut self, ticket: &FetchTicket) -> FetchApplied {
    let kind = ticket.kind();
    let slot = self.catalogs.entry(kind).or_default();
    if !slot.awaits(ticket.generation()) {
      return FetchApplied::Stale;
    }
    warn!(%kind, generation = ticket.generation(), "catalog fetch failed");
    *slot = CatalogSlot::Failed;
    FetchApplied::Applied
  }

  pub fn set_run_name(&mut self, name: impl Into<String>) {
    self.run_name = name.into();
  }

  /// Select a task from the loaded task catalog.
  pub fn select_task(&mut self, id: &str) -> Result<(), WizardError> {
    let task = self
      .find_task(id)
      .cloned()
      .ok_or_else(|| WizardError::UnknownResource {
        kind: CatalogKind::Tasks,
        id: id.to_string(),
      })?;
    self.task.toggle_or_replace(task);
    Ok(())
  }

  /// Toggle a catalog entry in one of the multi-selection lists.
  pub fn toggle(&mut self, list: ListKind, id: &str) -> Result<(), WizardError> {
    let item = self.find_resource(list.catalog(), id)?.clone();
    self.list_mut(list).toggle_or_replace(item);
    Ok(())
  }

  /// Add a configured entry. Duplicates (same id and argument values) are
  /// rejected with a warning notice.
  pub fn add(&mut self, list: ListKind, item: Resource) -> Result<(), WizardError> {
    if let Err(e) = self.list_mut(list).add(item) {
      self.notifier.notify(Notice::warning(e.to_string()));
      return Err(e.into());
    }
    Ok(())
  }

  pub fn remove(&mut self, list: ListKind, id: &str, arguments: &[Argument]) -> Option<Resource> {
    self.list_mut(list).remove(id, arguments)
  }

  /// Open an editor configuring a catalog entry before adding it.
  pub fn begin_add(&self, list: ListKind, id: &str) -> Result<ArgumentEditor<Resource>, WizardError> {
    let item = self.find_resource(list.catalog(), id)?;
    Ok(ArgumentEditor::for_addition(item.clone()))
  }

  /// Open an editor on the selected entry at `index`.
  pub fn begin_edit(&self, list: ListKind, index: usize) -> Option<ArgumentEditor<Resource>> {
    let item = self.selection(list).get(index)?;
    Some(ArgumentEditor::for_existing(item.clone(), index))
  }

  /// Save an editor into its list. On a name collision a warning notice is
  /// raised and the editor comes back for another try.
  pub fn commit_edit(
    &mut self,
    list: ListKind,
    editor: ArgumentEditor<Resource>,
  ) -> Result<(), Box<CommitRejected<Resource>>> {
    let result = editor.commit(self.list_mut(list));
    if let Err(rejected) = &result {
      self.notifier.notify(Notice::warning(rejected.error.to_string()));
    }
    result
  }

  /// Open an editor on the selected task's arguments.
  pub fn begin_task_edit(&self) -> Option<ArgumentEditor<Task>> {
    self
      .task
      .get()
      .map(|task| ArgumentEditor::for_existing(task.clone(), 0))
  }

  pub fn commit_task_edit(&mut self, editor: ArgumentEditor<Task>) {
    editor.commit_single(&mut self.task);
  }

  /// Validate the session and assemble the request body. Only available on
  /// the review step; validation failures raise a notice.
  pub fn build_request(&self) -> Result<RunRequest, WizardError> {
    if self.step != Step::LAST {
      return Err(WizardError::NotOnFinalStep {
        step: self.step.number(),
      });
    }

    let task = match self.validate() {
      Ok(task) => task,
      Err(e) => {
        warn!(error = %e, "run request rejected");
        self.notifier.notify(Notice::warning(e.to_string()));
        return Err(e.into());
      }
    };

    Ok(RunRequest {
      run_name: self.run_name.trim().to_string(),
      task_id: task.resource.id.clone(),
      task_arguments: task.resource.arguments_map(),
      metrics: items(&self.metrics),
      agents: items(&self.agents),
      user_simulators: items(&self.simulators),
    })
  }

  fn validate(&self) -> Result<&Task, ValidationError> {
    if self.run_name.trim().is_empty() {
      return Err(ValidationError::MissingRunName);
    }
    self.task.get().ok_or(ValidationError::MissingTask)
  }

  /// Abandon an in-flight fetch for the step being left.
  fn leave(&mut self, step: Step) {
    if let Some(kind) = step.catalog()
      && let Some(slot) = self.catalogs.get_mut(&kind)
      && slot.is_loading()
    {
      *slot = CatalogSlot::Idle;
    }
  }

  fn enter(&mut self, step: Step) -> Option<FetchTicket> {
    let kind = step.catalog()?;
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

  fn find_task(&self, id: &str) -> Option<&Task> {
    match self.catalog(CatalogKind::Tasks)? {
      Catalog::Tasks(tasks) => tasks.iter().find(|t| t.resource.id == id),
      Catalog::Resources { .. } => None,
    }
  }

  fn find_resource(&self, kind: CatalogKind, id: &str) -> Result<&Resource, WizardError> {
    let found = match self.catalog(kind) {
      Some(Catalog::Resources { entries, .. }) => entries.iter().find(|r| r.id == id),
      _ => None,
    };
    found.ok_or_else(|| WizardError::UnknownResource {
      kind,
      id: id.to_string(),
    })
  }

  fn list_mut(&mut self, list: ListKind) -> &mut MultiSelection<Resource> {
    match list {
      ListKind::Metrics => &mut self.metrics,
      ListKind::Agents => &mut self.agents,
      ListKind::Simulators => &mut self.simulators,
    }
  }
}

fn items(list: &MultiSelection<Resource>) -> Vec<SelectedItem> {
  list.current().iter().map(SelectedItem::from_selected).collect()
}
