use std::fmt;

use simlab_catalog::{Catalog, CatalogKind};

/// Steps of the full submission flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
  Task = 1,
  Metrics = 2,
  Agents = 3,
  Simulators = 4,
  Review = 5,
}

impl Step {
  pub const FIRST: Step = Step::Task;
  pub const LAST: Step = Step::Review;

  pub fn number(self) -> u8 {
    self as u8
  }

  pub fn next(self) -> Option<Step> {
    match self {
      Step::Task => Some(Step::Metrics),
      Step::Metrics => Some(Step::Agents),
      Step::Agents => Some(Step::Simulators),
      Step::Simulators => Some(Step::Review),
      Step::Review => None,
    }
  }

  pub fn prev(self) -> Option<Step> {
    match self {
      Step::Task => None,
      Step::Metrics => Some(Step::Task),
      Step::Agents => Some(Step::Metrics),
      Step::Simulators => Some(Step::Agents),
      Step::Review => Some(Step::Simulators),
    }
  }

  /// The catalog listed on this step, if any.
  pub fn catalog(self) -> Option<CatalogKind> {
    match self {
      Step::Task => Some(CatalogKind::Tasks),
      Step::Metrics => Some(CatalogKind::Metrics),
      Step::Agents => Some(CatalogKind::Agents),
      Step::Simulators => Some(CatalogKind::Simulators),
      Step::Review => None,
    }
  }
}

impl fmt::Display for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      Step::Task => "task",
      Step::Metrics => "metrics",
      Step::Agents => "agents",
      Step::Simulators => "simulators",
      Step::Review => "review",
    };
    write!(f, "{} ({})", self.number(), label)
  }
}

/// Permission to apply one catalog fetch result.
///
/// Issued on step entry. The result is applied only while the ticket is still
/// the latest one for its catalog and the wizard has not moved away from the
/// step it was issued for; otherwise it is discarded as stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
  kind: CatalogKind,
  generation: u64,
}

impl FetchTicket {
  pub(crate) fn new(kind: CatalogKind, generation: u64) -> Self {
    Self { kind, generation }
  }

  pub fn kind(&self) -> CatalogKind {
    self.kind
  }

  pub fn generation(&self) -> u64 {
    self.generation
  }
}

/// Load state of one catalog within a wizard.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) enum CatalogSlot {
  #[default]
  Idle,
  Loading {
    generation: u64,
  },
  Loaded(Catalog),
  /// The last fetch failed. Re-entering the step fetches again.
  Failed,
}

impl CatalogSlot {
  pub(crate) fn is_loading(&self) -> bool {
    matches!(self, CatalogSlot::Loading { .. })
  }

  pub(crate) fn is_failed(&self) -> bool {
    matches!(self, CatalogSlot::Failed)
  }

  pub(crate) fn needs_fetch(&self) -> bool {
    matches!(self, CatalogSlot::Idle | CatalogSlot::Failed)
  }

  pub(crate) fn awaits(&self, generation: u64) -> bool {
    matches!(self, CatalogSlot::Loading { generation: g } if *g == generation)
  }

  pub(crate) fn loaded(&self) -> Option<&Catalog> {
    match self {
      CatalogSlot::Loaded(catalog) => Some(catalog),
      _ => None,
    }
  }
}

/// Outcome of a `next`/`back` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<S> {
  pub from: S,
  pub to: S,
  /// Fetch to perform for the entered step.
  pub fetch: Option<FetchTicket>,
}

impl<S: PartialEq> Transition<S> {
  pub fn moved(&self) -> bool {
    self.from != self.to
  }
}

/// What happened to a delivered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchApplied {
  Applied,
  Stale,
}
