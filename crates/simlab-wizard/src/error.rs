use simlab_catalog::{ArgumentType, CatalogKind};
use thiserror::Error;

/// Rejected selection changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
  /// Same id and equal argument values are already selected.
  #[error("\"{name}\" is already selected with the same arguments.")]
  DuplicateArguments { id: String, name: String },

  /// Another selected entry has the same id and name.
  #[error("A resource with the name \"{name}\" already exists.")]
  DuplicateName { id: String, name: String },

  #[error("no selected entry at position {index}")]
  NoSuchEntry { index: usize },
}

/// Errors raised while editing argument values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
  #[error("unknown argument '{name}'")]
  UnknownArgument { name: String },

  #[error("invalid value for '{name}' (expected {expected}): {message}")]
  InvalidValue {
    name: String,
    expected: ArgumentType,
    message: String,
  },

  #[error("this entry cannot be renamed")]
  RenameNotAllowed,

  #[error("name cannot be empty")]
  EmptyName,
}

/// Missing or malformed input detected before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("Please fill in all required fields: run name.")]
  MissingRunName,

  #[error("Please fill in all required fields: task.")]
  MissingTask,

  #[error("Please fill in all required fields: system type.")]
  MissingSystemType,

  #[error("Please fill in all required fields: image.")]
  MissingImage,

  #[error("Please fill in all required fields: system id.")]
  MissingSystemId,

  #[error("Invalid JSON configuration: {message}")]
  MalformedConfiguration { message: String },
}

/// Errors from wizard controller operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
  #[error("submit is only available on the final step (currently on step {step})")]
  NotOnFinalStep { step: u8 },

  #[error("No task selected. Please go back to the tasks page and select a task.")]
  NoTaskSelected,

  #[error("no {kind} entry with id '{id}' in the loaded catalog")]
  UnknownResource { kind: CatalogKind, id: String },

  /// A catalog could not be fetched or was not understood.
  #[error("Error fetching {kind}. Please contact the admin.")]
  CatalogUnavailable { kind: CatalogKind },

  #[error("choose a system type first")]
  NoSystemType,

  /// Metadata for the chosen image could not be resolved.
  #[error("{message}")]
  ImageLookup { image: String, message: String },

  #[error(transparent)]
  Selection(#[from] SelectionError),

  #[error(transparent)]
  Editor(#[from] EditorError),

  #[error(transparent)]
  Validation(#[from] ValidationError),
}
