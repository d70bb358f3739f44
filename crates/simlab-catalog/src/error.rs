use thiserror::Error;

use crate::types::CatalogKind;

/// Errors produced while interpreting a raw catalog document.
#[derive(Debug, Error)]
pub enum CatalogError {
  /// The backend answered with an object instead of a list, e.g.
  /// `{"message": "No agents found"}`.
  #[error("no {kind} available: {message}")]
  NoEntries { kind: CatalogKind, message: String },

  /// The body is neither a list nor an object.
  #[error("unexpected {kind} document: {message}")]
  UnexpectedShape { kind: CatalogKind, message: String },

  #[error("unknown catalog kind: {0}")]
  UnknownKind(String),

  #[error("unknown system type: {0}")]
  UnknownSystemType(String),
}
