//! Selection lists backing the wizard's catalog steps.
//!
//! Both variants hold clones of catalog entries, so argument edits made on a
//! selection never leak back into the catalog they were picked from.

use simlab_catalog::{Argument, Selectable};

use crate::error::SelectionError;

/// A list the user picks entries from.
pub trait SelectionList<T: Selectable> {
  /// Apply a click on `item`: replace for single selection, toggle
  /// membership by id for multi selection.
  fn toggle_or_replace(&mut self, item: T);

  /// The current selection in selection order.
  fn current(&self) -> &[T];

  fn is_selected(&self, id: &str) -> bool {
    self.current().iter().any(|item| item.id() == id)
  }

  fn is_empty(&self) -> bool {
    self.current().is_empty()
  }
}

/// Zero or one selected entry. Once something is selected the list never
/// returns to empty through clicks.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleSelection<T> {
  selected: Option<T>,
}

impl<T> Default for SingleSelection<T> {
  fn default() -> Self {
    Self { selected: None }
  }
}

impl<T: Selectable> SingleSelection<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self) -> Option<&T> {
    self.selected.as_ref()
  }

  /// Replace the selected entry with an edited copy of itself.
  pub(crate) fn set(&mut self, item: T) {
    self.selected = Some(item);
  }
}

impl<T: Selectable> SelectionList<T> for SingleSelection<T> {
  fn toggle_or_replace(&mut self, item: T) {
    if self.selected.as_ref().is_some_and(|s| s.id() == item.id()) {
      return;
    }
    self.selected = Some(item);
  }

  fn current(&self) -> &[T] {
    self.selected.as_slice()
  }
}

/// An ordered set of selected entries.
///
/// Clicks toggle by id. Configured additions may hold the same id more than
/// once as long as the argument values differ.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiSelection<T> {
  items: Vec<T>,
}

impl<T> Default for MultiSelection<T> {
  fn default() -> Self {
    Self { items: Vec::new() }
  }
}

impl<T: Selectable> MultiSelection<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn get(&self, index: usize) -> Option<&T> {
    self.items.get(index)
  }

  /// Add a configured entry. Rejected if an entry with the same id and equal
  /// argument values is already present.
  pub fn add(&mut self, item: T) -> Result<(), SelectionError> {
    if self.position(item.id(), item.arguments()).is_some() {
      return Err(SelectionError::DuplicateArguments {
        id: item.id().to_string(),
        name: item.name().to_string(),
      });
    }
    self.items.push(item);
    Ok(())
  }

  /// Remove the entry with this id and these argument values.
  pub fn remove(&mut self, id: &str, arguments: &[Argument]) -> Option<T> {
    let index = self.position(id, arguments)?;
    Some(self.items.remove(index))
  }

  /// Store an edited entry, replacing the one at `replacing` or appending.
  ///
  /// Rejected if another entry already has the same id and name.
  pub fn commit(&mut self, item: T, replacing: Option<usize>) -> Result<(), SelectionError> {
    if let Some(index) = replacing
      && index >= self.items.len()
    {
      return Err(SelectionError::NoSuchEntry { index });
    }

    let collides = self
      .items
      .iter()
      .enumerate()
      .any(|(i, other)| Some(i) != replacing && other.id() == item.id() && other.name() == item.name());
    if collides {
      return Err(SelectionError::DuplicateName {
        id: item.id().to_string(),
        name: item.name().to_string(),
      });
    }

    match replacing {
      Some(index) => self.items[index] = item,
      None => self.add(item)?,
    }
    Ok(())
  }

  fn position(&self, id: &str, arguments: &[Argument]) -> Option<usize> {
    self
      .items
      .iter()
      .position(|item| item.id() == id && item.arguments() == arguments)
  }
}

impl<T: Selectable> SelectionList<T> for MultiSelection<T> {
  fn toggle_or_replace(&mut self, item: T) {
    if self.is_selected(item.id()) {
      self.items.retain(|i| i.id() != item.id());
    } else {
      self.items.push(item);
    }
  }

  fn current(&self) -> &[T] {
    &self.items
  }
}
