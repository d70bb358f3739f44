use serde_json::Value;
use simlab_catalog::{Argument, ArgumentType, Selectable};

use crate::error::{EditorError, SelectionError};
use crate::selection::{MultiSelection, SingleSelection};

/// Where an edited entry goes when it is saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
  /// Replace the selected entry at `index`.
  Existing { index: usize },
  /// Append as a new configured entry.
  Add,
}

/// A save the selection refused. The editor is handed back unchanged so the
/// user can fix the entry and try again.
#[derive(Debug)]
pub struct CommitRejected<T: Selectable> {
  pub error: SelectionError,
  pub editor: ArgumentEditor<T>,
}

/// Edits the argument values (and optionally the name) of one entry.
///
/// Works on a copy: nothing reaches the selection until [`commit`] succeeds,
/// and [`cancel`] returns the untouched original.
///
/// [`commit`]: ArgumentEditor::commit
/// [`cancel`]: ArgumentEditor::cancel
#[derive(Debug, Clone)]
pub struct ArgumentEditor<T: Selectable> {
  original: T,
  draft: T,
  mode: EditMode,
  renamable: bool,
}

impl<T: Selectable> ArgumentEditor<T> {
  /// Edit a selected entry in place. Its name is fixed.
  pub fn for_existing(item: T, index: usize) -> Self {
    Self {
      draft: item.clone(),
      original: item,
      mode: EditMode::Existing { index },
      renamable: false,
    }
  }

  /// Configure a catalog entry before adding it. The name is editable so
  /// several configurations of one resource can be told apart.
  pub fn for_addition(item: T) -> Self {
    Self {
      draft: item.clone(),
      original: item,
      mode: EditMode::Add,
      renamable: true,
    }
  }

  pub fn mode(&self) -> EditMode {
    self.mode
  }

  pub fn draft(&self) -> &T {
    &self.draft
  }

  pub fn original(&self) -> &T {
    &self.original
  }

  pub fn entries(&self) -> &[Argument] {
    self.draft.arguments()
  }

  pub fn is_dirty(&self) -> bool {
    self.draft.name() != self.original.name() || self.draft.arguments() != self.original.arguments()
  }

  /// Set a value directly. The value must fit the argument's type; `null`
  /// always fits.
  pub fn set_value(&mut self, name: &str, value: Value) -> Result<(), EditorError> {
    let argument = self.argument_mut(name)?;
    check_fits(argument, &value)?;
    argument.set_value(value);
    Ok(())
  }

  /// Set a value from user text, parsed according to the argument's type.
  pub fn set_text(&mut self, name: &str, raw: &str) -> Result<(), EditorError> {
    let argument = self.argument_mut(name)?;
    let value = parse_text(argument, raw)?;
    argument.set_value(value);
    Ok(())
  }

  pub fn rename(&mut self, name: impl Into<String>) -> Result<(), EditorError> {
    if !self.renamable {
      return Err(EditorError::RenameNotAllowed);
    }
    let name = name.into();
    if name.trim().is_empty() {
      return Err(EditorError::EmptyName);
    }
    self.draft.set_name(name.trim().to_string());
    Ok(())
  }

  /// The edited copy.
  pub fn finish(self) -> T {
    self.draft
  }

  /// Drop the edits and return the entry as it was when editing began.
  pub fn cancel(self) -> T {
    self.original
  }

  /// Save the edited copy into a multi selection.
  pub fn commit(self, list: &mut MultiSelection<T>) -> Result<(), Box<CommitRejected<T>>> {
    let replacing = match self.mode {
      EditMode::Existing { index } => Some(index),
      EditMode::Add => None,
    };
    match list.commit(self.draft.clone(), replacing) {
      Ok(()) => Ok(()),
      Err(error) => Err(Box::new(CommitRejected {
        error,
        editor: self,
      })),
    }
  }

  /// Save the edited copy as the single selected entry.
  pub fn commit_single(self, selection: &mut SingleSelection<T>) {
    selection.set(self.draft);
  }

  fn argument_mut(&mut self, name: &str) -> Result<&mut Argument, EditorError> {
    self
      .draft
      .arguments_mut()
      .iter_mut()
      .find(|a| a.name() == name)
      .ok_or_else(|| EditorError::UnknownArgument {
        name: name.to_string(),
      })
  }
}

fn check_fits(argument: &Argument, value: &Value) -> Result<(), EditorError> {
  let fits = match (argument.arg_type(), value) {
    (_, Value::Null) | (ArgumentType::Unknown, _) => true,
    (ArgumentType::Text, Value::String(_)) => true,
    (ArgumentType::Number, Value::Number(_)) => true,
    (ArgumentType::Structured, Value::Object(_) | Value::Array(_)) => true,
    _ => false,
  };
  if fits {
    Ok(())
  } else {
    Err(invalid(argument, format!("got {value}")))
  }
}

fn parse_text(argument: &Argument, raw: &str) -> Result<Value, EditorError> {
  let trimmed = raw.trim();
  match argument.arg_type() {
    ArgumentType::Text => Ok(Value::String(raw.to_string())),
    _ if trimmed.is_empty() => Ok(Value::Null),
    ArgumentType::Number => {
      if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(Value::from(n));
      }
      trimmed
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| invalid(argument, format!("'{trimmed}' is not a number")))
    }
    ArgumentType::Structured => match serde_json::from_str::<Value>(trimmed) {
      Ok(value @ (Value::Object(_) | Value::Array(_))) => Ok(value),
      Ok(other) => Err(invalid(argument, format!("expected an object or list, got {other}"))),
      Err(e) => Err(invalid(argument, e.to_string())),
    },
    ArgumentType::Unknown => {
      Ok(serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(raw.to_string())))
    }
  }
}

fn invalid(argument: &Argument, message: String) -> EditorError {
  EditorError::InvalidValue {
    name: argument.name().to_string(),
    expected: argument.arg_type(),
    message,
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use simlab_catalog::Resource;

  use super::*;
  use crate::selection::SelectionList;

  fn agent() -> Resource {
    Resource::new("a1", "Agent")
      .with_argument(Argument::new("temperature", ArgumentType::Number, json!(0.7)))
      .with_argument(Argument::new("prompt", ArgumentType::Text, json!("hi")))
      .with_argument(Argument::new("options", ArgumentType::Structured, Value::Null))
      .with_argument(Argument::new("extra", ArgumentType::Unknown, Value::Null))
  }

  #[test]
  fn test_set_text_parses_by_type() {
    let mut editor = ArgumentEditor::for_addition(agent());
    editor.set_text("temperature", "0.2").unwrap();
    editor.set_text("prompt", "  hello ").unwrap();
    editor.set_text("options", r#"{"k": [1, 2]}"#).unwrap();
    editor.set_text("extra", "true").unwrap();

    let draft = editor.finish();
    assert_eq!(draft.arguments[0].value(), &json!(0.2));
    assert_eq!(draft.arguments[1].value(), &json!("  hello "));
    assert_eq!(draft.arguments[2].value(), &json!({"k": [1, 2]}));
    assert_eq!(draft.arguments[3].value(), &json!(true));
  }

  #[test]
  fn test_integers_stay_integers() {
    let mut editor = ArgumentEditor::for_addition(agent());
    editor.set_text("temperature", "3").unwrap();
    assert_eq!(editor.draft().arguments[0].value(), &json!(3));
  }

  #[test]
  fn test_unknown_falls_back_to_text() {
    let mut editor = ArgumentEditor::for_addition(agent());
    editor.set_text("extra", "not json").unwrap();
    assert_eq!(editor.draft().arguments[3].value(), &json!("not json"));
  }

  #[test]
  fn test_invalid_values_rejected() {
    let mut editor = ArgumentEditor::for_addition(agent());
    assert!(matches!(
      editor.set_text("temperature", "warm"),
      Err(EditorError::InvalidValue { .. })
    ));
    assert!(matches!(
      editor.set_text("options", "{broken"),
      Err(EditorError::InvalidValue { .. })
    ));
    assert!(matches!(
      editor.set_text("options", "42"),
      Err(EditorError::InvalidValue { .. })
    ));
    assert!(matches!(
      editor.set_value("prompt", json!(1)),
      Err(EditorError::InvalidValue { .. })
    ));
    assert_eq!(
      editor.set_text("missing", "1"),
      Err(EditorError::UnknownArgument {
        name: "missing".to_string()
      })
    );
    assert!(!editor.is_dirty());
  }

  #[test]
  fn test_editing_keeps_name_and_type() {
    let mut editor = ArgumentEditor::for_addition(agent());
    editor.set_value("temperature", Value::Null).unwrap();
    let draft = editor.finish();
    assert_eq!(draft.arguments[0].name(), "temperature");
    assert_eq!(draft.arguments[0].arg_type(), ArgumentType::Number);
  }

  #[test]
  fn test_rename_only_when_allowed() {
    let mut editor = ArgumentEditor::for_existing(agent(), 0);
    assert_eq!(editor.rename("New"), Err(EditorError::RenameNotAllowed));

    let mut editor = ArgumentEditor::for_addition(agent());
    assert_eq!(editor.rename("   "), Err(EditorError::EmptyName));
    editor.rename("Agent (cold)").unwrap();
    assert_eq!(editor.draft().name, "Agent (cold)");
  }

  #[test]
  fn test_cancel_returns_original() {
    let mut editor = ArgumentEditor::for_addition(agent());
    editor.set_text("temperature", "0.1").unwrap();
    assert!(editor.is_dirty());
    assert_eq!(editor.cancel(), agent());
  }

  #[test]
  fn test_commit_existing_replaces() {
    let mut list = MultiSelection::new();
    list.toggle_or_replace(agent());

    let mut editor = ArgumentEditor::for_existing(list.get(0).unwrap().clone(), 0);
    editor.set_text("prompt", "bye").unwrap();
    editor.commit(&mut list).unwrap();

    assert_eq!(list.len(), 1);
    assert_eq!(list.get(0).unwrap().arguments[1].value(), &json!("bye"));
  }

  #[test]
  fn test_rejected_commit_keeps_editor_open() {
    let mut list = MultiSelection::new();
    list.toggle_or_replace(agent());

    let mut editor = ArgumentEditor::for_addition(agent());
    editor.set_text("temperature", "0.1").unwrap();
    let rejected = editor.commit(&mut list).unwrap_err();
    assert_eq!(
      rejected.error.to_string(),
      "A resource with the name \"Agent\" already exists."
    );
    assert_eq!(list.len(), 1);

    let mut editor = rejected.editor;
    assert_eq!(editor.draft().arguments[0].value(), &json!(0.1));
    editor.rename("Agent (cold)").unwrap();
    editor.commit(&mut list).unwrap();
    assert_eq!(list.len(), 2);
  }
}
