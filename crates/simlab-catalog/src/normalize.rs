//! Conversion of raw backend documents into catalog types.
//!
//! The backend is not consistent about document shape: tasks carry their
//! arguments as a `{key: value}` bag with the applicable metrics nested inside
//! it, while agents and simulators declare `[{name, type, default,
//! configurable}]` lists. Everything is normalized here, once, so the rest of
//! the client only ever sees [`Resource`] and [`Task`].

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::CatalogError;
use crate::types::{Argument, ArgumentType, CatalogKind, Resource, Task};

/// A normalized catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum Catalog {
  Tasks(Vec<Task>),
  Resources {
    kind: CatalogKind,
    entries: Vec<Resource>,
  },
}

impl Catalog {
  /// An empty catalog of the given kind.
  pub fn empty(kind: CatalogKind) -> Self {
    match kind {
      CatalogKind::Tasks => Catalog::Tasks(Vec::new()),
      kind => Catalog::Resources {
        kind,
        entries: Vec::new(),
      },
    }
  }

  pub fn kind(&self) -> CatalogKind {
    match self {
      Catalog::Tasks(_) => CatalogKind::Tasks,
      Catalog::Resources { kind, .. } => *kind,
    }
  }

  pub fn len(&self) -> usize {
    match self {
      Catalog::Tasks(tasks) => tasks.len(),
      Catalog::Resources { entries, .. } => entries.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Borrow every entry as a plain resource (tasks without their metrics).
  pub fn resources(&self) -> Vec<&Resource> {
    match self {
      Catalog::Tasks(tasks) => tasks.iter().map(|t| &t.resource).collect(),
      Catalog::Resources { entries, .. } => entries.iter().collect(),
    }
  }

  pub fn into_tasks(self) -> Option<Vec<Task>> {
    match self {
      Catalog::Tasks(tasks) => Some(tasks),
      Catalog::Resources { .. } => None,
    }
  }

  pub fn into_resources(self) -> Option<Vec<Resource>> {
    match self {
      Catalog::Tasks(_) => None,
      Catalog::Resources { entries, .. } => Some(entries),
    }
  }
}

/// Normalize a raw catalog body of the given kind.
///
/// Entries without a usable id are skipped, as are later entries repeating an
/// id already seen in the same document.
pub fn normalize(kind: CatalogKind, raw: &Value) -> Result<Catalog, CatalogError> {
  let items = match raw {
    Value::Array(items) => items,
    Value::Object(obj) => {
      let message = obj
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("No {} found", kind));
      return Err(CatalogError::NoEntries { kind, message });
    }
    other => {
      return Err(CatalogError::UnexpectedShape {
        kind,
        message: format!("expected a list, got {}", json_kind(other)),
      });
    }
  };

  let mut seen = HashSet::new();
  let mut tasks = Vec::new();
  let mut entries = Vec::new();

  for (index, item) in items.iter().enumerate() {
    let Some(obj) = item.as_object() else {
      warn!(%kind, index, "skipping catalog entry that is not an object");
      continue;
    };
    let Some(id) = extract_id(obj.get("_id")).or_else(|| extract_id(obj.get("id"))) else {
      warn!(%kind, index, "skipping catalog entry without an id");
      continue;
    };
    if !seen.insert(id.clone()) {
      warn!(%kind, index, id = %id, "skipping duplicate catalog entry");
      continue;
    }

    let resource = parse_resource(kind, id, obj);
    if kind == CatalogKind::Tasks {
      let metrics = obj
        .get("arguments")
        .and_then(|a| a.get("metrics"))
        .map(parse_metrics)
        .unwrap_or_default();
      tasks.push(Task { resource, metrics });
    } else {
      entries.push(resource);
    }
  }

  Ok(match kind {
    CatalogKind::Tasks => Catalog::Tasks(tasks),
    kind => Catalog::Resources { kind, entries },
  })
}

fn parse_resource(kind: CatalogKind, id: String, obj: &Map<String, Value>) -> Resource {
  let raw_arguments = obj.get("arguments");

  let name = str_field(obj, "name")
    .or_else(|| raw_arguments.and_then(|a| a.get("name")).and_then(Value::as_str))
    .or_else(|| str_field(obj, "tag"))
    .map(str::to_string)
    .unwrap_or_else(|| id.clone());

  let exclude: &[&str] = match kind {
    CatalogKind::Tasks => &["metrics"],
    _ => &[],
  };

  Resource {
    id,
    name,
    description: str_field(obj, "description").unwrap_or_default().to_string(),
    arguments: raw_arguments
      .map(|a| parse_arguments(a, exclude))
      .unwrap_or_default(),
  }
}

fn parse_metrics(raw: &Value) -> Vec<Resource> {
  let Some(items) = raw.as_array() else {
    return Vec::new();
  };

  items
    .iter()
    .filter_map(Value::as_object)
    .map(|obj| {
      let id = extract_id(obj.get("id"))
        .or_else(|| extract_id(obj.get("_id")))
        .unwrap_or_default();
      let raw_arguments = obj.get("arguments");
      let name = raw_arguments
        .and_then(|a| a.get("name"))
        .and_then(Value::as_str)
        .or_else(|| str_field(obj, "name"))
        .unwrap_or_default()
        .to_string();

      Resource {
        id,
        name,
        description: str_field(obj, "description").unwrap_or_default().to_string(),
        arguments: raw_arguments
          .map(|a| parse_arguments(a, &[]))
          .unwrap_or_default(),
      }
    })
    .collect()
}

/// Arguments from either a declared list or a `{key: value}` bag.
fn parse_arguments(raw: &Value, exclude: &[&str]) -> Vec<Argument> {
  match raw {
    Value::Array(declarations) => declarations
      .iter()
      .filter_map(Value::as_object)
      .filter_map(parse_declaration)
      .collect(),
    Value::Object(bag) => bag
      .iter()
      .filter(|(key, _)| !exclude.contains(&key.as_str()))
      .map(|(key, value)| Argument::new(key.clone(), ArgumentType::of_value(value), value.clone()))
      .collect(),
    _ => Vec::new(),
  }
}

fn parse_declaration(decl: &Map<String, Value>) -> Option<Argument> {
  let name = str_field(decl, "name")?;
  let configurable = decl
    .get("configurable")
    .and_then(Value::as_bool)
    .unwrap_or(false);
  if !configurable {
    return None;
  }

  let value = decl
    .get("default")
    .or_else(|| decl.get("value"))
    .cloned()
    .unwrap_or(Value::Null);
  let arg_type = match str_field(decl, "type") {
    Some(tag) => ArgumentType::from_type_tag(tag),
    None => ArgumentType::of_value(&value),
  };

  Some(Argument::new(name, arg_type, value))
}

fn extract_id(raw: Option<&Value>) -> Option<String> {
  match raw? {
    Value::String(s) if !s.is_empty() => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Object(obj) => obj.get("$oid").and_then(Value::as_str).map(str::to_string),
    _ => None,
  }
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
  obj.get(key).and_then(Value::as_str)
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "a list",
    Value::Object(_) => "an object",
  }
}
