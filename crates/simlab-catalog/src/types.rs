use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// The kinds of catalog the backend serves, one endpoint each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
  Tasks,
  Metrics,
  Agents,
  Simulators,
}

impl CatalogKind {
  /// Endpoint path relative to the API root.
  pub fn path(&self) -> &'static str {
    match self {
      CatalogKind::Tasks => "tasks",
      CatalogKind::Metrics => "metrics",
      CatalogKind::Agents => "agents",
      CatalogKind::Simulators => "simulators",
    }
  }
}

impl fmt::Display for CatalogKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.path())
  }
}

impl FromStr for CatalogKind {
  type Err = CatalogError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "tasks" | "task" => Ok(CatalogKind::Tasks),
      "metrics" | "metric" => Ok(CatalogKind::Metrics),
      "agents" | "agent" => Ok(CatalogKind::Agents),
      "simulators" | "simulator" => Ok(CatalogKind::Simulators),
      other => Err(CatalogError::UnknownKind(other.to_string())),
    }
  }
}

/// Which side of a dialogue a submitted system plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemType {
  Agent,
  Simulator,
}

impl SystemType {
  /// The catalog listing systems of this type.
  pub fn catalog(&self) -> CatalogKind {
    match self {
      SystemType::Agent => CatalogKind::Agents,
      SystemType::Simulator => CatalogKind::Simulators,
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      SystemType::Agent => "Conversational Agent",
      SystemType::Simulator => "User Simulator",
    }
  }
}

impl fmt::Display for SystemType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SystemType::Agent => f.write_str("agent"),
      SystemType::Simulator => f.write_str("simulator"),
    }
  }
}

impl FromStr for SystemType {
  type Err = CatalogError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "agent" => Ok(SystemType::Agent),
      "simulator" | "user_simulator" => Ok(SystemType::Simulator),
      other => Err(CatalogError::UnknownSystemType(other.to_string())),
    }
  }
}

/// Semantic kind of an argument, derived once from the backend's type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentType {
  Text,
  Number,
  Structured,
  Unknown,
}

impl ArgumentType {
  /// Map a backend primitive type tag ("str", "int", "Dict[str, Any]", ...).
  pub fn from_type_tag(tag: &str) -> Self {
    let tag = tag.trim().to_lowercase();
    let base = tag.split('[').next().unwrap_or_default().trim();
    match base {
      "str" | "string" | "text" => ArgumentType::Text,
      "int" | "integer" | "float" | "number" => ArgumentType::Number,
      "dict" | "list" | "object" | "array" | "json" | "tuple" => ArgumentType::Structured,
      _ => ArgumentType::Unknown,
    }
  }

  /// Derive the kind from a concrete JSON value.
  pub fn of_value(value: &serde_json::Value) -> Self {
    match value {
      serde_json::Value::String(_) => ArgumentType::Text,
      serde_json::Value::Number(_) => ArgumentType::Number,
      serde_json::Value::Object(_) | serde_json::Value::Array(_) => ArgumentType::Structured,
      _ => ArgumentType::Unknown,
    }
  }
}

impl fmt::Display for ArgumentType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      ArgumentType::Text => "string",
      ArgumentType::Number => "number",
      ArgumentType::Structured => "object",
      ArgumentType::Unknown => "unknown",
    };
    f.write_str(s)
  }
}

/// One configurable parameter of a resource.
///
/// Only the value is mutable: name and type are fixed by the backend
/// declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
  name: String,
  #[serde(rename = "type")]
  arg_type: ArgumentType,
  #[serde(default)]
  value: serde_json::Value,
}

impl Argument {
  pub fn new(name: impl Into<String>, arg_type: ArgumentType, value: serde_json::Value) -> Self {
    Self {
      name: name.into(),
      arg_type,
      value,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn arg_type(&self) -> ArgumentType {
    self.arg_type
  }

  pub fn value(&self) -> &serde_json::Value {
    &self.value
  }

  pub fn set_value(&mut self, value: serde_json::Value) {
    self.value = value;
  }
}

/// A selectable catalog entry: task, metric, agent or simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub arguments: Vec<Argument>,
}

impl Resource {
  pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      name: name.into(),
      description: String::new(),
      arguments: Vec::new(),
    }
  }

  pub fn with_argument(mut self, argument: Argument) -> Self {
    self.arguments.push(argument);
    self
  }

  /// Look up an argument by name.
  pub fn argument(&self, name: &str) -> Option<&Argument> {
    self.arguments.iter().find(|a| a.name() == name)
  }

  /// Arguments as a `{ name: value }` object, in declaration order.
  pub fn arguments_map(&self) -> serde_json::Map<String, serde_json::Value> {
    self
      .arguments
      .iter()
      .map(|a| (a.name().to_string(), a.value().clone()))
      .collect()
  }
}

/// A task: a resource plus the evaluation metrics applicable to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
  #[serde(flatten)]
  pub resource: Resource,
  #[serde(default)]
  pub metrics: Vec<Resource>,
}

impl Task {
  pub fn new(resource: Resource) -> Self {
    Self {
      resource,
      metrics: Vec::new(),
    }
  }

  pub fn with_metric(mut self, metric: Resource) -> Self {
    self.metrics.push(metric);
    self
  }
}

/// Anything a selection list can hold.
pub trait Selectable: Clone {
  fn id(&self) -> &str;
  fn name(&self) -> &str;
  fn set_name(&mut self, name: String);
  fn arguments(&self) -> &[Argument];

  /// Mutable access to argument values. The slice cannot be resized and
  /// [`Argument`] only exposes its value for mutation.
  fn arguments_mut(&mut self) -> &mut [Argument];
}

impl Selectable for Resource {
  fn id(&self) -> &str {
    &self.id
  }

  fn name(&self) -> &str {
    &self.name
  }

  fn set_name(&mut self, name: String) {
    self.name = name;
  }

  fn arguments(&self) -> &[Argument] {
    &self.arguments
  }

  fn arguments_mut(&mut self) -> &mut [Argument] {
    &mut self.arguments
  }
}

impl Selectable for Task {
  fn id(&self) -> &str {
    &self.resource.id
  }

  fn name(&self) -> &str {
    &self.resource.name
  }

  fn set_name(&mut self, name: String) {
    self.resource.name = name;
  }

  fn arguments(&self) -> &[Argument] {
    &self.resource.arguments
  }

  fn arguments_mut(&mut self) -> &mut [Argument] {
    &mut self.resource.arguments
  }
}
