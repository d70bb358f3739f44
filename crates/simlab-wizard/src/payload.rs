use serde::Serialize;
use serde_json::{Map, Value};
use simlab_catalog::{Selectable, SystemType};

/// A selected entry as sent to `/run-request`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedItem {
  pub id: String,
  pub name: String,
  pub arguments: Map<String, Value>,
}

impl SelectedItem {
  pub fn from_selected<T: Selectable>(item: &T) -> Self {
    Self {
      id: item.id().to_string(),
      name: item.name().to_string(),
      arguments: item
        .arguments()
        .iter()
        .map(|a| (a.name().to_string(), a.value().clone()))
        .collect(),
    }
  }
}

/// Body of a full-flow run request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRequest {
  pub run_name: String,
  pub task_id: String,
  pub task_arguments: Map<String, Value>,
  pub metrics: Vec<SelectedItem>,
  pub agents: Vec<SelectedItem>,
  #[serde(rename = "userSimulators")]
  pub user_simulators: Vec<SelectedItem>,
}

/// The system submitted to a public leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemPayload {
  pub id: String,
  #[serde(rename = "type")]
  pub system_type: SystemType,
  pub image: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub class_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub arguments: Option<Map<String, Value>>,
  /// Parsed configuration text.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub parameters: Option<Value>,
}

/// Body of a public-leaderboard run request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRequest {
  pub run_name: String,
  pub task_id: String,
  pub system: SystemPayload,
}
