use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use simlab_catalog::{Resource, SystemType};

use crate::ListingError;

/// Keep the resources whose name or id contains `term`, ignoring case.
/// An empty term keeps everything.
pub fn search<'a>(items: &'a [Resource], term: &str) -> Vec<&'a Resource> {
  let needle = term.trim().to_lowercase();
  items
    .iter()
    .filter(|r| {
      needle.is_empty()
        || r.name.to_lowercase().contains(&needle)
        || r.id.to_lowercase().contains(&needle)
    })
    .collect()
}

/// A registered system (agent or simulator image).
#[derive(Debug, Clone, PartialEq)]
pub struct SystemEntry {
  pub system_type: SystemType,
  pub resource: Resource,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SystemFilter {
  #[default]
  All,
  Agent,
  Simulator,
}

impl SystemFilter {
  pub fn accepts(&self, system_type: SystemType) -> bool {
    match self {
      SystemFilter::All => true,
      SystemFilter::Agent => system_type == SystemType::Agent,
      SystemFilter::Simulator => system_type == SystemType::Simulator,
    }
  }

  /// The system types whose catalogs must be fetched for this filter.
  pub fn types(&self) -> Vec<SystemType> {
    match self {
      SystemFilter::All => vec![SystemType::Agent, SystemType::Simulator],
      SystemFilter::Agent => vec![SystemType::Agent],
      SystemFilter::Simulator => vec![SystemType::Simulator],
    }
  }
}

impl fmt::Display for SystemFilter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SystemFilter::All => f.write_str("all"),
      SystemFilter::Agent => f.write_str("agent"),
      SystemFilter::Simulator => f.write_str("simulator"),
    }
  }
}

impl FromStr for SystemFilter {
  type Err = ListingError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "all" | "" => Ok(SystemFilter::All),
      "agent" | "agents" => Ok(SystemFilter::Agent),
      "simulator" | "simulators" => Ok(SystemFilter::Simulator),
      other => Err(ListingError::UnknownFilter(other.to_string())),
    }
  }
}

/// Filter systems by type, then search on the image (name) or id.
pub fn filter_systems<'a>(
  systems: &'a [SystemEntry],
  filter: SystemFilter,
  term: &str,
) -> Vec<&'a SystemEntry> {
  let needle = term.trim().to_lowercase();
  systems
    .iter()
    .filter(|s| filter.accepts(s.system_type))
    .filter(|s| {
      needle.is_empty()
        || s.resource.name.to_lowercase().contains(&needle)
        || s.resource.id.to_lowercase().contains(&needle)
    })
    .collect()
}

/// Keep the run records whose `run_name` contains `term`, ignoring case.
/// Records without a run name only survive an empty term.
pub fn search_runs<'a>(runs: &'a [Value], term: &str) -> Vec<&'a Value> {
  let needle = term.trim().to_lowercase();
  runs
    .iter()
    .filter(|run| {
      needle.is_empty()
        || run
          .get("run_name")
          .and_then(Value::as_str)
          .is_some_and(|name| name.to_lowercase().contains(&needle))
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn entry(system_type: SystemType, id: &str, image: &str) -> SystemEntry {
    SystemEntry {
      system_type,
      resource: Resource::new(id, image),
    }
  }

  #[test]
  fn test_search_is_case_insensitive() {
    let items = vec![
      Resource::new("m1", "BLEU Score"),
      Resource::new("m2", "Success Rate"),
      Resource::new("bleu-2", "Other"),
    ];

    let found: Vec<_> = search(&items, "bleu").iter().map(|r| r.id.as_str()).collect();
    assert_eq!(found, vec!["m1", "bleu-2"]);
    assert_eq!(search(&items, "").len(), 3);
    assert!(search(&items, "nothing").is_empty());
  }

  #[test]
  fn test_search_runs_by_name() {
    let runs = vec![
      json!({ "run_name": "Baseline", "task_id": "t1" }),
      json!({ "run_name": "tuned-baseline", "task_id": "t2" }),
      json!({ "task_id": "t3" }),
    ];

    let found: Vec<_> = search_runs(&runs, "BASELINE")
      .iter()
      .map(|r| r["task_id"].as_str().unwrap())
      .collect();
    assert_eq!(found, vec!["t1", "t2"]);
    assert_eq!(search_runs(&runs, "  ").len(), 3);
    assert!(search_runs(&runs, "t3").is_empty());
  }

  #[test]
  fn test_filter_systems() {
    let systems = vec![
      entry(SystemType::Agent, "a1", "movie-agent:latest"),
      entry(SystemType::Simulator, "s1", "movie-sim:1.0"),
      entry(SystemType::Agent, "a2", "book-agent:latest"),
    ];

    assert_eq!(filter_systems(&systems, SystemFilter::All, "").len(), 3);
    assert_eq!(filter_systems(&systems, SystemFilter::Agent, "").len(), 2);

    let movie: Vec<_> = filter_systems(&systems, SystemFilter::All, "MOVIE")
      .iter()
      .map(|s| s.resource.id.as_str())
      .collect();
    assert_eq!(movie, vec!["a1", "s1"]);

    let sims = filter_systems(&systems, SystemFilter::Simulator, "book");
    assert!(sims.is_empty());
  }

  #[test]
  fn test_parse_filter() {
    assert_eq!("Agents".parse::<SystemFilter>().unwrap(), SystemFilter::Agent);
    assert_eq!("all".parse::<SystemFilter>().unwrap(), SystemFilter::All);
    assert!("robots".parse::<SystemFilter>().is_err());
    assert_eq!(SystemFilter::All.types().len(), 2);
  }
}
