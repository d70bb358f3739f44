use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::{Map, Value};
use tracing::warn;

use simlab_catalog::{CatalogKind, SystemType};
use simlab_wizard::{LeaderboardWizard, ListKind, RunWizard, SubmitOutcome, WizardDriver};

use crate::App;

#[derive(Args)]
pub(crate) struct RunArgs {
  #[arg(long)]
  run_name: String,

  /// Task id
  #[arg(long)]
  task: String,

  /// Task argument value, NAME=VALUE (repeatable)
  #[arg(long = "task-arg", value_parser = parse_assignment)]
  task_args: Vec<(String, String)>,

  /// Metric id, optionally with argument values: ID or ID={"name": value}
  #[arg(long = "metric", value_parser = parse_selection)]
  metrics: Vec<Selection>,

  /// Agent id, optionally with argument values
  #[arg(long = "agent", value_parser = parse_selection)]
  agents: Vec<Selection>,

  /// User simulator id, optionally with argument values
  #[arg(long = "simulator", value_parser = parse_selection)]
  simulators: Vec<Selection>,

  /// Print the request instead of sending it
  #[arg(long)]
  dry_run: bool,
}

#[derive(Args)]
pub(crate) struct LeaderboardArgs {
  #[arg(long)]
  run_name: String,

  /// Task id
  #[arg(long)]
  task: String,

  /// agent or simulator
  #[arg(long = "type")]
  system_type: SystemType,

  /// Registered image (repository:tag)
  #[arg(long)]
  image: String,

  /// Participant id (default: the id in the image labels)
  #[arg(long)]
  system_id: Option<String>,

  /// System configuration as a JSON document
  #[arg(long)]
  parameters: Option<String>,

  /// Print the request instead of sending it
  #[arg(long)]
  dry_run: bool,
}

/// A catalog entry picked on the command line.
#[derive(Debug, Clone)]
pub(crate) struct Selection {
  id: String,
  arguments: Map<String, Value>,
}

pub(crate) async fn run(app: &App, args: &RunArgs) -> Result<()> {
  let driver = WizardDriver::new(app.api.clone(), app.notifier.clone());
  let mut wizard = RunWizard::new(app.notifier.clone());

  driver.start(&mut wizard).await;
  wizard.set_run_name(args.run_name.as_str());
  wizard.select_task(&args.task)?;
  if !args.task_args.is_empty() {
    let mut editor = wizard.begin_task_edit().context("no task selected")?;
    for (name, raw) in &args.task_args {
      editor
        .set_text(name, raw)
        .with_context(|| format!("task argument '{name}'"))?;
    }
    wizard.commit_task_edit(editor);
  }

  let lists = [
    (ListKind::Metrics, &args.metrics),
    (ListKind::Agents, &args.agents),
    (ListKind::Simulators, &args.simulators),
  ];
  for (list, selections) in lists {
    driver.next(&mut wizard).await;
    for selection in selections {
      configure(&mut wizard, list, selection)?;
    }
  }
  driver.next(&mut wizard).await;

  if args.dry_run {
    let request = wizard.build_request()?;
    println!("{}", serde_json::to_string_pretty(&request)?);
    return Ok(());
  }
  finish(driver.submit(&wizard).await)
}

pub(crate) async fn leaderboard(app: &App, args: &LeaderboardArgs) -> Result<()> {
  let driver = WizardDriver::new(app.api.clone(), app.notifier.clone());

  let task = driver
    .catalogs()
    .fetch(CatalogKind::Tasks)
    .await?
    .into_tasks()
    .unwrap_or_default()
    .into_iter()
    .find(|task| task.resource.id == args.task);
  let mut wizard = LeaderboardWizard::new(task, app.notifier.clone())?;

  wizard.set_run_name(args.run_name.as_str());
  driver.choose_type(&mut wizard, args.system_type).await;
  driver.next_leaderboard(&mut wizard).await;

  if let Some(catalog) = wizard.catalog()
    && !catalog.resources().iter().any(|system| system.name == args.image)
  {
    warn!(image = %args.image, system_type = %args.system_type, "image is not listed in the system catalog");
  }

  driver.resolve_image(&mut wizard, &args.image).await?;
  if let Some(id) = &args.system_id {
    wizard.set_system_id(id.as_str());
  }
  if let Some(parameters) = &args.parameters {
    wizard.set_config_text(parameters.as_str());
  }

  if args.dry_run {
    let request = wizard.build_request()?;
    println!("{}", serde_json::to_string_pretty(&request)?);
    return Ok(());
  }
  finish(driver.submit_leaderboard(&wizard).await)
}

/// Configure a catalog entry with the given values and add it to `list`.
fn configure(wizard: &mut RunWizard, list: ListKind, selection: &Selection) -> Result<()> {
  let mut editor = wizard.begin_add(list, &selection.id)?;
  for (name, value) in &selection.arguments {
    editor
      .set_value(name, value.clone())
      .with_context(|| format!("argument '{name}' of '{}'", selection.id))?;
  }
  wizard.add(list, editor.finish())?;
  Ok(())
}

fn finish(outcome: SubmitOutcome) -> Result<()> {
  if !outcome.is_accepted() {
    bail!("run was not submitted");
  }
  println!("{}", outcome.message());
  Ok(())
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
  let (name, value) = raw
    .split_once('=')
    .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
  let name = name.trim();
  if name.is_empty() {
    return Err(format!("missing argument name in '{raw}'"));
  }
  Ok((name.to_string(), value.to_string()))
}

fn parse_selection(raw: &str) -> Result<Selection, String> {
  let (id, arguments) = match raw.split_once('=') {
    Some((id, json)) => {
      let arguments = serde_json::from_str::<Map<String, Value>>(json)
        .map_err(|e| format!("argument values for '{id}' must be a JSON object: {e}"))?;
      (id, arguments)
    }
    None => (raw, Map::new()),
  };

  let id = id.trim();
  if id.is_empty() {
    return Err(format!("missing id in '{raw}'"));
  }
  Ok(Selection {
    id: id.to_string(),
    arguments,
  })
}
