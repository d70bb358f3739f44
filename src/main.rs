use std::io::{self, BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use simlab_api::{Credentials, Download, HttpPortalApi, PasswordReset, Registration};
use simlab_catalog::{CatalogKind, Resource};
use simlab_config::{ENV_BASE_URL, PortalConfig};
use simlab_listing::{
  FIXED_COLUMNS, ResultTable, SortDirection, SystemEntry, SystemFilter, cell, filter_systems,
  paginate, search, search_runs,
};
use simlab_session::{SessionStore, User};
use simlab_wizard::{CatalogClient, Notice, NoticeKind, Notifier};

mod submit;

const RUNS_FAILURE: &str = "Error fetching runs. Please reach out to the admin.";

/// SimLab - submit and inspect conversational system evaluation runs
#[derive(Parser)]
#[command(name = "simlab")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.simlab)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Path to the configuration file (default: <data-dir>/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Backend API root, overriding configuration and environment
  #[arg(long, global = true)]
  base_url: Option<String>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Log in and keep the session for later commands
  Login {
    #[arg(long)]
    username: String,

    /// Read from stdin when omitted
    #[arg(long)]
    password: Option<String>,
  },

  /// Create an account
  Register {
    #[arg(long)]
    email: String,

    #[arg(long)]
    username: String,

    /// Read from stdin when omitted
    #[arg(long)]
    password: Option<String>,
  },

  /// Set a new password for an account
  ResetPassword {
    #[arg(long)]
    email: String,

    /// Read from stdin when omitted
    #[arg(long)]
    password: Option<String>,
  },

  /// End the session
  Logout,

  /// Show the logged-in user
  Whoami,

  /// List a catalog (tasks, metrics, agents or simulators)
  Catalog {
    kind: CatalogKind,

    /// Case-insensitive filter on name or id
    #[arg(long)]
    search: Option<String>,

    #[arg(long, default_value_t = 1)]
    page: usize,
  },

  /// List agents and user simulators together
  Systems {
    /// all, agent or simulator
    #[arg(long = "type", default_value = "all")]
    filter: SystemFilter,

    /// Case-insensitive filter on image or id
    #[arg(long)]
    search: Option<String>,

    #[arg(long, default_value_t = 1)]
    page: usize,
  },

  /// List your submitted runs
  Runs {
    /// Case-insensitive filter on the run name
    #[arg(long)]
    search: Option<String>,

    #[arg(long, default_value_t = 1)]
    page: usize,
  },

  /// Submit a run: task, metrics, agents and user simulators
  Submit(submit::RunArgs),

  /// Submit one system to a task's public leaderboard
  SubmitLeaderboard(submit::LeaderboardArgs),

  /// Show the leaderboard of a task
  Results {
    task_id: String,

    /// Column to sort by (a record field or a metric name)
    #[arg(long)]
    sort: Option<String>,

    /// Sort descending
    #[arg(long)]
    desc: bool,

    /// Also write the records as JSON to this file, or to
    /// <task-id>_results.json inside this directory
    #[arg(long)]
    output: Option<PathBuf>,
  },

  /// Upload a Docker image archive
  UploadImage {
    archive: PathBuf,

    /// Image name (repository:tag)
    #[arg(long)]
    name: String,

    /// Poll until the import finishes
    #[arg(long)]
    wait: bool,
  },

  /// Show the progress of an image upload
  UploadStatus { task_id: String },

  /// Download a Docker image archive
  DownloadImage {
    image: String,

    /// Directory to write the archive to
    #[arg(long, default_value = ".")]
    output: PathBuf,
  },
}

/// Everything a command needs: configuration, identity and the backend.
pub(crate) struct App {
  config: PortalConfig,
  session: SessionStore,
  api: Arc<HttpPortalApi>,
  notifier: Arc<dyn Notifier>,
}

impl App {
  fn open(cli: &Cli) -> Result<Self> {
    let data_dir = match &cli.data_dir {
      Some(dir) => dir.clone(),
      None => dirs::home_dir()
        .context("could not determine home directory")?
        .join(".simlab"),
    };

    let config_path = cli
      .config
      .clone()
      .unwrap_or_else(|| data_dir.join("config.json"));
    let mut config = PortalConfig::load(&config_path)
      .with_context(|| format!("failed to load config: {}", config_path.display()))?
      .with_env_overrides()
      .context("invalid environment override")?;
    if let Some(url) = &cli.base_url {
      config = config
        .with_overrides(|key| (key == ENV_BASE_URL).then(|| url.clone()))
        .context("invalid --base-url")?;
    }

    let session = SessionStore::open(data_dir.join("session.json")).context("failed to open session")?;

    let mut api = HttpPortalApi::new(&config).context("failed to create API client")?;
    if let Some(cookie) = session.cookie() {
      api = api.with_cookie(&cookie);
    }

    Ok(Self {
      config,
      session,
      api: Arc::new(api),
      notifier: Arc::new(ConsoleNotifier),
    })
  }

  pub(crate) fn catalogs(&self) -> CatalogClient {
    CatalogClient::new(self.api.clone(), self.notifier.clone())
  }
}

/// Prints notices to stderr so stdout carries only command output.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
  fn notify(&self, notice: Notice) {
    let label = match notice.kind {
      NoticeKind::Success => "ok",
      NoticeKind::Info => "info",
      NoticeKind::Warning => "warning",
      NoticeKind::Error => "error",
    };
    eprintln!("[{label}] {}", notice.message);
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();
  let Some(command) = cli.command.as_ref() else {
    println!("simlab - use --help to see available commands");
    return Ok(());
  };

  let app = App::open(&cli)?;
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(run(&app, command))
}

async fn run(app: &App, command: &Commands) -> Result<()> {
  match command {
    Commands::Login { username, password } => {
      let credentials = Credentials {
        username: username.clone(),
        password: password_or_stdin(password.as_deref())?,
      };
      let message = app.api.login(&credentials).await.context("login failed")?;
      app
        .session
        .sign_in(User::new(username.clone()), app.api.session_cookie())
        .context("failed to save session")?;
      println!("{message}");
    }
    Commands::Register {
      email,
      username,
      password,
    } => {
      let registration = Registration {
        email: email.clone(),
        username: username.clone(),
        password: password_or_stdin(password.as_deref())?,
      };
      let message = app.api.register(&registration).await.context("registration failed")?;
      println!("{message}");
    }
    Commands::ResetPassword { email, password } => {
      let reset = PasswordReset {
        email: email.clone(),
        password: password_or_stdin(password.as_deref())?,
      };
      let message = app.api.reset_password(&reset).await.context("password reset failed")?;
      println!("{message}");
    }
    Commands::Logout => {
      let result = app.api.logout().await;
      app.session.sign_out().context("failed to clear session")?;
      println!("{}", result.context("logout failed")?);
    }
    Commands::Whoami => match app.session.current_user() {
      Some(user) => println!("{}", user.username),
      None => println!("not logged in"),
    },
    Commands::Catalog { kind, search, page } => {
      list_catalog(app, *kind, search.as_deref(), *page).await?;
    }
    Commands::Systems {
      filter,
      search,
      page,
    } => {
      list_systems(app, *filter, search.as_deref(), *page).await?;
    }
    Commands::Runs { search, page } => list_runs(app, search.as_deref(), *page).await?,
    Commands::Submit(args) => submit::run(app, args).await?,
    Commands::SubmitLeaderboard(args) => submit::leaderboard(app, args).await?,
    Commands::Results {
      task_id,
      sort,
      desc,
      output,
    } => {
      let records = app
        .api
        .results(task_id)
        .await
        .with_context(|| format!("failed to fetch results for task '{task_id}'"))?;
      if let Some(output) = output {
        export_results(output, task_id, &records).await?;
      }
      let mut table = ResultTable::new(records);
      if let Some(column) = sort {
        let direction = if *desc {
          SortDirection::Descending
        } else {
          SortDirection::Ascending
        };
        table.sort(column, direction);
      } else if *desc {
        table.sort(FIXED_COLUMNS[0], SortDirection::Descending);
      }
      print_results(&table);
    }
    Commands::UploadImage {
      archive,
      name,
      wait,
    } => upload_image(app, archive, name, *wait).await?,
    Commands::UploadStatus { task_id } => {
      let status = app
        .api
        .upload_status(task_id)
        .await
        .context("failed to fetch upload status")?;
      print_upload_status(&status);
    }
    Commands::DownloadImage { image, output } => {
      match app.api.download_image(image).await.context("download failed")? {
        Download::File { filename, bytes } => {
          let path = output.join(&filename);
          tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
          println!("{} ({} bytes)", path.display(), bytes.len());
        }
        Download::Json(body) => println!("{}", serde_json::to_string_pretty(&body)?),
      }
    }
  }

  Ok(())
}

async fn list_catalog(app: &App, kind: CatalogKind, term: Option<&str>, page: usize) -> Result<()> {
  let catalog = app.catalogs().fetch(kind).await?;
  let items: Vec<Resource> = catalog.resources().into_iter().cloned().collect();
  let matches = search(&items, term.unwrap_or_default());
  let page = paginate(&matches, page, app.config.page_size);

  for resource in &page.items {
    println!("{}\t{}", resource.id, resource.name);
  }
  eprintln!(
    "page {}/{} ({} {kind})",
    page.page, page.total_pages, page.total_items
  );
  Ok(())
}

async fn list_systems(app: &App, filter: SystemFilter, term: Option<&str>, page: usize) -> Result<()> {
  let catalogs = app.catalogs();
  let mut systems = Vec::new();
  for system_type in filter.types() {
    let catalog = catalogs.fetch(system_type.catalog()).await?;
    systems.extend(catalog.resources().into_iter().map(|resource| SystemEntry {
      system_type,
      resource: resource.clone(),
    }));
  }

  let matches = filter_systems(&systems, filter, term.unwrap_or_default());
  let page = paginate(&matches, page, app.config.page_size);
  for entry in &page.items {
    println!(
      "{}\t{}\t{}",
      entry.system_type.label(),
      entry.resource.id,
      entry.resource.name
    );
  }
  eprintln!(
    "page {}/{} ({} systems)",
    page.page, page.total_pages, page.total_items
  );
  Ok(())
}

async fn list_runs(app: &App, term: Option<&str>, page: usize) -> Result<()> {
  let runs = match app.api.user_results().await {
    Ok(runs) => runs,
    Err(e) => {
      app.notifier.notify(Notice::error(RUNS_FAILURE));
      return Err(e).context("failed to fetch runs");
    }
  };
  if runs.is_empty() {
    println!("You have no experiments yet.");
    return Ok(());
  }

  let matches = search_runs(&runs, term.unwrap_or_default());
  let page = paginate(&matches, page, app.config.page_size);
  for run in &page.items {
    println!("{}\t{}", display(run.get("run_name")), display(run.get("task_id")));
  }
  eprintln!(
    "page {}/{} ({} runs)",
    page.page, page.total_pages, page.total_items
  );
  Ok(())
}

/// Write the records as pretty JSON. A directory gets
/// `<task_id>_results.json` inside it.
async fn export_results(output: &Path, task_id: &str, records: &[serde_json::Value]) -> Result<()> {
  let path = if output.is_dir() {
    output.join(format!("{task_id}_results.json"))
  } else {
    output.to_path_buf()
  };
  let body = serde_json::to_string_pretty(records)?;
  tokio::fs::write(&path, body)
    .await
    .with_context(|| format!("failed to write {}", path.display()))?;
  eprintln!("wrote {} ({} records)", path.display(), records.len());
  Ok(())
}

fn print_results(table: &ResultTable) {
  if table.is_empty() {
    println!("no results yet");
    return;
  }

  let columns = table.columns();
  println!("{}", columns.join("\t"));
  for row in table.rows() {
    let cells: Vec<String> = columns
      .iter()
      .map(|column| display(cell(row, column)))
      .collect();
    println!("{}", cells.join("\t"));
  }
}

fn display(value: Option<&serde_json::Value>) -> String {
  match value {
    Some(serde_json::Value::String(s)) => s.clone(),
    Some(value) => value.to_string(),
    None => "-".to_string(),
  }
}

async fn upload_image(app: &App, archive: &Path, name: &str, wait: bool) -> Result<()> {
  let accepted = app
    .api
    .upload_image(archive, name)
    .await
    .context("upload failed")?;
  println!("{}", accepted.task_id);
  if !accepted.message.is_empty() {
    app.notifier.notify(Notice::info(accepted.message));
  }
  if !wait {
    return Ok(());
  }

  loop {
    let status = app
      .api
      .upload_status(&accepted.task_id)
      .await
      .context("failed to fetch upload status")?;
    if status.is_finished() {
      print_upload_status(&status);
      if status.is_failure() {
        bail!("image import failed");
      }
      return Ok(());
    }
    tokio::time::sleep(Duration::from_secs(2)).await;
  }
}

fn print_upload_status(status: &simlab_api::UploadStatus) {
  let detail = status.message.as_deref().or(status.error.as_deref());
  match detail {
    Some(detail) => println!("{}: {detail}", status.status),
    None => println!("{}", status.status),
  }
}

fn password_or_stdin(password: Option<&str>) -> Result<String> {
  if let Some(password) = password {
    return Ok(password.to_string());
  }
  if io::stdin().is_terminal() {
    eprint!("password: ");
  }
  let mut line = String::new();
  io::stdin()
    .lock()
    .read_line(&mut line)
    .context("failed to read password from stdin")?;
  let password = line.trim_end_matches(['\r', '\n']).to_string();
  if password.is_empty() {
    bail!("password cannot be empty");
  }
  Ok(password)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[tokio::test]
  async fn test_export_results() {
    let dir = tempfile::tempdir().unwrap();
    let records = vec![json!({ "run_name": "r1", "metrics": { "bleu": { "mean": 0.5 } } })];

    export_results(dir.path(), "t1", &records).await.unwrap();
    let written = std::fs::read_to_string(dir.path().join("t1_results.json")).unwrap();
    assert_eq!(written, serde_json::to_string_pretty(&records).unwrap());

    let file = dir.path().join("leaderboard.json");
    export_results(&file, "t1", &[]).await.unwrap();
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "[]");
  }
}
