//! End-to-end wizard flows against an in-memory portal.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use simlab_api::{ApiError, ApiReply, ImageMetadata, PortalApi};
use simlab_catalog::{CatalogKind, SystemType, Task};
use simlab_wizard::{
  ChannelNotifier, FetchApplied, GENERIC_SUBMIT_FAILURE, LeaderboardWizard, ListKind, Notice, NoticeKind,
  RunWizard, Step, SubmitOutcome, WizardDriver, WizardError,
};
use tokio::sync::mpsc;

struct FakePortal {
  catalogs: Mutex<HashMap<CatalogKind, Result<Value, u16>>>,
  reply: Result<ApiReply, u16>,
  images: HashMap<String, ImageMetadata>,
  fetched: Mutex<Vec<CatalogKind>>,
  submitted: Mutex<Vec<Value>>,
}

impl FakePortal {
  fn new() -> Self {
    let mut catalogs = HashMap::new();
    catalogs.insert(
      CatalogKind::Tasks,
      Ok(json!([{
        "_id": { "$oid": "t1" },
        "name": "Conversational recommendation",
        "arguments": {
          "foo": 1,
          "metrics": [
            { "id": "m1", "arguments": { "name": "Success rate" } },
            { "id": "m2", "arguments": { "name": "Turns" } }
          ]
        }
      }])),
    );
    catalogs.insert(
      CatalogKind::Metrics,
      Ok(json!([
        { "_id": "m1", "name": "Success rate" },
        { "_id": "m2", "name": "Turns" }
      ])),
    );
    catalogs.insert(
      CatalogKind::Agents,
      Ok(json!([{ "id": "a1", "tag": "agent:latest" }])),
    );
    catalogs.insert(
      CatalogKind::Simulators,
      Ok(json!([{ "id": "s1", "tag": "simulator:latest" }])),
    );

    let mut arguments = Map::new();
    arguments.insert("id".to_string(), json!("agent-1"));
    let mut images = HashMap::new();
    images.insert(
      "agent:latest".to_string(),
      ImageMetadata {
        class_name: Some("CrsAgent".to_string()),
        arguments,
        image: "agent:latest".to_string(),
        description: String::new(),
      },
    );

    Self {
      catalogs: Mutex::new(catalogs),
      reply: Ok(ApiReply {
        status: 201,
        body: Some(json!({ "message": "Run request submitted" })),
      }),
      images,
      fetched: Mutex::default(),
      submitted: Mutex::default(),
    }
  }

  fn with_catalog(self, kind: CatalogKind, body: Result<Value, u16>) -> Self {
    self.set_catalog(kind, body);
    self
  }

  fn set_catalog(&self, kind: CatalogKind, body: Result<Value, u16>) {
    self.catalogs.lock().unwrap().insert(kind, body);
  }

  fn with_reply(mut self, reply: Result<ApiReply, u16>) -> Self {
    self.reply = reply;
    self
  }

  fn submitted(&self) -> Vec<Value> {
    self.submitted.lock().unwrap().clone()
  }

  fn fetched(&self) -> Vec<CatalogKind> {
    self.fetched.lock().unwrap().clone()
  }
}

fn status_error(path: &str, status: u16) -> ApiError {
  ApiError::Status {
    path: path.to_string(),
    status,
    message: None,
  }
}

#[async_trait]
impl PortalApi for FakePortal {
  async fn fetch_catalog(&self, kind: CatalogKind) -> Result<Value, ApiError> {
    self.fetched.lock().unwrap().push(kind);
    match self.catalogs.lock().unwrap().get(&kind) {
      Some(Ok(body)) => Ok(body.clone()),
      Some(Err(status)) => Err(status_error(kind.path(), *status)),
      None => Err(status_error(kind.path(), 404)),
    }
  }

  async fn submit_run(&self, payload: &Value) -> Result<ApiReply, ApiError> {
    self.submitted.lock().unwrap().push(payload.clone());
    match &self.reply {
      Ok(reply) => Ok(reply.clone()),
      Err(status) => Err(status_error("/run-request", *status)),
    }
  }

  async fn resolve_image(&self, image: &str) -> Result<ImageMetadata, ApiError> {
    self.images.get(image).cloned().ok_or_else(|| ApiError::Status {
      path: "/image".to_string(),
      status: 400,
      message: Some("Image not found".to_string()),
    })
  }
}

struct Harness {
  portal: Arc<FakePortal>,
  driver: WizardDriver,
  notices: mpsc::UnboundedReceiver<Notice>,
  notifier: Arc<ChannelNotifier>,
}

impl Harness {
  fn new(portal: FakePortal) -> Self {
    let (tx, notices) = mpsc::unbounded_channel();
    let notifier = Arc::new(ChannelNotifier::new(tx));
    let portal = Arc::new(portal);
    let driver = WizardDriver::new(portal.clone(), notifier.clone());
    Self {
      portal,
      driver,
      notices,
      notifier,
    }
  }

  fn wizard(&self) -> RunWizard {
    RunWizard::new(self.notifier.clone())
  }

  fn drain(&mut self) -> Vec<Notice> {
    std::iter::from_fn(|| self.notices.try_recv().ok()).collect()
  }
}

/// Drive a full flow up to the review step with everything filled in.
async fn filled_wizard(harness: &Harness) -> RunWizard {
  let driver = &harness.driver;
  let mut wizard = harness.wizard();

  driver.start(&mut wizard).await;
  wizard.set_run_name("baseline");
  wizard.select_task("t1").unwrap();

  driver.next(&mut wizard).await;
  wizard.toggle(ListKind::Metrics, "m1").unwrap();
  wizard.toggle(ListKind::Metrics, "m2").unwrap();

  driver.next(&mut wizard).await;
  wizard.toggle(ListKind::Agents, "a1").unwrap();

  driver.next(&mut wizard).await;
  wizard.toggle(ListKind::Simulators, "s1").unwrap();

  driver.next(&mut wizard).await;
  assert_eq!(wizard.step(), Step::Review);
  wizard
}

#[tokio::test]
async fn test_full_flow_submits_once() {
  let mut harness = Harness::new(FakePortal::new());
  let wizard = filled_wizard(&harness).await;

  let outcome = harness.driver.submit(&wizard).await;
  assert_eq!(
    outcome,
    SubmitOutcome::Accepted {
      status: 201,
      message: "Run request submitted".to_string(),
    }
  );
  assert_eq!(wizard.step(), Step::Review);

  let submitted = harness.portal.submitted();
  assert_eq!(submitted.len(), 1);
  assert_eq!(
    submitted[0],
    json!({
      "run_name": "baseline",
      "task_id": "t1",
      "task_arguments": { "foo": 1 },
      "metrics": [
        { "id": "m1", "name": "Success rate", "arguments": {} },
        { "id": "m2", "name": "Turns", "arguments": {} }
      ],
      "agents": [{ "id": "a1", "name": "agent:latest", "arguments": {} }],
      "userSimulators": [{ "id": "s1", "name": "simulator:latest", "arguments": {} }]
    })
  );

  let notices = harness.drain();
  assert_eq!(notices, vec![Notice::success("Run request submitted")]);
}

#[tokio::test]
async fn test_task_metrics_are_unpacked() {
  let harness = Harness::new(FakePortal::new());
  let wizard = filled_wizard(&harness).await;

  let task = wizard.task().unwrap();
  let metric_ids: Vec<_> = task.metrics.iter().map(|m| m.id.as_str()).collect();
  assert_eq!(metric_ids, ["m1", "m2"]);
  assert!(task.resource.argument("foo").is_some());
  assert!(task.resource.argument("metrics").is_none());
}

#[tokio::test]
async fn test_missing_run_name_sends_nothing() {
  let mut harness = Harness::new(FakePortal::new());
  let mut wizard = filled_wizard(&harness).await;
  wizard.set_run_name("");
  harness.drain();

  let outcome = harness.driver.submit(&wizard).await;
  assert!(matches!(outcome, SubmitOutcome::Rejected { .. }));
  assert!(harness.portal.submitted().is_empty());

  let notices = harness.drain();
  assert_eq!(notices.len(), 1);
  assert_eq!(notices[0].kind, NoticeKind::Warning);
  assert_eq!(notices[0].message, "Please fill in all required fields: run name.");
}

#[tokio::test]
async fn test_backend_error_message_is_surfaced() {
  let portal = FakePortal::new().with_reply(Ok(ApiReply {
    status: 500,
    body: Some(json!({ "message": "db down" })),
  }));
  let mut harness = Harness::new(portal);
  let wizard = filled_wizard(&harness).await;
  harness.drain();

  let outcome = harness.driver.submit(&wizard).await;
  assert_eq!(
    outcome,
    SubmitOutcome::Failed {
      status: Some(500),
      message: "db down".to_string(),
    }
  );
  let notices = harness.drain();
  assert_eq!(notices, vec![Notice::error("db down")]);
  assert_eq!(wizard.step(), Step::Review);
}

#[tokio::test]
async fn test_missing_body_uses_generic_message() {
  let portal = FakePortal::new().with_reply(Ok(ApiReply {
    status: 502,
    body: None,
  }));
  let mut harness = Harness::new(portal);
  let wizard = filled_wizard(&harness).await;
  harness.drain();

  let outcome = harness.driver.submit(&wizard).await;
  assert_eq!(outcome.message(), GENERIC_SUBMIT_FAILURE);
  assert_eq!(harness.drain(), vec![Notice::error(GENERIC_SUBMIT_FAILURE)]);
  assert_eq!(harness.portal.submitted().len(), 1);
}

#[tokio::test]
async fn test_transport_failure_uses_generic_message() {
  let portal = FakePortal::new().with_reply(Err(503));
  let mut harness = Harness::new(portal);
  let wizard = filled_wizard(&harness).await;
  harness.drain();

  let outcome = harness.driver.submit(&wizard).await;
  assert_eq!(
    outcome,
    SubmitOutcome::Failed {
      status: Some(503),
      message: GENERIC_SUBMIT_FAILURE.to_string(),
    }
  );
  assert_eq!(harness.portal.submitted().len(), 1);
}

#[tokio::test]
async fn test_catalogs_fetched_once_per_session() {
  let harness = Harness::new(FakePortal::new());
  let mut wizard = filled_wizard(&harness).await;

  for _ in 0..4 {
    harness.driver.back(&mut wizard).await;
  }
  for _ in 0..4 {
    harness.driver.next(&mut wizard).await;
  }

  assert_eq!(
    harness.portal.fetched(),
    [
      CatalogKind::Tasks,
      CatalogKind::Metrics,
      CatalogKind::Agents,
      CatalogKind::Simulators
    ]
  );
  assert_eq!(wizard.run_name(), "baseline");
  assert_eq!(wizard.selection(ListKind::Metrics).len(), 2);
}

#[tokio::test]
async fn test_catalog_failures_become_notices() {
  let portal = FakePortal::new()
    .with_catalog(CatalogKind::Metrics, Err(500))
    .with_catalog(CatalogKind::Agents, Ok(json!({ "message": "No agents found" })));
  let mut harness = Harness::new(portal);
  let mut wizard = harness.wizard();

  harness.driver.start(&mut wizard).await;
  harness.driver.next(&mut wizard).await;
  assert!(wizard.catalog(CatalogKind::Metrics).is_none());
  assert!(wizard.load_failed());
  assert!(!wizard.is_loading());

  harness.driver.next(&mut wizard).await;
  assert!(wizard.catalog(CatalogKind::Agents).unwrap().is_empty());

  assert_eq!(
    harness.drain(),
    vec![
      Notice::error("Error fetching metrics. Please contact the admin."),
      Notice::info("No agents found"),
    ]
  );
}

#[tokio::test]
async fn test_failed_catalog_is_fetched_again_on_reentry() {
  let portal = FakePortal::new().with_catalog(CatalogKind::Metrics, Err(503));
  let mut harness = Harness::new(portal);
  let driver = &harness.driver;
  let mut wizard = harness.wizard();

  driver.start(&mut wizard).await;
  driver.next(&mut wizard).await;
  assert!(wizard.load_failed());

  harness.portal.set_catalog(
    CatalogKind::Metrics,
    Ok(json!([{ "_id": "m1", "name": "Success rate" }])),
  );
  driver.back(&mut wizard).await;
  let transition = driver.next(&mut wizard).await;

  assert_eq!(transition.fetch.map(|t| t.kind()), Some(CatalogKind::Metrics));
  assert_eq!(
    harness.portal.fetched(),
    [CatalogKind::Tasks, CatalogKind::Metrics, CatalogKind::Metrics]
  );
  assert!(!wizard.load_failed());
  wizard.toggle(ListKind::Metrics, "m1").unwrap();
  assert_eq!(
    harness.drain(),
    vec![Notice::error("Error fetching metrics. Please contact the admin.")]
  );
}

#[tokio::test]
async fn test_retry_in_place() {
  let portal = FakePortal::new().with_catalog(CatalogKind::Agents, Err(500));
  let harness = Harness::new(portal);
  let driver = &harness.driver;
  let mut wizard = harness.wizard();

  driver.start(&mut wizard).await;
  driver.next(&mut wizard).await;
  driver.next(&mut wizard).await;
  assert_eq!(wizard.step(), Step::Agents);
  assert!(wizard.load_failed());

  assert_eq!(driver.retry(&mut wizard).await, Some(FetchApplied::Applied));
  assert!(wizard.load_failed());

  harness
    .portal
    .set_catalog(CatalogKind::Agents, Ok(json!([{ "id": "a1", "tag": "agent:latest" }])));
  assert_eq!(driver.retry(&mut wizard).await, Some(FetchApplied::Applied));
  assert_eq!(wizard.catalog(CatalogKind::Agents).unwrap().len(), 1);
  assert_eq!(driver.retry(&mut wizard).await, None);
  assert_eq!(
    harness.portal.fetched().iter().filter(|k| **k == CatalogKind::Agents).count(),
    3
  );
}

#[tokio::test]
async fn test_leaderboard_catalog_retry() {
  let portal = FakePortal::new().with_catalog(CatalogKind::Simulators, Err(502));
  let harness = Harness::new(portal);
  let driver = &harness.driver;
  let mut wizard = leaderboard(&harness);

  driver.choose_type(&mut wizard, SystemType::Simulator).await;
  driver.next_leaderboard(&mut wizard).await;
  assert!(wizard.load_failed());
  assert!(wizard.catalog().is_none());

  harness.portal.set_catalog(
    CatalogKind::Simulators,
    Ok(json!([{ "id": "s1", "tag": "simulator:latest" }])),
  );
  assert_eq!(
    driver.retry_leaderboard(&mut wizard).await,
    Some(FetchApplied::Applied)
  );
  assert_eq!(wizard.catalog().unwrap().kind(), CatalogKind::Simulators);
}

fn leaderboard(harness: &Harness) -> LeaderboardWizard {
  let task = Task::new(simlab_catalog::Resource::new("t1", "CRS"));
  LeaderboardWizard::new(Some(task), harness.notifier.clone()).unwrap()
}

#[tokio::test]
async fn test_leaderboard_type_switch_clears_system() {
  let harness = Harness::new(FakePortal::new());
  let driver = &harness.driver;
  let mut wizard = leaderboard(&harness);

  wizard.set_run_name("public");
  driver.choose_type(&mut wizard, SystemType::Agent).await;
  driver.next_leaderboard(&mut wizard).await;
  assert_eq!(wizard.catalog().unwrap().kind(), CatalogKind::Agents);

  driver.resolve_image(&mut wizard, "agent:latest").await.unwrap();
  wizard.set_config_text(r#"{"temperature": 0.2}"#);
  assert_eq!(wizard.draft().id, "agent-1");

  driver.choose_type(&mut wizard, SystemType::Simulator).await;
  let draft = wizard.draft();
  assert_eq!(draft.system_type, Some(SystemType::Simulator));
  assert!(draft.image.is_empty());
  assert!(draft.id.is_empty());
  assert!(draft.class_name.is_none());
  assert!(draft.arguments.is_none());
  assert!(draft.config_text.is_empty());
  assert_eq!(wizard.catalog().unwrap().kind(), CatalogKind::Simulators);
}

#[tokio::test]
async fn test_leaderboard_submit() {
  let harness = Harness::new(FakePortal::new());
  let driver = &harness.driver;
  let mut wizard = leaderboard(&harness);

  wizard.set_run_name("public");
  driver.choose_type(&mut wizard, SystemType::Agent).await;
  driver.next_leaderboard(&mut wizard).await;
  driver.resolve_image(&mut wizard, "agent:latest").await.unwrap();
  wizard.set_config_text(r#"{"temperature": 0.2}"#);

  let outcome = driver.submit_leaderboard(&wizard).await;
  assert!(outcome.is_accepted());
  assert_eq!(
    harness.portal.submitted(),
    vec![json!({
      "run_name": "public",
      "task_id": "t1",
      "system": {
        "id": "agent-1",
        "type": "agent",
        "image": "agent:latest",
        "class_name": "CrsAgent",
        "arguments": { "id": "agent-1" },
        "parameters": { "temperature": 0.2 }
      }
    })]
  );
}

#[tokio::test]
async fn test_leaderboard_image_lookup_failure() {
  let mut harness = Harness::new(FakePortal::new());
  let mut wizard = leaderboard(&harness);
  harness.driver.choose_type(&mut wizard, SystemType::Agent).await;
  harness.driver.next_leaderboard(&mut wizard).await;

  let err = harness
    .driver
    .resolve_image(&mut wizard, "missing:latest")
    .await
    .unwrap_err();
  assert!(matches!(err, WizardError::ImageLookup { .. }));
  assert!(!wizard.is_resolving_image());
  assert_eq!(harness.drain(), vec![Notice::error("Image not found")]);
}

#[tokio::test]
async fn test_leaderboard_bad_configuration_sends_nothing() {
  let mut harness = Harness::new(FakePortal::new());
  let driver = &harness.driver;
  let mut wizard = leaderboard(&harness);

  wizard.set_run_name("public");
  driver.choose_type(&mut wizard, SystemType::Agent).await;
  driver.next_leaderboard(&mut wizard).await;
  driver.resolve_image(&mut wizard, "agent:latest").await.unwrap();
  wizard.set_config_text("{temperature: }");

  let outcome = driver.submit_leaderboard(&wizard).await;
  assert!(outcome.message().starts_with("Invalid JSON configuration"));
  assert!(harness.portal.submitted().is_empty());

  let notices = harness.drain();
  assert_eq!(notices.len(), 1);
  assert_eq!(notices[0].kind, NoticeKind::Warning);
}
