//! SimLab Wizard
//!
//! The run submission flows: a five-step full flow ([`RunWizard`]) and a
//! two-step public-leaderboard flow ([`LeaderboardWizard`]).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       WizardDriver                          │
//! │  - performs fetches the controllers ask for                 │
//! │  - submit(wizard) → SubmitOutcome                           │
//! └─────────────────────────────────────────────────────────────┘
//!            │                                   │
//!            ▼                                   ▼
//! ┌───────────────────────────┐   ┌─────────────────────────────┐
//! │ RunWizard /               │   │ CatalogClient               │
//! │ LeaderboardWizard         │   │ SubmissionGateway           │
//! │  - step state machine     │   │  - PortalApi + Notifier     │
//! │  - selections, editors    │   └─────────────────────────────┘
//! │  - tickets for fetches    │
//! └───────────────────────────┘
//! ```
//!
//! Controllers are synchronous and never touch the network. Every fetch they
//! need comes back as a ticket; a result is applied only while its ticket is
//! still current, so a slow response for a step the user already left is
//! dropped.
//!
//! # Usage
//!
//! ```ignore
//! use simlab_wizard::{ListKind, NoticeBoard, RunWizard, WizardDriver};
//!
//! let notifier = Arc::new(NoticeBoard::new(config.notice_ttl()));
//! let driver = WizardDriver::new(api, notifier.clone());
//! let mut wizard = RunWizard::new(notifier);
//!
//! driver.start(&mut wizard).await;
//! wizard.set_run_name("baseline");
//! wizard.select_task("t1")?;
//! driver.next(&mut wizard).await;
//! wizard.toggle(ListKind::Metrics, "m1")?;
//! // ... agents, simulators
//! driver.next(&mut wizard).await;
//! let outcome = driver.submit(&wizard).await;
//! ```

mod catalog;
mod driver;
mod editor;
mod error;
mod gateway;
mod leaderboard;
mod notice;
mod payload;
mod selection;
mod step;
mod wizard;

pub use catalog::{CatalogClient, fetch_failure_message};
pub use driver::WizardDriver;
pub use editor::{ArgumentEditor, CommitRejected, EditMode};
pub use error::{EditorError, SelectionError, ValidationError, WizardError};
pub use gateway::{GENERIC_SUBMIT_FAILURE, SubmissionGateway, SubmitOutcome};
pub use leaderboard::{ImageTicket, LeaderboardStep, LeaderboardWizard, SystemDraft};
pub use notice::{ChannelNotifier, NoopNotifier, Notice, NoticeBoard, NoticeKind, Notifier};
pub use payload::{LeaderboardRequest, RunRequest, SelectedItem, SystemPayload};
pub use selection::{MultiSelection, SelectionList, SingleSelection};
pub use step::{FetchApplied, FetchTicket, Step, Transition};
pub use wizard::{ListKind, RunWizard};
