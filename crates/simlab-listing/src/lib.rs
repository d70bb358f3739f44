//! SimLab Listing
//!
//! Client-side search, pagination and sorting for catalog and leaderboard
//! listings. The backend returns whole collections; everything here operates
//! on what was fetched.

mod page;
mod results;
mod search;

use thiserror::Error;

pub use page::{Page, paginate};
pub use results::{FIXED_COLUMNS, ResultTable, SortDirection, cell};
pub use search::{SystemEntry, SystemFilter, filter_systems, search, search_runs};

#[derive(Debug, Error)]
pub enum ListingError {
  #[error("unknown system filter '{0}' (expected all, agent or simulator)")]
  UnknownFilter(String),
}
