//! SimLab Catalog
//!
//! Types shared by every part of the client: resources, their arguments,
//! tasks with their applicable metrics, and the normalization that turns raw
//! backend documents into those types.

mod error;
mod normalize;
mod types;

pub use error::CatalogError;
pub use normalize::{Catalog, normalize};
pub use types::{Argument, ArgumentType, CatalogKind, Resource, Selectable, SystemType, Task};
