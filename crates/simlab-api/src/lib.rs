//! SimLab API
//!
//! Client side of the SimLab REST backend. [`PortalApi`] is the seam the run
//! wizard depends on; [`HttpPortalApi`] implements it with `reqwest` and also
//! carries the endpoints only the command-line front end uses (auth, image
//! transfer, results).

mod error;
mod http;
mod portal;
mod types;

pub use error::ApiError;
pub use http::HttpPortalApi;
pub use portal::PortalApi;
pub use types::{
  ApiReply, Credentials, Download, ImageMetadata, PasswordReset, Registration, UploadAccepted,
  UploadStatus, backend_message,
};
