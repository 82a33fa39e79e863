//! Imgpress API Library
//!
//! HTTP surface of the batch image converter: upload and bulk-download
//! handlers, the multipart upload collaborator, HTML views, health checks,
//! telemetry and application setup.

mod handlers;
mod utils;

pub mod error;
pub mod setup;
pub mod state;
pub mod telemetry;
pub mod views;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
