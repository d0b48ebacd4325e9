//! Tubely API Library
//!
//! HTTP handlers, authentication and application setup for the video
//! ingestion service.

mod api_doc;
mod handlers;
mod telemetry;
mod utils;

pub mod auth;
pub mod error;
pub mod setup;
pub mod state;

pub use api_doc::get_openapi_spec;
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
