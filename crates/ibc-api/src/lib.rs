//! IBC API Library
//!
//! This crate provides the AJAX handlers, the ingestion orchestrator and the
//! application setup.

mod auth;
pub mod constants;
pub mod envelope;
mod handlers;
pub mod services;
pub mod setup;
pub mod state;

// Re-exports
pub use envelope::ResponseEnvelope;
pub use services::ingest::{IngestService, UploadRequest};
pub use state::AppState;
