//! IBC Infrastructure Library
//!
//! This crate provides shared infrastructure components:
//! - Diagnostic file log (per-request accumulator flushed once)
//! - Anti-forgery nonces
//! - Telemetry initialization

pub mod diagnostics;

#[cfg(feature = "nonce")]
pub mod nonce;

#[cfg(feature = "observability-basic")]
pub mod telemetry;

// Re-export commonly used types
pub use diagnostics::{DiagnosticLog, DiagnosticLogSink, LogEntry, LogMessage};

#[cfg(feature = "nonce")]
pub use nonce::{NonceService, SESSION_COOKIE, UPLOAD_NONCE_ACTION};

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry};
