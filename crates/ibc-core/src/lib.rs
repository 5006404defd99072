//! IBC Core Library
//!
//! This crate provides the domain models, error types, configuration and request
//! validation shared by every IBC component.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::IbcConfig;
pub use error::{DownloadError, ErrorMetadata, IngestError, LogLevel, ValidationError};
pub use models::{AssetKind, FetchedAsset, IngestionRequest, ValidatedAssetRecord};
pub use validation::validate;
