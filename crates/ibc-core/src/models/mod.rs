//! Data models for the ingestion flow

mod asset;

pub use asset::*;
