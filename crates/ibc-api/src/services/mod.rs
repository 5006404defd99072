//! Application services

pub mod ingest;
