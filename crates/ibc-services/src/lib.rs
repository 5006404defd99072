//! IBC Services Library
//!
//! External service integrations used by the ingestion flow.

pub mod fetcher;
pub mod ssrf;

pub use fetcher::AssetFetcher;
pub use ssrf::UrlPolicy;
