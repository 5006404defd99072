//! IBC Storage Library
//!
//! This crate defines the media library an ingested file is registered with,
//! and a local filesystem implementation.
//!
//! # Layout
//!
//! Files are stored below the library root as `{YYYY}/{MM}/{filename}`, the
//! filename being sanitized and made unique within its month directory.

#[cfg(feature = "storage-local")]
pub mod local;
pub mod mime;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "storage-local")]
pub use local::LocalMediaLibrary;
pub use traits::{
    Attachment, AttachmentId, AttachmentUpdate, MediaError, MediaLibrary, MediaResult,
    SideloadFile,
};
