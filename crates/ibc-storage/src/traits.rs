//! Media library abstraction
//!
//! The ingestion flow only needs three things from the media library: take
//! ownership of a downloaded file, update the descriptive fields of the
//! resulting attachment, and describe it for the browser.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ibc_core::AssetKind;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Media library errors. The `Display` text is shown to the user.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("File is empty. Please upload something more substantial.")]
    EmptyFile,

    #[error("Sorry, you are not allowed to upload this file type.")]
    FileType,

    #[error("Invalid file name: {0}")]
    InvalidFilename(String),

    #[error("Invalid attachment ID {0}.")]
    NotFound(AttachmentId),

    #[error("The uploaded file could not be moved to {path}.")]
    Move {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for media library operations
pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AttachmentId(pub u64);

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A staged file presented to the library as if it had been uploaded
#[derive(Debug, Clone)]
pub struct SideloadFile {
    /// Temp file; the library owns it from the moment `sideload` is called
    pub path: PathBuf,
    /// Filename declared by the DAM
    pub filename: String,
    pub kind: AssetKind,
    pub declared_size: i64,
}

/// Descriptive fields to overwrite; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentUpdate {
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub alt_text: Option<String>,
}

impl AttachmentUpdate {
    /// Use the same text for content, excerpt and alt text
    pub fn describe(text: &str) -> Self {
        Self {
            content: Some(text.to_string()),
            excerpt: Some(text.to_string()),
            alt_text: Some(text.to_string()),
        }
    }
}

/// A media object registered in the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: AttachmentId,
    pub title: String,
    pub filename: String,
    /// Path relative to the library root, `/`-separated
    pub relative_path: String,
    pub url: String,
    pub mime_type: String,
    pub kind: AssetKind,
    pub size_bytes: u64,
    pub declared_size: i64,
    pub content: String,
    pub excerpt: String,
    pub alt_text: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Media library trait
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait MediaLibrary: Send + Sync {
    /// Register a staged file as a new attachment.
    ///
    /// Ownership of `file.path` passes to the library: it is moved into the
    /// library on success and deleted when the file is rejected.
    async fn sideload(&self, file: SideloadFile) -> MediaResult<AttachmentId>;

    async fn update_attachment(&self, id: AttachmentId, update: AttachmentUpdate)
        -> MediaResult<()>;

    /// Browser-ready description of an attachment
    async fn prepare_for_client(&self, id: AttachmentId) -> MediaResult<serde_json::Value>;
}
