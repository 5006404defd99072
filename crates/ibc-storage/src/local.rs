use crate::mime::{human_readable_size, mime_for_filename, sanitize_filename};
use crate::traits::{
    Attachment, AttachmentId, AttachmentUpdate, MediaError, MediaLibrary, MediaResult,
    SideloadFile,
};
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::sync::RwLock;

/// Media library on the local filesystem with an in-memory attachment index
pub struct LocalMediaLibrary {
    base_path: PathBuf,
    base_url: String,
    next_id: AtomicU64,
    attachments: RwLock<HashMap<AttachmentId, Attachment>>,
}

impl LocalMediaLibrary {
    /// Create a new LocalMediaLibrary instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for stored media (e.g., "/var/lib/ibc/uploads")
    /// * `base_url` - Base URL the root is served from (e.g., "http://localhost:3000/uploads")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> MediaResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await?;

        Ok(LocalMediaLibrary {
            base_path,
            base_url,
            next_id: AtomicU64::new(1),
            attachments: RwLock::new(HashMap::new()),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub async fn attachment(&self, id: AttachmentId) -> Option<Attachment> {
        self.attachments.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.attachments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.attachments.read().await.is_empty()
    }

    fn generate_url(&self, relative_path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), relative_path)
    }

    async fn store(&self, file: &SideloadFile) -> MediaResult<Attachment> {
        let filename = sanitize_filename(&file.filename)?;
        let mime_type = mime_for_filename(&filename).ok_or(MediaError::FileType)?;

        let size_bytes = fs::metadata(&file.path).await?.len();
        if size_bytes == 0 {
            return Err(MediaError::EmptyFile);
        }

        let now = Utc::now();
        let subdir = format!("{:04}/{:02}", now.year(), now.month());
        let dir = self.base_path.join(&subdir);
        fs::create_dir_all(&dir).await?;

        let (unique_name, target) = reserve_unique_path(&dir, &filename).await?;
        if let Err(e) = move_file(&file.path, &target).await {
            let _ = fs::remove_file(&target).await;
            return Err(MediaError::Move {
                path: target.display().to_string(),
                source: e,
            });
        }

        let relative_path = format!("{}/{}", subdir, unique_name);
        let title = Path::new(&filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&filename)
            .to_string();

        Ok(Attachment {
            id: AttachmentId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            title,
            filename: unique_name,
            url: self.generate_url(&relative_path),
            relative_path,
            mime_type: mime_type.to_string(),
            kind: file.kind.clone(),
            size_bytes,
            declared_size: file.declared_size,
            content: String::new(),
            excerpt: String::new(),
            alt_text: String::new(),
            uploaded_at: now,
        })
    }
}

#[async_trait]
impl MediaLibrary for LocalMediaLibrary {
    async fn sideload(&self, file: SideloadFile) -> MediaResult<AttachmentId> {
        let start = std::time::Instant::now();

        let attachment = match self.store(&file).await {
            Ok(attachment) => attachment,
            Err(e) => {
                if let Err(cleanup_err) = fs::remove_file(&file.path).await {
                    if cleanup_err.kind() != ErrorKind::NotFound {
                        tracing::warn!(
                            error = %cleanup_err,
                            path = %file.path.display(),
                            "Failed to remove rejected temp file"
                        );
                    }
                }
                return Err(e);
            }
        };

        let id = attachment.id;
        tracing::info!(
            attachment_id = %id,
            path = %attachment.relative_path,
            size_bytes = attachment.size_bytes,
            declared_size = attachment.declared_size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Attachment registered"
        );

        self.attachments.write().await.insert(id, attachment);
        Ok(id)
    }

    async fn update_attachment(
        &self,
        id: AttachmentId,
        update: AttachmentUpdate,
    ) -> MediaResult<()> {
        let mut attachments = self.attachments.write().await;
        let attachment = attachments.get_mut(&id).ok_or(MediaError::NotFound(id))?;

        if let Some(content) = update.content {
            attachment.content = content;
        }
        if let Some(excerpt) = update.excerpt {
            attachment.excerpt = excerpt;
        }
        if let Some(alt_text) = update.alt_text {
            attachment.alt_text = alt_text;
        }

        Ok(())
    }

    async fn prepare_for_client(&self, id: AttachmentId) -> MediaResult<serde_json::Value> {
        let attachments = self.attachments.read().await;
        let attachment = attachments.get(&id).ok_or(MediaError::NotFound(id))?;

        let (media_type, subtype) = attachment
            .mime_type
            .split_once('/')
            .unwrap_or((attachment.mime_type.as_str(), ""));
        let timestamp_ms = attachment.uploaded_at.timestamp_millis();

        Ok(json!({
            "id": attachment.id,
            "title": attachment.title,
            "filename": attachment.filename,
            "url": attachment.url,
            "link": attachment.url,
            "alt": attachment.alt_text,
            "author": "",
            "description": attachment.content,
            "caption": attachment.excerpt,
            "name": attachment.title,
            "status": "inherit",
            "uploadedTo": 0,
            "date": timestamp_ms,
            "modified": timestamp_ms,
            "mime": attachment.mime_type,
            "type": media_type,
            "subtype": subtype,
            "assetType": attachment.kind.as_str(),
            "filesizeInBytes": attachment.size_bytes,
            "filesizeHumanReadable": human_readable_size(attachment.size_bytes),
        }))
    }
}

/// Claim `name` in `dir`, or `stem-N.ext` for the first free N, by creating
/// the target exclusively. Returns the chosen name and path.
async fn reserve_unique_path(dir: &Path, name: &str) -> MediaResult<(String, PathBuf)> {
    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };

    let mut counter = 0u32;
    loop {
        let candidate = match (counter, extension) {
            (0, _) => name.to_string(),
            (n, Some(ext)) => format!("{}-{}.{}", stem, n, ext),
            (n, None) => format!("{}-{}", stem, n),
        };
        let path = dir.join(&candidate);

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(_) => return Ok((candidate, path)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => counter += 1,
            Err(e) => return Err(MediaError::Io(e)),
        }
    }
}

/// Rename, falling back to copy + delete across filesystems
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    fs::copy(from, to).await?;
    fs::remove_file(from).await
}
