//! Extension based MIME detection and filename sanitizing

use crate::traits::MediaError;
use std::path::Path;

const MAX_FILENAME_LENGTH: usize = 255;

/// MIME type for a filename's extension, or `None` for a type the library
/// does not accept.
pub fn mime_for_filename(filename: &str) -> Option<&'static str> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())?;

    let mime = match extension.as_str() {
        // Images
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        // Videos
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "ogv" => "video/ogg",
        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        // Documents
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odt" => "application/vnd.oasis.opendocument.text",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "zip" => "application/zip",
        _ => return None,
    };

    Some(mime)
}

/// Reduce a declared filename to a safe basename: path components dropped,
/// whitespace turned into `-`, anything outside `[A-Za-z0-9._-]` removed.
pub fn sanitize_filename(filename: &str) -> Result<String, MediaError> {
    let basename = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();

    let sanitized: String = basename
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('-')
            } else if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                Some(c)
            } else {
                None
            }
        })
        .take(MAX_FILENAME_LENGTH)
        .collect();

    let sanitized = sanitized.trim_start_matches(['.', '-']).to_string();
    if sanitized.is_empty() || sanitized.contains("..") {
        return Err(MediaError::InvalidFilename(filename.to_string()));
    }

    Ok(sanitized)
}

/// WordPress-style human readable size, e.g. `"2 MB"`
pub fn human_readable_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.0} {}", value, UNITS[unit])
}
