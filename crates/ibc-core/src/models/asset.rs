use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

/// Asset type declared by the DAM picker.
///
/// The set is open: values other than the well-known ones are kept verbatim in
/// `Other` so they still reach the media library unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssetKind {
    Image,
    Video,
    Audio,
    Other(String),
}

impl AssetKind {
    pub fn as_str(&self) -> &str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Video => "video",
            AssetKind::Audio => "audio",
            AssetKind::Other(value) => value,
        }
    }
}

impl From<&str> for AssetKind {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "image" => AssetKind::Image,
            "video" => AssetKind::Video,
            "audio" => AssetKind::Audio,
            _ => AssetKind::Other(value.to_string()),
        }
    }
}

impl From<String> for AssetKind {
    fn from(value: String) -> Self {
        AssetKind::from(value.as_str())
    }
}

impl From<AssetKind> for String {
    fn from(kind: AssetKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw, untrusted `data` mapping of an upload request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct IngestionRequest(pub Map<String, Value>);

impl IngestionRequest {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Extract the `data` object from a request body. Returns `None` when the
    /// key is absent or is not an object.
    pub fn from_body(body: &Value) -> Option<Self> {
        body.get("data")
            .and_then(Value::as_object)
            .map(|data| IngestionRequest(data.clone()))
    }
}

impl From<Map<String, Value>> for IngestionRequest {
    fn from(map: Map<String, Value>) -> Self {
        IngestionRequest(map)
    }
}

/// Normalized upload request. Built only by [`crate::validation::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedAssetRecord {
    pub url: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub filename: String,
    pub filesize: i64,
    /// Legacy `_aid` credential of the older DAM API; empty when unused.
    #[serde(rename = "_aid")]
    pub auth_token: String,
    pub description: String,
}

impl ValidatedAssetRecord {
    /// Text used for the attachment's description, caption and alt text.
    pub fn attachment_description(&self) -> &str {
        if self.description.is_empty() {
            &self.name
        } else {
            &self.description
        }
    }
}

/// A downloaded file staged in the temp directory, described the way an
/// uploaded file would be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAsset {
    pub path: PathBuf,
    pub filename: String,
    pub kind: AssetKind,
    pub declared_size: i64,
}

impl FetchedAsset {
    pub fn new(path: PathBuf, record: &ValidatedAssetRecord) -> Self {
        Self {
            path,
            filename: record.filename.clone(),
            kind: record.kind.clone(),
            declared_size: record.filesize,
        }
    }
}
