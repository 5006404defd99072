//! Error types module
//!
//! Every failure of the ingestion flow is represented by [`IngestError`]. Its
//! `Display` output is the exact, human-readable message sent back to the
//! browser, so variants never carry stack traces or internal identifiers
//! beyond what the message states.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for failures caused by the remote DAM or the caller
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be reported
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "DOWNLOAD_ERROR")
    fn error_code(&self) -> &'static str;

    /// Client-facing message
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Failure of the request validator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Field \"{0}\" is required")]
    MissingField(&'static str),

    #[error("Field \"{0}\" must not be empty")]
    EmptyField(&'static str),
}

impl ValidationError {
    /// Name of the offending schema field
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField(name) | ValidationError::EmptyField(name) => name,
        }
    }
}

/// Failure of the asset fetcher. The temp file is already gone when one of
/// these is returned.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("could not create temp file")]
    TempFile(#[source] std::io::Error),

    /// DNS, connection, TLS, timeout or body-read failure; the message joins
    /// the whole error chain with ". ".
    #[error("{0}")]
    Transport(String),

    #[error("Download error: {reason}")]
    Status { status: u16, reason: String },

    #[error("Download error: {0}")]
    Write(#[source] std::io::Error),
}

/// Unified error of the ingestion flow.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Wrong nonce")]
    Auth,

    #[error("Missing data in POST")]
    BadRequest,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("Upload error: {0}")]
    Registration(String),

    #[error("Error while updating attachment data for {id}: {message}")]
    Metadata { id: u64, message: String },

    #[error("Error while preparing data for JS: {0}")]
    Serialization(String),
}

impl IngestError {
    /// Short name of the variant, used as a structured logging field
    pub fn error_type(&self) -> &'static str {
        match self {
            IngestError::Auth => "AuthError",
            IngestError::BadRequest => "BadRequestError",
            IngestError::Validation(_) => "ValidationError",
            IngestError::Download(_) => "DownloadError",
            IngestError::Registration(_) => "RegistrationError",
            IngestError::Metadata { .. } => "MetadataError",
            IngestError::Serialization(_) => "SerializationError",
        }
    }
}

impl ErrorMetadata for IngestError {
    fn error_code(&self) -> &'static str {
        match self {
            IngestError::Auth => "WRONG_NONCE",
            IngestError::BadRequest => "MISSING_DATA",
            IngestError::Validation(_) => "VALIDATION_ERROR",
            IngestError::Download(_) => "DOWNLOAD_ERROR",
            IngestError::Registration(_) => "UPLOAD_ERROR",
            IngestError::Metadata { .. } => "METADATA_ERROR",
            IngestError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    fn client_message(&self) -> String {
        self.to_string()
    }

    fn log_level(&self) -> LogLevel {
        match self {
            IngestError::Auth | IngestError::BadRequest | IngestError::Validation(_) => {
                LogLevel::Debug
            }
            IngestError::Download(_) | IngestError::Registration(_) => LogLevel::Warn,
            IngestError::Metadata { .. } | IngestError::Serialization(_) => LogLevel::Error,
        }
    }
}
