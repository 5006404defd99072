//! Asset ingestion
//!
//! Steps of one upload, each short-circuiting to the error envelope:
//! nonce check, `data` payload check, validation, download, sideload into the
//! media library, description update, client serialization.

use crate::envelope::ResponseEnvelope;
use ibc_core::{
    validate, ErrorMetadata, FetchedAsset, IngestError, IngestionRequest, LogLevel,
    ValidatedAssetRecord,
};
use ibc_infra::{DiagnosticLog, NonceService, UPLOAD_NONCE_ACTION};
use ibc_services::AssetFetcher;
use ibc_storage::{AttachmentId, AttachmentUpdate, MediaLibrary, SideloadFile};
use serde_json::Value;
use std::sync::Arc;

/// An inbound upload: the nonce presented with the request, the session
/// cookie it must be bound to, and the body
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub nonce: Option<String>,
    pub session: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
pub struct IngestService {
    nonces: NonceService,
    fetcher: AssetFetcher,
    library: Arc<dyn MediaLibrary>,
}

impl IngestService {
    pub fn new(nonces: NonceService, fetcher: AssetFetcher, library: Arc<dyn MediaLibrary>) -> Self {
        Self {
            nonces,
            fetcher,
            library,
        }
    }

    /// Run one ingestion and build its response. Never fails: every error
    /// becomes an error envelope after being written to `log`.
    pub async fn ingest(&self, request: &UploadRequest, log: &DiagnosticLog) -> ResponseEnvelope {
        match self.run(request, log).await {
            Ok(data) => {
                log.log("Done");
                ResponseEnvelope::success("Done", data)
            }
            Err(e) => {
                trace_error(&e);
                log.log(format!("Error: {}", e));
                ResponseEnvelope::error(e.client_message())
            }
        }
    }

    async fn run(&self, request: &UploadRequest, log: &DiagnosticLog) -> Result<Value, IngestError> {
        let nonce = request.nonce.as_deref().unwrap_or_default();
        let session = request.session.as_deref().unwrap_or_default();
        if !self.nonces.verify(UPLOAD_NONCE_ACTION, session, nonce) {
            return Err(IngestError::Auth);
        }

        log.log("Uploading asset...");

        let raw = IngestionRequest::from_body(&request.body).ok_or(IngestError::BadRequest)?;
        let record = validate(&raw)?;

        log.log("Downloading...");
        let path = self.fetcher.fetch(&record.url, &record.auth_token).await?;
        log.log("Downloaded");

        let id = self.register(FetchedAsset::new(path, &record)).await?;
        self.describe(id, &record).await?;

        self.library
            .prepare_for_client(id)
            .await
            .map_err(|e| IngestError::Serialization(e.to_string()))
    }

    /// Hand the downloaded file to the media library, which owns it from here.
    async fn register(&self, asset: FetchedAsset) -> Result<AttachmentId, IngestError> {
        let file = SideloadFile {
            path: asset.path,
            filename: asset.filename,
            kind: asset.kind,
            declared_size: asset.declared_size,
        };

        self.library
            .sideload(file)
            .await
            .map_err(|e| IngestError::Registration(e.to_string()))
    }

    async fn describe(
        &self,
        id: AttachmentId,
        record: &ValidatedAssetRecord,
    ) -> Result<(), IngestError> {
        let update = AttachmentUpdate::describe(record.attachment_description());
        self.library
            .update_attachment(id, update)
            .await
            .map_err(|e| IngestError::Metadata {
                id: id.0,
                message: e.to_string(),
            })
    }
}

fn trace_error(error: &IngestError) {
    let error_type = error.error_type();
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type, code, "Ingestion failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type, code, "Ingestion failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type, code, "Ingestion failed");
        }
    }
}
