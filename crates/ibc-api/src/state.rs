use crate::services::ingest::IngestService;
use ibc_core::IbcConfig;
use ibc_infra::{DiagnosticLogSink, NonceService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: IbcConfig,
    pub ingest: IngestService,
    pub diagnostics: DiagnosticLogSink,
    pub nonces: NonceService,
}
