use crate::auth;
use crate::constants::{NONCE_FIELDS, NONCE_HEADER};
use crate::envelope::ResponseEnvelope;
use crate::services::ingest::UploadRequest;
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap};
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;

/// Import one DAM asset into the media library.
///
/// The body is read leniently: anything that is not a JSON object is treated
/// as an empty object, so the request still reaches the nonce check and gets
/// a regular error envelope.
#[tracing::instrument(skip(state, headers, body), fields(body_len = body.len()))]
pub async fn ajax_upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ResponseEnvelope {
    let request = upload_request(&headers, &body);

    let log = state.diagnostics.begin();
    let envelope = state.ingest.ingest(&request, &log).await;
    log.flush().await;

    envelope
}

fn upload_request(headers: &HeaderMap, body: &[u8]) -> UploadRequest {
    let body = match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) | Err(_) => Value::Object(Default::default()),
    };

    let nonce = NONCE_FIELDS
        .iter()
        .find_map(|field| body.get(*field).and_then(Value::as_str))
        .map(str::to_string)
        .or_else(|| {
            headers
                .get(NONCE_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        });

    UploadRequest {
        nonce,
        session: auth::session_cookie(headers),
        body,
    }
}
