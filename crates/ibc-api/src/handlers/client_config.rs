use crate::auth;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use ibc_infra::{NonceService, UPLOAD_NONCE_ACTION};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Settings the browser UI needs before it can post uploads
#[derive(Debug, Serialize)]
pub struct ClientConfig {
    pub nonce: String,
    pub url: String,
    pub log: bool,
}

/// Issue an upload nonce for the caller's session.
///
/// Requires the access key. An existing session cookie is kept so nonces
/// handed out earlier stay valid; otherwise a new session is started.
pub async fn client_config(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if !auth::has_access_key(&headers, &state.config.access_key) {
        tracing::warn!("Client config requested without a valid access key");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "Invalid or missing access key",
                "error_type": "Unauthorized",
            })),
        )
            .into_response();
    }

    let session = auth::session_cookie(&headers)
        .filter(|s| NonceService::is_session_id(s))
        .unwrap_or_else(NonceService::new_session);

    let config = ClientConfig {
        nonce: state.nonces.create(UPLOAD_NONCE_ACTION, &session),
        url: state.config.dam_url.clone(),
        log: state.config.log_enabled,
    };
    let cookie = auth::session_set_cookie(&session, state.config.is_production());

    ([(header::SET_COOKIE, cookie)], Json(config)).into_response()
}
