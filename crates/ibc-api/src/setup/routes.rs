//! Route configuration and setup

use crate::constants::{
    CLIENT_CONFIG_PATH, HEALTH_PATH, NONCE_HEADER, UPLOADS_PATH, UPLOAD_PATH,
};
use crate::handlers;
use crate::state::AppState;
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use ibc_core::IbcConfig;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Upload requests carry metadata only; the asset itself is pulled from the DAM.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &IbcConfig, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let ajax_routes = Router::new()
        .route(UPLOAD_PATH, post(handlers::upload::ajax_upload))
        .route(CLIENT_CONFIG_PATH, get(handlers::client_config::client_config))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    let app = Router::new()
        .merge(ajax_routes)
        .route(HEALTH_PATH, get(handlers::health::health_check))
        .nest_service(UPLOADS_PATH, ServeDir::new(&config.uploads_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &IbcConfig) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        // credentialed so the session cookie reaches the upload endpoint
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                HeaderName::from_static(NONCE_HEADER),
            ])
            .allow_credentials(true)
    };
    Ok(cors)
}
