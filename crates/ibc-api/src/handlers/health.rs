//! Health check handler

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Run an async check with timeout; returns "healthy", "timeout", or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub uploads: String,
    pub temp: String,
}

/// Checks that the uploads and staging directories are reachable.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uploads_dir = state.config.uploads_dir.clone();
    let uploads = run_check(TIMEOUT, dir_exists(uploads_dir), "unhealthy").await;

    let temp_dir = state.config.temp_dir.clone();
    let temp = run_check(TIMEOUT, dir_exists(temp_dir), "unhealthy").await;

    let healthy = uploads == "healthy" && temp == "healthy";
    let response = HealthCheckResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        uploads,
        temp,
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        tracing::error!(
            uploads = %response.uploads,
            temp = %response.temp,
            "Health check failed"
        );
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}

async fn dir_exists(path: std::path::PathBuf) -> std::io::Result<()> {
    let metadata = tokio::fs::metadata(&path).await?;
    if metadata.is_dir() {
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotADirectory,
            format!("{} is not a directory", path.display()),
        ))
    }
}
