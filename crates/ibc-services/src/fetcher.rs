//! Remote asset download
//!
//! Assets can be large, so the response body is streamed chunk by chunk into
//! a temp file and never held in memory. The temp file is a
//! [`tempfile::NamedTempFile`] until the download succeeds, which removes it
//! on every early return.
//!
//! Every URL, redirect targets included, must pass the fetcher's
//! [`UrlPolicy`] before it is requested.

use crate::ssrf::UrlPolicy;
use futures::StreamExt;
use ibc_core::DownloadError;
use reqwest::header::COOKIE;
use reqwest::redirect;
use reqwest::{StatusCode, Url};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

const INVALID_URL_MESSAGE: &str = "A valid URL was not provided.";
const LEGACY_AUTH_COOKIE: &str = "_aid";
const MAX_PREFIX_LENGTH: usize = 64;
const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone)]
pub struct AssetFetcher {
    client: reqwest::Client,
    temp_dir: PathBuf,
    policy: UrlPolicy,
}

impl AssetFetcher {
    pub fn new(
        temp_dir: impl Into<PathBuf>,
        timeout: Duration,
        policy: UrlPolicy,
    ) -> Result<Self, reqwest::Error> {
        let hop_policy = policy.clone();
        let redirects = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                return attempt.error("too many redirects");
            }
            match hop_policy.check_host(attempt.url()) {
                Ok(()) => attempt.follow(),
                Err(reason) => attempt.error(reason),
            }
        });
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(redirects)
            .build()?;
        Ok(Self {
            client,
            temp_dir: temp_dir.into(),
            policy,
        })
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Download `url` into a new temp file and return its path.
    ///
    /// A non-empty `auth_token` is sent as the `_aid` cookie required by the
    /// older DAM API; no cookie is sent otherwise. On success the caller owns
    /// the returned file.
    #[tracing::instrument(skip(self, auth_token), fields(legacy_auth = !auth_token.is_empty()))]
    pub async fn fetch(&self, url: &str, auth_token: &str) -> Result<PathBuf, DownloadError> {
        let parsed = Url::parse(url)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .ok_or_else(|| DownloadError::Transport(INVALID_URL_MESSAGE.to_string()))?;

        self.policy.check(&parsed).await.map_err(|reason| {
            tracing::warn!(reason = %reason, "Asset URL refused");
            DownloadError::Transport(reason)
        })?;

        let temp = self.create_temp_file(&parsed).map_err(|e| {
            tracing::error!(error = %e, temp_dir = %self.temp_dir.display(), "Could not create temp file");
            DownloadError::TempFile(e)
        })?;

        let mut request = self.client.get(parsed);
        if !auth_token.is_empty() {
            request = request.header(COOKIE, format!("{}={}", LEGACY_AUTH_COOKIE, auth_token));
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Asset request failed");
            DownloadError::Transport(error_messages(&e))
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!(status = status.as_u16(), "Asset request returned non-200 status");
            return Err(DownloadError::Status {
                status: status.as_u16(),
                reason: reason_phrase(status),
            });
        }

        let std_file = temp.reopen().map_err(DownloadError::Write)?;
        let mut file = tokio::fs::File::from_std(std_file);
        let mut written: u64 = 0;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| DownloadError::Transport(error_messages(&e)))?;
            file.write_all(&chunk).await.map_err(DownloadError::Write)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(DownloadError::Write)?;
        drop(file);

        let path = temp
            .into_temp_path()
            .keep()
            .map_err(|e| DownloadError::Write(e.error))?;

        tracing::info!(path = %path.display(), bytes = written, "Asset downloaded");
        Ok(path)
    }

    /// `<url basename stem>-<random>.tmp` in the temp directory
    fn create_temp_file(&self, url: &Url) -> std::io::Result<NamedTempFile> {
        let prefix = format!("{}-", temp_prefix(url));
        tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(&self.temp_dir)
    }
}

fn temp_prefix(url: &Url) -> String {
    let basename = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");
    let stem = basename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(basename);

    let prefix: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(MAX_PREFIX_LENGTH)
        .collect();

    if prefix.is_empty() {
        "download".to_string()
    } else {
        prefix
    }
}

/// Every message of the error chain joined with ". "
fn error_messages(err: &(dyn Error + 'static)) -> String {
    let mut messages = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        let message = inner.to_string();
        if !messages.contains(&message) {
            messages.push(message);
        }
        source = inner.source();
    }
    messages.join(". ")
}

fn reason_phrase(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_u16().to_string())
}
