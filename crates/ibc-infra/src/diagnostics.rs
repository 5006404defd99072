//! Diagnostic file log
//!
//! A [`DiagnosticLog`] collects timestamped entries for one request and writes
//! them to `log.txt` as a single appended block when [`DiagnosticLog::flush`]
//! is called. Nothing is written for a request that logged nothing.
//!
//! Writing is best-effort: I/O failures are reported through `tracing` and
//! never reach the caller.

use chrono::{DateTime, Local};
use std::error::Error;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

const TIMESTAMP_FORMAT: &str = "%d.%m.%y %H:%M:%S";
const LOG_FILENAME: &str = "log.txt";

/// A message accepted by [`DiagnosticLog::log`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogMessage {
    Text(String),
    /// Messages of an error and its sources, rendered joined with " | "
    Errors(Vec<String>),
}

impl LogMessage {
    pub fn from_error(err: &(dyn Error + 'static)) -> Self {
        let mut messages = vec![err.to_string()];
        let mut source = err.source();
        while let Some(inner) = source {
            messages.push(inner.to_string());
            source = inner.source();
        }
        LogMessage::Errors(messages)
    }

    fn render(self) -> String {
        match self {
            LogMessage::Text(text) => text,
            LogMessage::Errors(messages) => messages.join(" | "),
        }
    }
}

impl From<&str> for LogMessage {
    fn from(text: &str) -> Self {
        LogMessage::Text(text.to_string())
    }
}

impl From<String> for LogMessage {
    fn from(text: String) -> Self {
        LogMessage::Text(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.message
        )
    }
}

/// Shared factory for per-request logs
#[derive(Debug, Clone)]
pub struct DiagnosticLogSink {
    dir: PathBuf,
    enabled: bool,
}

impl DiagnosticLogSink {
    /// `dir` is the log directory; it is created on the first logged entry.
    pub fn new(dir: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            dir: dir.into(),
            enabled,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn file_path(&self) -> PathBuf {
        self.dir.join(LOG_FILENAME)
    }

    /// Start the log of one request
    pub fn begin(&self) -> DiagnosticLog {
        DiagnosticLog {
            dir: self.dir.clone(),
            enabled: self.enabled,
            launched: Local::now(),
            state: Mutex::new(LogState::default()),
        }
    }
}

#[derive(Debug, Default)]
struct LogState {
    entries: Vec<LogEntry>,
    dir_checked: bool,
}

#[derive(Debug)]
pub struct DiagnosticLog {
    dir: PathBuf,
    enabled: bool,
    launched: DateTime<Local>,
    state: Mutex<LogState>,
}

impl DiagnosticLog {
    pub fn log(&self, message: impl Into<LogMessage>) {
        if !self.enabled {
            return;
        }

        let text = message.into().render();
        tracing::debug!(target: "ibc::diagnostics", "{}", text);

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.dir_checked {
            state.dir_checked = true;
            if let Some(outcome) = ensure_dir(&self.dir) {
                push(&mut state.entries, outcome);
            }
        }
        push(&mut state.entries, text);
    }

    /// Log an error together with its source chain
    pub fn log_error(&self, err: &(dyn Error + 'static)) {
        self.log(LogMessage::from_error(err));
    }

    /// Snapshot of the entries recorded so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clone()
    }

    /// Append the collected entries to the log file as one block.
    pub async fn flush(mut self) {
        let Some(block) = self.take_block() else {
            return;
        };

        let path = self.dir.join(LOG_FILENAME);
        if let Err(e) = append(&path, block.as_bytes()).await {
            tracing::warn!(error = %e, path = %path.display(), "Failed to write diagnostic log");
        }
    }

    /// Render and clear the pending entries; `None` when nothing was logged.
    fn take_block(&mut self) -> Option<String> {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if state.entries.is_empty() {
            return None;
        }

        let lines: Vec<String> = std::mem::take(&mut state.entries)
            .iter()
            .map(ToString::to_string)
            .collect();
        Some(format!(
            "\nProcess launched: {}\n{}\n",
            self.launched.format(TIMESTAMP_FORMAT),
            lines.join("\n")
        ))
    }
}

/// A request cancelled before [`DiagnosticLog::flush`] (client disconnect,
/// shutdown) still gets its block written, synchronously.
impl Drop for DiagnosticLog {
    fn drop(&mut self) {
        let Some(block) = self.take_block() else {
            return;
        };

        let path = self.dir.join(LOG_FILENAME);
        tracing::debug!(path = %path.display(), "Diagnostic log dropped before flush");
        if let Err(e) = append_blocking(&path, block.as_bytes()) {
            tracing::warn!(error = %e, path = %path.display(), "Failed to write diagnostic log");
        }
    }
}

fn push(entries: &mut Vec<LogEntry>, message: String) {
    entries.push(LogEntry {
        timestamp: Local::now(),
        message,
    });
}

/// Create the log directory if missing; returns the outcome line to log.
fn ensure_dir(dir: &Path) -> Option<String> {
    if dir.exists() {
        return None;
    }
    Some(match std::fs::create_dir_all(dir) {
        Ok(()) => format!("Dir {} created successfully", dir.display()),
        Err(e) => {
            tracing::warn!(error = %e, dir = %dir.display(), "Failed to create log directory");
            format!("Error while creating dir {}", dir.display())
        }
    })
}

/// One `write_all` on an `O_APPEND` handle, so concurrent requests never
/// interleave inside a block.
async fn append(path: &Path, block: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(block).await?;
    file.flush().await
}

fn append_blocking(path: &Path, block: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(block)
}
