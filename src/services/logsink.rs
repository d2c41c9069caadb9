//! Asynchronous request-log pipeline
//!
//! The logging middleware hands entries to a bounded queue and returns
//! immediately; a single sink task drains the queue and writes structured log
//! lines. Request latency is never coupled to log throughput.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use super::queue::{QueueReceiver, QueueSender};

/// One handled HTTP request, as observed by the logging middleware.
#[derive(Clone, Debug)]
pub struct LogEntry {
    pub method: String,
    pub path: String,
    pub duration: Duration,
    pub started_at: DateTime<Utc>,
}

impl LogEntry {
    /// Writes the entry as a structured `tracing` event.
    pub fn emit(&self) {
        info!(
            target: "http::request",
            method = %self.method,
            path = %self.path,
            duration_ms = u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX),
            started_at = %self.started_at.to_rfc3339(),
            "request",
        );
    }
}

/// Producer handle held by the logging middleware.
#[derive(Clone)]
pub struct LogWriter {
    tx: QueueSender<LogEntry>,
}

impl LogWriter {
    pub const fn new(tx: QueueSender<LogEntry>) -> Self {
        Self { tx }
    }

    /// Best-effort enqueue. A full queue drops the entry silently; nothing
    /// here may surface an error into the request path.
    pub fn record(&self, entry: LogEntry) {
        let _ = self.tx.try_push(entry);
    }
}

/// Drains the log queue until it closes, writing each entry in acceptance
/// order. Returns once every `LogWriter` clone is gone and the buffer is
/// empty.
pub async fn run_log_sink<F>(mut rx: QueueReceiver<LogEntry>, mut write: F)
where
    F: FnMut(&LogEntry),
{
    info!("log sink started");
    while let Some(entry) = rx.recv().await {
        write(&entry);
    }
    info!("log sink stopped");
}
