//! Request logging middleware
//!
//! Hands one entry per request to the async log sink queue. The hand-off is
//! non-blocking and best-effort; the request outcome is never affected.

use std::time::Instant;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use chrono::Utc;

use crate::services::logsink::{LogEntry, LogWriter};

pub async fn request_logger(
    State(log): State<LogWriter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_owned();
    let started_at = Utc::now();
    let start = Instant::now();

    let response = next.run(req).await;

    log.record(LogEntry {
        method,
        path,
        duration: start.elapsed(),
        started_at,
    });

    response
}
