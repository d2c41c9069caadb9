//! Calendar backend with background reminder, archiver and logging workers

mod app;
mod config;
mod error;
mod handlers;
mod middlewares;
mod models;
mod services;
mod state;

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{close_db, init_db, APP_CONFIG};
use crate::models::{event::EventStore, user::UserStore};
use crate::services::logsink::{self, LogEntry, LogWriter};
use crate::services::notifier::EmailNotifier;
use crate::services::reminder::{self, ReminderScheduler};
use crate::services::{archiver, queue};
use crate::state::AppState;

// High-performance memory allocator for non-MSVC targets
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    info!("Starting calendar-service...");

    let _sentry_guard = init_sentry();

    let db_pool = init_db().await?;
    let shutdown = CancellationToken::new();

    // Bounded hand-off queues between the request path and the workers.
    // Producers never block; a full queue drops.
    let (reminder_tx, reminder_rx) = queue::bounded(APP_CONFIG.reminder_queue_capacity);
    let (log_tx, log_rx) = queue::bounded(APP_CONFIG.log_queue_capacity);

    let log_sink = tokio::spawn(logsink::run_log_sink(log_rx, LogEntry::emit));
    let reminder_worker = tokio::spawn(reminder::run_reminder_worker(
        reminder_rx,
        Arc::new(UserStore::new(db_pool.clone())),
        Arc::new(EmailNotifier::new()),
        shutdown.clone(),
    ));
    let archiver_worker = tokio::spawn(archiver::run_archiver(
        EventStore::new(db_pool.clone()),
        Duration::from_secs(APP_CONFIG.archive_interval_secs),
        shutdown.clone(),
    ));

    let state = AppState::new(db_pool, ReminderScheduler::new(reminder_tx));
    let app = app::app(state, LogWriter::new(log_tx));

    let port = &APP_CONFIG.server_port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    info!("Server running on http://0.0.0.0:{port}");
    info!(
        "Config: reminder_queue={}, log_queue={}, archive_interval={}s",
        APP_CONFIG.reminder_queue_capacity,
        APP_CONFIG.log_queue_capacity,
        APP_CONFIG.archive_interval_secs
    );

    // The server task owns the router and with it every queue producer; when
    // it finishes, both queues close and the consumers drain out.
    let server = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal(shutdown))
                .await
        })
    };

    // In-flight requests get a fixed grace period once the shutdown signal
    // fires; exceeding it is fatal.
    let grace = Duration::from_secs(APP_CONFIG.shutdown_grace_secs);
    tokio::select! {
        result = server => result??,
        () = async {
            shutdown.cancelled().await;
            tokio::time::sleep(grace).await;
        } => {
            error!("shutdown grace period of {grace:?} exceeded, forcing exit");
            return Err("shutdown grace period exceeded".into());
        }
    }

    info!("Shutting down...");
    for result in
        futures::future::join_all([reminder_worker, archiver_worker, log_sink]).await
    {
        result?;
    }

    close_db().await;

    // Flush Sentry events before exit
    if let Some(client) = sentry::Hub::current().client() {
        client.flush(Some(std::time::Duration::from_secs(2)));
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on SIGINT/SIGTERM, cancelling the shared token so every worker
/// and the HTTP server begin shutting down together.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }

    shutdown.cancel();
}

fn init_logger() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)))
        .init();
}

fn init_sentry() -> sentry::ClientInitGuard {
    sentry::init((
        APP_CONFIG.sentry_dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            traces_sample_rate: APP_CONFIG.sentry_traces_sample_rate,
            sample_rate: 1.0,
            ..Default::default()
        },
    ))
}
