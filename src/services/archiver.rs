//! Periodic event archiver
//!
//! One task on a fixed interval. The archive call is awaited inside the tick
//! branch, so runs never overlap; a slow run simply delays the next tick.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Target of the archiver loop. Must be idempotent: re-running over an
/// overlapping date range is safe.
#[async_trait]
pub trait EventArchiver: Send + Sync {
    /// Archives events older than today, returning how many were moved.
    async fn archive_old_events(&self) -> Result<u64, sqlx::Error>;
}

/// Invokes `archive_old_events` every `interval` until `shutdown` fires. The
/// first run happens one full interval after start; missed ticks are skipped,
/// a failed run is retried only by the next regular tick. An in-progress run
/// completes before cancellation is observed.
pub async fn run_archiver<A: EventArchiver>(
    archiver: A,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(interval_secs = interval.as_secs(), "archiver started");

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                info!("archiver stopped");
                return;
            }
            _ = ticker.tick() => match archiver.archive_old_events().await {
                Ok(archived) => info!(archived, "archived old events"),
                Err(err) => error!(error = %err, "failed to archive old events"),
            },
        }
    }
}
