//! Reminder dispatch worker
//!
//! Handlers push reminders into a bounded queue and move on; the worker loop
//! spawns one task per reminder, each of which waits out its own fire time and
//! delivers exactly one notification. The queue bounds only reminders awaiting
//! pickup, not those already waiting on their timer.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::time::sleep;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{reminder::Reminder, user::User};

use super::notifier::Notifier;
use super::queue::{QueueReceiver, QueueSender};

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("user not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Resolves the recipient of a reminder.
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn by_id(&self, id: Uuid) -> Result<User, LookupError>;
}

/// Producer handle held by the event handlers.
#[derive(Clone)]
pub struct ReminderScheduler {
    tx: QueueSender<Reminder>,
}

impl ReminderScheduler {
    #[must_use]
    pub const fn new(tx: QueueSender<Reminder>) -> Self {
        Self { tx }
    }

    /// Non-blocking, best-effort. A reminder the queue cannot take is logged
    /// and never delivered.
    pub fn schedule(&self, reminder: Reminder) {
        if let Err(err) = self.tx.try_push(reminder) {
            let reason = err.to_string();
            let dropped = err.into_inner();
            warn!(
                event_id = %dropped.event_id,
                user_id = %dropped.user_id,
                reason,
                "dropping reminder",
            );
        }
    }
}

/// Consumes the reminder queue until it closes or `shutdown` fires, spawning
/// an independent delivery task per reminder. Returns only after every
/// in-flight delivery task has finished.
pub async fn run_reminder_worker(
    mut rx: QueueReceiver<Reminder>,
    users: Arc<dyn UserLookup>,
    notifier: Arc<dyn Notifier>,
    shutdown: CancellationToken,
) {
    let tracker = TaskTracker::new();
    info!("reminder worker started");

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            maybe = rx.recv() => match maybe {
                Some(reminder) => {
                    tracker.spawn(handle_reminder(
                        reminder,
                        Arc::clone(&users),
                        Arc::clone(&notifier),
                        shutdown.clone(),
                    ));
                }
                None => break,
            },
        }
    }

    tracker.close();
    tracker.wait().await;
    info!("reminder worker stopped");
}

/// Owns one reminder's lifecycle: wait until the fire time (or cancellation),
/// resolve the recipient, deliver once. Failures are logged, never retried.
async fn handle_reminder(
    reminder: Reminder,
    users: Arc<dyn UserLookup>,
    notifier: Arc<dyn Notifier>,
    shutdown: CancellationToken,
) {
    // A past-due reminder fires immediately; to_std rejects negative delays.
    if let Ok(delay) = (reminder.remind_at - Utc::now()).to_std() {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => return,
            () = sleep(delay) => {}
        }
    }

    let user = match users.by_id(reminder.user_id).await {
        Ok(user) => user,
        Err(err) => {
            warn!(
                user_id = %reminder.user_id,
                event_id = %reminder.event_id,
                error = %err,
                "failed to fetch reminder recipient",
            );
            return;
        }
    };

    let message = format!("Reminder: your event \"{}\" is coming up!", reminder.message);
    if let Err(err) = notifier.send(&user.email, &message).await {
        warn!(
            user_id = %reminder.user_id,
            event_id = %reminder.event_id,
            error = %err,
            "failed to deliver reminder",
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::{DateTime, Utc};
    use tokio::time::{advance, timeout};

    use super::*;
    use crate::services::notifier::NotifyError;
    use crate::services::queue;

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_owned(),
            name: "Alice".to_owned(),
            password_hash: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn reminder_at(remind_at: DateTime<Utc>) -> Reminder {
        Reminder {
            user_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            message: "Dentist".to_owned(),
            remind_at,
        }
    }

    struct StaticUsers(User);

    #[async_trait]
    impl UserLookup for StaticUsers {
        async fn by_id(&self, _id: Uuid) -> Result<User, LookupError> {
            Ok(self.0.clone())
        }
    }

    struct MissingUsers;

    #[async_trait]
    impl UserLookup for MissingUsers {
        async fn by_id(&self, _id: Uuid) -> Result<User, LookupError> {
            Err(LookupError::NotFound)
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingNotifier {
        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, to: &str, message: &str) -> Result<(), NotifyError> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_owned(), message.to_owned()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FailingNotifier {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn send(&self, _to: &str, _message: &str) -> Result<(), NotifyError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(NotifyError::Sdk("boom".to_owned()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_deliver_before_the_fire_time() {
        let (tx, rx) = queue::bounded(8);
        let notifier = Arc::new(RecordingNotifier::default());
        let shutdown = CancellationToken::new();
        let worker = tokio::spawn(run_reminder_worker(
            rx,
            Arc::new(StaticUsers(test_user())),
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            shutdown.clone(),
        ));

        let scheduler = ReminderScheduler::new(tx);
        scheduler.schedule(reminder_at(Utc::now() + chrono::Duration::hours(1)));

        // Let the worker pick the reminder up and arm its timer.
        sleep(Duration::from_millis(50)).await;

        advance(Duration::from_secs(3500)).await;
        sleep(Duration::from_millis(50)).await;
        assert!(notifier.sent().is_empty());

        advance(Duration::from_secs(200)).await;
        sleep(Duration::from_millis(50)).await;
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "alice@example.com");
        assert!(sent[0].1.contains("Dentist"));

        shutdown.cancel();
        worker.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_cuts_short_a_pending_timer() {
        let (tx, rx) = queue::bounded(8);
        let notifier = Arc::new(RecordingNotifier::default());
        let shutdown = CancellationToken::new();
        let worker = tokio::spawn(run_reminder_worker(
            rx,
            Arc::new(StaticUsers(test_user())),
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            shutdown.clone(),
        ));

        let scheduler = ReminderScheduler::new(tx);
        scheduler.schedule(reminder_at(Utc::now() + chrono::Duration::hours(1)));
        sleep(Duration::from_millis(50)).await;

        shutdown.cancel();

        // The worker must join long before the hour elapses.
        timeout(Duration::from_secs(5), worker)
            .await
            .expect("worker did not stop promptly")
            .unwrap();
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn past_due_reminder_is_delivered_immediately() {
        let (tx, rx) = queue::bounded(8);
        let notifier = Arc::new(RecordingNotifier::default());
        let shutdown = CancellationToken::new();
        let worker = tokio::spawn(run_reminder_worker(
            rx,
            Arc::new(StaticUsers(test_user())),
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            shutdown.clone(),
        ));

        let scheduler = ReminderScheduler::new(tx);
        scheduler.schedule(reminder_at(Utc::now() - chrono::Duration::minutes(5)));

        sleep(Duration::from_millis(50)).await;
        assert_eq!(notifier.sent().len(), 1);

        shutdown.cancel();
        worker.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn queue_closure_drains_buffered_reminders_then_joins() {
        let (tx, rx) = queue::bounded(8);
        let notifier = Arc::new(RecordingNotifier::default());
        let shutdown = CancellationToken::new();

        let scheduler = ReminderScheduler::new(tx);
        for _ in 0..3 {
            scheduler.schedule(reminder_at(Utc::now() - chrono::Duration::minutes(1)));
        }
        drop(scheduler);

        run_reminder_worker(
            rx,
            Arc::new(StaticUsers(test_user())),
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            shutdown,
        )
        .await;

        assert_eq!(notifier.sent().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_recipient_lookup_abandons_the_reminder() {
        let (tx, rx) = queue::bounded(8);
        let notifier = Arc::new(RecordingNotifier::default());
        let shutdown = CancellationToken::new();
        let worker = tokio::spawn(run_reminder_worker(
            rx,
            Arc::new(MissingUsers),
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            shutdown.clone(),
        ));

        let scheduler = ReminderScheduler::new(tx);
        scheduler.schedule(reminder_at(Utc::now() - chrono::Duration::minutes(1)));

        sleep(Duration::from_millis(50)).await;
        assert!(notifier.sent().is_empty());

        shutdown.cancel();
        worker.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_failure_is_not_retried() {
        let (tx, rx) = queue::bounded(8);
        let notifier = Arc::new(FailingNotifier::default());
        let shutdown = CancellationToken::new();
        let worker = tokio::spawn(run_reminder_worker(
            rx,
            Arc::new(StaticUsers(test_user())),
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            shutdown.clone(),
        ));

        let scheduler = ReminderScheduler::new(tx);
        scheduler.schedule(reminder_at(Utc::now() - chrono::Duration::minutes(1)));

        sleep(Duration::from_millis(50)).await;
        assert_eq!(notifier.attempts.load(Ordering::SeqCst), 1);

        shutdown.cancel();
        worker.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn idle_worker_shuts_down_cleanly() {
        let (_tx, rx) = queue::bounded::<Reminder>(8);
        let shutdown = CancellationToken::new();
        let worker = tokio::spawn(run_reminder_worker(
            rx,
            Arc::new(MissingUsers),
            Arc::new(RecordingNotifier::default()) as Arc<dyn Notifier>,
            shutdown.clone(),
        ));

        shutdown.cancel();
        timeout(Duration::from_secs(1), worker)
            .await
            .expect("idle worker did not stop promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn overflow_reminders_are_dropped_best_effort() {
        let (tx, mut rx) = queue::bounded(100);
        let scheduler = ReminderScheduler::new(tx);

        for _ in 0..150 {
            scheduler.schedule(reminder_at(Utc::now()));
        }
        drop(scheduler);

        let mut accepted = 0;
        while rx.recv().await.is_some() {
            accepted += 1;
        }
        assert_eq!(accepted, 100);
    }
}
