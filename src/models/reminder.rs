//! Reminder value object

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A scheduled future notification for a calendar event.
///
/// Reminders exist only in memory on the queue-to-delivery path; a process
/// restart between enqueue and fire time loses them.
#[derive(Clone, Debug)]
pub struct Reminder {
    pub user_id: Uuid,
    pub event_id: Uuid,
    /// Human-readable payload, typically the event title.
    pub message: String,
    pub remind_at: DateTime<Utc>,
}
