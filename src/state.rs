//! Application state shared across handlers

use sqlx::SqlitePool;

use crate::models::{event::EventStore, user::UserStore};
use crate::services::reminder::ReminderScheduler;

/// Shared application state accessible via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub users: UserStore,
    pub events: EventStore,
    pub reminders: ReminderScheduler,
}

impl AppState {
    #[must_use]
    pub fn new(db_pool: SqlitePool, reminders: ReminderScheduler) -> Self {
        Self {
            users: UserStore::new(db_pool.clone()),
            events: EventStore::new(db_pool.clone()),
            db_pool,
            reminders,
        }
    }
}
