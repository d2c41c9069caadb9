//! Event model and database operations

use async_trait::async_trait;
use chrono::{DateTime, Duration, Months, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::services::archiver::EventArchiver;

/// Calendar event owned by a single user.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Event {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub event_date: DateTime<Utc>,
    pub remind_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SELECT_COLUMNS: &str =
    "id, user_id, title, description, event_date, remind_at, created_at, updated_at";

/// Event persistence over the shared pool.
#[derive(Clone)]
pub struct EventStore {
    pool: SqlitePool,
}

impl EventStore {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a new event and returns the generated id.
    pub async fn create(
        &self,
        user_id: Uuid,
        title: &str,
        description: &str,
        event_date: DateTime<Utc>,
        remind_at: Option<DateTime<Utc>>,
    ) -> Result<Uuid, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO events (id, user_id, title, description, event_date, remind_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(event_date)
        .bind(remind_at)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    /// Updates an event owned by `user_id`. Returns `false` when no such
    /// event exists.
    pub async fn update(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        title: &str,
        description: &str,
        event_date: DateTime<Utc>,
        remind_at: Option<DateTime<Utc>>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE events
             SET title = ?, description = ?, event_date = ?, remind_at = ?,
                 updated_at = datetime('now')
             WHERE id = ? AND user_id = ?",
        )
        .bind(title)
        .bind(description)
        .bind(event_date)
        .bind(remind_at)
        .bind(event_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Deletes an event owned by `user_id`. Returns `false` when no such
    /// event exists.
    pub async fn delete(&self, event_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE id = ? AND user_id = ?")
            .bind(event_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Events for `user_id` on the given day.
    pub async fn for_day(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<Event>, sqlx::Error> {
        let from = day_start(date);
        self.for_window(user_id, from, from + Duration::days(1))
            .await
    }

    /// Events for `user_id` within seven days of the given date.
    pub async fn for_week(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Event>, sqlx::Error> {
        let from = day_start(date);
        self.for_window(user_id, from, from + Duration::days(7))
            .await
    }

    /// Events for `user_id` within one calendar month of the given date.
    pub async fn for_month(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Event>, sqlx::Error> {
        let from = day_start(date);
        let to = from
            .checked_add_months(Months::new(1))
            .unwrap_or(from + Duration::days(31));
        self.for_window(user_id, from, to).await
    }

    async fn for_window(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM events
             WHERE user_id = ? AND event_date >= ? AND event_date < ?
             ORDER BY event_date",
        ))
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[async_trait]
impl EventArchiver for EventStore {
    /// Moves events dated before today into `events_archive` and removes them
    /// from `events`. Safe to run repeatedly: re-archiving an overlapping
    /// range inserts nothing new and deletes nothing extra.
    async fn archive_old_events(&self) -> Result<u64, sqlx::Error> {
        let cutoff = day_start(Utc::now().date_naive());

        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!(
            "INSERT OR IGNORE INTO events_archive
             (id, user_id, title, description, event_date, remind_at, created_at, updated_at)
             SELECT {SELECT_COLUMNS} FROM events WHERE event_date < ?",
        ))
        .bind(cutoff)
        .execute(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM events WHERE event_date < ?")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(deleted.rows_affected())
    }
}
