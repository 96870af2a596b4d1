/// Notification model and database operations
///
/// Notifications form an append-only per-user log. Only the read flag is
/// ever updated. Rows survive the recipient leaving a project.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE notifications (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id),
///     title VARCHAR(255) NOT NULL,
///     message TEXT NOT NULL,
///     is_read BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
/// );
/// ```
///
/// `clock_timestamp()` rather than `NOW()` keeps rows written inside one
/// transaction in insertion order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Notification model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,

    /// Recipient
    pub user_id: Uuid,

    pub title: String,

    pub message: String,

    pub is_read: bool,

    pub created_at: DateTime<Utc>,
}

/// Input for appending a notification
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
}

const NOTIFICATION_COLUMNS: &str = "id, user_id, title, message, is_read, created_at";

impl Notification {
    /// Appends an unread notification
    pub async fn create<'e, E>(executor: E, data: CreateNotification) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Notification>(&format!(
            "INSERT INTO notifications (user_id, title, message) VALUES ($1, $2, $3) RETURNING {}",
            NOTIFICATION_COLUMNS
        ))
        .bind(data.user_id)
        .bind(data.title)
        .bind(data.message)
        .fetch_one(executor)
        .await
    }

    /// Lists a user's notifications, newest first
    pub async fn list_for_user<'e, E>(
        executor: E,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
            NOTIFICATION_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(executor)
        .await
    }

    /// Flips the read flag if the notification belongs to `user_id` and is unread
    ///
    /// Returns true if a row changed.
    pub async fn mark_read<'e, E>(executor: E, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2 AND NOT is_read",
        )
        .bind(id)
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flips every unread notification of a user; returns the count flipped
    pub async fn mark_all_read<'e, E>(executor: E, user_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result =
            sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read")
                .bind(user_id)
                .execute(executor)
                .await?;

        Ok(result.rows_affected())
    }

    /// Counts a user's unread notifications
    pub async fn count_unread<'e, E>(executor: E, user_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read")
                .bind(user_id)
                .fetch_one(executor)
                .await?;

        Ok(count)
    }
}
