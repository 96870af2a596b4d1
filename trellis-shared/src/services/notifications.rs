/// Notification dispatcher
///
/// Notifications are written by other services as a side effect of a
/// mutation. [`NotificationDispatcher::emit`] therefore takes the caller's
/// executor: the mutation and its notification commit together or not at
/// all. Reads and read-flag updates run directly against the pool.
///
/// # Example
///
/// ```no_run
/// use trellis_shared::services::notifications::NotificationDispatcher;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let mut tx = pool.begin().await?;
/// NotificationDispatcher::emit(&mut *tx, user_id, "Hello", "Welcome aboard").await?;
/// tx.commit().await?;
///
/// let dispatcher = NotificationDispatcher::new(pool);
/// let latest = dispatcher.list_for(user_id, None).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::CoreResult;
use crate::models::notification::{CreateNotification, Notification};

/// Default number of notifications returned by a listing
pub const DEFAULT_LIST_LIMIT: i64 = 10;

/// Upper bound on a single listing
pub const MAX_LIST_LIMIT: i64 = 100;

/// Clamps a requested listing size into `1..=MAX_LIST_LIMIT`
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

/// Title and message for a user added to a project
pub fn added_to_project(project_name: &str) -> (String, String) {
    (
        "Added to project".to_string(),
        format!("You were added to the project '{}'.", project_name),
    )
}

/// Title and message for a task assigned at creation
pub fn task_assigned(project_name: &str, task_title: &str) -> (String, String) {
    (
        "New task assigned".to_string(),
        format!(
            "You were assigned the task '{}' in project '{}'.",
            task_title, project_name
        ),
    )
}

/// Title and message for a task reassigned to a new user
pub fn assignment_changed(project_name: &str, task_title: &str) -> (String, String) {
    (
        "Task assignment changed".to_string(),
        format!(
            "The task '{}' in project '{}' is now assigned to you.",
            task_title, project_name
        ),
    )
}

/// Appends to and reads from each user's notification log
#[derive(Clone)]
pub struct NotificationDispatcher {
    pool: PgPool,
}

impl NotificationDispatcher {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends an unread notification through the caller's executor
    ///
    /// Never fails for backpressure; a store failure aborts the enclosing
    /// transaction.
    pub async fn emit<'e, E>(
        executor: E,
        recipient: Uuid,
        title: &str,
        message: &str,
    ) -> CoreResult<Notification>
    where
        E: PgExecutor<'e>,
    {
        let notification = Notification::create(
            executor,
            CreateNotification {
                user_id: recipient,
                title: title.to_string(),
                message: message.to_string(),
            },
        )
        .await?;

        tracing::debug!(
            notification_id = %notification.id,
            user_id = %recipient,
            "Notification emitted"
        );

        Ok(notification)
    }

    /// Lists a user's notifications, newest first
    pub async fn list_for(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> CoreResult<Vec<Notification>> {
        Ok(Notification::list_for_user(&self.pool, user_id, clamp_limit(limit)).await?)
    }

    /// Marks one notification read
    ///
    /// A notification that does not belong to `user_id`, does not exist, or
    /// is already read is left alone without error.
    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> CoreResult<()> {
        let changed = Notification::mark_read(&self.pool, user_id, notification_id).await?;

        if !changed {
            tracing::debug!(
                user_id = %user_id,
                notification_id = %notification_id,
                "Mark read was a no-op"
            );
        }

        Ok(())
    }

    /// Marks every unread notification read; returns how many flipped
    pub async fn mark_all_read(&self, user_id: Uuid) -> CoreResult<u64> {
        Ok(Notification::mark_all_read(&self.pool, user_id).await?)
    }

    /// Counts unread notifications
    pub async fn unread_count(&self, user_id: Uuid) -> CoreResult<i64> {
        Ok(Notification::count_unread(&self.pool, user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), DEFAULT_LIST_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(-5)), 1);
        assert_eq!(clamp_limit(Some(25)), 25);
        assert_eq!(clamp_limit(Some(10_000)), MAX_LIST_LIMIT);
    }

    #[test]
    fn test_messages_name_project_and_task() {
        let (title, message) = added_to_project("Apollo");
        assert_eq!(title, "Added to project");
        assert!(message.contains("'Apollo'"));

        let (_, message) = task_assigned("Apollo", "Fix login");
        assert!(message.contains("'Fix login'"));
        assert!(message.contains("'Apollo'"));

        let (title, _) = assignment_changed("Apollo", "Fix login");
        assert_eq!(title, "Task assignment changed");
    }
}
