/// Database models for Trellis
///
/// This module contains all database models and their queries.
///
/// # Models
///
/// - `user`: User accounts and profiles
/// - `project`: Projects
/// - `membership`: User-project relationships with roles
/// - `task`: Project tasks with status and derived completion time
/// - `notification`: Append-only per-user notification log
///
/// Query functions take any `PgExecutor`, so the same call works against
/// the pool or inside a transaction (`&mut *tx`).
///
/// # Example
///
/// ```no_run
/// use trellis_shared::models::user::{User, CreateUser};
/// use trellis_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Deserializer};

pub mod membership;
pub mod notification;
pub mod project;
pub mod task;
pub mod user;

/// Deserializes a present field into `Some(value)`
///
/// Paired with `#[serde(default)]` on an `Option<Option<T>>` field this
/// distinguishes "absent" (`None`) from "explicit null" (`Some(None)`),
/// which merge-patch updates need for clearable columns.
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
