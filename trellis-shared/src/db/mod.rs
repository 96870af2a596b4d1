/// Database layer for Trellis
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: Embedded schema migrations
///
/// Models live in the crate-level `models` module.
///
/// # Example
///
/// ```no_run
/// use trellis_shared::db::pool::{create_pool, DatabaseConfig};
/// use trellis_shared::db::migrations::run_migrations;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     })
///     .await?;
///
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod pool;
pub mod migrations;
