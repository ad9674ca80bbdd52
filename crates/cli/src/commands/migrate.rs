//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! dengo-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DENGO_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! Migration files live in `crates/api/migrations/`.

use super::{CommandError, database_url};

/// Run the API database migrations.
///
/// # Errors
///
/// Returns `CommandError` if the URL is missing, the connection fails, or a
/// migration fails to apply.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = dengo_api::db::create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
