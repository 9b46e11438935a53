//! Database migration command.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (fallback `DATABASE_URL`)
//!
//! Migration files live in `crates/storefront/migrations/`. The last one
//! creates the session table used by the server.

use casecraft_storefront::db;

use super::{CommandError, database_url};

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns `CommandError` if the URL is missing, the database is unreachable,
/// or a migration fails.
pub async fn storefront() -> Result<(), CommandError> {
    let url = database_url()?;

    tracing::info!("Connecting to storefront database...");
    let pool = db::create_pool(&url).await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
