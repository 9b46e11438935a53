//! Seed the template catalog.
//!
//! Inserts the built-in templates. Templates whose ID already exists are
//! left alone, so seeding is safe to repeat.

use tracing::{info, warn};

use casecraft_core::{NewTemplate, default_catalog};
use casecraft_storefront::db::{self, Repositories, RepositoryError};

use super::{CommandError, database_url};

/// Outcome of a seeding run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub inserted: usize,
    pub skipped: usize,
}

/// Seed the built-in template catalog.
///
/// # Errors
///
/// Returns `CommandError` if the URL is missing or a database call fails for
/// any reason other than an existing template.
pub async fn templates(dry_run: bool) -> Result<(), CommandError> {
    let catalog = default_catalog();

    if dry_run {
        info!(templates = catalog.len(), "Dry run, nothing written");
        for template in &catalog {
            let id = template.id.as_ref().map_or("-", |id| id.as_str());
            info!("  {id}: {} ({})", template.name, template.category);
        }
        return Ok(());
    }

    let url = database_url()?;
    let pool = db::create_pool(&url).await?;
    info!("Connected to database");

    let repos = Repositories::postgres(pool);
    let summary = insert_all(&repos, catalog).await?;

    info!("Seeding complete!");
    info!("  Templates inserted: {}", summary.inserted);
    info!("  Templates skipped (already exist): {}", summary.skipped);
    Ok(())
}

async fn insert_all(
    repos: &Repositories,
    templates: Vec<NewTemplate>,
) -> Result<SeedSummary, RepositoryError> {
    let mut summary = SeedSummary::default();
    for template in templates {
        match repos.templates.create(template).await {
            Ok(created) => {
                info!(template_id = %created.id, "Inserted template");
                summary.inserted += 1;
            }
            Err(RepositoryError::Conflict(reason)) => {
                warn!("Skipping: {reason}");
                summary.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(summary)
}
