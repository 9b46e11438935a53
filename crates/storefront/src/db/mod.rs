//! Persistence for designs, orders and templates.
//!
//! # Schema: `casecraft`
//!
//! - `designs` - Saved case configurations
//! - `orders` - Submitted orders, unique per `(customer_key, design_id)`
//! - `templates` - Design template catalog
//! - `tower_sessions.session` - Session storage
//!
//! Each table sits behind a repository trait with two implementations:
//! [`PgStore`] for `PostgreSQL`, and [`MemoryStore`] for tests and for local
//! development when no database URL is configured.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p casecraft-cli -- migrate
//! ```

pub mod designs;
pub mod memory;
pub mod orders;
pub mod templates;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use casecraft_core::{
    CategoryFilter, Design, DesignId, DesignUpdate, NewDesign, NewOrder, NewTemplate, Order,
    OrderId, Template, TemplateId, TemplateUpdate,
};

pub use memory::MemoryStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate template slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Whether `find_or_create` inserted a new row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Created {
    New,
    Existing,
}

/// Saved case designs.
#[async_trait]
pub trait DesignRepository: Send + Sync {
    /// Insert a design with a generated ID.
    async fn create(&self, design: NewDesign) -> Result<Design, RepositoryError>;

    /// Designs owned by `email`, newest first.
    async fn list_by_email(&self, email: &str) -> Result<Vec<Design>, RepositoryError>;

    async fn get(&self, id: DesignId) -> Result<Option<Design>, RepositoryError>;

    /// Apply a partial update. Fails with `NotFound` if the design is gone.
    async fn update(&self, id: DesignId, update: DesignUpdate) -> Result<Design, RepositoryError>;

    /// Fails with `NotFound` if the design is gone.
    async fn delete(&self, id: DesignId) -> Result<(), RepositoryError>;
}

/// Submitted orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert unconditionally.
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    /// Insert unless an order for the same customer and design exists, in
    /// which case that order is returned. Atomic with respect to concurrent
    /// callers. Orders without a design are always inserted.
    async fn find_or_create(&self, order: NewOrder) -> Result<(Order, Created), RepositoryError>;

    async fn find_for_customer(
        &self,
        customer_key: &str,
        design_id: DesignId,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Orders placed with `email`, newest first.
    async fn list_by_email(&self, email: &str) -> Result<Vec<Order>, RepositoryError>;

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Whether any order references the design.
    async fn exists_for_design(&self, design_id: DesignId) -> Result<bool, RepositoryError>;
}

/// Template catalog.
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// Enabled templates by sort order.
    async fn list_enabled(&self) -> Result<Vec<Template>, RepositoryError>;

    /// Every template, enabled or not, by sort order.
    async fn list_all(&self) -> Result<Vec<Template>, RepositoryError>;

    async fn get(&self, id: &TemplateId) -> Result<Option<Template>, RepositoryError>;

    /// Enabled templates in a category.
    async fn list_by_category(
        &self,
        filter: CategoryFilter,
    ) -> Result<Vec<Template>, RepositoryError>;

    /// Enabled and featured templates.
    async fn list_featured(&self) -> Result<Vec<Template>, RepositoryError>;

    /// Insert. A missing ID is derived from the name. Duplicate IDs fail with `Conflict`.
    async fn create(&self, template: NewTemplate) -> Result<Template, RepositoryError>;

    async fn update(
        &self,
        id: &TemplateId,
        update: TemplateUpdate,
    ) -> Result<Template, RepositoryError>;

    async fn delete(&self, id: &TemplateId) -> Result<(), RepositoryError>;

    async fn set_enabled(&self, id: &TemplateId, enabled: bool)
    -> Result<Template, RepositoryError>;

    async fn set_featured(
        &self,
        id: &TemplateId,
        featured: bool,
    ) -> Result<Template, RepositoryError>;
}

/// The three repositories the handlers work against.
#[derive(Clone)]
pub struct Repositories {
    pub designs: Arc<dyn DesignRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub templates: Arc<dyn TemplateRepository>,
}

impl Repositories {
    /// Repositories backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self {
            designs: store.clone(),
            orders: store.clone(),
            templates: store,
        }
    }

    /// Repositories backed by a process-local store.
    #[must_use]
    pub fn memory(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            designs: store.clone(),
            orders: store.clone(),
            templates: store,
        }
    }
}

/// `PostgreSQL` implementation of every repository trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Slug for a template created without an explicit ID.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("template");
    }
    slug
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
