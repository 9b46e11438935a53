//! `PostgreSQL` template repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use casecraft_core::models::template::normalize_colors;
use casecraft_core::{
    CategoryFilter, NewTemplate, Template, TemplateCategory, TemplateId, TemplateUpdate,
};

use super::{PgStore, RepositoryError, TemplateRepository, slugify};

const TEMPLATE_COLUMNS: &str = "id, name, description, category, image_url, colors, featured, \
     enabled, sort_order, created_at, updated_at";

const CATALOG_ORDER: &str = "ORDER BY sort_order, name";

#[derive(Debug, sqlx::FromRow)]
struct TemplateRow {
    id: String,
    name: String,
    description: String,
    category: String,
    image_url: String,
    colors: Vec<String>,
    featured: bool,
    enabled: bool,
    sort_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TemplateRow> for Template {
    type Error = RepositoryError;

    fn try_from(row: TemplateRow) -> Result<Self, Self::Error> {
        let category = row
            .category
            .parse::<TemplateCategory>()
            .map_err(|e| RepositoryError::DataCorruption(format!("template {}: {e}", row.id)))?;

        Ok(Self {
            id: TemplateId::new(row.id),
            name: row.name,
            description: row.description,
            category,
            image_url: row.image_url,
            colors: row.colors,
            featured: row.featured,
            enabled: row.enabled,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn collect(rows: Vec<TemplateRow>) -> Result<Vec<Template>, RepositoryError> {
    rows.into_iter().map(Template::try_from).collect()
}

impl PgStore {
    async fn select_templates(
        &self,
        filter: &str,
        bind: Option<&str>,
    ) -> Result<Vec<Template>, RepositoryError> {
        let sql =
            format!("SELECT {TEMPLATE_COLUMNS} FROM casecraft.templates {filter} {CATALOG_ORDER}");
        let mut query = sqlx::query_as::<_, TemplateRow>(&sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        collect(query.fetch_all(self.pool()).await?)
    }

    async fn set_flag(
        &self,
        id: &TemplateId,
        column: &str,
        value: bool,
    ) -> Result<Template, RepositoryError> {
        let sql = format!(
            "UPDATE casecraft.templates SET {column} = $2 WHERE id = $1 RETURNING {TEMPLATE_COLUMNS}"
        );
        let row: Option<TemplateRow> = sqlx::query_as(&sql)
            .bind(id.as_str())
            .bind(value)
            .fetch_optional(self.pool())
            .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }
}

#[async_trait]
impl TemplateRepository for PgStore {
    async fn list_enabled(&self) -> Result<Vec<Template>, RepositoryError> {
        self.select_templates("WHERE enabled", None).await
    }

    async fn list_all(&self) -> Result<Vec<Template>, RepositoryError> {
        self.select_templates("", None).await
    }

    async fn get(&self, id: &TemplateId) -> Result<Option<Template>, RepositoryError> {
        let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM casecraft.templates WHERE id = $1");
        let row: Option<TemplateRow> = sqlx::query_as(&sql)
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await?;

        row.map(Template::try_from).transpose()
    }

    async fn list_by_category(
        &self,
        filter: CategoryFilter,
    ) -> Result<Vec<Template>, RepositoryError> {
        match filter {
            CategoryFilter::All => self.list_enabled().await,
            CategoryFilter::Only(category) => {
                self.select_templates("WHERE enabled AND category = $1", Some(category.as_str()))
                    .await
            }
        }
    }

    async fn list_featured(&self) -> Result<Vec<Template>, RepositoryError> {
        self.select_templates("WHERE enabled AND featured", None)
            .await
    }

    #[tracing::instrument(skip(self, template), fields(name = %template.name))]
    async fn create(&self, template: NewTemplate) -> Result<Template, RepositoryError> {
        let id = template
            .id
            .clone()
            .unwrap_or_else(|| TemplateId::new(slugify(&template.name)));
        let sql = format!(
            "INSERT INTO casecraft.templates (
                id, name, description, category, image_url, colors, featured, enabled, sort_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {TEMPLATE_COLUMNS}"
        );

        let row: TemplateRow = sqlx::query_as(&sql)
            .bind(id.as_str())
            .bind(&template.name)
            .bind(&template.description)
            .bind(template.category.as_str())
            .bind(&template.image_url)
            .bind(normalize_colors(template.colors))
            .bind(template.featured)
            .bind(template.enabled)
            .bind(template.sort_order)
            .fetch_one(self.pool())
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    RepositoryError::Conflict(format!("template {id} already exists"))
                }
                other => RepositoryError::Database(other),
            })?;

        row.try_into()
    }

    #[tracing::instrument(skip(self, update), fields(template_id = %id))]
    async fn update(
        &self,
        id: &TemplateId,
        update: TemplateUpdate,
    ) -> Result<Template, RepositoryError> {
        let sql = format!(
            "UPDATE casecraft.templates SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                image_url = COALESCE($5, image_url),
                colors = COALESCE($6, colors),
                featured = COALESCE($7, featured),
                enabled = COALESCE($8, enabled),
                sort_order = COALESCE($9, sort_order)
            WHERE id = $1
            RETURNING {TEMPLATE_COLUMNS}"
        );

        let row: Option<TemplateRow> = sqlx::query_as(&sql)
            .bind(id.as_str())
            .bind(update.name)
            .bind(update.description)
            .bind(update.category.map(TemplateCategory::as_str))
            .bind(update.image_url)
            .bind(update.colors.map(normalize_colors))
            .bind(update.featured)
            .bind(update.enabled)
            .bind(update.sort_order)
            .fetch_optional(self.pool())
            .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn delete(&self, id: &TemplateId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM casecraft.templates WHERE id = $1")
            .bind(id.as_str())
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_enabled(
        &self,
        id: &TemplateId,
        enabled: bool,
    ) -> Result<Template, RepositoryError> {
        self.set_flag(id, "enabled", enabled).await
    }

    async fn set_featured(
        &self,
        id: &TemplateId,
        featured: bool,
    ) -> Result<Template, RepositoryError> {
        self.set_flag(id, "featured", featured).await
    }
}
