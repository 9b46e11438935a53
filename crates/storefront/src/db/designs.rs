//! `PostgreSQL` design repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use casecraft_core::{Choice, Design, DesignId, DesignUpdate, NewDesign, TemplateId};

use super::{DesignRepository, PgStore, RepositoryError};

const DESIGN_COLUMNS: &str = "id, email, template_id, design_name, image_url, cropped_image_url, \
     phone_model, case_color, case_material, case_finish, width, height, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct DesignRow {
    id: Uuid,
    email: String,
    template_id: String,
    design_name: String,
    image_url: String,
    cropped_image_url: Option<String>,
    phone_model: Option<String>,
    case_color: Option<String>,
    case_material: Option<String>,
    case_finish: Option<String>,
    width: i32,
    height: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DesignRow> for Design {
    type Error = RepositoryError;

    fn try_from(row: DesignRow) -> Result<Self, Self::Error> {
        let dimension = |value: i32, field: &str| {
            u32::try_from(value).map_err(|_| {
                RepositoryError::DataCorruption(format!("design {} has {field} {value}", row.id))
            })
        };

        Ok(Self {
            id: DesignId::from_uuid(row.id),
            width: dimension(row.width, "width")?,
            height: dimension(row.height, "height")?,
            email: row.email,
            template_id: TemplateId::new(row.template_id),
            design_name: row.design_name,
            image_url: row.image_url,
            cropped_image_url: row.cropped_image_url,
            phone_model: row.phone_model.as_deref().map(Choice::parse),
            case_color: row.case_color.as_deref().map(Choice::parse),
            case_material: row.case_material.as_deref().map(Choice::parse),
            case_finish: row.case_finish.as_deref().map(Choice::parse),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn to_db_dimension(value: u32) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::Conflict(format!("image dimension {value} is too large")))
}

fn choice_str<T: casecraft_core::CaseOption>(choice: Option<&Choice<T>>) -> Option<&str> {
    choice.map(Choice::as_str)
}

#[async_trait]
impl DesignRepository for PgStore {
    #[tracing::instrument(skip(self, design), fields(template_id = %design.template_id))]
    async fn create(&self, design: NewDesign) -> Result<Design, RepositoryError> {
        let sql = format!(
            "INSERT INTO casecraft.designs (
                id, email, template_id, design_name, image_url, cropped_image_url,
                phone_model, case_color, case_material, case_finish, width, height
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {DESIGN_COLUMNS}"
        );

        let row: DesignRow = sqlx::query_as(&sql)
            .bind(DesignId::generate().as_uuid())
            .bind(&design.email)
            .bind(design.template_id.as_str())
            .bind(&design.design_name)
            .bind(&design.image_url)
            .bind(design.cropped_image_url.as_deref())
            .bind(choice_str(design.phone_model.as_ref()))
            .bind(choice_str(design.case_color.as_ref()))
            .bind(choice_str(design.case_material.as_ref()))
            .bind(choice_str(design.case_finish.as_ref()))
            .bind(to_db_dimension(design.width)?)
            .bind(to_db_dimension(design.height)?)
            .fetch_one(self.pool())
            .await?;

        row.try_into()
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<Design>, RepositoryError> {
        let sql = format!(
            "SELECT {DESIGN_COLUMNS} FROM casecraft.designs
             WHERE email = $1
             ORDER BY created_at DESC"
        );

        let rows: Vec<DesignRow> = sqlx::query_as(&sql)
            .bind(email)
            .fetch_all(self.pool())
            .await?;

        rows.into_iter().map(Design::try_from).collect()
    }

    async fn get(&self, id: DesignId) -> Result<Option<Design>, RepositoryError> {
        let sql = format!("SELECT {DESIGN_COLUMNS} FROM casecraft.designs WHERE id = $1");

        let row: Option<DesignRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(self.pool())
            .await?;

        row.map(Design::try_from).transpose()
    }

    #[tracing::instrument(skip(self, update), fields(design_id = %id))]
    async fn update(&self, id: DesignId, update: DesignUpdate) -> Result<Design, RepositoryError> {
        let sql = format!(
            "UPDATE casecraft.designs SET
                design_name = COALESCE($2, design_name),
                cropped_image_url = COALESCE($3, cropped_image_url),
                phone_model = COALESCE($4, phone_model),
                case_color = COALESCE($5, case_color),
                case_material = COALESCE($6, case_material),
                case_finish = COALESCE($7, case_finish)
            WHERE id = $1
            RETURNING {DESIGN_COLUMNS}"
        );

        let row: Option<DesignRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .bind(update.design_name.as_deref())
            .bind(update.cropped_image_url.as_deref())
            .bind(choice_str(update.phone_model.as_ref()))
            .bind(choice_str(update.case_color.as_ref()))
            .bind(choice_str(update.case_material.as_ref()))
            .bind(choice_str(update.case_finish.as_ref()))
            .fetch_optional(self.pool())
            .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn delete(&self, id: DesignId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM casecraft.designs WHERE id = $1")
            .bind(id.as_uuid())
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
