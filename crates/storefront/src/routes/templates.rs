//! Template catalog route handlers.
//!
//! Public listings read through the cached catalog. Admin routes write
//! through it and take multipart forms so an image can ride along.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use casecraft_core::{CategoryFilter, NewTemplate, Template, TemplateCategory, TemplateId, TemplateUpdate};

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::routes::form::MultipartForm;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleBody {
    pub value: bool,
}

/// `GET /api/templates?category=`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Template>>, AppError> {
    let filter = match query.category.as_deref().map(str::trim) {
        None | Some("") => CategoryFilter::All,
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::BadRequest(format!("unknown category: {raw}")))?,
    };

    let templates = state.catalog().list(filter).await?;
    Ok(Json(templates.as_ref().clone()))
}

/// `GET /api/templates/featured`
pub async fn featured(State(state): State<AppState>) -> Result<Json<Vec<Template>>, AppError> {
    let templates = state.catalog().featured().await?;
    Ok(Json(templates.as_ref().clone()))
}

/// `GET /api/templates/{id}`
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Template>, AppError> {
    state
        .catalog()
        .get(&TemplateId::new(id.clone()))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("template {id}")))
}

/// `GET /api/admin/templates`
pub async fn admin_index(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Template>>, AppError> {
    Ok(Json(state.catalog().list_all().await?))
}

/// Colors arrive as a comma-separated field.
fn colors(form: &MultipartForm) -> Option<Vec<String>> {
    form.text("colors")
        .map(|raw| raw.split(',').map(|c| c.trim().to_owned()).collect())
}

/// `POST /api/admin/templates`
///
/// Fields: `name`, `category`, optional `id`, `description`, `colors`,
/// `featured`, `enabled`, `sortOrder`; file part `image`.
#[instrument(skip(_admin, state, multipart))]
pub async fn create(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Template>), AppError> {
    let mut form = MultipartForm::read(multipart).await?;
    let image = form
        .take_file("image")
        .ok_or_else(|| AppError::BadRequest("image is required".to_owned()))?;

    let category: TemplateCategory = form
        .parse("category")?
        .ok_or_else(|| AppError::BadRequest("category is required".to_owned()))?;

    let template = NewTemplate {
        id: form.text("id").map(TemplateId::new),
        name: form.require("name")?.to_owned(),
        description: form.text("description").unwrap_or_default().to_owned(),
        category,
        image_url: String::new(),
        colors: colors(&form).unwrap_or_default(),
        featured: form.parse("featured")?.unwrap_or(false),
        enabled: form.parse("enabled")?.unwrap_or(true),
        sort_order: form.parse("sortOrder")?.unwrap_or(0),
    };

    let created = state.catalog().create(template, image).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PATCH /api/admin/templates/{id}`
#[instrument(skip(_admin, state, multipart))]
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Template>, AppError> {
    let mut form = MultipartForm::read(multipart).await?;
    let image = form.take_file("image");

    let update = TemplateUpdate {
        name: form.text("name").map(str::to_owned),
        description: form.text("description").map(str::to_owned),
        category: form.parse("category")?,
        image_url: None,
        colors: colors(&form),
        featured: form.parse("featured")?,
        enabled: form.parse("enabled")?,
        sort_order: form.parse("sortOrder")?,
    };

    let template = state
        .catalog()
        .update(&TemplateId::new(id), update, image)
        .await?;
    Ok(Json(template))
}

/// `DELETE /api/admin/templates/{id}`
#[instrument(skip(_admin, state))]
pub async fn delete(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.catalog().delete(&TemplateId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/admin/templates/{id}/enabled` with `{"value": bool}`
#[instrument(skip(_admin, state))]
pub async fn set_enabled(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ToggleBody>,
) -> Result<Json<Template>, AppError> {
    let template = state
        .catalog()
        .set_enabled(&TemplateId::new(id), body.value)
        .await?;
    Ok(Json(template))
}

/// `POST /api/admin/templates/{id}/featured` with `{"value": bool}`
#[instrument(skip(_admin, state))]
pub async fn set_featured(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ToggleBody>,
) -> Result<Json<Template>, AppError> {
    let template = state
        .catalog()
        .set_featured(&TemplateId::new(id), body.value)
        .await?;
    Ok(Json(template))
}
