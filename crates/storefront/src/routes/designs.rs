//! Saved design route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use casecraft_core::{
    CaseColor, CaseFinish, CaseMaterial, Choice, DEFAULT_DESIGN_NAME, Design, NewDesign,
    PhoneModel, TemplateId,
};

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::routes::parse_design_id;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    #[serde(default)]
    pub email: String,
    pub template_id: Option<TemplateId>,
    pub design_name: Option<String>,
    #[serde(default)]
    pub image_url: String,
    pub cropped_image_url: Option<String>,
    pub phone_model: Option<Choice<PhoneModel>>,
    pub case_color: Option<Choice<CaseColor>>,
    pub case_material: Option<Choice<CaseMaterial>>,
    pub case_finish: Option<Choice<CaseFinish>>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: &'static str,
}

/// `GET /api/designs?email=`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Design>>, AppError> {
    let email = query
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::BadRequest("Email parameter required".to_owned()))?;

    Ok(Json(
        state
            .repos()
            .designs
            .list_by_email(&email.to_lowercase())
            .await?,
    ))
}

/// `POST /api/designs`
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateRequest>,
) -> Result<(StatusCode, Json<Design>), AppError> {
    let mut missing = Vec::new();
    if body.email.trim().is_empty() {
        missing.push("email");
    }
    if body.template_id.is_none() {
        missing.push("templateId");
    }
    if body.image_url.trim().is_empty() {
        missing.push("imageUrl");
    }
    let Some(template_id) = body.template_id.filter(|_| missing.is_empty()) else {
        return Err(AppError::Validation { missing });
    };

    let design = state
        .repos()
        .designs
        .create(NewDesign {
            email: body.email.trim().to_lowercase(),
            template_id,
            design_name: body
                .design_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DESIGN_NAME.to_owned()),
            image_url: body.image_url,
            cropped_image_url: body.cropped_image_url,
            phone_model: body.phone_model,
            case_color: body.case_color,
            case_material: body.case_material,
            case_finish: body.case_finish,
            width: body.width,
            height: body.height,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(design)))
}

/// `GET /api/designs/{id}`
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Design>, AppError> {
    state
        .repos()
        .designs
        .get(parse_design_id(&id)?)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No such configuration found".to_owned()))
}

/// `DELETE /api/designs/{id}`
///
/// Orders that referenced the design keep their snapshot and lose the link.
#[instrument(skip(admin, state), fields(user_id = %admin.0.id))]
pub async fn delete(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    state.repos().designs.delete(parse_design_id(&id)?).await?;
    Ok(Json(DeleteResponse {
        success: true,
        message: "Design deleted successfully",
    }))
}
