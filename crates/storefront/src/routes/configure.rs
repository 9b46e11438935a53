//! Case configurator route handlers.
//!
//! Upload creates a pending design, preview reports its status and price,
//! save records the chosen options and cropped image. Saving is refused once
//! an order references the design.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use casecraft_core::{
    CaseColor, CaseFinish, CaseMaterial, Choice, Design, DesignId, DesignStatus, DesignUpdate,
    PhoneModel, Price, TemplateId,
};

use crate::error::{AppError, add_breadcrumb};
use crate::middleware::CurrentUser;
use crate::routes::{form::MultipartForm, parse_design_id};
use crate::services::uploads::create_design_from_upload;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub config_id: DesignId,
    pub template_id: TemplateId,
    pub image_url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewQuery {
    /// Freshly uploaded crop that may not be saved yet.
    pub cropped_image_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceView {
    pub cents: i64,
    pub currency: &'static str,
    pub display: String,
}

impl From<Price> for PriceView {
    fn from(price: Price) -> Self {
        Self {
            cents: price.cents,
            currency: price.currency_code.code(),
            display: price.display(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub configuration: Design,
    pub status: DesignStatus,
    pub price: PriceView,
    /// Query override, else the saved crop, else the source image.
    pub cropped_image_url: String,
}

/// Options chosen in the configurator.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub design_name: Option<String>,
    pub cropped_image_url: Option<String>,
    pub phone_model: Option<Choice<PhoneModel>>,
    pub case_color: Option<Choice<CaseColor>>,
    pub case_material: Option<Choice<CaseMaterial>>,
    pub case_finish: Option<Choice<CaseFinish>>,
}

impl From<SaveRequest> for DesignUpdate {
    fn from(req: SaveRequest) -> Self {
        let non_blank = |s: Option<String>| s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty());
        Self {
            design_name: non_blank(req.design_name),
            cropped_image_url: non_blank(req.cropped_image_url),
            phone_model: req.phone_model,
            case_color: req.case_color,
            case_material: req.case_material,
            case_finish: req.case_finish,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub configuration: Design,
    pub status: DesignStatus,
}

/// `POST /api/configure/upload`
///
/// Fields: file part `image` (or `file`), optional `template` and `email`.
/// The owner defaults to the signed-in user, if any.
#[instrument(skip(state, user, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut form = MultipartForm::read(multipart).await?;
    let file = form
        .take_file("image")
        .or_else(|| form.take_file("file"))
        .ok_or_else(|| AppError::BadRequest("No file provided".to_owned()))?;

    let template_id = form.text("template").map_or_else(TemplateId::default, TemplateId::new);
    let email = form
        .text("email")
        .map(str::to_lowercase)
        .or_else(|| user.map(|u| u.email.as_str().to_owned()))
        .unwrap_or_default();

    let design = create_design_from_upload(
        state.media(),
        &state.repos().designs,
        &email,
        template_id,
        file,
    )
    .await?;

    let design_id = design.id.to_string();
    add_breadcrumb("configure", "Image uploaded", Some(&[("design_id", design_id.as_str())]));

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            config_id: design.id,
            template_id: design.template_id,
            image_url: design.image_url,
            width: design.width,
            height: design.height,
        }),
    ))
}

async fn load(state: &AppState, id: DesignId) -> Result<(Design, DesignStatus), AppError> {
    let design = state
        .repos()
        .designs
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("No such configuration found".to_owned()))?;
    let has_order = state.repos().orders.exists_for_design(id).await?;
    let status = design.status(has_order);
    Ok((design, status))
}

/// `GET /api/configure/{id}?croppedImageUrl=`
#[instrument(skip(state, query))]
pub async fn preview(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<PreviewResponse>, AppError> {
    let (design, status) = load(&state, parse_design_id(&id)?).await?;
    let price = state.orders().pricing().quote_design(&design);

    let cropped_image_url = query
        .cropped_image_url
        .map(|url| url.trim().to_owned())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| design.final_image_url().to_owned());

    Ok(Json(PreviewResponse {
        configuration: design,
        status,
        price: price.into(),
        cropped_image_url,
    }))
}

/// `PUT /api/configure/{id}`
#[instrument(skip(state, body))]
pub async fn save(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SaveRequest>,
) -> Result<Json<SaveResponse>, AppError> {
    let id = parse_design_id(&id)?;
    let update = DesignUpdate::from(body);
    if update.is_empty() {
        return Err(AppError::BadRequest("Nothing to save".to_owned()));
    }

    let (_, status) = load(&state, id).await?;
    if !status.is_editable() {
        return Err(AppError::Conflict(
            "This design has already been ordered".to_owned(),
        ));
    }

    let design = state.repos().designs.update(id, update).await?;
    let status = design.status(false);
    tracing::info!(design_id = %design.id, status = ?status, "Design saved");

    Ok(Json(SaveResponse {
        configuration: design,
        status,
    }))
}
