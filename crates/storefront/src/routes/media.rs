//! Media upload and retrieval.
//!
//! `configId` names the folder: a design ID, a temporary upload ID, or a
//! collection-qualified ID such as `templates/modern-neon`.

use axum::{
    Json,
    extract::{Multipart, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::AppError;
use crate::routes::form::MultipartForm;
use crate::services::media::{MediaAsset, MediaPath, MediaSlot, MediaUpload, upload_batch};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveQuery {
    pub config_id: Option<String>,
    #[serde(rename = "type")]
    pub slot: Option<String>,
}

/// One asset, or several when the form carried one file per slot.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UploadResponse {
    One(MediaAsset),
    Many(Vec<MediaAsset>),
}

/// Resolve a client `configId` into a storage path.
fn media_path(config_id: &str, slot: MediaSlot) -> MediaPath {
    match config_id.split_once('/') {
        Some((collection, entity_id)) => MediaPath {
            collection: Some(collection.to_owned()),
            entity_id: entity_id.to_owned(),
            slot,
        },
        None => MediaPath::design(config_id, slot),
    }
}

fn slot(raw: Option<&str>) -> Result<MediaSlot, AppError> {
    raw.map_or(Ok(MediaSlot::default()), |raw| {
        raw.parse().map_err(AppError::from)
    })
}

/// `POST /api/media/upload`
///
/// Fields: `configId`, optional `type` (default `configuration`). A `file`
/// part goes to `type`; parts named after a slot (`original`,
/// `configuration`, `preview`) go to that slot and are uploaded together.
#[instrument(skip(state, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut form = MultipartForm::read(multipart).await?;
    let config_id = form
        .text("configId")
        .ok_or_else(|| AppError::BadRequest("configId is required".to_owned()))?
        .to_owned();
    let default_slot = slot(form.text("type"))?;

    let mut uploads: Vec<MediaUpload> = form
        .take_file("file")
        .map(|file| MediaUpload {
            path: media_path(&config_id, default_slot),
            bytes: file.bytes,
            content_type: file.content_type,
        })
        .into_iter()
        .collect();

    for slot in [MediaSlot::Original, MediaSlot::Configuration, MediaSlot::Preview] {
        if let Some(file) = form.take_file(slot.as_str()) {
            uploads.push(MediaUpload {
                path: media_path(&config_id, slot),
                bytes: file.bytes,
                content_type: file.content_type,
            });
        }
    }

    if uploads.is_empty() {
        return Err(AppError::BadRequest("No file provided".to_owned()));
    }
    if uploads.iter().any(|u| u.bytes.is_empty()) {
        return Err(AppError::BadRequest("file is empty".to_owned()));
    }

    let mut assets = upload_batch(state.media().as_ref(), uploads).await?;
    tracing::info!(config_id = %config_id, count = assets.len(), "Media uploaded");

    Ok(Json(match assets.len() {
        1 => UploadResponse::One(assets.remove(0)),
        _ => UploadResponse::Many(assets),
    }))
}

/// `GET /api/media/upload?configId=&type=`
#[instrument(skip(state))]
pub async fn retrieve(
    State(state): State<AppState>,
    Query(query): Query<RetrieveQuery>,
) -> Result<Json<MediaAsset>, AppError> {
    let config_id = query
        .config_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("configId is required".to_owned()))?;
    let slot = slot(query.slot.as_deref())?;

    state
        .media()
        .retrieve(&media_path(config_id, slot))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Image not found".to_owned()))
}
