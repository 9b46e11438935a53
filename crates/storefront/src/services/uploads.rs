//! Source image intake.
//!
//! Validates an uploaded photo, stores it under a temporary folder, and
//! creates the pending design that points at it.

use std::io::Cursor;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::ImageReader;
use thiserror::Error;
use uuid::Uuid;

use casecraft_core::{Design, ImageDimensions, NewDesign, TemplateId};

use crate::db::{DesignRepository, RepositoryError};
use crate::services::media::{MediaError, MediaPath, MediaSlot, MediaStorage};

/// Largest accepted image, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// An image file received from a form.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file is empty")]
    Empty,

    #[error("file exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("not a supported image: {0}")]
    UnsupportedImage(String),

    #[error(transparent)]
    InvalidDimensions(#[from] casecraft_core::InvalidDimensions),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Database(#[from] RepositoryError),
}

/// Read the pixel dimensions from the image header.
///
/// # Errors
///
/// Returns `UploadError` if the bytes are empty, too large, not a decodable
/// image format, or describe a zero-sized image.
pub fn read_dimensions(bytes: &[u8]) -> Result<ImageDimensions, UploadError> {
    if bytes.is_empty() {
        return Err(UploadError::Empty);
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            limit: MAX_UPLOAD_BYTES,
        });
    }

    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| UploadError::UnsupportedImage(e.to_string()))?
        .into_dimensions()
        .map_err(|e| UploadError::UnsupportedImage(e.to_string()))?;

    Ok(ImageDimensions::new(width, height)?)
}

/// Folder name for an upload that has no design ID yet.
///
/// The millisecond stamp keeps folders roughly ordered; the random suffix keeps
/// uploads landing in the same millisecond apart.
#[must_use]
pub fn temp_entity_id(now: DateTime<Utc>) -> String {
    format!("temp_{}_{}", now.timestamp_millis(), Uuid::new_v4().simple())
}

/// Store the source photo and create a pending design for it.
#[tracing::instrument(skip(media, designs, file), fields(template_id = %template_id, size = file.bytes.len()))]
pub async fn create_design_from_upload(
    media: &Arc<dyn MediaStorage>,
    designs: &Arc<dyn DesignRepository>,
    email: &str,
    template_id: TemplateId,
    file: ImageFile,
) -> Result<Design, UploadError> {
    let dimensions = read_dimensions(&file.bytes)?;

    let path = MediaPath::design(temp_entity_id(Utc::now()), MediaSlot::Original);
    let asset = media
        .upload(&path, file.bytes, file.content_type.as_deref())
        .await?;

    let design = designs
        .create(NewDesign::from_upload(
            email,
            template_id,
            asset.secure_url,
            dimensions,
        ))
        .await?;

    tracing::info!(design_id = %design.id, width = dimensions.width, height = dimensions.height, "Design created from upload");
    Ok(design)
}
