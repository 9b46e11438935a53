//! Multipart form reading shared by the upload routes.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::AppError;
use crate::services::uploads::ImageFile;

/// A fully buffered multipart form: text fields plus file parts.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: Vec<(String, ImageFile)>,
}

impl MultipartForm {
    /// Read every part. Parts with a file name are files; the rest are text.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the body is not valid multipart.
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_owned();

            if field.file_name().is_some() {
                let file_name = field.file_name().map(str::to_owned);
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                form.files.push((
                    name,
                    ImageFile {
                        bytes: bytes.to_vec(),
                        content_type,
                        file_name,
                    },
                ));
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// A text field, trimmed. Blank counts as absent.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// A required text field.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming the field when it is blank.
    pub fn require(&self, name: &str) -> Result<&str, AppError> {
        self.text(name)
            .ok_or_else(|| AppError::BadRequest(format!("{name} is required")))
    }

    /// Parse a text field, if present.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming the field when it does not parse.
    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>, AppError> {
        self.text(name)
            .map(|raw| {
                raw.parse()
                    .map_err(|_| AppError::BadRequest(format!("invalid {name}: {raw}")))
            })
            .transpose()
    }

    /// Remove and return the first file part named `name`.
    pub fn take_file(&mut self, name: &str) -> Option<ImageFile> {
        let index = self.files.iter().position(|(n, _)| n == name)?;
        Some(self.files.remove(index).1)
    }

    /// Remove and return every file part named `name`, in order.
    pub fn take_files(&mut self, name: &str) -> Vec<ImageFile> {
        let (taken, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.files).into_iter().partition(|(n, _)| n == name);
        self.files = kept;
        taken.into_iter().map(|(_, file)| file).collect()
    }
}
