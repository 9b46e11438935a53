//! Design (case configuration) records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{
    CaseColor, CaseFinish, CaseMaterial, Choice, DesignId, DesignStatus, PhoneModel, TemplateId,
};

/// Name given to designs created from an upload.
pub const DEFAULT_DESIGN_NAME: &str = "My Case Design";

/// A saved case design.
///
/// Created once when the source photo is uploaded, then edited in place while
/// the customer picks case options and the cropped image is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Design {
    pub id: DesignId,
    /// Owner email. Empty for anonymous uploads.
    pub email: String,
    pub template_id: TemplateId,
    pub design_name: String,
    /// Source photo in media storage.
    pub image_url: String,
    /// Final cropped/positioned image, once the crop step has run.
    pub cropped_image_url: Option<String>,
    pub phone_model: Option<Choice<PhoneModel>>,
    pub case_color: Option<Choice<CaseColor>>,
    pub case_material: Option<Choice<CaseMaterial>>,
    pub case_finish: Option<Choice<CaseFinish>>,
    /// Source image width in pixels.
    pub width: u32,
    /// Source image height in pixels.
    pub height: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Design {
    /// The image to print: the cropped image, or the source photo if no crop exists.
    #[must_use]
    pub fn final_image_url(&self) -> &str {
        self.cropped_image_url.as_deref().unwrap_or(&self.image_url)
    }

    /// Whether every case option and the cropped image have been saved.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.cropped_image_url.is_some()
            && self.phone_model.is_some()
            && self.case_color.is_some()
            && self.case_material.is_some()
            && self.case_finish.is_some()
    }

    /// Derive the lifecycle status.
    ///
    /// `has_order` tells whether any order references this design.
    #[must_use]
    pub const fn status(&self, has_order: bool) -> DesignStatus {
        if has_order {
            DesignStatus::Ordered
        } else if self.is_configured() {
            DesignStatus::Configured
        } else {
            DesignStatus::Pending
        }
    }

    /// Apply a partial update, bumping `updated_at`.
    pub fn apply(&mut self, update: DesignUpdate, now: DateTime<Utc>) {
        if let Some(name) = update.design_name {
            self.design_name = name;
        }
        if let Some(url) = update.cropped_image_url {
            self.cropped_image_url = Some(url);
        }
        if let Some(model) = update.phone_model {
            self.phone_model = Some(model);
        }
        if let Some(color) = update.case_color {
            self.case_color = Some(color);
        }
        if let Some(material) = update.case_material {
            self.case_material = Some(material);
        }
        if let Some(finish) = update.case_finish {
            self.case_finish = Some(finish);
        }
        self.updated_at = now;
    }
}

/// Pixel dimensions of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Zero-sized images cannot be placed on a case.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("image dimensions must be positive (got {width}x{height})")]
pub struct InvalidDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    /// Validate dimensions.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDimensions` if either side is zero.
    pub const fn new(width: u32, height: u32) -> Result<Self, InvalidDimensions> {
        if width == 0 || height == 0 {
            return Err(InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }
}

/// Fields for inserting a design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDesign {
    pub email: String,
    pub template_id: TemplateId,
    pub design_name: String,
    pub image_url: String,
    pub cropped_image_url: Option<String>,
    pub phone_model: Option<Choice<PhoneModel>>,
    pub case_color: Option<Choice<CaseColor>>,
    pub case_material: Option<Choice<CaseMaterial>>,
    pub case_finish: Option<Choice<CaseFinish>>,
    pub width: u32,
    pub height: u32,
}

impl NewDesign {
    /// A freshly uploaded, unconfigured design.
    #[must_use]
    pub fn from_upload(
        email: impl Into<String>,
        template_id: TemplateId,
        image_url: impl Into<String>,
        dimensions: ImageDimensions,
    ) -> Self {
        Self {
            email: email.into(),
            template_id,
            design_name: DEFAULT_DESIGN_NAME.to_owned(),
            image_url: image_url.into(),
            cropped_image_url: None,
            phone_model: None,
            case_color: None,
            case_material: None,
            case_finish: None,
            width: dimensions.width,
            height: dimensions.height,
        }
    }

    /// Materialize the record with a generated ID, as a store would on insert.
    #[must_use]
    pub fn into_design(self, id: DesignId, now: DateTime<Utc>) -> Design {
        Design {
            id,
            email: self.email,
            template_id: self.template_id,
            design_name: self.design_name,
            image_url: self.image_url,
            cropped_image_url: self.cropped_image_url,
            phone_model: self.phone_model,
            case_color: self.case_color,
            case_material: self.case_material,
            case_finish: self.case_finish,
            width: self.width,
            height: self.height,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a design. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignUpdate {
    pub design_name: Option<String>,
    pub cropped_image_url: Option<String>,
    pub phone_model: Option<Choice<PhoneModel>>,
    pub case_color: Option<Choice<CaseColor>>,
    pub case_material: Option<Choice<CaseMaterial>>,
    pub case_finish: Option<Choice<CaseFinish>>,
}

impl DesignUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.design_name.is_none()
            && self.cropped_image_url.is_none()
            && self.phone_model.is_none()
            && self.case_color.is_none()
            && self.case_material.is_none()
            && self.case_finish.is_none()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::configured_design;
    use super::*;

    #[test]
    fn test_final_image_prefers_crop() {
        let mut design = configured_design();
        assert!(design.final_image_url().ends_with("configuration.png"));

        design.cropped_image_url = None;
        assert_eq!(design.final_image_url(), design.image_url);
    }

    #[test]
    fn test_status_derivation() {
        let mut design = configured_design();
        assert_eq!(design.status(false), DesignStatus::Configured);
        assert_eq!(design.status(true), DesignStatus::Ordered);

        design.case_finish = None;
        assert_eq!(design.status(false), DesignStatus::Pending);
    }

    #[test]
    fn test_apply_partial_update() {
        let mut design = configured_design();
        let later = design.updated_at + chrono::Duration::minutes(5);
        design.apply(
            DesignUpdate {
                case_color: Some(CaseColor::Blue.into()),
                ..DesignUpdate::default()
            },
            later,
        );
        assert!(design.case_color.as_ref().is_some_and(|c| c.is(CaseColor::Blue)));
        assert!(design.case_finish.as_ref().is_some_and(|f| f.is(CaseFinish::Textured)));
        assert_eq!(design.updated_at, later);
    }

    #[test]
    fn test_dimensions_must_be_positive() {
        assert!(ImageDimensions::new(0, 100).is_err());
        assert!(ImageDimensions::new(640, 480).is_ok());
    }

    #[test]
    fn test_upload_design_is_pending() {
        let dims = ImageDimensions::new(640, 480).ok();
        let new = NewDesign::from_upload(
            "",
            TemplateId::default(),
            "https://cdn.example.com/x.png",
            dims.unwrap_or(ImageDimensions {
                width: 1,
                height: 1,
            }),
        );
        let design = new.into_design(DesignId::generate(), Utc::now());
        assert_eq!(design.design_name, DEFAULT_DESIGN_NAME);
        assert_eq!(design.status(false), DesignStatus::Pending);
    }
}
