//! Design template catalog.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::TemplateId;

/// Image URL placeholder stored while a new template's image is uploading.
pub const PENDING_IMAGE_URL: &str = "pending";

/// Template style category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateCategory {
    Minimalist,
    Geometric,
    Artistic,
    Nature,
    Abstract,
    Vintage,
    Modern,
    Luxury,
}

impl TemplateCategory {
    /// Every category, in catalog order.
    pub const ALL: [Self; 8] = [
        Self::Minimalist,
        Self::Geometric,
        Self::Artistic,
        Self::Nature,
        Self::Abstract,
        Self::Vintage,
        Self::Modern,
        Self::Luxury,
    ];

    /// Stored value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minimalist => "minimalist",
            Self::Geometric => "geometric",
            Self::Artistic => "artistic",
            Self::Nature => "nature",
            Self::Abstract => "abstract",
            Self::Vintage => "vintage",
            Self::Modern => "modern",
            Self::Luxury => "luxury",
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Minimalist => "Minimalist",
            Self::Geometric => "Geometric",
            Self::Artistic => "Artistic",
            Self::Nature => "Nature",
            Self::Abstract => "Abstract",
            Self::Vintage => "Vintage",
            Self::Modern => "Modern",
            Self::Luxury => "Luxury",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown template category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for TemplateCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}

impl fmt::Display for TemplateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category filter for catalog listings. `all` disables filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(TemplateCategory),
}

impl FromStr for CategoryFilter {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse().map(Self::Only)
    }
}

/// A catalog template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub description: String,
    pub category: TemplateCategory,
    pub image_url: String,
    /// Palette swatches as hex strings.
    pub colors: Vec<String>,
    pub featured: bool,
    pub enabled: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// Whether the image upload for this template has not finished.
    #[must_use]
    pub fn image_pending(&self) -> bool {
        self.image_url == PENDING_IMAGE_URL
    }
}

/// Fields for inserting a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTemplate {
    /// Explicit slug; the store generates one when absent.
    #[serde(default)]
    pub id: Option<TemplateId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: TemplateCategory,
    #[serde(default = "pending_image")]
    pub image_url: String,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub sort_order: i32,
}

fn pending_image() -> String {
    PENDING_IMAGE_URL.to_owned()
}

const fn enabled_by_default() -> bool {
    true
}

impl NewTemplate {
    /// Materialize the record, as a store would on insert.
    #[must_use]
    pub fn into_template(self, id: TemplateId, now: DateTime<Utc>) -> Template {
        Template {
            id,
            name: self.name,
            description: self.description,
            category: self.category,
            image_url: self.image_url,
            colors: normalize_colors(self.colors),
            featured: self.featured,
            enabled: self.enabled,
            sort_order: self.sort_order,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a template. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<TemplateCategory>,
    pub image_url: Option<String>,
    pub colors: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub enabled: Option<bool>,
    pub sort_order: Option<i32>,
}

impl TemplateUpdate {
    /// Apply onto a template, bumping `updated_at`.
    pub fn apply_to(self, template: &mut Template, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            template.name = name;
        }
        if let Some(description) = self.description {
            template.description = description;
        }
        if let Some(category) = self.category {
            template.category = category;
        }
        if let Some(image_url) = self.image_url {
            template.image_url = image_url;
        }
        if let Some(colors) = self.colors {
            template.colors = normalize_colors(colors);
        }
        if let Some(featured) = self.featured {
            template.featured = featured;
        }
        if let Some(enabled) = self.enabled {
            template.enabled = enabled;
        }
        if let Some(sort_order) = self.sort_order {
            template.sort_order = sort_order;
        }
        template.updated_at = now;
    }
}

/// Drop blank swatches left over from empty form inputs.
#[must_use]
pub fn normalize_colors(colors: Vec<String>) -> Vec<String> {
    colors
        .into_iter()
        .map(|c| c.trim().to_owned())
        .filter(|c| !c.is_empty())
        .collect()
}

/// The built-in catalog used to seed a fresh database.
#[must_use]
pub fn default_catalog() -> Vec<NewTemplate> {
    use TemplateCategory::{
        Abstract, Artistic, Geometric, Luxury, Minimalist, Modern, Nature, Vintage,
    };

    let entries: [(&str, &str, &str, TemplateCategory, &[&str], bool); 18] = [
        ("minimalist-white", "Minimalist Clean", "Simple, elegant design with clean lines", Minimalist, &["#E8D5B0", "#0D0D0D", "#FFFFFF"], true),
        ("minimalist-sand", "Minimalist Sand", "Warm sand tones with plenty of space", Minimalist, &["#E8D5B0", "#0D0D0D"], true),
        ("geometric-hex", "Hexagon Grid", "Modern hexagon pattern design", Geometric, &["#0D0D0D", "#C4622D", "#E8D5B0"], true),
        ("geometric-triangles", "Triangle Mosaic", "Dynamic triangular pattern", Geometric, &["#C4622D", "#E8D5B0", "#0D0D0D"], false),
        ("geometric-lines", "Linear Geometry", "Contemporary line art with copper accents", Geometric, &["#0D0D0D", "#C4622D"], false),
        ("marble-classic", "Classic Marble", "Elegant marble texture effect", Artistic, &["#E8D5B0", "#0D0D0D", "#C4622D"], true),
        ("marble-copper", "Copper Swirl", "Rich copper and sand marble blend", Artistic, &["#C4622D", "#E8D5B0", "#0D0D0D"], false),
        ("watercolor-blend", "Watercolor Blend", "Soft flowing watercolor transitions", Artistic, &["#C4622D", "#E8D5B0"], false),
        ("nature-forest", "Forest Vibes", "Natural earth and green tones", Nature, &["#0D0D0D", "#4A7C59", "#E8D5B0"], false),
        ("nature-sunset", "Sunset Gradient", "Warm sunset inspired colors", Nature, &["#FF6B35", "#F7931E", "#E8D5B0"], false),
        ("nature-botanical", "Botanical", "Delicate botanical patterns and leaves", Nature, &["#0D0D0D", "#E8D5B0"], false),
        ("abstract-dots", "Dot Matrix", "Abstract polka dot pattern design", Abstract, &["#0D0D0D", "#C4622D", "#E8D5B0"], false),
        ("abstract-waves", "Wave Flows", "Smooth flowing wave patterns", Abstract, &["#C4622D", "#E8D5B0", "#0D0D0D"], false),
        ("vintage-typewriter", "Vintage Typewriter", "Nostalgic typewriter key aesthetic", Vintage, &["#0D0D0D", "#E8D5B0"], false),
        ("vintage-retro", "Retro 70s", "Classic 70s inspired vintage vibes", Vintage, &["#8B4513", "#D2691E", "#E8D5B0"], false),
        ("modern-neon", "Neon Lines", "Vibrant neon lines on dark background", Modern, &["#0D0D0D", "#FF1493", "#00D9FF"], true),
        ("modern-glass", "Glassmorphism", "Frosted glass effect with depth", Modern, &["#E8D5B0", "#0D0D0D"], false),
        ("luxury-gold", "Luxury Gold", "Premium gold foil and black elegance", Luxury, &["#0D0D0D", "#E8D5B0"], true),
    ];

    entries
        .into_iter()
        .zip(0_i32..)
        .map(
            |((id, name, description, category, colors, featured), sort_order)| NewTemplate {
                id: Some(TemplateId::new(id)),
                name: name.to_owned(),
                description: description.to_owned(),
                category,
                image_url: PENDING_IMAGE_URL.to_owned(),
                colors: colors.iter().map(|c| (*c).to_owned()).collect(),
                featured,
                enabled: true,
                sort_order,
            },
        )
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_category_filter_parse() {
        assert_eq!("all".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!(
            "Nature".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::Only(TemplateCategory::Nature)
        );
        assert!("baroque".parse::<CategoryFilter>().is_err());
    }

    #[test]
    fn test_default_catalog_is_ordered_and_unique() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 18);
        let mut ids: Vec<_> = catalog.iter().filter_map(|t| t.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 18);
        assert!(catalog.windows(2).all(|w| w[0].sort_order < w[1].sort_order));
    }

    #[test]
    fn test_update_drops_blank_colors() {
        let mut template = default_catalog()
            .remove(0)
            .into_template(TemplateId::new("minimalist-white"), Utc::now());
        TemplateUpdate {
            colors: Some(vec!["#000000".to_owned(), " ".to_owned()]),
            ..TemplateUpdate::default()
        }
        .apply_to(&mut template, Utc::now());
        assert_eq!(template.colors, vec!["#000000".to_owned()]);
    }

    #[test]
    fn test_new_template_defaults() {
        let new: NewTemplate = serde_json::from_value(serde_json::json!({
            "name": "Test",
            "category": "modern"
        }))
        .unwrap();
        assert!(new.enabled);
        assert!(!new.featured);
        assert_eq!(new.image_url, PENDING_IMAGE_URL);
    }
}
