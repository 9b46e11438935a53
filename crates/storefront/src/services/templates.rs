//! Template catalog.
//!
//! Public listings are cached using `moka` (5-minute TTL). Admin writes go
//! straight to the repository and invalidate the whole cache.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use casecraft_core::{
    CategoryFilter, NewTemplate, PENDING_IMAGE_URL, Template, TemplateId, TemplateUpdate,
};

use crate::db::{RepositoryError, TemplateRepository};
use crate::services::media::{MediaPath, MediaStorage};
use crate::services::uploads::{ImageFile, UploadError, read_dimensions};

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Listing(Option<casecraft_core::TemplateCategory>),
    Featured,
    Template(TemplateId),
}

#[derive(Debug, Clone)]
enum CacheValue {
    Templates(Arc<Vec<Template>>),
    Template(Option<Box<Template>>),
}

/// Read-through cached catalog plus admin operations.
#[derive(Clone)]
pub struct TemplateCatalog {
    repo: Arc<dyn TemplateRepository>,
    media: Arc<dyn MediaStorage>,
    cache: Cache<CacheKey, CacheValue>,
}

impl TemplateCatalog {
    #[must_use]
    pub fn new(repo: Arc<dyn TemplateRepository>, media: Arc<dyn MediaStorage>) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300))
            .build();

        Self { repo, media, cache }
    }

    /// Enabled templates, optionally limited to one category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store query fails.
    pub async fn list(&self, filter: CategoryFilter) -> Result<Arc<Vec<Template>>, RepositoryError> {
        let key = CacheKey::Listing(match filter {
            CategoryFilter::All => None,
            CategoryFilter::Only(category) => Some(category),
        });
        if let Some(CacheValue::Templates(templates)) = self.cache.get(&key).await {
            debug!("Cache hit for template listing");
            return Ok(templates);
        }

        let templates = Arc::new(self.repo.list_by_category(filter).await?);
        self.cache
            .insert(key, CacheValue::Templates(templates.clone()))
            .await;
        Ok(templates)
    }

    /// Enabled, featured templates.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store query fails.
    pub async fn featured(&self) -> Result<Arc<Vec<Template>>, RepositoryError> {
        if let Some(CacheValue::Templates(templates)) = self.cache.get(&CacheKey::Featured).await {
            debug!("Cache hit for featured templates");
            return Ok(templates);
        }

        let templates = Arc::new(self.repo.list_featured().await?);
        self.cache
            .insert(CacheKey::Featured, CacheValue::Templates(templates.clone()))
            .await;
        Ok(templates)
    }

    /// One template, enabled or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store query fails.
    pub async fn get(&self, id: &TemplateId) -> Result<Option<Template>, RepositoryError> {
        let key = CacheKey::Template(id.clone());
        if let Some(CacheValue::Template(template)) = self.cache.get(&key).await {
            return Ok(template.map(|t| *t));
        }

        let template = self.repo.get(id).await?;
        self.cache
            .insert(key, CacheValue::Template(template.clone().map(Box::new)))
            .await;
        Ok(template)
    }

    /// Every template for the admin listing. Never cached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store query fails.
    pub async fn list_all(&self) -> Result<Vec<Template>, RepositoryError> {
        self.repo.list_all().await
    }

    /// Create a template, then upload its image under the new ID.
    ///
    /// The row is inserted with a pending image first because the image path
    /// is derived from the ID. If the upload fails the template keeps the
    /// pending image and the error is returned.
    ///
    /// # Errors
    ///
    /// Returns `UploadError` if the image is invalid, the insert fails, or the
    /// upload fails.
    #[instrument(skip(self, template, image), fields(name = %template.name))]
    pub async fn create(
        &self,
        mut template: NewTemplate,
        image: ImageFile,
    ) -> Result<Template, UploadError> {
        read_dimensions(&image.bytes)?;

        PENDING_IMAGE_URL.clone_into(&mut template.image_url);
        let created = self.repo.create(template).await?;
        self.invalidate().await;

        let template = self.attach_image(&created.id, image).await?;
        tracing::info!(template_id = %template.id, "Template created");
        Ok(template)
    }

    /// Apply an update, replacing the image when one is given.
    ///
    /// # Errors
    ///
    /// Returns `UploadError` if the image is invalid, the template is gone, or
    /// a backend call fails.
    #[instrument(skip(self, update, image), fields(template_id = %id))]
    pub async fn update(
        &self,
        id: &TemplateId,
        update: TemplateUpdate,
        image: Option<ImageFile>,
    ) -> Result<Template, UploadError> {
        if let Some(image) = &image {
            read_dimensions(&image.bytes)?;
        }

        let mut template = self.repo.update(id, update).await?;
        self.invalidate().await;
        if let Some(image) = image {
            template = self.attach_image(id, image).await?;
        }
        Ok(template)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the template does not exist.
    pub async fn delete(&self, id: &TemplateId) -> Result<(), RepositoryError> {
        self.repo.delete(id).await?;
        self.invalidate().await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the template does not exist.
    pub async fn set_enabled(&self, id: &TemplateId, enabled: bool) -> Result<Template, RepositoryError> {
        let template = self.repo.set_enabled(id, enabled).await?;
        self.invalidate().await;
        Ok(template)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the template does not exist.
    pub async fn set_featured(
        &self,
        id: &TemplateId,
        featured: bool,
    ) -> Result<Template, RepositoryError> {
        let template = self.repo.set_featured(id, featured).await?;
        self.invalidate().await;
        Ok(template)
    }

    async fn attach_image(&self, id: &TemplateId, image: ImageFile) -> Result<Template, UploadError> {
        let asset = self
            .media
            .upload(
                &MediaPath::template(id.as_str()),
                image.bytes,
                image.content_type.as_deref(),
            )
            .await?;

        let template = self
            .repo
            .update(
                id,
                TemplateUpdate {
                    image_url: Some(asset.secure_url),
                    ..TemplateUpdate::default()
                },
            )
            .await?;
        self.invalidate().await;
        Ok(template)
    }

    async fn invalidate(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}
