//! Image storage.
//!
//! Assets live at `{root}/{collection?}/{entity_id}/{slot}`. A design keeps its
//! source photo under `original` and its cropped render under `configuration`.
//! Writing the same path again replaces the asset.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::CloudinaryConfig;

/// Errors from the media backend.
#[derive(Debug, Error)]
pub enum MediaError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Upload payload was rejected before sending.
    #[error("invalid upload: {0}")]
    Invalid(String),
}

/// Asset slot within an entity folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaSlot {
    /// Raw uploaded photo.
    Original,
    /// Final cropped and positioned image.
    #[default]
    Configuration,
    /// Preview render.
    Preview,
}

impl MediaSlot {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Configuration => "configuration",
            Self::Preview => "preview",
        }
    }
}

impl fmt::Display for MediaSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaSlot {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "original" => Ok(Self::Original),
            "configuration" => Ok(Self::Configuration),
            "preview" => Ok(Self::Preview),
            other => Err(MediaError::Invalid(format!("unknown media type {other}"))),
        }
    }
}

/// Location of an asset below the storage root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaPath {
    /// Optional grouping folder, e.g. `templates`.
    pub collection: Option<String>,
    pub entity_id: String,
    pub slot: MediaSlot,
}

impl MediaPath {
    /// Path for a design asset.
    #[must_use]
    pub fn design(entity_id: impl Into<String>, slot: MediaSlot) -> Self {
        Self {
            collection: None,
            entity_id: entity_id.into(),
            slot,
        }
    }

    /// Path for a template's catalog image.
    #[must_use]
    pub fn template(template_id: impl Into<String>) -> Self {
        Self {
            collection: Some("templates".to_owned()),
            entity_id: template_id.into(),
            slot: MediaSlot::Original,
        }
    }

    /// Folder holding the asset, under `root`.
    #[must_use]
    pub fn folder(&self, root: &str) -> String {
        match &self.collection {
            Some(collection) => format!("{root}/{collection}/{}", self.entity_id),
            None => format!("{root}/{}", self.entity_id),
        }
    }

    /// Full public ID, under `root`.
    #[must_use]
    pub fn public_id(&self, root: &str) -> String {
        format!("{}/{}", self.folder(root), self.slot)
    }

    fn validate(&self) -> Result<(), MediaError> {
        let valid = |s: &str| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        };
        if !valid(&self.entity_id) {
            return Err(MediaError::Invalid(format!(
                "entity id {:?} must be alphanumeric",
                self.entity_id
            )));
        }
        if let Some(collection) = &self.collection
            && !valid(collection)
        {
            return Err(MediaError::Invalid(format!(
                "collection {collection:?} must be alphanumeric"
            )));
        }
        Ok(())
    }
}

/// A stored asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub secure_url: String,
    pub public_id: String,
    pub folder: String,
}

/// One item of a batch upload.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub path: MediaPath,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Image storage backend.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Store `bytes` at `path`, replacing any existing asset.
    async fn upload(
        &self,
        path: &MediaPath,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<MediaAsset, MediaError>;

    /// Look up an asset. `Ok(None)` when nothing is stored at `path`.
    async fn retrieve(&self, path: &MediaPath) -> Result<Option<MediaAsset>, MediaError>;
}

/// Upload every item concurrently. The first failure fails the batch.
///
/// # Errors
///
/// Returns the first `MediaError` raised by any upload.
pub async fn upload_batch(
    storage: &dyn MediaStorage,
    uploads: Vec<MediaUpload>,
) -> Result<Vec<MediaAsset>, MediaError> {
    let pending = uploads.into_iter().map(|item| async move {
        storage
            .upload(&item.path, item.bytes, item.content_type.as_deref())
            .await
    });
    futures::future::try_join_all(pending).await
}

// =============================================================================
// Cloudinary
// =============================================================================

/// Cloudinary upload and Admin API client.
#[derive(Clone)]
pub struct CloudinaryMedia {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
    root: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryResource {
    secure_url: String,
    public_id: String,
    #[serde(default)]
    folder: Option<String>,
    #[serde(default)]
    asset_folder: Option<String>,
}

impl CloudinaryMedia {
    /// Create a new Cloudinary client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CloudinaryConfig) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            root: config.root_folder.clone(),
        })
    }

    fn asset(&self, resource: CloudinaryResource, path: &MediaPath) -> MediaAsset {
        MediaAsset {
            secure_url: resource.secure_url,
            public_id: resource.public_id,
            folder: resource
                .folder
                .or(resource.asset_folder)
                .unwrap_or_else(|| path.folder(&self.root)),
        }
    }
}

/// Signature over the upload parameters: sorted `key=value` pairs joined by
/// `&`, followed by the API secret, hashed with SHA-256.
fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by_key(|(key, _)| *key);
    let to_sign = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl MediaStorage for CloudinaryMedia {
    #[tracing::instrument(skip(self, bytes), fields(public_id = %path.public_id(&self.root), size = bytes.len()))]
    async fn upload(
        &self,
        path: &MediaPath,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<MediaAsset, MediaError> {
        path.validate()?;
        if bytes.is_empty() {
            return Err(MediaError::Invalid("empty file".to_owned()));
        }

        let params = vec![
            ("folder", path.folder(&self.root)),
            ("overwrite", "true".to_owned()),
            ("public_id", path.slot.as_str().to_owned()),
            (
                "tags",
                format!("{},{},{}", self.root, path.slot, path.entity_id),
            ),
            ("timestamp", Utc::now().timestamp().to_string()),
        ];
        let signature = sign_params(&params, self.api_secret.expose_secret());

        let mut file = reqwest::multipart::Part::bytes(bytes).file_name(path.slot.as_str());
        if let Some(mime) = content_type {
            file = file
                .mime_str(mime)
                .map_err(|e| MediaError::Invalid(format!("content type {mime}: {e}")))?;
        }

        let mut form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in params {
            form = form.text(key, value);
        }

        let url = format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.cloud_name
        );
        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MediaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let resource: CloudinaryResource = response.json().await?;
        Ok(self.asset(resource, path))
    }

    #[tracing::instrument(skip(self), fields(public_id = %path.public_id(&self.root)))]
    async fn retrieve(&self, path: &MediaPath) -> Result<Option<MediaAsset>, MediaError> {
        path.validate()?;
        let url = format!(
            "https://api.cloudinary.com/v1_1/{}/resources/image/upload/{}",
            self.cloud_name,
            path.public_id(&self.root)
        );

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.api_key, Some(self.api_secret.expose_secret()))
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MediaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let resource: CloudinaryResource = response.json().await?;
        Ok(Some(self.asset(resource, path)))
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Process-local media storage for tests and local development.
///
/// URLs take the form `memory://{public_id}?v={n}`, with `n` bumped on every
/// overwrite.
#[derive(Clone)]
pub struct MemoryMedia {
    root: String,
    assets: Arc<RwLock<HashMap<String, (MediaAsset, Vec<u8>)>>>,
}

impl MemoryMedia {
    #[must_use]
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            assets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Bytes stored at `path`.
    pub async fn bytes(&self, path: &MediaPath) -> Option<Vec<u8>> {
        self.assets
            .read()
            .await
            .get(&path.public_id(&self.root))
            .map(|(_, bytes)| bytes.clone())
    }
}

#[async_trait]
impl MediaStorage for MemoryMedia {
    async fn upload(
        &self,
        path: &MediaPath,
        bytes: Vec<u8>,
        _content_type: Option<&str>,
    ) -> Result<MediaAsset, MediaError> {
        path.validate()?;
        if bytes.is_empty() {
            return Err(MediaError::Invalid("empty file".to_owned()));
        }

        let public_id = path.public_id(&self.root);
        let mut assets = self.assets.write().await;
        let version = assets.get(&public_id).map_or(1, |(asset, _)| {
            asset
                .secure_url
                .rsplit_once("?v=")
                .and_then(|(_, v)| v.parse::<u32>().ok())
                .map_or(1, |v| v + 1)
        });

        let asset = MediaAsset {
            secure_url: format!("memory://{public_id}?v={version}"),
            public_id: public_id.clone(),
            folder: path.folder(&self.root),
        };
        assets.insert(public_id, (asset.clone(), bytes));
        Ok(asset)
    }

    async fn retrieve(&self, path: &MediaPath) -> Result<Option<MediaAsset>, MediaError> {
        path.validate()?;
        Ok(self
            .assets
            .read()
            .await
            .get(&path.public_id(&self.root))
            .map(|(asset, _)| asset.clone()))
    }
}
