//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{AuthConfig, StorefrontConfig};
use crate::db::{MemoryStore, Repositories};
use crate::services::checkout::{CheckoutError, CheckoutProvider, DisabledCheckout, StripeCheckout};
use crate::services::email::EmailService;
use crate::services::handoff::WhatsAppHandoff;
use crate::services::identity::{IdentityError, IdentityProvider, MockIdentity, OAuthIdentity};
use crate::services::media::{CloudinaryMedia, MediaError, MediaStorage, MemoryMedia};
use crate::services::orders::OrderService;
use crate::services::templates::TemplateCatalog;

/// Folder used by the in-process media store.
const LOCAL_MEDIA_ROOT: &str = "caseCraft";

/// Error building a remote client at startup.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("media client: {0}")]
    Media(#[from] MediaError),
    #[error("checkout client: {0}")]
    Checkout(#[from] CheckoutError),
    #[error("identity client: {0}")]
    Identity(#[from] IdentityError),
    #[error("smtp transport: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// The remote collaborators handlers work against.
///
/// Built once at startup from configuration, or assembled directly in tests.
#[derive(Clone)]
pub struct Services {
    pub repos: Repositories,
    pub media: Arc<dyn MediaStorage>,
    pub checkout: Arc<dyn CheckoutProvider>,
    pub identity: Arc<dyn IdentityProvider>,
    pub email: EmailService,
}

impl Services {
    /// Build every client from configuration.
    ///
    /// Providers without configuration fall back to their local stand-ins:
    /// the in-memory store, in-process media, disabled checkout, the mock
    /// identity and a logging mailer.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if a configured client fails to build.
    pub fn from_config(config: &StorefrontConfig, pool: Option<PgPool>) -> Result<Self, StateError> {
        let repos = match pool {
            Some(pool) => Repositories::postgres(pool),
            None => {
                tracing::warn!("No database configured, using in-memory store");
                Repositories::memory(MemoryStore::new())
            }
        };

        let media: Arc<dyn MediaStorage> = match &config.media {
            Some(cloudinary) => Arc::new(CloudinaryMedia::new(cloudinary)?),
            None => {
                tracing::warn!("No media storage configured, keeping uploads in memory");
                Arc::new(MemoryMedia::new(LOCAL_MEDIA_ROOT))
            }
        };

        let checkout: Arc<dyn CheckoutProvider> = match &config.checkout {
            Some(stripe) => Arc::new(StripeCheckout::new(stripe)?),
            None => Arc::new(DisabledCheckout),
        };

        let identity: Arc<dyn IdentityProvider> = match &config.auth {
            AuthConfig::Mock => Arc::new(MockIdentity),
            AuthConfig::Kinde {
                issuer,
                client_id,
                client_secret,
            } => Arc::new(OAuthIdentity::new(
                issuer,
                client_id,
                client_secret.clone(),
                &config.base_url,
            )?),
        };

        let email = EmailService::new(config.email.as_ref())?;

        Ok(Self {
            repos,
            media,
            checkout,
            identity,
            email,
        })
    }

    /// Local stand-ins for every collaborator.
    #[must_use]
    pub fn local(store: MemoryStore) -> Self {
        Self {
            repos: Repositories::memory(store),
            media: Arc::new(MemoryMedia::new(LOCAL_MEDIA_ROOT)),
            checkout: Arc::new(DisabledCheckout),
            identity: Arc::new(MockIdentity),
            email: EmailService::log_only(),
        }
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like repositories, remote clients and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: Option<PgPool>,
    services: Services,
    catalog: TemplateCatalog,
    orders: OrderService,
}

impl AppState {
    /// Create application state, building clients from configuration.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if a configured client fails to build.
    pub fn new(config: StorefrontConfig, pool: Option<PgPool>) -> Result<Self, StateError> {
        let services = Services::from_config(&config, pool.clone())?;
        Ok(Self::with_services(config, pool, services))
    }

    /// Create application state around already-built collaborators.
    #[must_use]
    pub fn with_services(config: StorefrontConfig, pool: Option<PgPool>, services: Services) -> Self {
        let catalog = TemplateCatalog::new(services.repos.templates.clone(), services.media.clone());
        let orders = OrderService::new(
            services.repos.designs.clone(),
            services.repos.orders.clone(),
            services.checkout.clone(),
            config.pricing,
            WhatsAppHandoff::new(config.whatsapp_number.clone()),
            &config.base_url,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                services,
                catalog,
                orders,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The `PostgreSQL` pool, when one is configured.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn repos(&self) -> &Repositories {
        &self.inner.services.repos
    }

    #[must_use]
    pub fn media(&self) -> &Arc<dyn MediaStorage> {
        &self.inner.services.media
    }

    #[must_use]
    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.inner.services.identity
    }

    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.services.email
    }

    #[must_use]
    pub fn catalog(&self) -> &TemplateCatalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }
}
