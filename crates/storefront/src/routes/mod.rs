//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness
//! GET    /health/ready                    - Readiness (database ping)
//!
//! # Identity
//! GET    /api/auth/{action}               - login | register | logout | callback, else status JSON
//!
//! # Templates
//! GET    /api/templates?category=         - Enabled templates
//! GET    /api/templates/featured          - Featured templates
//! GET    /api/templates/{id}              - One template
//!
//! # Admin (signed in and listed in ADMIN_EMAILS)
//! GET    /api/admin/templates             - All templates
//! POST   /api/admin/templates             - Create (multipart, with image)
//! PATCH  /api/admin/templates/{id}        - Update (multipart, optional image)
//! DELETE /api/admin/templates/{id}        - Delete
//! POST   /api/admin/templates/{id}/enabled   - Toggle enabled
//! POST   /api/admin/templates/{id}/featured  - Toggle featured
//!
//! # Media
//! POST   /api/media/upload                - Upload file(s) under configId/type
//! GET    /api/media/upload?configId&type  - Retrieve an asset
//!
//! # Configurator
//! POST   /api/configure/upload            - Upload source image, create design
//! GET    /api/configure/{id}              - Preview: status, price, crop URL
//! PUT    /api/configure/{id}              - Save options and cropped image
//!
//! # Designs
//! GET    /api/designs?email=              - Designs of an owner
//! POST   /api/designs                     - Create a design
//! GET    /api/designs/{id}                - One design
//! DELETE /api/designs/{id}                - Delete a design (admin)
//!
//! # Orders (rate limited)
//! POST   /api/orders                      - WhatsApp order
//! POST   /api/checkout                    - Hosted checkout (requires auth)
//! POST   /api/send-order-email            - Email order confirmation
//! GET    /api/orders                      - Signed-in user's orders
//! GET    /api/orders/{id}                 - One order
//! ```

pub mod auth;
pub mod configure;
pub mod designs;
pub mod form;
pub mod health;
pub mod media;
pub mod orders;
pub mod templates;

#[cfg(test)]
mod tests;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use casecraft_core::DesignId;

use crate::error::AppError;
use crate::middleware::{order_rate_limiter, upload_rate_limiter};
use crate::services::uploads::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Request body limit for multipart routes: room for one file per slot.
const MULTIPART_BODY_LIMIT: usize = 3 * MAX_UPLOAD_BYTES + 64 * 1024;

/// Parse a design ID from a path segment. Malformed IDs are simply unknown.
///
/// # Errors
///
/// Returns `AppError::NotFound` if `raw` is not a design ID.
pub fn parse_design_id(raw: &str) -> Result<DesignId, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound("No such configuration found".to_owned()))
}

/// Public template catalog routes.
pub fn template_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(templates::index))
        .route("/featured", get(templates::featured))
        .route("/{id}", get(templates::show))
}

/// Template administration routes. Every handler takes `RequireAdmin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/templates",
            get(templates::admin_index).post(templates::create),
        )
        .route(
            "/templates/{id}",
            axum::routing::patch(templates::update).delete(templates::delete),
        )
        .route("/templates/{id}/enabled", post(templates::set_enabled))
        .route("/templates/{id}/featured", post(templates::set_featured))
        .layer(DefaultBodyLimit::max(MULTIPART_BODY_LIMIT))
}

/// Design routes.
pub fn design_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(designs::index).post(designs::create))
        .route("/{id}", get(designs::show).delete(designs::delete))
}

/// Create all routes for the storefront.
///
/// Order-submitting routes share one limiter, upload routes another. Both
/// key on the client IP.
pub fn routes() -> Router<AppState> {
    let order_limit = order_rate_limiter();
    let upload_limit = upload_rate_limiter();

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/api/auth/{action}", get(auth::handle))
        .nest("/api/templates", template_routes())
        .nest("/api/admin", admin_routes())
        .route(
            "/api/media/upload",
            post(media::upload)
                .route_layer(upload_limit.clone())
                .layer(DefaultBodyLimit::max(MULTIPART_BODY_LIMIT))
                .get(media::retrieve),
        )
        .route(
            "/api/configure/upload",
            post(configure::upload)
                .route_layer(upload_limit)
                .layer(DefaultBodyLimit::max(MULTIPART_BODY_LIMIT)),
        )
        .route(
            "/api/configure/{id}",
            get(configure::preview).put(configure::save),
        )
        .nest("/api/designs", design_routes())
        .route(
            "/api/orders",
            post(orders::place)
                .route_layer(order_limit.clone())
                .get(orders::index),
        )
        .route("/api/orders/{id}", get(orders::show))
        .route(
            "/api/checkout",
            post(orders::checkout).route_layer(order_limit.clone()),
        )
        .route(
            "/api/send-order-email",
            post(orders::send_order_email).route_layer(order_limit),
        )
}
