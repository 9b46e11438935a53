//! Integration tests for CaseCraft.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (no external services)
//! cargo test -p casecraft-integration-tests
//!
//! # Database and HTTP tests, against a disposable database and a running server
//! export STOREFRONT_TEST_DATABASE_URL=postgres://localhost/casecraft_test
//! export STOREFRONT_URL=http://localhost:3000
//! cargo test -p casecraft-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `order_flow` - Order service over the in-memory store
//! - `postgres_repositories` - `PostgreSQL` repositories (ignored by default)
//! - `http_api` - Storefront HTTP API (ignored by default)

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use casecraft_core::{
    CaseColor, CaseFinish, CaseMaterial, ContactInfo, ImageDimensions, NewDesign, PhoneModel,
    TemplateId,
};
use secrecy::SecretString;
use sqlx::PgPool;

/// Base URL of a running storefront.
#[must_use]
pub fn storefront_url() -> String {
    std::env::var("STOREFRONT_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned())
}

/// Connect to the test database and apply migrations.
///
/// Panics if `STOREFRONT_TEST_DATABASE_URL` is unset, so only call it from
/// ignored tests.
pub async fn test_pool() -> PgPool {
    let url = std::env::var("STOREFRONT_TEST_DATABASE_URL")
        .map(SecretString::from)
        .expect("STOREFRONT_TEST_DATABASE_URL must be set for database tests");

    let pool = casecraft_storefront::db::create_pool(&url).await.unwrap();
    sqlx::migrate!("../storefront/migrations")
        .run(&pool)
        .await
        .unwrap();
    pool
}

/// A complete contact form. `tag` keeps customers distinct between tests.
#[must_use]
pub fn contact(tag: &str) -> ContactInfo {
    ContactInfo {
        name: "Kavindi Silva".to_owned(),
        email: format!("kavindi+{tag}@example.com"),
        phone: "+94 71 234 5678".to_owned(),
        address: "45 Temple Road".to_owned(),
        city: "Kandy".to_owned(),
        postal_code: "20000".to_owned(),
        country: "Sri Lanka".to_owned(),
        state: None,
    }
}

/// A design with every case option chosen: black silicone, smooth, iPhone 14.
#[must_use]
pub fn configured_design(email: &str) -> NewDesign {
    let mut design = NewDesign::from_upload(
        email,
        TemplateId::new("minimalist-white"),
        "https://res.cloudinary.com/demo/image/upload/caseCraft/temp_1/original.png",
        ImageDimensions::new(1170, 2532).unwrap(),
    );
    design.cropped_image_url =
        Some("https://res.cloudinary.com/demo/image/upload/caseCraft/temp_1/configuration.png".to_owned());
    design.phone_model = Some(PhoneModel::Iphone14.into());
    design.case_color = Some(CaseColor::Black.into());
    design.case_material = Some(CaseMaterial::Silicone.into());
    design.case_finish = Some(CaseFinish::Smooth.into());
    design
}
