//! `PostgreSQL` repository tests.
//!
//! Ignored by default: they need `STOREFRONT_TEST_DATABASE_URL` pointing at a
//! disposable database. Migrations are applied on connect.

use std::sync::Arc;

use casecraft_core::{
    CategoryFilter, DesignUpdate, NewOrder, NewTemplate, OrderChannel, OrderSnapshot, PriceSchedule,
    TemplateCategory, TemplateId, default_catalog,
};
use casecraft_integration_tests::{configured_design, contact, test_pool};
use casecraft_storefront::db::{Created, Repositories, RepositoryError};

fn unique_tag() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

// =============================================================================
// Designs
// =============================================================================

#[tokio::test]
#[ignore = "requires STOREFRONT_TEST_DATABASE_URL"]
async fn test_design_update_keeps_unset_fields() {
    let repos = Repositories::postgres(test_pool().await);
    let email = format!("kavindi+{}@example.com", unique_tag());
    let design = repos.designs.create(configured_design(&email)).await.unwrap();

    let updated = repos
        .designs
        .update(
            design.id,
            DesignUpdate {
                design_name: Some("Kandy Lake".to_owned()),
                ..DesignUpdate::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.design_name, "Kandy Lake");
    assert_eq!(updated.case_material, design.case_material);
    assert!(updated.updated_at >= design.updated_at);

    let listed = repos.designs.list_by_email(&email).await.unwrap();
    assert_eq!(listed.len(), 1);

    repos.designs.delete(design.id).await.unwrap();
    assert!(repos.designs.get(design.id).await.unwrap().is_none());
    assert!(matches!(
        repos.designs.delete(design.id).await,
        Err(RepositoryError::NotFound)
    ));
}

// =============================================================================
// Orders
// =============================================================================

#[tokio::test]
#[ignore = "requires STOREFRONT_TEST_DATABASE_URL"]
async fn test_concurrent_find_or_create_inserts_once() {
    let repos = Repositories::postgres(test_pool().await);
    let tag = unique_tag();
    let design = repos
        .designs
        .create(configured_design(&format!("kavindi+{tag}@example.com")))
        .await
        .unwrap();
    let price = PriceSchedule::default().quote_design(&design);
    let snapshot = OrderSnapshot::capture(&design, price).to_json().unwrap();

    let orders = Arc::clone(&repos.orders);
    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let orders = Arc::clone(&orders);
            let order = NewOrder {
                contact: contact(&tag),
                design_id: Some(design.id),
                template_id: design.template_id.clone(),
                order_details: snapshot.clone(),
                channel: OrderChannel::Messaging,
            };
            tokio::spawn(async move { orders.find_or_create(order).await })
        })
        .collect();

    let mut created = 0;
    let mut ids = Vec::new();
    for task in tasks {
        let (order, outcome) = task.await.unwrap().unwrap();
        if outcome == Created::New {
            created += 1;
        }
        ids.push(order.id);
    }
    ids.dedup();

    assert_eq!(created, 1);
    assert_eq!(ids.len(), 1);
    assert!(repos.orders.exists_for_design(design.id).await.unwrap());
}

// =============================================================================
// Templates
// =============================================================================

#[tokio::test]
#[ignore = "requires STOREFRONT_TEST_DATABASE_URL"]
async fn test_template_ids_are_unique() {
    let repos = Repositories::postgres(test_pool().await);
    let id = TemplateId::new(format!("test-{}", unique_tag()));

    let template = NewTemplate {
        id: Some(id.clone()),
        ..default_catalog().remove(0)
    };
    repos.templates.create(template.clone()).await.unwrap();
    assert!(matches!(
        repos.templates.create(template).await,
        Err(RepositoryError::Conflict(_))
    ));

    let toggled = repos.templates.set_enabled(&id, false).await.unwrap();
    assert!(!toggled.enabled);
    let enabled = repos
        .templates
        .list_by_category(CategoryFilter::Only(TemplateCategory::Minimalist))
        .await
        .unwrap();
    assert!(enabled.iter().all(|t| t.id != id));

    repos.templates.delete(&id).await.unwrap();
    assert!(repos.templates.get(&id).await.unwrap().is_none());
}
