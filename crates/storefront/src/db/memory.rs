//! Process-local store implementing every repository trait.
//!
//! Used by tests and by local development when no database URL is set. Each
//! operation holds one lock for its whole duration, so `find_or_create` is
//! atomic here for the same reason the unique index makes it atomic in
//! `PostgreSQL`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use casecraft_core::{
    CategoryFilter, Design, DesignId, DesignUpdate, NewDesign, NewOrder, NewTemplate, Order,
    OrderId, Template, TemplateId, TemplateUpdate,
};

use super::{
    Created, DesignRepository, OrderRepository, RepositoryError, TemplateRepository, slugify,
};

#[derive(Default)]
struct Tables {
    designs: HashMap<DesignId, Design>,
    orders: Vec<(String, Order)>,
    templates: HashMap<TemplateId, Template>,
}

/// In-memory repositories. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with templates.
    pub async fn with_templates(templates: Vec<NewTemplate>) -> Result<Self, RepositoryError> {
        let store = Self::new();
        for template in templates {
            TemplateRepository::create(&store, template).await?;
        }
        Ok(store)
    }
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> chrono::DateTime<Utc>) {
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

fn catalog_sorted(mut templates: Vec<Template>) -> Vec<Template> {
    templates.sort_by(|a, b| {
        a.sort_order
            .cmp(&b.sort_order)
            .then_with(|| a.name.cmp(&b.name))
    });
    templates
}

#[async_trait]
impl DesignRepository for MemoryStore {
    async fn create(&self, design: NewDesign) -> Result<Design, RepositoryError> {
        let design = design.into_design(DesignId::generate(), Utc::now());
        self.tables
            .lock()
            .await
            .designs
            .insert(design.id, design.clone());
        Ok(design)
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<Design>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut designs: Vec<Design> = tables
            .designs
            .values()
            .filter(|d| d.email == email)
            .cloned()
            .collect();
        newest_first(&mut designs, |d| d.created_at);
        Ok(designs)
    }

    async fn get(&self, id: DesignId) -> Result<Option<Design>, RepositoryError> {
        Ok(self.tables.lock().await.designs.get(&id).cloned())
    }

    async fn update(&self, id: DesignId, update: DesignUpdate) -> Result<Design, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let design = tables
            .designs
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        design.apply(update, Utc::now());
        Ok(design.clone())
    }

    async fn delete(&self, id: DesignId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        tables
            .designs
            .remove(&id)
            .ok_or(RepositoryError::NotFound)?;
        // Mirrors ON DELETE SET NULL.
        for (_, order) in &mut tables.orders {
            if order.design_id == Some(id) {
                order.design_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let key = order.customer_key();
        let order = order.into_order(OrderId::generate(), Utc::now());
        self.tables.lock().await.orders.push((key, order.clone()));
        Ok(order)
    }

    async fn find_or_create(&self, order: NewOrder) -> Result<(Order, Created), RepositoryError> {
        let key = order.customer_key();
        let mut tables = self.tables.lock().await;

        if let Some(design_id) = order.design_id
            && let Some((_, existing)) = tables
                .orders
                .iter()
                .find(|(k, o)| *k == key && o.design_id == Some(design_id))
        {
            return Ok((existing.clone(), Created::Existing));
        }

        let order = order.into_order(OrderId::generate(), Utc::now());
        tables.orders.push((key, order.clone()));
        Ok((order, Created::New))
    }

    async fn find_for_customer(
        &self,
        customer_key: &str,
        design_id: DesignId,
    ) -> Result<Option<Order>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .iter()
            .find(|(k, o)| k == customer_key && o.design_id == Some(design_id))
            .map(|(_, o)| o.clone()))
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut orders: Vec<Order> = tables
            .orders
            .iter()
            .map(|(_, o)| o)
            .filter(|o| o.email.eq_ignore_ascii_case(email))
            .cloned()
            .collect();
        newest_first(&mut orders, |o| o.created_at);
        Ok(orders)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .iter()
            .find(|(_, o)| o.id == id)
            .map(|(_, o)| o.clone()))
    }

    async fn exists_for_design(&self, design_id: DesignId) -> Result<bool, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .iter()
            .any(|(_, o)| o.design_id == Some(design_id)))
    }
}

#[async_trait]
impl TemplateRepository for MemoryStore {
    async fn list_enabled(&self) -> Result<Vec<Template>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(catalog_sorted(
            tables
                .templates
                .values()
                .filter(|t| t.enabled)
                .cloned()
                .collect(),
        ))
    }

    async fn list_all(&self) -> Result<Vec<Template>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(catalog_sorted(tables.templates.values().cloned().collect()))
    }

    async fn get(&self, id: &TemplateId) -> Result<Option<Template>, RepositoryError> {
        Ok(self.tables.lock().await.templates.get(id).cloned())
    }

    async fn list_by_category(
        &self,
        filter: CategoryFilter,
    ) -> Result<Vec<Template>, RepositoryError> {
        let enabled = self.list_enabled().await?;
        Ok(match filter {
            CategoryFilter::All => enabled,
            CategoryFilter::Only(category) => enabled
                .into_iter()
                .filter(|t| t.category == category)
                .collect(),
        })
    }

    async fn list_featured(&self) -> Result<Vec<Template>, RepositoryError> {
        let enabled = self.list_enabled().await?;
        Ok(enabled.into_iter().filter(|t| t.featured).collect())
    }

    async fn create(&self, template: NewTemplate) -> Result<Template, RepositoryError> {
        let id = template
            .id
            .clone()
            .unwrap_or_else(|| TemplateId::new(slugify(&template.name)));
        let mut tables = self.tables.lock().await;
        if tables.templates.contains_key(&id) {
            return Err(RepositoryError::Conflict(format!(
                "template {id} already exists"
            )));
        }
        let template = template.into_template(id.clone(), Utc::now());
        tables.templates.insert(id, template.clone());
        Ok(template)
    }

    async fn update(
        &self,
        id: &TemplateId,
        update: TemplateUpdate,
    ) -> Result<Template, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let template = tables
            .templates
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        update.apply_to(template, Utc::now());
        Ok(template.clone())
    }

    async fn delete(&self, id: &TemplateId) -> Result<(), RepositoryError> {
        self.tables
            .lock()
            .await
            .templates
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn set_enabled(
        &self,
        id: &TemplateId,
        enabled: bool,
    ) -> Result<Template, RepositoryError> {
        TemplateRepository::update(
            self,
            id,
            TemplateUpdate {
                enabled: Some(enabled),
                ..TemplateUpdate::default()
            },
        )
        .await
    }

    async fn set_featured(
        &self,
        id: &TemplateId,
        featured: bool,
    ) -> Result<Template, RepositoryError> {
        TemplateRepository::update(
            self,
            id,
            TemplateUpdate {
                featured: Some(featured),
                ..TemplateUpdate::default()
            },
        )
        .await
    }
}
