//! `PostgreSQL` order repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use casecraft_core::{DesignId, NewOrder, Order, OrderId, TemplateId};

use super::{Created, OrderRepository, PgStore, RepositoryError};

const ORDER_COLUMNS: &str = "id, name, email, phone, address, city, postal_code, country, state, \
     design_id, template_id, order_details, created_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    address: String,
    city: String,
    postal_code: String,
    country: String,
    state: Option<String>,
    design_id: Option<Uuid>,
    template_id: String,
    order_details: String,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            city: row.city,
            postal_code: row.postal_code,
            country: row.country,
            state: row.state,
            design_id: row.design_id.map(DesignId::from_uuid),
            template_id: TemplateId::new(row.template_id),
            order_details: row.order_details,
            created_at: row.created_at,
        }
    }
}

impl PgStore {
    /// Insert an order. With `skip_duplicate`, a row that collides with the
    /// `(customer_key, design_id)` index is not inserted and `None` is returned.
    async fn insert_order(
        &self,
        order: &NewOrder,
        skip_duplicate: bool,
    ) -> Result<Option<Order>, RepositoryError> {
        let on_conflict = if skip_duplicate {
            "ON CONFLICT (customer_key, design_id) DO NOTHING"
        } else {
            ""
        };
        let sql = format!(
            "INSERT INTO casecraft.orders (
                id, customer_key, name, email, phone, address, city, postal_code,
                country, state, design_id, template_id, order_details
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            {on_conflict}
            RETURNING {ORDER_COLUMNS}"
        );

        let contact = &order.contact;
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(OrderId::generate().as_uuid())
            .bind(order.customer_key())
            .bind(&contact.name)
            .bind(&contact.email)
            .bind(&contact.phone)
            .bind(&contact.address)
            .bind(&contact.city)
            .bind(&contact.postal_code)
            .bind(&contact.country)
            .bind(contact.state())
            .bind(order.design_id.map(|id| id.as_uuid()))
            .bind(order.template_id.as_str())
            .bind(&order.order_details)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    RepositoryError::Conflict(db.message().to_owned())
                }
                other => RepositoryError::Database(other),
            })?;

        Ok(row.map(Order::from))
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    #[tracing::instrument(skip(self, order))]
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        self.insert_order(&order, false)
            .await?
            .ok_or_else(|| RepositoryError::DataCorruption("insert returned no row".to_owned()))
    }

    #[tracing::instrument(skip(self, order), fields(design_id = ?order.design_id))]
    async fn find_or_create(&self, order: NewOrder) -> Result<(Order, Created), RepositoryError> {
        let Some(design_id) = order.design_id else {
            return Ok((OrderRepository::create(self, order).await?, Created::New));
        };

        if let Some(inserted) = self.insert_order(&order, true).await? {
            return Ok((inserted, Created::New));
        }

        // Lost the race (or a previous submission exists): the row is committed.
        let existing = self
            .find_for_customer(&order.customer_key(), design_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "order for design {design_id} conflicted but could not be read back"
                ))
            })?;
        Ok((existing, Created::Existing))
    }

    async fn find_for_customer(
        &self,
        customer_key: &str,
        design_id: DesignId,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM casecraft.orders
             WHERE customer_key = $1 AND design_id = $2"
        );

        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(customer_key)
            .bind(design_id.as_uuid())
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(Order::from))
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM casecraft.orders
             WHERE lower(email) = lower($1)
             ORDER BY created_at DESC"
        );

        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(email)
            .fetch_all(self.pool())
            .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM casecraft.orders WHERE id = $1");

        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(Order::from))
    }

    async fn exists_for_design(&self, design_id: DesignId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM casecraft.orders WHERE design_id = $1)",
        )
        .bind(design_id.as_uuid())
        .fetch_one(self.pool())
        .await?;

        Ok(exists)
    }
}
