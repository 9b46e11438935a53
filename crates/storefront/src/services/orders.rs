//! Order assembly and handoff.
//!
//! Both flows price the design as stored at the moment of ordering, persist
//! at most one order per customer and design, and then hand off: the
//! messaging flow returns a WhatsApp link carrying the composed summary, the
//! checkout flow returns a hosted checkout URL.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use casecraft_core::message::compose_order_message;
use casecraft_core::{
    ContactFlow, ContactInfo, Design, DesignId, DesignStatus, NewOrder, Order, OrderChannel,
    OrderSnapshot, Price, PriceSchedule, Principal, ValidationError,
};

use crate::db::{Created, DesignRepository, OrderRepository, RepositoryError};
use crate::services::checkout::{CheckoutError, CheckoutProvider, CheckoutRequest};
use crate::services::handoff::WhatsAppHandoff;

/// Product name shown on the hosted checkout page.
pub const CHECKOUT_PRODUCT_NAME: &str = "Custom iPhone Case";

#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("design {0} not found")]
    DesignNotFound(DesignId),

    #[error("design {0} has no saved case options yet")]
    NotConfigured(DesignId),

    #[error("could not place order: {0}")]
    Database(#[from] RepositoryError),

    #[error("could not serialize order snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("could not start checkout: {0}")]
    Checkout(#[from] CheckoutError),
}

/// Result of the messaging flow.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    /// Whether an earlier order for the same customer and design was reused.
    pub reused: bool,
    pub price: Price,
    pub message: String,
    pub whatsapp_url: String,
}

/// Result of the checkout flow.
#[derive(Debug, Clone)]
pub struct CheckoutRedirect {
    pub order: Order,
    pub price: Price,
    pub url: String,
}

#[derive(Clone)]
pub struct OrderService {
    designs: Arc<dyn DesignRepository>,
    orders: Arc<dyn OrderRepository>,
    checkout: Arc<dyn CheckoutProvider>,
    pricing: PriceSchedule,
    handoff: WhatsAppHandoff,
    base_url: String,
}

impl OrderService {
    #[must_use]
    pub fn new(
        designs: Arc<dyn DesignRepository>,
        orders: Arc<dyn OrderRepository>,
        checkout: Arc<dyn CheckoutProvider>,
        pricing: PriceSchedule,
        handoff: WhatsAppHandoff,
        base_url: &str,
    ) -> Self {
        Self {
            designs,
            orders,
            checkout,
            pricing,
            handoff,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    #[must_use]
    pub const fn pricing(&self) -> &PriceSchedule {
        &self.pricing
    }

    /// Load a design that has a crop and all four case options saved.
    async fn load_design(&self, design_id: DesignId) -> Result<Design, OrderError> {
        let design = self
            .designs
            .get(design_id)
            .await?
            .ok_or(OrderError::DesignNotFound(design_id))?;

        // A design that already has an order still reads as configured here,
        // so a repeat submission reaches the reuse path.
        if !design.status(false).can_transition_to(DesignStatus::Ordered) {
            return Err(OrderError::NotConfigured(design_id));
        }
        Ok(design)
    }

    fn new_order(
        contact: ContactInfo,
        design: &Design,
        price: Price,
        channel: OrderChannel,
    ) -> Result<NewOrder, OrderError> {
        Ok(NewOrder {
            contact,
            design_id: Some(design.id),
            template_id: design.template_id.clone(),
            order_details: OrderSnapshot::capture(design, price).to_json()?,
            channel,
        })
    }

    /// Messaging flow: validate, price, persist (or reuse), compose, link.
    ///
    /// # Errors
    ///
    /// `Validation` before any store access if required contact fields are
    /// blank; `DesignNotFound` if the design is gone; `NotConfigured` if its
    /// case options were never saved; `Database` if the order cannot be stored.
    #[instrument(skip(self, contact), fields(design_id = %design_id))]
    pub async fn place_order(
        &self,
        contact: ContactInfo,
        design_id: DesignId,
    ) -> Result<PlacedOrder, OrderError> {
        contact.validate(ContactFlow::Messaging)?;

        let design = self.load_design(design_id).await?;
        let price = self.pricing.quote_design(&design);

        let (order, created) = self
            .orders
            .find_or_create(Self::new_order(
                contact.clone(),
                &design,
                price,
                OrderChannel::Messaging,
            )?)
            .await?;
        let reused = created == Created::Existing;
        if reused {
            tracing::info!(order_id = %order.id, "Reusing existing order");
        } else {
            tracing::info!(order_id = %order.id, cents = price.cents, "Order placed");
        }

        let message = compose_order_message(order.id, &contact, &design, price);
        let whatsapp_url = self.handoff.link(&message);

        Ok(PlacedOrder {
            order,
            reused,
            price,
            message,
            whatsapp_url,
        })
    }

    /// Checkout flow for a signed-in principal.
    ///
    /// # Errors
    ///
    /// `DesignNotFound` if the design is gone; `NotConfigured` if its case
    /// options were never saved; `Database` if the order cannot be stored; `Checkout` if the provider refuses the session. Nothing is
    /// retried.
    #[instrument(skip(self, principal), fields(design_id = %design_id, user_id = %principal.id))]
    pub async fn start_checkout(
        &self,
        principal: &Principal,
        design_id: DesignId,
    ) -> Result<CheckoutRedirect, OrderError> {
        let design = self.load_design(design_id).await?;
        let price = self.pricing.quote_design(&design);

        let contact = ContactInfo {
            name: principal.display_name().to_owned(),
            email: principal.email.as_str().to_owned(),
            ..ContactInfo::default()
        };
        let (order, _) = self
            .orders
            .find_or_create(Self::new_order(
                contact,
                &design,
                price,
                OrderChannel::Checkout,
            )?)
            .await?;

        let session = self
            .checkout
            .create_session(CheckoutRequest {
                product_name: CHECKOUT_PRODUCT_NAME.to_owned(),
                image_url: design.image_url.clone(),
                unit_amount: price.cents,
                currency: price.currency_code,
                success_url: format!("{}/thank-you?orderId={}", self.base_url, order.id),
                cancel_url: format!("{}/configure/preview?id={}", self.base_url, design.id),
                metadata: vec![
                    ("userId".to_owned(), principal.id.clone()),
                    ("orderId".to_owned(), order.id.to_string()),
                ],
            })
            .await?;

        Ok(CheckoutRedirect {
            order,
            price,
            url: session.url,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use casecraft_core::{
        CaseColor, CaseFinish, CaseMaterial, Email, ImageDimensions, NewDesign, PhoneModel,
        TemplateId,
    };

    use super::*;
    use crate::db::MemoryStore;
    use crate::services::checkout::CheckoutSession;

    /// Records checkout requests and answers with a fixed URL.
    #[derive(Default)]
    pub struct RecordingCheckout {
        pub requests: Mutex<Vec<CheckoutRequest>>,
    }

    #[async_trait]
    impl CheckoutProvider for RecordingCheckout {
        async fn create_session(
            &self,
            request: CheckoutRequest,
        ) -> Result<CheckoutSession, CheckoutError> {
            self.requests.lock().unwrap().push(request);
            Ok(CheckoutSession {
                id: "cs_test_1".to_owned(),
                url: "https://checkout.stripe.com/c/pay/cs_test_1".to_owned(),
            })
        }
    }

    /// Counts repository reads so tests can prove nothing was touched.
    struct CountingDesigns {
        inner: MemoryStore,
        reads: Mutex<usize>,
    }

    #[async_trait]
    impl DesignRepository for CountingDesigns {
        async fn create(&self, design: NewDesign) -> Result<Design, RepositoryError> {
            DesignRepository::create(&self.inner, design).await
        }
        async fn list_by_email(&self, email: &str) -> Result<Vec<Design>, RepositoryError> {
            DesignRepository::list_by_email(&self.inner, email).await
        }
        async fn get(&self, id: DesignId) -> Result<Option<Design>, RepositoryError> {
            *self.reads.lock().unwrap() += 1;
            DesignRepository::get(&self.inner, id).await
        }
        async fn update(
            &self,
            id: DesignId,
            update: casecraft_core::DesignUpdate,
        ) -> Result<Design, RepositoryError> {
            DesignRepository::update(&self.inner, id, update).await
        }
        async fn delete(&self, id: DesignId) -> Result<(), RepositoryError> {
            DesignRepository::delete(&self.inner, id).await
        }
    }

    pub fn contact() -> ContactInfo {
        ContactInfo {
            name: "Ada Lovelace".to_owned(),
            email: "ada@example.com".to_owned(),
            phone: "+94 75 535 4830".to_owned(),
            address: "12 Analytical Row".to_owned(),
            city: "Colombo".to_owned(),
            postal_code: "00100".to_owned(),
            country: "Sri Lanka".to_owned(),
            state: None,
        }
    }

    pub async fn configured_design(store: &MemoryStore, cropped: bool) -> Design {
        let mut new = NewDesign::from_upload(
            "ada@example.com",
            TemplateId::new("geometric-hex"),
            "memory://caseCraft/temp_1/original?v=1",
            ImageDimensions::new(800, 1600).unwrap(),
        );
        new.phone_model = Some(PhoneModel::Iphone15.into());
        new.case_color = Some(CaseColor::Copper.into());
        new.case_material = Some(CaseMaterial::Polycarbonate.into());
        new.case_finish = Some(CaseFinish::Textured.into());
        if cropped {
            new.cropped_image_url = Some("memory://caseCraft/abc/configuration?v=1".to_owned());
        }
        DesignRepository::create(store, new).await.unwrap()
    }

    fn service(store: &MemoryStore, checkout: Arc<RecordingCheckout>) -> OrderService {
        OrderService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            checkout,
            PriceSchedule::default(),
            WhatsAppHandoff::new("94755354830"),
            "http://localhost:3000/",
        )
    }

    #[tokio::test]
    async fn test_place_order_prices_and_composes() {
        let store = MemoryStore::new();
        let design = configured_design(&store, true).await;
        let placed = service(&store, Arc::default())
            .place_order(contact(), design.id)
            .await
            .unwrap();

        assert_eq!(placed.price.cents, 1350);
        assert!(!placed.reused);
        assert!(placed.message.contains("💰 *Total: $13.50*"));
        assert_eq!(
            placed.message.lines().last(),
            design.cropped_image_url.as_deref()
        );
        assert!(placed.whatsapp_url.starts_with("https://wa.me/94755354830?text="));

        let snapshot: serde_json::Value =
            serde_json::from_str(&placed.order.order_details).unwrap();
        assert_eq!(snapshot["material"], "polycarbonate");
        assert_eq!(snapshot["amount"], 13.5);
    }

    #[tokio::test]
    async fn test_place_order_twice_reuses_order() {
        let store = MemoryStore::new();
        let design = configured_design(&store, true).await;
        let service = service(&store, Arc::default());

        let first = service.place_order(contact(), design.id).await.unwrap();
        let second = service.place_order(contact(), design.id).await.unwrap();
        assert_eq!(first.order.id, second.order.id);
        assert!(second.reused);
        assert!(second.message.contains(&first.order.id.short_code()));
    }

    #[tokio::test]
    async fn test_missing_city_rejected_before_any_lookup() {
        let store = MemoryStore::new();
        let design = configured_design(&store, true).await;
        let designs = Arc::new(CountingDesigns {
            inner: store.clone(),
            reads: Mutex::new(0),
        });
        let service = OrderService::new(
            designs.clone(),
            Arc::new(store.clone()),
            Arc::new(RecordingCheckout::default()),
            PriceSchedule::default(),
            WhatsAppHandoff::new("94755354830"),
            "http://localhost:3000",
        );

        let mut contact = contact();
        contact.city = "  ".to_owned();
        let err = service.place_order(contact, design.id).await.unwrap_err();

        let OrderError::Validation(validation) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(validation.missing, vec!["city"]);
        assert_eq!(*designs.reads.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_design() {
        let store = MemoryStore::new();
        let err = service(&store, Arc::default())
            .place_order(contact(), DesignId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::DesignNotFound(_)));
    }

    #[tokio::test]
    async fn test_design_without_crop_is_not_orderable() {
        let store = MemoryStore::new();
        let design = configured_design(&store, false).await;
        let checkout = Arc::new(RecordingCheckout::default());
        let service = service(&store, checkout.clone());

        let err = service.place_order(contact(), design.id).await.unwrap_err();
        assert!(matches!(err, OrderError::NotConfigured(id) if id == design.id));

        let principal = Principal {
            id: "kp_7".to_owned(),
            email: Email::parse("ada@example.com").unwrap(),
            name: None,
        };
        let err = service.start_checkout(&principal, design.id).await.unwrap_err();
        assert!(matches!(err, OrderError::NotConfigured(_)));

        assert!(checkout.requests.lock().unwrap().is_empty());
        assert!(
            OrderRepository::list_by_email(&store, "ada@example.com")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_checkout_order_not_reused_for_messaging() {
        let store = MemoryStore::new();
        let design = configured_design(&store, true).await;
        let service = service(&store, Arc::new(RecordingCheckout::default()));
        let principal = Principal {
            id: "kp_42".to_owned(),
            email: Email::parse("ada@example.com").unwrap(),
            name: None,
        };

        let checkout = service.start_checkout(&principal, design.id).await.unwrap();
        assert!(checkout.order.address.is_empty());

        let placed = service.place_order(contact(), design.id).await.unwrap();
        assert!(!placed.reused);
        assert_ne!(placed.order.id, checkout.order.id);
        assert_eq!(placed.order.address, "12 Analytical Row");
        assert_eq!(placed.order.city, "Colombo");
    }

    #[tokio::test]
    async fn test_start_checkout() {
        let store = MemoryStore::new();
        let design = configured_design(&store, true).await;
        let checkout = Arc::new(RecordingCheckout::default());
        let service = service(&store, checkout.clone());
        let principal = Principal {
            id: "kp_42".to_owned(),
            email: Email::parse("ada@example.com").unwrap(),
            name: Some("Ada Lovelace".to_owned()),
        };

        let first = service.start_checkout(&principal, design.id).await.unwrap();
        let second = service.start_checkout(&principal, design.id).await.unwrap();
        assert_eq!(first.order.id, second.order.id);
        assert_eq!(first.url, "https://checkout.stripe.com/c/pay/cs_test_1");
        assert_eq!(first.order.name, "Ada Lovelace");

        let requests = checkout.requests.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.unit_amount, 1350);
        assert_eq!(request.image_url, design.image_url);
        assert_eq!(
            request.success_url,
            format!("http://localhost:3000/thank-you?orderId={}", first.order.id)
        );
        assert_eq!(
            request.cancel_url,
            format!("http://localhost:3000/configure/preview?id={}", design.id)
        );
        assert!(request.metadata.contains(&("userId".to_owned(), "kp_42".to_owned())));
    }
}
