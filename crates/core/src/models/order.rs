//! Orders, contact details and the order snapshot.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::design::Design;
use crate::types::{DesignId, OrderId, Price, TemplateId};

/// Which submission flow the contact form came through.
///
/// The messaging flow reaches the customer by phone, so email is optional
/// there. The email flow needs an address to send the confirmation to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactFlow {
    Messaging,
    Email,
}

/// Which handoff an order was placed through.
///
/// Orders from different channels never de-duplicate against each other: a
/// checkout order carries only the signed-in email, so reusing it for a
/// messaging submission would lose the shipping address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderChannel {
    #[default]
    Messaging,
    Checkout,
}

/// Required fields that were missing from a submission.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("missing required fields: {}", .missing.join(", "))]
pub struct ValidationError {
    /// Field names, in form order.
    pub missing: Vec<&'static str>,
}

/// Customer contact and shipping details from the order form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default, alias = "postal_code")]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub state: Option<String>,
}

impl ContactInfo {
    /// Names of required fields that are blank for `flow`.
    #[must_use]
    pub fn missing_fields(&self, flow: ContactFlow) -> Vec<&'static str> {
        let email_required = flow == ContactFlow::Email;
        let postal_required = flow == ContactFlow::Email;

        [
            ("name", self.name.as_str(), true),
            ("email", self.email.as_str(), email_required),
            ("phone", self.phone.as_str(), true),
            ("address", self.address.as_str(), true),
            ("city", self.city.as_str(), true),
            ("postalCode", self.postal_code.as_str(), postal_required),
            ("country", self.country.as_str(), true),
        ]
        .into_iter()
        .filter(|(_, value, required)| *required && value.trim().is_empty())
        .map(|(field, _, _)| field)
        .collect()
    }

    /// Validate the form for `flow`.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` listing every blank required field.
    pub fn validate(&self, flow: ContactFlow) -> Result<(), ValidationError> {
        let missing = self.missing_fields(flow);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { missing })
        }
    }

    /// State/province, treating blank as absent.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Key identifying the customer for order de-duplication.
    #[must_use]
    pub fn customer_key(&self) -> String {
        customer_key(&self.email, &self.phone)
    }
}

/// Customer key: the normalized email, or the phone digits when there is no email.
#[must_use]
pub fn customer_key(email: &str, phone: &str) -> String {
    let email = email.trim();
    if email.is_empty() {
        let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
        format!("tel:{digits}")
    } else {
        email.to_lowercase()
    }
}

/// Order-relevant configuration captured at order time.
///
/// Serialized into `orders.order_details`. The pipeline writes it once and
/// never parses it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    pub model: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
    pub finish: Option<String>,
    /// Price in major units.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub image_url: String,
    pub cropped_image_url: Option<String>,
}

impl OrderSnapshot {
    /// Capture the design's options and the price computed for it.
    #[must_use]
    pub fn capture(design: &Design, price: Price) -> Self {
        Self {
            model: design.phone_model.as_ref().map(|c| c.as_str().to_owned()),
            color: design.case_color.as_ref().map(|c| c.as_str().to_owned()),
            material: design.case_material.as_ref().map(|c| c.as_str().to_owned()),
            finish: design.case_finish.as_ref().map(|c| c.as_str().to_owned()),
            amount: price.major_units(),
            image_url: design.image_url.clone(),
            cropped_image_url: design.cropped_image_url.clone(),
        }
    }

    /// Serialize for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Fields for inserting an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub contact: ContactInfo,
    pub design_id: Option<DesignId>,
    pub template_id: TemplateId,
    /// JSON-encoded [`OrderSnapshot`].
    pub order_details: String,
    #[serde(default)]
    pub channel: OrderChannel,
}

impl NewOrder {
    /// Key the uniqueness constraint is enforced on.
    ///
    /// Checkout orders are keyed apart from messaging orders for the same
    /// customer.
    #[must_use]
    pub fn customer_key(&self) -> String {
        let key = self.contact.customer_key();
        match self.channel {
            OrderChannel::Messaging => key,
            OrderChannel::Checkout => format!("checkout:{key}"),
        }
    }

    /// Materialize the record with a generated ID, as a store would on insert.
    #[must_use]
    pub fn into_order(self, id: OrderId, now: DateTime<Utc>) -> Order {
        let state = self.contact.state().map(str::to_owned);
        Order {
            id,
            name: self.contact.name,
            email: self.contact.email,
            phone: self.contact.phone,
            address: self.contact.address,
            city: self.contact.city,
            postal_code: self.contact.postal_code,
            country: self.contact.country,
            state,
            design_id: self.design_id,
            template_id: self.template_id,
            order_details: self.order_details,
            created_at: now,
        }
    }
}

/// A persisted order. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub state: Option<String>,
    pub design_id: Option<DesignId>,
    pub template_id: TemplateId,
    pub order_details: String,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Contact details as submitted.
    #[must_use]
    pub fn contact(&self) -> ContactInfo {
        ContactInfo {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
            postal_code: self.postal_code.clone(),
            country: self.country.clone(),
            state: self.state.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::design::fixtures::configured_design;
    use crate::types::CurrencyCode;

    fn complete_contact() -> ContactInfo {
        ContactInfo {
            name: "Ada Lovelace".to_owned(),
            email: String::new(),
            phone: "+94 75 535 4830".to_owned(),
            address: "12 Galle Road".to_owned(),
            city: "Colombo".to_owned(),
            postal_code: String::new(),
            country: "Sri Lanka".to_owned(),
            state: None,
        }
    }

    #[test]
    fn test_messaging_flow_allows_missing_email() {
        assert!(complete_contact().validate(ContactFlow::Messaging).is_ok());
    }

    #[test]
    fn test_missing_city_is_named() {
        let contact = ContactInfo {
            city: "  ".to_owned(),
            ..complete_contact()
        };
        let err = contact.validate(ContactFlow::Messaging).unwrap_err();
        assert_eq!(err.missing, vec!["city"]);
        assert_eq!(err.to_string(), "missing required fields: city");
    }

    #[test]
    fn test_email_flow_requires_email_and_postal_code() {
        let err = complete_contact().validate(ContactFlow::Email).unwrap_err();
        assert_eq!(err.missing, vec!["email", "postalCode"]);
    }

    #[test]
    fn test_customer_key() {
        assert_eq!(customer_key(" Dev@Example.com ", "123"), "dev@example.com");
        assert_eq!(customer_key("", "+94 75-535"), "tel:9475535");
    }

    #[test]
    fn test_checkout_orders_keyed_apart() {
        let mut order = NewOrder {
            contact: ContactInfo {
                email: "Ada@Example.com".to_owned(),
                ..complete_contact()
            },
            design_id: None,
            template_id: TemplateId::default(),
            order_details: "{}".to_owned(),
            channel: OrderChannel::Messaging,
        };
        assert_eq!(order.customer_key(), "ada@example.com");

        order.channel = OrderChannel::Checkout;
        assert_eq!(order.customer_key(), "checkout:ada@example.com");
    }

    #[test]
    fn test_blank_state_is_absent() {
        let contact = ContactInfo {
            state: Some("   ".to_owned()),
            ..complete_contact()
        };
        assert_eq!(contact.state(), None);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let design = configured_design();
        let snapshot = OrderSnapshot::capture(&design, Price::from_cents(1350, CurrencyCode::USD));
        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();

        assert_eq!(value["model"], "iphone14");
        assert_eq!(value["material"], "polycarbonate");
        assert_eq!(value["finish"], "textured");
        assert_eq!(value["amount"], serde_json::json!(13.5));
        assert_eq!(value["imageUrl"], design.image_url);
        assert_eq!(
            value["croppedImageUrl"],
            serde_json::json!(design.cropped_image_url)
        );
    }

    #[test]
    fn test_contact_accepts_camel_case_form() {
        let contact: ContactInfo = serde_json::from_value(serde_json::json!({
            "name": "Ada",
            "phone": "1",
            "address": "a",
            "city": "b",
            "postalCode": "10001",
            "country": "US"
        }))
        .unwrap();
        assert_eq!(contact.postal_code, "10001");
        assert!(contact.email.is_empty());
    }
}
