//! Hosted payment checkout.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use casecraft_core::CurrencyCode;

use crate::config::StripeConfig;

const STRIPE_API: &str = "https://api.stripe.com/v1";

/// Errors from the checkout provider.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// No checkout provider is configured.
    #[error("checkout is not configured")]
    NotConfigured,
}

/// A one-item checkout session request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub product_name: String,
    pub image_url: String,
    /// Price in minor units.
    pub unit_amount: i64,
    pub currency: CurrencyCode,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: Vec<(String, String)>,
}

/// A created hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Hosted checkout backend.
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    async fn create_session(&self, request: CheckoutRequest)
    -> Result<CheckoutSession, CheckoutError>;
}

/// Stripe Checkout via the REST API.
#[derive(Clone)]
pub struct StripeCheckout {
    client: reqwest::Client,
    secret_key: SecretString,
    allowed_countries: Vec<String>,
}

impl StripeCheckout {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, CheckoutError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            allowed_countries: config.allowed_countries.clone(),
        })
    }

    fn form(&self, request: &CheckoutRequest) -> Vec<(String, String)> {
        let mut form: Vec<(String, String)> = [
            ("mode", "payment".to_owned()),
            ("payment_method_types[0]", "card".to_owned()),
            ("success_url", request.success_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
            ("line_items[0][quantity]", "1".to_owned()),
            (
                "line_items[0][price_data][currency]",
                request.currency.code().to_ascii_lowercase(),
            ),
            (
                "line_items[0][price_data][unit_amount]",
                request.unit_amount.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                request.product_name.clone(),
            ),
            (
                "line_items[0][price_data][product_data][images][0]",
                request.image_url.clone(),
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect();

        for (i, country) in self.allowed_countries.iter().enumerate() {
            form.push((
                format!("shipping_address_collection[allowed_countries][{i}]"),
                country.clone(),
            ));
        }
        for (key, value) in &request.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }
        form
    }
}

#[async_trait]
impl CheckoutProvider for StripeCheckout {
    #[tracing::instrument(skip(self, request), fields(amount = request.unit_amount))]
    async fn create_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, CheckoutError> {
        let response = self
            .client
            .post(format!("{STRIPE_API}/checkout/sessions"))
            .basic_auth(self.secret_key.expose_secret(), None::<&str>)
            .form(&self.form(&request))
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CheckoutError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: CheckoutSession = response.json().await?;
        tracing::info!(session_id = %session.id, "Checkout session created");
        Ok(session)
    }
}

/// Used when no checkout provider is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCheckout;

#[async_trait]
impl CheckoutProvider for DisabledCheckout {
    async fn create_session(
        &self,
        _request: CheckoutRequest,
    ) -> Result<CheckoutSession, CheckoutError> {
        Err(CheckoutError::NotConfigured)
    }
}
