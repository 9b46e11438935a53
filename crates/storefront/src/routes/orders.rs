//! Order route handlers.
//!
//! Three ways to order a configured design:
//! - `POST /api/orders`: WhatsApp handoff, no account needed
//! - `POST /api/checkout`: hosted checkout, signed-in users only
//! - `POST /api/send-order-email`: confirmation email, quote follows by hand

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use casecraft_core::message::{compose_confirmation_email, confirmation_subject};
use casecraft_core::{ContactFlow, ContactInfo, DesignId, Order, OrderId, TemplateId};

use crate::error::{AppError, add_breadcrumb};
use crate::middleware::RequireUser;
use crate::routes::configure::PriceView;
use crate::services::email::Delivery;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(alias = "configId")]
    pub design_id: DesignId,
    #[serde(flatten)]
    pub contact: ContactInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub order_id: OrderId,
    /// Whether an earlier order for the same customer and design was returned.
    pub existing: bool,
    pub price: PriceView,
    pub message: String,
    pub whatsapp_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequestBody {
    #[serde(alias = "designId")]
    pub config_id: DesignId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub url: String,
    pub order_id: OrderId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEmailRequest {
    #[serde(flatten)]
    pub contact: ContactInfo,
    pub design_id: Option<DesignId>,
    pub template_id: Option<TemplateId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEmailDetails {
    pub name: String,
    pub email: String,
    pub design_id: Option<DesignId>,
    pub template_id: TemplateId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEmailResponse {
    pub success: bool,
    pub message: &'static str,
    pub order_details: OrderEmailDetails,
}

/// `POST /api/orders`
#[instrument(skip(state, body), fields(design_id = %body.design_id))]
pub async fn place(
    State(state): State<AppState>,
    Json(body): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<PlaceOrderResponse>), AppError> {
    let placed = state.orders().place_order(body.contact, body.design_id).await?;

    let order_id = placed.order.id.to_string();
    add_breadcrumb("order", "Order placed", Some(&[("order_id", order_id.as_str())]));

    let status = if placed.reused {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(PlaceOrderResponse {
            order_id: placed.order.id,
            existing: placed.reused,
            price: placed.price.into(),
            message: placed.message,
            whatsapp_url: placed.whatsapp_url,
        }),
    ))
}

/// `GET /api/orders`: the signed-in user's orders, newest first.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(
        state
            .repos()
            .orders
            .list_by_email(user.email.as_str())
            .await?,
    ))
}

/// `GET /api/orders/{id}`
///
/// Looked up by ID alone, for the thank-you page.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError> {
    let not_found = || AppError::NotFound("Order not found".to_owned());
    let id: OrderId = id.parse().map_err(|_| not_found())?;

    state
        .repos()
        .orders
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// `POST /api/checkout`
#[instrument(skip(state, user, body), fields(design_id = %body.config_id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<CheckoutRequestBody>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let redirect = state.orders().start_checkout(&user, body.config_id).await?;
    tracing::info!(order_id = %redirect.order.id, "Checkout session created");

    Ok(Json(CheckoutResponse {
        url: redirect.url,
        order_id: redirect.order.id,
    }))
}

/// `POST /api/send-order-email`
#[instrument(skip(state, body))]
pub async fn send_order_email(
    State(state): State<AppState>,
    Json(body): Json<OrderEmailRequest>,
) -> Result<Json<OrderEmailResponse>, AppError> {
    body.contact.validate(ContactFlow::Email)?;

    let template_id = body.template_id.unwrap_or_default();
    let subject = confirmation_subject(body.design_id);
    let text = compose_confirmation_email(&body.contact, &template_id, body.design_id);

    let delivery = state
        .email()
        .send_text(&body.contact.email, &subject, &text)
        .await?;
    tracing::info!(delivery = ?delivery, "Order confirmation handled");

    Ok(Json(OrderEmailResponse {
        success: true,
        message: match delivery {
            Delivery::Sent => "Order confirmation email sent successfully",
            Delivery::Logged => "Order received; confirmation email logged",
        },
        order_details: OrderEmailDetails {
            name: body.contact.name,
            email: body.contact.email,
            design_id: body.design_id,
            template_id,
        },
    }))
}
