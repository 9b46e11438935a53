//! Router-level tests driving the full middleware stack with in-memory
//! collaborators.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use casecraft_core::{Principal, default_catalog};
use tower_sessions::Session;

use crate::config::StorefrontConfig;
use crate::db::MemoryStore;
use crate::services::identity::{CallbackQuery, IdentityError, IdentityProvider};
use crate::services::orders::tests::RecordingCheckout;
use crate::services::uploads::tests::png;
use crate::state::{AppState, Services};

const CLIENT_IP: &str = "203.0.113.9";
const BOUNDARY: &str = "casecraft-test-boundary";

fn app_with(services: Services) -> Router {
    app_with_config(StorefrontConfig::local("http://localhost:3000"), services)
}

fn app_with_config(config: StorefrontConfig, services: Services) -> Router {
    let state = AppState::with_services(config, None, services);
    crate::app(state, tower_sessions::MemoryStore::default())
}

/// Identity provider with nobody signed in.
struct SignedOut;

#[async_trait]
impl IdentityProvider for SignedOut {
    async fn current_user(&self, _session: &Session) -> Result<Option<Principal>, IdentityError> {
        Ok(None)
    }

    async fn login(&self, _session: &Session) -> Result<String, IdentityError> {
        Ok("/".to_owned())
    }

    async fn register(&self, _session: &Session) -> Result<String, IdentityError> {
        Ok("/".to_owned())
    }

    async fn callback(
        &self,
        _session: &Session,
        _query: CallbackQuery,
    ) -> Result<String, IdentityError> {
        Ok("/".to_owned())
    }

    async fn logout(&self, _session: &Session) -> Result<String, IdentityError> {
        Ok("/".to_owned())
    }
}

async fn seeded_store() -> MemoryStore {
    MemoryStore::with_templates(default_catalog()).await.unwrap()
}

async fn local_app() -> Router {
    app_with(Services::local(seeded_store().await))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", CLIENT_IP)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", CLIENT_IP)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// A multipart request with text `fields` and `(name, filename, bytes)` files.
fn multipart_request(uri: &str, fields: &[(&str, &str)], files: &[(&str, &str, Vec<u8>)]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, filename, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("x-forwarded-for", CLIENT_IP)
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn contact() -> Value {
    json!({
        "name": "Nimal Perera",
        "email": "nimal@example.com",
        "phone": "+94 77 123 4567",
        "address": "12 Galle Road",
        "city": "Colombo",
        "postalCode": "00300",
        "country": "Sri Lanka",
    })
}

/// Upload a source image and return the new design's ID.
async fn upload_design(app: &Router) -> String {
    let response = send(
        app,
        multipart_request(
            "/api/configure/upload",
            &[("template", "modern-neon")],
            &[("image", "case.png", png(40, 80))],
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["templateId"], "modern-neon");
    assert_eq!(body["width"], 40);
    assert_eq!(body["height"], 80);
    body["configId"].as_str().unwrap().to_owned()
}

async fn save_options(app: &Router, id: &str) -> Response {
    send(
        app,
        json_request(
            Method::PUT,
            &format!("/api/configure/{id}"),
            &json!({
                "croppedImageUrl": "https://cdn.example.com/crop.png",
                "phoneModel": "iphone15",
                "caseColor": "copper",
                "caseMaterial": "polycarbonate",
                "caseFinish": "textured",
            }),
        ),
    )
    .await
}

#[tokio::test]
async fn test_health() {
    let app = local_app().await;

    let response = send(&app, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let response = send(&app, get("/health/ready")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_template_listing() {
    let app = local_app().await;

    let all = body_json(send(&app, get("/api/templates")).await).await;
    assert_eq!(all.as_array().unwrap().len(), 18);
    assert_eq!(all[0]["id"], "minimalist-white");

    let nature = body_json(send(&app, get("/api/templates?category=nature")).await).await;
    let ids: Vec<&str> = nature
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["nature-forest", "nature-sunset", "nature-botanical"]);

    let featured = body_json(send(&app, get("/api/templates/featured")).await).await;
    assert_eq!(featured.as_array().unwrap().len(), 6);

    let response = send(&app, get("/api/templates?category=cubism")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, get("/api/templates/no-such-template")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_creates_template_with_image() {
    let app = local_app().await;

    let response = send(
        &app,
        multipart_request(
            "/api/admin/templates",
            &[
                ("name", "Night Sky"),
                ("category", "modern"),
                ("colors", "#000000, #FFFFFF"),
                ("sortOrder", "40"),
            ],
            &[("image", "night.png", png(10, 10))],
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["id"], "night-sky");
    assert_eq!(body["colors"], json!(["#000000", "#FFFFFF"]));
    assert!(body["image_url"].as_str().unwrap().contains("templates/night-sky"));

    let listed = body_json(send(&app, get("/api/templates?category=modern")).await).await;
    assert!(listed.as_array().unwrap().iter().any(|t| t["id"] == "night-sky"));
}

#[tokio::test]
async fn test_admin_routes_refuse_signed_out_visitors() {
    let app = app_with(Services {
        identity: Arc::new(SignedOut),
        ..Services::local(seeded_store().await)
    });
    let id = upload_design(&app).await;

    let response = send(&app, get("/api/admin/templates")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/admin/templates/minimalist-white/enabled",
            &json!({ "value": false }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let delete = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/designs/{id}"))
        .header("x-forwarded-for", CLIENT_IP)
        .body(Body::empty())
        .unwrap();
    let response = send(&app, delete).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, get(&format!("/api/designs/{id}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(&app, get("/api/templates/minimalist-white")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_routes_refuse_non_admins() {
    let config = StorefrontConfig {
        admin_emails: vec!["ops@casecraft.example".to_owned()],
        ..StorefrontConfig::local("http://localhost:3000")
    };
    let app = app_with_config(config, Services::local(seeded_store().await));
    let id = upload_design(&app).await;

    let response = send(&app, get("/api/admin/templates")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "Admin access required");

    let delete = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/designs/{id}"))
        .header("x-forwarded-for", CLIENT_IP)
        .body(Body::empty())
        .unwrap();
    let response = send(&app, delete).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_deletes_design() {
    let app = local_app().await;
    let id = upload_design(&app).await;

    let delete = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/designs/{id}"))
        .header("x-forwarded-for", CLIENT_IP)
        .body(Body::empty())
        .unwrap();
    let response = send(&app, delete).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);

    let response = send(&app, get(&format!("/api/designs/{id}"))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_configure_and_order_flow() {
    let app = local_app().await;
    let id = upload_design(&app).await;

    let preview = body_json(send(&app, get(&format!("/api/configure/{id}"))).await).await;
    assert_eq!(preview["status"], "pending");
    assert_eq!(preview["price"]["cents"], 1000);
    assert_eq!(preview["croppedImageUrl"], preview["configuration"]["image_url"]);

    let response = save_options(&app, &id).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "configured");

    let preview = body_json(send(&app, get(&format!("/api/configure/{id}"))).await).await;
    assert_eq!(preview["price"]["cents"], 1350);
    assert_eq!(preview["price"]["display"], "$13.50");
    assert_eq!(preview["croppedImageUrl"], "https://cdn.example.com/crop.png");

    let preview = body_json(
        send(
            &app,
            get(&format!(
                "/api/configure/{id}?croppedImageUrl=https://cdn.example.com/fresh.png"
            )),
        )
        .await,
    )
    .await;
    assert_eq!(preview["croppedImageUrl"], "https://cdn.example.com/fresh.png");

    let mut order = contact();
    order["designId"] = json!(id);
    let response = send(&app, json_request(Method::POST, "/api/orders", &order)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let placed = body_json(response).await;
    assert_eq!(placed["existing"], false);
    assert_eq!(placed["price"]["display"], "$13.50");
    assert!(placed["message"].as_str().unwrap().contains("💰 *Total: $13.50*"));
    assert!(
        placed["whatsappUrl"]
            .as_str()
            .unwrap()
            .starts_with("https://wa.me/")
    );

    let order_id = placed["orderId"].as_str().unwrap();
    let response = send(&app, get(&format!("/api/orders/{order_id}"))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let preview = body_json(send(&app, get(&format!("/api/configure/{id}"))).await).await;
    assert_eq!(preview["status"], "ordered");

    let response = save_options(&app, &id).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_repeat_order_returns_existing() {
    let app = local_app().await;
    let id = upload_design(&app).await;
    save_options(&app, &id).await;

    let mut order = contact();
    order["configId"] = json!(id);

    let first = body_json(send(&app, json_request(Method::POST, "/api/orders", &order)).await).await;
    let response = send(&app, json_request(Method::POST, "/api/orders", &order)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let second = body_json(response).await;
    assert_eq!(second["existing"], true);
    assert_eq!(second["orderId"], first["orderId"]);
}

#[tokio::test]
async fn test_order_lists_missing_fields() {
    let app = local_app().await;
    let id = upload_design(&app).await;

    let mut order = contact();
    order["designId"] = json!(id);
    order["city"] = json!("  ");

    let response = send(&app, json_request(Method::POST, "/api/orders", &order)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["missing"], json!(["city"]));
    assert_eq!(body["error"], "Missing required fields");
}

#[tokio::test]
async fn test_order_for_unknown_design() {
    let app = local_app().await;

    let mut order = contact();
    order["designId"] = json!(uuid::Uuid::new_v4());

    let response = send(&app, json_request(Method::POST, "/api/orders", &order)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, get("/api/configure/not-a-design-id")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, get("/api/orders/not-an-order-id")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_without_proxy_headers() {
    let app = local_app().await;
    let id = upload_design(&app).await;
    save_options(&app, &id).await;

    let mut order = contact();
    order["designId"] = json!(id);
    let direct = Request::builder()
        .method(Method::POST)
        .uri("/api/orders")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(order.to_string()))
        .unwrap();

    let response = send(&app, direct).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_order_for_pending_design_conflicts() {
    let app = local_app().await;
    let id = upload_design(&app).await;

    let mut order = contact();
    order["designId"] = json!(id);
    let response = send(&app, json_request(Method::POST, "/api/orders", &order)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(
        &app,
        json_request(Method::POST, "/api/checkout", &json!({ "configId": id })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let preview = body_json(send(&app, get(&format!("/api/configure/{id}"))).await).await;
    assert_eq!(preview["status"], "pending");
}

#[tokio::test]
async fn test_checkout_returns_session_url() {
    let checkout = Arc::new(RecordingCheckout::default());
    let app = app_with(Services {
        checkout: checkout.clone(),
        ..Services::local(seeded_store().await)
    });
    let id = upload_design(&app).await;
    save_options(&app, &id).await;

    let response = send(
        &app,
        json_request(Method::POST, "/api/checkout", &json!({ "configId": id })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["url"], "https://checkout.stripe.com/c/pay/cs_test_1");

    let requests = checkout.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].unit_amount, 1350);
}

#[tokio::test]
async fn test_checkout_unavailable_without_provider() {
    let app = local_app().await;
    let id = upload_design(&app).await;
    save_options(&app, &id).await;

    let response = send(
        &app,
        json_request(Method::POST, "/api/checkout", &json!({ "configId": id })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_auth_status_and_login() {
    let app = local_app().await;

    let status = body_json(send(&app, get("/api/auth/status")).await).await;
    assert_eq!(status["authenticated"], true);
    assert_eq!(status["user"]["id"], "mock_user_001");
    assert_eq!(status["user"]["email"], "dev@example.com");

    let response = send(&app, get("/api/auth/login")).await;
    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[header::LOCATION], "/");
}

#[tokio::test]
async fn test_send_order_email() {
    let app = local_app().await;
    let mut body = contact();
    body["templateId"] = json!("luxury-gold");

    let response = send(
        &app,
        json_request(Method::POST, "/api/send-order-email", &body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = body_json(response).await;
    assert_eq!(response["success"], true);
    assert_eq!(response["orderDetails"]["templateId"], "luxury-gold");
    assert_eq!(response["orderDetails"]["email"], "nimal@example.com");

    let mut body = contact();
    body["postalCode"] = json!("");
    let response = send(
        &app,
        json_request(Method::POST, "/api/send-order-email", &body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["missing"], json!(["postalCode"]));
}

#[tokio::test]
async fn test_media_upload_and_retrieve() {
    let app = local_app().await;

    let response = send(&app, get("/api/media/upload?configId=temp_1&type=preview")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &app,
        multipart_request(
            "/api/media/upload",
            &[("configId", "temp_1"), ("type", "preview")],
            &[("file", "preview.png", png(8, 8))],
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let uploaded = body_json(response).await;
    assert_eq!(uploaded["public_id"], "caseCraft/temp_1/preview");

    let response = send(&app, get("/api/media/upload?configId=temp_1&type=preview")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, uploaded);

    let response = send(&app, get("/api/media/upload?configId=temp_1&type=thumbnail")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_design_create_validation() {
    let app = local_app().await;

    let response = send(
        &app,
        json_request(Method::POST, "/api/designs", &json!({ "email": "a@example.com" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["missing"],
        json!(["templateId", "imageUrl"])
    );

    let response = send(&app, get("/api/designs")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/designs",
            &json!({
                "email": "A@Example.com",
                "templateId": "geometric-hex",
                "imageUrl": "https://cdn.example.com/source.png",
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["design_name"], "My Case Design");

    let listed = body_json(send(&app, get("/api/designs?email=a@example.com")).await).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}
