//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures remote failures to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`. Responses are JSON: `{"error": "..."}`, plus a
//! `missing` field list for validation failures.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use casecraft_core::ValidationError;

use crate::db::RepositoryError;
use crate::services::checkout::CheckoutError;
use crate::services::email::EmailError;
use crate::services::identity::IdentityError;
use crate::services::media::MediaError;
use crate::services::orders::OrderError;
use crate::services::uploads::UploadError;

/// Message returned for every remote failure.
const RETRY_NOTICE: &str = "Something went wrong on our side. Please try again.";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Required fields are blank.
    #[error("Missing required fields: {}", .missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Signed in, but not allowed to do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Request conflicts with current state (e.g. editing an ordered design).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Media storage failed.
    #[error("Media error: {0}")]
    Media(MediaError),

    /// Checkout provider failed.
    #[error("Checkout error: {0}")]
    Checkout(CheckoutError),

    /// Email delivery failed.
    #[error("Email error: {0}")]
    Email(EmailError),

    /// Identity provider or session failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing: Option<&'a [&'static str]>,
}

impl AppError {
    /// Whether this error came from a remote dependency.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Media(_) | Self::Checkout(_) | Self::Email(_) | Self::Internal(_)
        ) || matches!(self, Self::Identity(IdentityError::Http(_)))
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Checkout(CheckoutError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Media(_) | Self::Checkout(_) | Self::Email(_) => StatusCode::BAD_GATEWAY,
            Self::Identity(err) => match err {
                IdentityError::Http(_) => StatusCode::BAD_GATEWAY,
                IdentityError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
                IdentityError::OAuth(_)
                | IdentityError::InvalidState
                | IdentityError::InvalidProfile(_) => StatusCode::UNAUTHORIZED,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture remote failures to Sentry
        if self.is_remote() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Checkout(CheckoutError::NotConfigured) => "Checkout is not available".to_owned(),
            _ if self.is_remote() => RETRY_NOTICE.to_owned(),
            Self::Validation { .. } => "Missing required fields".to_owned(),
            Self::Identity(IdentityError::Session(_)) => "Session error".to_owned(),
            Self::Identity(_) => "Sign-in failed, please try again".to_owned(),
            Self::BadRequest(msg)
            | Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::Conflict(msg) => msg.clone(),
            _ => self.to_string(),
        };

        let missing = match &self {
            Self::Validation { missing } => Some(missing.as_slice()),
            _ => None,
        };

        (
            status,
            Json(ErrorBody {
                error: &message,
                missing,
            }),
        )
            .into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation {
            missing: err.missing,
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("Not found".to_owned()),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Database(other),
        }
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Invalid(msg) => Self::BadRequest(msg),
            other => Self::Media(other),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        Self::Checkout(err)
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::InvalidAddress(addr) => {
                Self::BadRequest(format!("Invalid email address: {addr}"))
            }
            other => Self::Email(other),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Media(err) => err.into(),
            UploadError::Database(err) => err.into(),
            UploadError::Empty
            | UploadError::TooLarge { .. }
            | UploadError::UnsupportedImage(_)
            | UploadError::InvalidDimensions(_) => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation(err) => err.into(),
            OrderError::DesignNotFound(_) => Self::NotFound("No such configuration found".to_owned()),
            OrderError::NotConfigured(_) => {
                Self::Conflict("Finish configuring the case before ordering".to_owned())
            }
            OrderError::Database(err) => err.into(),
            OrderError::Checkout(err) => err.into(),
            OrderError::Snapshot(err) => Self::Internal(err.to_string()),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a customer action.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("order", "Order placed", Some(&[("design_id", "…")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("design-123".to_string());
        assert_eq!(err.to_string(), "Not found: design-123");

        let err = AppError::Validation {
            missing: vec!["city", "phone"],
        };
        assert_eq!(err.to_string(), "Missing required fields: city, phone");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            AppError::Checkout(CheckoutError::NotConfigured).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Media(MediaError::Api {
                status: 500,
                message: "boom".into()
            })
            .status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_repository_errors_map_by_kind() {
        assert!(matches!(
            AppError::from(RepositoryError::NotFound),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(RepositoryError::Conflict("dup".into())),
            AppError::Conflict(_)
        ));
        assert!(AppError::from(RepositoryError::DataCorruption("bad".into())).is_remote());
    }

    #[tokio::test]
    async fn test_validation_body_lists_fields() {
        let (status, body) = body_json(AppError::Validation {
            missing: vec!["city"],
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["missing"], serde_json::json!(["city"]));
    }

    #[tokio::test]
    async fn test_remote_error_hides_details() {
        let (status, body) = body_json(AppError::Database(RepositoryError::DataCorruption(
            "secret detail".into(),
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], RETRY_NOTICE);
        assert!(body.get("missing").is_none());
    }
}
