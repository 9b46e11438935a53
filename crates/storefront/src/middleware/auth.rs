//! Authentication extractors.
//!
//! All extractors ask the configured [`IdentityProvider`] for the current
//! principal, so handlers behave the same under the mock and OAuth providers.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use casecraft_core::Principal;

use crate::error::{AppError, set_sentry_user};
use crate::services::identity::IdentityProvider;
use crate::state::AppState;

async fn resolve(parts: &mut Parts, state: &AppState) -> Result<Option<Principal>, AppError> {
    let session = Session::from_request_parts(parts, state)
        .await
        .map_err(|(_, msg)| AppError::Internal(msg.to_owned()))?;

    let principal = state.identity().current_user(&session).await?;
    if let Some(principal) = &principal {
        set_sentry_user(&principal.id, Some(principal.email.as_str()));
    }
    Ok(principal)
}

/// The signed-in principal. Rejects with `401` when nobody is signed in.
///
/// ```rust,ignore
/// async fn my_orders(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Orders for {}", user.email)
/// }
/// ```
pub struct RequireUser(pub Principal);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve(parts, state).await?.map(Self).ok_or_else(|| {
            AppError::Unauthorized("Please sign in to continue".to_owned())
        })
    }
}

/// A signed-in principal listed in `ADMIN_EMAILS`.
///
/// Rejects with `401` when nobody is signed in and `403` for anyone else.
pub struct RequireAdmin(pub Principal);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let RequireUser(principal) = RequireUser::from_request_parts(parts, state).await?;
        if !state.config().is_admin(principal.email.as_str()) {
            tracing::warn!(user_id = %principal.id, "Admin route refused");
            return Err(AppError::Forbidden("Admin access required".to_owned()));
        }
        Ok(Self(principal))
    }
}

/// The signed-in principal, if any.
pub struct CurrentUser(pub Option<Principal>);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve(parts, state).await.map(Self)
    }
}
