//! Identity route handlers.
//!
//! `GET /api/auth/{action}` dispatches to the configured identity provider:
//! - `login` / `register`: redirect to the provider (or home, for the mock)
//! - `callback`: finish the OAuth flow and redirect home
//! - `logout`: clear the session and redirect
//!
//! Any other action reports the current session as JSON.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::services::identity::CallbackQuery;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

/// `GET /api/auth/{action}`
#[instrument(skip(state, session, query))]
pub async fn handle(
    State(state): State<AppState>,
    Path(action): Path<String>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    let identity = state.identity();

    let location = match action.as_str() {
        "login" => identity.login(&session).await?,
        "register" => identity.register(&session).await?,
        "logout" => {
            let location = identity.logout(&session).await?;
            clear_sentry_user();
            location
        }
        "callback" => match identity.callback(&session, query).await {
            Ok(location) => location,
            Err(e) => {
                tracing::warn!(error = %e, "OAuth callback failed");
                return Ok(Redirect::to(&format!("/?auth_error={}", e.code())).into_response());
            }
        },
        _ => {
            let user = identity.current_user(&session).await?;
            if let Some(user) = &user {
                set_sentry_user(&user.id, Some(user.email.as_str()));
            }
            return Ok(Json(AuthStatus {
                authenticated: user.is_some(),
                user: user.map(|u| SessionUser {
                    id: u.id,
                    email: u.email.as_str().to_owned(),
                }),
            })
            .into_response());
        }
    };

    Ok(Redirect::to(&location).into_response())
}
