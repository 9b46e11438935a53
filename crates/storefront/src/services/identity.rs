//! Identity providers.
//!
//! The provider is chosen once at startup. [`MockIdentity`] reports a fixed
//! development user; [`OAuthIdentity`] runs the OAuth 2.0 authorization code
//! flow against a Kinde-compatible issuer and keeps the signed-in principal in
//! the session.

use async_trait::async_trait;
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tower_sessions::Session;

use casecraft_core::{Email, Principal};

/// Session keys for authentication data.
pub mod session_keys {
    /// Signed-in principal.
    pub const PRINCIPAL: &str = "principal";

    /// OAuth state (CSRF protection).
    pub const OAUTH_STATE: &str = "oauth_state";
}

/// Fixed user reported by [`MockIdentity`].
pub const MOCK_USER_ID: &str = "mock_user_001";
pub const MOCK_USER_EMAIL: &str = "dev@example.com";

/// Errors from the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Session store failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Provider rejected the exchange or denied authorization.
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// Callback state did not match the one issued at login.
    #[error("OAuth state mismatch")]
    InvalidState,

    /// Profile lacked a usable email.
    #[error("invalid user profile: {0}")]
    InvalidProfile(String),
}

impl IdentityError {
    /// Short code appended to the error redirect.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "provider_unreachable",
            Self::Session(_) => "session",
            Self::OAuth(_) => "denied",
            Self::InvalidState => "invalid_state",
            Self::InvalidProfile(_) => "invalid_profile",
        }
    }
}

/// Query parameters of the OAuth callback.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Authentication backend. Every action returns the URL to redirect to.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self, session: &Session) -> Result<Option<Principal>, IdentityError>;

    async fn login(&self, session: &Session) -> Result<String, IdentityError>;

    async fn register(&self, session: &Session) -> Result<String, IdentityError>;

    async fn callback(
        &self,
        session: &Session,
        query: CallbackQuery,
    ) -> Result<String, IdentityError>;

    async fn logout(&self, session: &Session) -> Result<String, IdentityError>;
}

// =============================================================================
// Mock
// =============================================================================

/// Development provider: always signed in as the mock user.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockIdentity;

impl MockIdentity {
    /// The fixed development principal.
    ///
    /// # Errors
    ///
    /// Never in practice; the mock email is a constant valid address.
    pub fn principal() -> Result<Principal, IdentityError> {
        Ok(Principal {
            id: MOCK_USER_ID.to_owned(),
            email: Email::parse(MOCK_USER_EMAIL)
                .map_err(|e| IdentityError::InvalidProfile(e.to_string()))?,
            name: None,
        })
    }
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    async fn current_user(&self, _session: &Session) -> Result<Option<Principal>, IdentityError> {
        Self::principal().map(Some)
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

    async fn logout(&self, session: &Session) -> Result<String, IdentityError> {
        session.flush().await?;
        Ok("/".to_owned())
    }
}

// =============================================================================
// OAuth (Kinde)
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserProfile {
    id: Option<String>,
    sub: Option<String>,
    email: Option<String>,
    preferred_email: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
}

impl UserProfile {
    fn into_principal(self) -> Result<Principal, IdentityError> {
        let id = self
            .id
            .or(self.sub)
            .ok_or_else(|| IdentityError::InvalidProfile("profile has no subject".to_owned()))?;
        let raw_email = self
            .email
            .or(self.preferred_email)
            .ok_or_else(|| IdentityError::InvalidProfile(format!("user {id} has no email")))?;
        let email =
            Email::parse(&raw_email).map_err(|e| IdentityError::InvalidProfile(e.to_string()))?;

        let name = [self.given_name, self.family_name]
            .into_iter()
            .flatten()
            .map(|part| part.trim().to_owned())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Principal {
            id,
            email,
            name: (!name.is_empty()).then_some(name),
        })
    }
}

/// OAuth 2.0 authorization code flow against a Kinde issuer.
#[derive(Clone)]
pub struct OAuthIdentity {
    client: reqwest::Client,
    issuer: String,
    client_id: String,
    client_secret: SecretString,
    base_url: String,
}

impl OAuthIdentity {
    /// Create a provider for `issuer`, redirecting back to `base_url`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(
        issuer: &str,
        client_id: &str,
        client_secret: SecretString,
        base_url: &str,
    ) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            issuer: issuer.trim_end_matches('/').to_owned(),
            client_id: client_id.to_owned(),
            client_secret,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn redirect_uri(&self) -> String {
        format!("{}/api/auth/callback", self.base_url)
    }

    /// Authorization URL for `state`; `prompt=create` opens the sign-up screen.
    fn authorization_url(&self, state: &str, prompt: Option<&str>) -> String {
        let mut url = format!(
            "{}/oauth2/auth?\
            client_id={}&\
            response_type=code&\
            redirect_uri={}&\
            scope=openid%20profile%20email&\
            state={}",
            self.issuer,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri()),
            urlencoding::encode(state),
        );
        if let Some(prompt) = prompt {
            url.push_str("&prompt=");
            url.push_str(&urlencoding::encode(prompt));
        }
        url
    }

    async fn start(&self, session: &Session, prompt: Option<&str>) -> Result<String, IdentityError> {
        let state = generate_random_string(32);
        session.insert(session_keys::OAUTH_STATE, &state).await?;
        Ok(self.authorization_url(&state, prompt))
    }

    async fn exchange_code(&self, code: &str) -> Result<String, IdentityError> {
        let redirect_uri = self.redirect_uri();
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
        ];

        let response = self
            .client
            .post(format!("{}/oauth2/token", self.issuer))
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IdentityError::OAuth(format!("Token exchange failed: {text}")));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<Principal, IdentityError> {
        let response = self
            .client
            .get(format!("{}/oauth2/v2/user_profile", self.issuer))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IdentityError::OAuth(format!("Profile request failed: {text}")));
        }

        response.json::<UserProfile>().await?.into_principal()
    }
}

#[async_trait]
impl IdentityProvider for OAuthIdentity {
    async fn current_user(&self, session: &Session) -> Result<Option<Principal>, IdentityError> {
        Ok(session.get(session_keys::PRINCIPAL).await?)
    }

    async fn login(&self, session: &Session) -> Result<String, IdentityError> {
        self.start(session, None).await
    }

    async fn register(&self, session: &Session) -> Result<String, IdentityError> {
        self.start(session, Some("create")).await
    }

    #[tracing::instrument(skip(self, session, query))]
    async fn callback(
        &self,
        session: &Session,
        query: CallbackQuery,
    ) -> Result<String, IdentityError> {
        if let Some(error) = query.error {
            let description = query.error_description.unwrap_or_default();
            return Err(IdentityError::OAuth(format!("{error}: {description}")));
        }

        let stored: Option<String> = session.remove(session_keys::OAUTH_STATE).await?;
        if stored.is_none() || stored != query.state {
            return Err(IdentityError::InvalidState);
        }

        let code = query
            .code
            .ok_or_else(|| IdentityError::OAuth("callback missing code".to_owned()))?;

        let access_token = self.exchange_code(&code).await?;
        let principal = self.fetch_profile(&access_token).await?;

        session.cycle_id().await?;
        session.insert(session_keys::PRINCIPAL, &principal).await?;
        tracing::info!(user_id = %principal.id, "User authenticated");

        Ok("/".to_owned())
    }

    async fn logout(&self, session: &Session) -> Result<String, IdentityError> {
        session.flush().await?;
        Ok(format!(
            "{}/logout?redirect={}",
            self.issuer,
            urlencoding::encode(&format!("{}/", self.base_url))
        ))
    }
}

/// Generate a cryptographically secure random string.
fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..length)
        .filter_map(|_| CHARSET.get(rng.random_range(0..CHARSET.len())))
        .map(|&b| char::from(b))
        .collect()
}
