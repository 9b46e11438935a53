//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Server
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (fallback `DATABASE_URL`).
//!   When neither is set the storefront runs on the in-memory store.
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL used for checkout return links
//!   (default: `http://localhost:3000`)
//!
//! ## Pricing
//! - `PRICE_BASE_CENTS` (default: 1000)
//! - `PRICE_TEXTURED_CENTS` (default: 150)
//! - `PRICE_POLYCARBONATE_CENTS` (default: 200)
//! - `PRICE_CURRENCY` (default: USD)
//!
//! ## Media storage (all three or none)
//! - `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET`
//! - `CLOUDINARY_ROOT_FOLDER` (default: caseCraft)
//!
//! ## Checkout
//! - `STRIPE_SECRET_KEY` - Enables hosted checkout
//! - `STRIPE_ALLOWED_COUNTRIES` - Comma-separated shipping countries (default: DE,US)
//!
//! ## Identity
//! - `AUTH_PROVIDER` - `mock` (default) or `kinde`
//! - `KINDE_ISSUER_URL`, `KINDE_CLIENT_ID`, `KINDE_CLIENT_SECRET` - required for `kinde`
//! - `ADMIN_EMAILS` - Comma-separated emails allowed on admin routes. Empty means
//!   nobody, except under `mock` where the mock user is the admin.
//!
//! ## Handoff
//! - `WHATSAPP_NUMBER` - Shop number in international format (default: 94755354830)
//! - `SMTP_HOST`, `SMTP_PORT` (587), `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM`
//!
//! ## Observability
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`
//! - `SENTRY_SAMPLE_RATE` (default: 1.0), `SENTRY_TRACES_SAMPLE_RATE` (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

use casecraft_core::{CurrencyCode, PriceSchedule};

use crate::services::identity::MOCK_USER_EMAIL;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default WhatsApp number orders are handed off to.
pub const DEFAULT_WHATSAPP_NUMBER: &str = "94755354830";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` connection URL. `None` selects the in-memory store.
    pub database_url: Option<SecretString>,
    pub host: IpAddr,
    pub port: u16,
    /// Public base URL, without trailing slash
    pub base_url: String,
    pub pricing: PriceSchedule,
    pub media: Option<CloudinaryConfig>,
    pub checkout: Option<StripeConfig>,
    pub auth: AuthConfig,
    /// Lowercased emails allowed on the template and design admin routes
    pub admin_emails: Vec<String>,
    pub whatsapp_number: String,
    pub email: Option<EmailConfig>,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_url", &self.base_url)
            .field("pricing", &self.pricing)
            .field("media", &self.media)
            .field("checkout", &self.checkout)
            .field("auth", &self.auth)
            .field("admin_emails", &self.admin_emails)
            .field("whatsapp_number", &self.whatsapp_number)
            .field("email", &self.email)
            .field("sentry_environment", &self.sentry_environment)
            .finish_non_exhaustive()
    }
}

/// Cloudinary credentials.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: SecretString,
    /// Folder every asset is stored under
    pub root_folder: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("root_folder", &self.root_folder)
            .finish()
    }
}

/// Stripe checkout settings.
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: SecretString,
    /// ISO country codes accepted for shipping
    pub allowed_countries: Vec<String>,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("allowed_countries", &self.allowed_countries)
            .finish()
    }
}

/// Identity provider selection.
#[derive(Clone)]
pub enum AuthConfig {
    /// Fixed development user.
    Mock,
    /// Kinde OAuth 2.0 authorization code flow.
    Kinde {
        /// Issuer base URL, e.g. `https://casecraft.kinde.com`
        issuer: String,
        client_id: String,
        client_secret: SecretString,
    },
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mock => f.write_str("Mock"),
            Self::Kinde {
                issuer, client_id, ..
            } => f
                .debug_struct("Kinde")
                .field("issuer", issuer)
                .field("client_id", client_id)
                .field("client_secret", &"[REDACTED]")
                .finish(),
        }
    }
}

/// SMTP relay for confirmation emails.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub from: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("from", &self.from)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed, a provider is only
    /// partially configured, or a secret fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = get_env_or_default("STOREFRONT_BASE_URL", "http://localhost:3000")
            .trim_end_matches('/')
            .to_owned();
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_owned(), e.to_string())
        })?;

        let auth = AuthConfig::from_env()?;
        let admin_emails = admin_allowlist(&auth, &get_env_or_default("ADMIN_EMAILS", ""));

        Ok(Self {
            database_url: get_database_url("STOREFRONT_DATABASE_URL"),
            host: parse_env_or_default("STOREFRONT_HOST", "127.0.0.1")?,
            port: parse_env_or_default("STOREFRONT_PORT", "3000")?,
            base_url,
            pricing: pricing_from_env()?,
            media: CloudinaryConfig::from_env()?,
            checkout: StripeConfig::from_env()?,
            auth,
            admin_emails,
            whatsapp_number: whatsapp_number(&get_env_or_default(
                "WHATSAPP_NUMBER",
                DEFAULT_WHATSAPP_NUMBER,
            ))?,
            email: EmailConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Configuration for tests and local runs: in-memory store, mock
    /// identity, no remote providers.
    #[must_use]
    pub fn local(base_url: &str) -> Self {
        Self {
            database_url: None,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: base_url.trim_end_matches('/').to_owned(),
            pricing: PriceSchedule::default(),
            media: None,
            checkout: None,
            auth: AuthConfig::Mock,
            admin_emails: vec![MOCK_USER_EMAIL.to_owned()],
            whatsapp_number: DEFAULT_WHATSAPP_NUMBER.to_owned(),
            email: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Whether `email` may use the admin routes.
    #[must_use]
    pub fn is_admin(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|admin| *admin == email)
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn pricing_from_env() -> Result<PriceSchedule, ConfigError> {
    let currency_raw = get_env_or_default("PRICE_CURRENCY", "USD");
    let currency = CurrencyCode::parse(&currency_raw).ok_or_else(|| {
        ConfigError::InvalidEnvVar(
            "PRICE_CURRENCY".to_owned(),
            format!("unsupported currency {currency_raw}"),
        )
    })?;

    let schedule = PriceSchedule {
        base_cents: parse_env_or_default(
            "PRICE_BASE_CENTS",
            &PriceSchedule::DEFAULT_BASE_CENTS.to_string(),
        )?,
        textured_cents: parse_env_or_default(
            "PRICE_TEXTURED_CENTS",
            &PriceSchedule::DEFAULT_TEXTURED_CENTS.to_string(),
        )?,
        polycarbonate_cents: parse_env_or_default(
            "PRICE_POLYCARBONATE_CENTS",
            &PriceSchedule::DEFAULT_POLYCARBONATE_CENTS.to_string(),
        )?,
        currency,
    };

    validate_schedule(&schedule)?;
    Ok(schedule)
}

/// Reject negative amounts and schedules whose full price overflows.
fn validate_schedule(schedule: &PriceSchedule) -> Result<(), ConfigError> {
    for (key, value) in [
        ("PRICE_BASE_CENTS", schedule.base_cents),
        ("PRICE_TEXTURED_CENTS", schedule.textured_cents),
        ("PRICE_POLYCARBONATE_CENTS", schedule.polycarbonate_cents),
    ] {
        if value < 0 {
            return Err(ConfigError::InvalidEnvVar(
                key.to_owned(),
                "must not be negative".to_owned(),
            ));
        }
    }

    if schedule.max_cents().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            "PRICE_BASE_CENTS".to_owned(),
            "base price plus surcharges overflows".to_owned(),
        ));
    }
    Ok(())
}

impl CloudinaryConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(cloud_name) = get_optional_env("CLOUDINARY_CLOUD_NAME") else {
            return Ok(None);
        };
        Ok(Some(Self {
            cloud_name,
            api_key: get_required_env("CLOUDINARY_API_KEY")?,
            api_secret: get_validated_secret("CLOUDINARY_API_SECRET")?,
            root_folder: get_env_or_default("CLOUDINARY_ROOT_FOLDER", "caseCraft"),
        }))
    }
}

impl StripeConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        if get_optional_env("STRIPE_SECRET_KEY").is_none() {
            return Ok(None);
        }
        Ok(Some(Self {
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
            allowed_countries: parse_country_list(&get_env_or_default(
                "STRIPE_ALLOWED_COUNTRIES",
                "DE,US",
            )),
        }))
    }
}

impl AuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        match get_env_or_default("AUTH_PROVIDER", "mock")
            .to_ascii_lowercase()
            .as_str()
        {
            "mock" => Ok(Self::Mock),
            "kinde" => Ok(Self::Kinde {
                issuer: get_required_env("KINDE_ISSUER_URL")?
                    .trim_end_matches('/')
                    .to_owned(),
                client_id: get_required_env("KINDE_CLIENT_ID")?,
                client_secret: get_validated_secret("KINDE_CLIENT_SECRET")?,
            }),
            other => Err(ConfigError::InvalidEnvVar(
                "AUTH_PROVIDER".to_owned(),
                format!("expected mock or kinde, got {other}"),
            )),
        }
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };
        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_env_or_default("SMTP_PORT", "587")?,
            username: get_optional_env("SMTP_USERNAME"),
            password: get_optional_env("SMTP_PASSWORD").map(SecretString::from),
            from: get_required_env("EMAIL_FROM")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    get_optional_env(primary_key)
        .or_else(|| get_optional_env("DATABASE_URL"))
        .map(SecretString::from)
}

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_country_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|c| c.trim().to_ascii_uppercase())
        .filter(|c| !c.is_empty())
        .collect()
}

fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Admins from `ADMIN_EMAILS`. The mock identity's user is an admin when the
/// list is empty so local runs can reach the admin routes.
fn admin_allowlist(auth: &AuthConfig, raw: &str) -> Vec<String> {
    let emails = parse_email_list(raw);
    if emails.is_empty() && matches!(auth, AuthConfig::Mock) {
        return vec![MOCK_USER_EMAIL.to_owned()];
    }
    emails
}

/// Digits only; `wa.me` rejects `+`, spaces and dashes.
fn whatsapp_number(raw: &str) -> Result<String, ConfigError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 7 {
        return Err(ConfigError::InvalidEnvVar(
            "WHATSAPP_NUMBER".to_owned(),
            format!("{raw:?} is not a phone number"),
        ));
    }
    Ok(digits)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_stripe_style_key() {
        let result = validate_secret_strength("sk_test_51Hx9QkLm3Zr7TpWv2Yb8NcDf", "STRIPE_SECRET_KEY");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_schedule_bounds() {
        assert!(validate_schedule(&PriceSchedule::default()).is_ok());

        let negative = PriceSchedule {
            textured_cents: -1,
            ..PriceSchedule::default()
        };
        assert!(matches!(
            validate_schedule(&negative),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "PRICE_TEXTURED_CENTS"
        ));

        let overflowing = PriceSchedule {
            base_cents: i64::MAX,
            ..PriceSchedule::default()
        };
        assert!(matches!(
            validate_schedule(&overflowing),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "PRICE_BASE_CENTS"
        ));
    }

    #[test]
    fn test_admin_emails() {
        assert_eq!(
            parse_email_list(" Ops@CaseCraft.example , ,dev@example.com"),
            vec!["ops@casecraft.example", "dev@example.com"]
        );

        let config = StorefrontConfig {
            admin_emails: parse_email_list("ops@casecraft.example"),
            ..StorefrontConfig::local("http://localhost:3000")
        };
        assert!(config.is_admin("OPS@casecraft.example"));
        assert!(!config.is_admin(MOCK_USER_EMAIL));
        assert!(StorefrontConfig::local("http://localhost:3000").is_admin(MOCK_USER_EMAIL));

        assert_eq!(admin_allowlist(&AuthConfig::Mock, ""), vec![MOCK_USER_EMAIL]);
        assert_eq!(
            admin_allowlist(&AuthConfig::Mock, "ops@casecraft.example"),
            vec!["ops@casecraft.example"]
        );
    }

    #[test]
    fn test_parse_country_list() {
        assert_eq!(parse_country_list("de, us,,"), vec!["DE", "US"]);
        assert!(parse_country_list("").is_empty());
    }

    #[test]
    fn test_whatsapp_number_strips_formatting() {
        assert_eq!(whatsapp_number("+94 75-535 4830").unwrap(), "94755354830");
        assert!(whatsapp_number("call me").is_err());
    }

    #[test]
    fn test_local_config() {
        let config = StorefrontConfig::local("http://localhost:3000/");
        assert_eq!(config.base_url, "http://localhost:3000");
        assert!(config.database_url.is_none());
        assert_eq!(config.pricing, PriceSchedule::default());

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = StorefrontConfig::local("http://localhost:3000");
        config.database_url = Some(SecretString::from("postgres://user:hunter2@db/casecraft"));
        config.media = Some(CloudinaryConfig {
            cloud_name: "demo".to_owned(),
            api_key: "1234".to_owned(),
            api_secret: SecretString::from("cloudinary_secret_value"),
            root_folder: "caseCraft".to_owned(),
        });
        config.auth = AuthConfig::Kinde {
            issuer: "https://casecraft.kinde.com".to_owned(),
            client_id: "client_id_value".to_owned(),
            client_secret: SecretString::from("kinde_secret_value"),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("client_id_value"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2"));
        assert!(!debug_output.contains("cloudinary_secret_value"));
        assert!(!debug_output.contains("kinde_secret_value"));
    }
}
