//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions, `PostgreSQL` or memory store)
//! 5. Rate limiting on order and upload routes (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{CurrentUser, RequireAdmin, RequireUser};
pub use rate_limit::{order_rate_limiter, upload_rate_limiter};
pub use request_id::{RequestId, request_id_middleware};
pub use session::create_session_layer;
