//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `checkout` - Hosted checkout sessions (Stripe)
//! - `email` - Order confirmation email (SMTP, or logged when unconfigured)
//! - `handoff` - WhatsApp deep links for the messaging order flow
//! - `identity` - Sign-in via the hosted identity provider, or a mock user
//! - `media` - Image storage (Cloudinary, or in-process for development)
//! - `orders` - Pricing, order placement and checkout handoff
//! - `templates` - Cached template catalog and admin writes
//! - `uploads` - Source image validation and pending design creation

pub mod checkout;
pub mod email;
pub mod handoff;
pub mod identity;
pub mod media;
pub mod orders;
pub mod templates;
pub mod uploads;
