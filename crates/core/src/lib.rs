//! CaseCraft core: shared domain types for the storefront and CLI.
//!
//! Everything here is pure. No I/O, no database access, no HTTP clients.
//!
//! # Modules
//!
//! - [`types`] - IDs, prices, emails, case options and design status
//! - [`models`] - designs, orders, templates and principals
//! - [`pricing`] - the price schedule
//! - [`message`] - order summary and confirmation email text

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod message;
pub mod models;
pub mod pricing;
pub mod types;

pub use models::*;
pub use pricing::PriceSchedule;
pub use types::*;
