//! Core types for CaseCraft.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod options;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use options::{CaseColor, CaseFinish, CaseMaterial, CaseOption, Choice, PhoneModel};
pub use price::{CurrencyCode, Price};
pub use status::DesignStatus;
