//! Prices in minor currency units.
//!
//! All arithmetic happens on integer cents. Conversion to major units uses
//! `rust_decimal` so snapshots never carry binary floating point noise.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An amount of money in the currency's minor unit (cents for USD).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the smallest currency unit.
    pub cents: i64,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a price from minor units.
    #[must_use]
    pub const fn from_cents(cents: i64, currency_code: CurrencyCode) -> Self {
        Self {
            cents,
            currency_code,
        }
    }

    /// Amount in major units (`1350` cents becomes `13.50`).
    #[must_use]
    pub fn major_units(&self) -> Decimal {
        Decimal::new(self.cents, 2)
    }

    /// Add a surcharge in the same currency, saturating at the `i64` bounds.
    #[must_use]
    pub const fn plus_cents(self, cents: i64) -> Self {
        Self {
            cents: self.cents.saturating_add(cents),
            currency_code: self.currency_code,
        }
    }

    /// Format for display with en-US grouping (e.g. `$13.50`, `$1,234.00`).
    #[must_use]
    pub fn display(&self) -> String {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        format!(
            "{sign}{}{}.{:02}",
            self.currency_code.symbol(),
            group_thousands(abs / 100),
            abs % 100
        )
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Upper-case ISO code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }

    /// Parse an ISO code in any case.
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "USD" => Some(Self::USD),
            "EUR" => Some(Self::EUR),
            "GBP" => Some(Self::GBP),
            "CAD" => Some(Self::CAD),
            "AUD" => Some(Self::AUD),
            _ => None,
        }
    }
}
