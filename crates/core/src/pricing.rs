//! Case pricing.
//!
//! The price of a case is a base price plus independent surcharges for the
//! textured finish and the polycarbonate material. Nothing else about a design
//! affects it, and it is never stored on the design: callers recompute it from
//! the saved options whenever they need it.

use serde::{Deserialize, Serialize};

use crate::models::Design;
use crate::types::{CaseFinish, CaseMaterial, Choice, CurrencyCode, Price};

/// Base price and surcharges, in minor units.
///
/// ```
/// use casecraft_core::pricing::PriceSchedule;
/// use casecraft_core::{CaseFinish, CaseMaterial};
///
/// let schedule = PriceSchedule::default();
/// let price = schedule.quote(
///     Some(&CaseMaterial::Polycarbonate.into()),
///     Some(&CaseFinish::Textured.into()),
/// );
/// assert_eq!(price.cents, 1350);
/// assert_eq!(price.display(), "$13.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSchedule {
    pub base_cents: i64,
    pub textured_cents: i64,
    pub polycarbonate_cents: i64,
    pub currency: CurrencyCode,
}

impl PriceSchedule {
    pub const DEFAULT_BASE_CENTS: i64 = 1000;
    pub const DEFAULT_TEXTURED_CENTS: i64 = 150;
    pub const DEFAULT_POLYCARBONATE_CENTS: i64 = 200;

    /// Price for a material/finish pair.
    ///
    /// Missing or unrecognized values add nothing.
    #[must_use]
    pub fn quote(
        &self,
        material: Option<&Choice<CaseMaterial>>,
        finish: Option<&Choice<CaseFinish>>,
    ) -> Price {
        let mut price = Price::from_cents(self.base_cents, self.currency);
        if finish.is_some_and(|f| f.is(CaseFinish::Textured)) {
            price = price.plus_cents(self.textured_cents);
        }
        if material.is_some_and(|m| m.is(CaseMaterial::Polycarbonate)) {
            price = price.plus_cents(self.polycarbonate_cents);
        }
        price
    }

    /// Highest price this schedule can quote, or `None` if base plus both
    /// surcharges does not fit in `i64` cents.
    #[must_use]
    pub fn max_cents(&self) -> Option<i64> {
        self.base_cents
            .checked_add(self.textured_cents)?
            .checked_add(self.polycarbonate_cents)
    }

    /// Price for a saved design.
    #[must_use]
    pub fn quote_design(&self, design: &Design) -> Price {
        self.quote(design.case_material.as_ref(), design.case_finish.as_ref())
    }
}

impl Default for PriceSchedule {
    fn default() -> Self {
        Self {
            base_cents: Self::DEFAULT_BASE_CENTS,
            textured_cents: Self::DEFAULT_TEXTURED_CENTS,
            polycarbonate_cents: Self::DEFAULT_POLYCARBONATE_CENTS,
            currency: CurrencyCode::USD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::design::fixtures::configured_design;
    use crate::types::{CaseColor, PhoneModel};

    fn quote(material: CaseMaterial, finish: CaseFinish) -> Price {
        PriceSchedule::default().quote(Some(&material.into()), Some(&finish.into()))
    }

    #[test]
    fn test_surcharges_are_additive() {
        assert_eq!(quote(CaseMaterial::Silicone, CaseFinish::Smooth).cents, 1000);
        assert_eq!(quote(CaseMaterial::Silicone, CaseFinish::Textured).cents, 1150);
        assert_eq!(quote(CaseMaterial::Polycarbonate, CaseFinish::Smooth).cents, 1200);
        assert_eq!(quote(CaseMaterial::Polycarbonate, CaseFinish::Textured).cents, 1350);
    }

    #[test]
    fn test_huge_surcharges_saturate() {
        let schedule = PriceSchedule {
            base_cents: i64::MAX - 100,
            textured_cents: 150,
            polycarbonate_cents: 200,
            ..PriceSchedule::default()
        };
        assert_eq!(schedule.max_cents(), None);
        let price = schedule.quote(
            Some(&CaseMaterial::Polycarbonate.into()),
            Some(&CaseFinish::Textured.into()),
        );
        assert_eq!(price.cents, i64::MAX);
        assert_eq!(PriceSchedule::default().max_cents(), Some(1350));
    }

    #[test]
    fn test_full_surcharge_display() {
        let price = quote(CaseMaterial::Polycarbonate, CaseFinish::Textured);
        assert_eq!(price.display(), "$13.50");
    }

    #[test]
    fn test_unknown_and_missing_add_nothing() {
        let schedule = PriceSchedule::default();
        assert_eq!(schedule.quote(None, None).cents, 1000);
        assert_eq!(
            schedule
                .quote(
                    Some(&Choice::parse("leather")),
                    Some(&Choice::parse("matte"))
                )
                .cents,
            1000
        );
    }

    #[test]
    fn test_other_options_do_not_affect_price() {
        let mut design = configured_design();
        let schedule = PriceSchedule::default();
        let before = schedule.quote_design(&design);

        design.phone_model = Some(PhoneModel::IphoneX.into());
        design.case_color = Some(CaseColor::Black.into());
        design.cropped_image_url = None;
        assert_eq!(schedule.quote_design(&design), before);
    }

    #[test]
    fn test_custom_schedule() {
        let schedule = PriceSchedule {
            base_cents: 2500,
            textured_cents: 0,
            polycarbonate_cents: 500,
            currency: CurrencyCode::EUR,
        };
        let price = schedule.quote(
            Some(&CaseMaterial::Polycarbonate.into()),
            Some(&CaseFinish::Textured.into()),
        );
        assert_eq!(price.cents, 3000);
        assert_eq!(price.currency_code, CurrencyCode::EUR);
    }
}
