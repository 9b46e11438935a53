//! Physical case options (model, color, material, finish).
//!
//! Options are stored as their raw string values. Reading them back goes through
//! [`Choice`], which keeps values this build does not know about instead of
//! rejecting the row, so older binaries can still read and label designs
//! written after a new option was introduced.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A closed set of case options with stored values and display labels.
pub trait CaseOption: Sized + Copy + PartialEq + 'static {
    /// Every known option, in display order.
    const ALL: &'static [Self];

    /// Value persisted in the database and sent over the wire.
    fn value(self) -> &'static str;

    /// Human-readable label.
    fn label(self) -> &'static str;

    /// Look an option up by its stored value.
    #[must_use]
    fn from_value(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|o| o.value() == value)
    }
}

macro_rules! case_option {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => ($value:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl CaseOption for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn value(self) -> &'static str {
                match self {
                    $(Self::$variant => $value),+
                }
            }

            fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }
    };
}

case_option! {
    /// Supported phone models.
    PhoneModel {
        IphoneX => ("iphonex", "iPhone X"),
        Iphone11 => ("iphone11", "iPhone 11"),
        Iphone12 => ("iphone12", "iPhone 12"),
        Iphone13 => ("iphone13", "iPhone 13"),
        Iphone14 => ("iphone14", "iPhone 14"),
        Iphone15 => ("iphone15", "iPhone 15"),
    }
}

case_option! {
    /// Case color palette.
    CaseColor {
        Black => ("black", "Black"),
        Blue => ("blue", "Blue"),
        Rose => ("rose", "Rose"),
        Obsidian => ("obsidian", "Obsidian"),
        Copper => ("copper", "Copper"),
    }
}

case_option! {
    /// Case material.
    CaseMaterial {
        Silicone => ("silicone", "Silicone"),
        Polycarbonate => ("polycarbonate", "Soft Polycarbonate"),
    }
}

case_option! {
    /// Case surface finish.
    CaseFinish {
        Smooth => ("smooth", "Smooth Finish"),
        Textured => ("textured", "Textured Finish"),
    }
}

/// A stored option value: either one this build knows, or the raw string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Choice<T> {
    Known(T),
    Unrecognized(String),
}

impl<T: CaseOption> Choice<T> {
    /// Parse a stored value. Never fails.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        T::from_value(raw).map_or_else(|| Self::Unrecognized(raw.to_owned()), Self::Known)
    }

    /// The stored value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(option) => option.value(),
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Label for display, falling back to the raw value when unregistered.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Known(option) => option.label(),
            Self::Unrecognized(raw) => raw,
        }
    }

    /// The known option, if any.
    #[must_use]
    pub fn known(&self) -> Option<T> {
        match self {
            Self::Known(option) => Some(*option),
            Self::Unrecognized(_) => None,
        }
    }

    /// Whether this is exactly `option`.
    #[must_use]
    pub fn is(&self, option: T) -> bool {
        self.known() == Some(option)
    }
}

impl<T: CaseOption> From<T> for Choice<T> {
    fn from(option: T) -> Self {
        Self::Known(option)
    }
}

impl<T: CaseOption> fmt::Display for Choice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<T: CaseOption> Serialize for Choice<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de, T: CaseOption> Deserialize<'de> for Choice<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Label for an optional option, empty when unset.
#[must_use]
pub fn label_or_empty<T: CaseOption>(choice: Option<&Choice<T>>) -> &str {
    choice.map_or("", Choice::label)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_known_value_resolves_label() {
        let model = Choice::<PhoneModel>::parse("iphone13");
        assert_eq!(model.known(), Some(PhoneModel::Iphone13));
        assert_eq!(model.label(), "iPhone 13");
    }

    #[test]
    fn test_unknown_value_falls_back_to_raw() {
        let model = Choice::<PhoneModel>::parse("pixel9");
        assert_eq!(model, Choice::Unrecognized("pixel9".to_string()));
        assert_eq!(model.label(), "pixel9");
        assert_eq!(model.as_str(), "pixel9");
    }

    #[test]
    fn test_material_label() {
        let material: Choice<CaseMaterial> = CaseMaterial::Polycarbonate.into();
        assert_eq!(material.label(), "Soft Polycarbonate");
        assert!(material.is(CaseMaterial::Polycarbonate));
        assert!(!material.is(CaseMaterial::Silicone));
    }

    #[test]
    fn test_serde_uses_stored_value() {
        let finish: Choice<CaseFinish> = CaseFinish::Textured.into();
        assert_eq!(serde_json::to_string(&finish).unwrap(), "\"textured\"");

        let parsed: Choice<CaseColor> = serde_json::from_str("\"neon\"").unwrap();
        assert_eq!(parsed.as_str(), "neon");
    }

    #[test]
    fn test_all_values_round_trip_through_lookup() {
        for color in CaseColor::ALL {
            assert_eq!(CaseColor::from_value(color.value()), Some(*color));
        }
    }

    #[test]
    fn test_label_or_empty() {
        assert_eq!(label_or_empty::<CaseFinish>(None), "");
    }
}
