//! # Quantity Module
//!
//! Stock quantities in fixed-point thousandths of a unit.
//!
//! ## Why Fixed-Point?
//! Inventory is counted in mixed units: boxes, pieces, kilograms, litres.
//! Half a kilo must stay exactly half a kilo after a dozen movements, so
//! quantities follow the same rule as money: integers all the way down.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Backend column      Quantity (milli)      Display                      │
//! │  ──────────────      ────────────────      ───────                      │
//! │  2.5            ──►  2500             ──►  "2.5"                        │
//! │  12             ──►  12000            ──►  "12"                         │
//! │  0.125          ──►  125              ──►  "0.125"                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The backend exchanges quantities as plain JSON numbers; values are rounded
//! to the nearest thousandth on the way in.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;

/// Thousandths per whole unit.
pub const MILLI_PER_UNIT: i64 = 1_000;

// =============================================================================
// Quantity
// =============================================================================

/// A stock quantity in thousandths of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, TS)]
#[ts(export)]
pub struct Quantity(i64);

impl Quantity {
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * MILLI_PER_UNIT)
    }

    /// Rounds a decimal value to the nearest thousandth.
    pub fn from_decimal(value: f64) -> Self {
        Quantity((value * MILLI_PER_UNIT as f64).round() as i64)
    }

    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    /// Decimal representation, for the wire and for display only.
    #[inline]
    pub fn as_decimal(&self) -> f64 {
        self.0 as f64 / MILLI_PER_UNIT as f64
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Quantity {
    /// Whole part, then up to three decimals with trailing zeros removed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        let whole = abs / MILLI_PER_UNIT;
        let frac = abs % MILLI_PER_UNIT;

        if frac == 0 {
            return write!(f, "{}{}", sign, whole);
        }

        let digits = format!("{:03}", frac);
        write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % MILLI_PER_UNIT == 0 {
            serializer.serialize_i64(self.0 / MILLI_PER_UNIT)
        } else {
            serializer.serialize_f64(self.as_decimal())
        }
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Ok(Quantity::from_decimal(value))
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Quantity {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Quantity(-self.0)
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), |acc, q| acc + q)
    }
}

// =============================================================================
// Conversion Rate
// =============================================================================

/// How many destination units correspond to a number of source units.
///
/// ## Examples
/// ```text
/// 1 box   → 12 pieces     ConversionRate { from_units: 1,    to_units: 12 }
/// 1 piece → 0.25 kg       ConversionRate { from_units: 4,    to_units: 1  }
/// same unit               ConversionRate { from_units: 1,    to_units: 1  }
/// ```
///
/// Stored as a ratio of two positive integers so a rate like "3 bags make
/// 2 sacks" survives without rounding until the final conversion.
///
/// Both sides are private: every rate, including one read from JSON, goes
/// through [`ConversionRate::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ConversionRate {
    from_units: u32,
    to_units: u32,
}

impl<'de> Deserialize<'de> for ConversionRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Wire {
            from_units: u32,
            to_units: u32,
        }

        let wire = Wire::deserialize(deserializer)?;
        ConversionRate::new(wire.from_units, wire.to_units).map_err(serde::de::Error::custom)
    }
}

impl ConversionRate {
    /// Builds a rate; both sides must be non-zero.
    pub fn new(from_units: u32, to_units: u32) -> Result<Self, ValidationError> {
        if from_units == 0 || to_units == 0 {
            return Err(ValidationError::MustBePositive {
                field: "conversion rate".to_string(),
            });
        }
        Ok(ConversionRate {
            from_units,
            to_units,
        })
    }

    /// Identity rate (source and destination share a unit).
    pub const fn identity() -> Self {
        ConversionRate {
            from_units: 1,
            to_units: 1,
        }
    }

    pub const fn is_identity(&self) -> bool {
        self.from_units == self.to_units
    }

    #[inline]
    pub const fn from_units(&self) -> u32 {
        self.from_units
    }

    #[inline]
    pub const fn to_units(&self) -> u32 {
        self.to_units
    }

    /// A rate that skips the non-zero check, for exercising callers.
    #[cfg(test)]
    pub(crate) const fn unchecked(from_units: u32, to_units: u32) -> Self {
        ConversionRate {
            from_units,
            to_units,
        }
    }

    /// Both sides non-zero.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.from_units > 0 && self.to_units > 0
    }

    /// Converts a source quantity into destination units.
    ///
    /// Integer math: `milli * to / from`, rounded half away from zero.
    ///
    /// ## Example
    /// ```rust
    /// use stockroom_core::quantity::{ConversionRate, Quantity};
    ///
    /// // 3 bags make 2 sacks: 1 bag → 0.667 sacks
    /// let rate = ConversionRate::new(3, 2).unwrap();
    /// assert_eq!(rate.convert(Quantity::from_units(1)).milli(), 667);
    /// ```
    pub fn convert(&self, quantity: Quantity) -> Quantity {
        let from = self.from_units as i128;
        let to = self.to_units as i128;
        let scaled = quantity.milli() as i128 * to;

        // half away from zero
        let half = from / 2;
        let rounded = if scaled >= 0 {
            (scaled + half) / from
        } else {
            (scaled - half) / from
        };

        Quantity::from_milli(rounded as i64)
    }
}

impl Default for ConversionRate {
    fn default() -> Self {
        ConversionRate::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_trims_zeros() {
        assert_eq!(Quantity::from_units(12).to_string(), "12");
        assert_eq!(Quantity::from_milli(2_500).to_string(), "2.5");
        assert_eq!(Quantity::from_milli(125).to_string(), "0.125");
        assert_eq!(Quantity::from_milli(-1_050).to_string(), "-1.05");
        assert_eq!(Quantity::zero().to_string(), "0");
    }

    #[test]
    fn test_json_numbers() {
        let whole: Quantity = serde_json::from_str("12").unwrap();
        assert_eq!(whole, Quantity::from_units(12));

        let frac: Quantity = serde_json::from_str("0.3333").unwrap();
        assert_eq!(frac.milli(), 333);

        assert_eq!(serde_json::to_string(&Quantity::from_units(4)).unwrap(), "4");
        assert_eq!(
            serde_json::to_string(&Quantity::from_milli(2_500)).unwrap(),
            "2.5"
        );
    }

    #[test]
    fn test_conversion_rates() {
        let box_to_pieces = ConversionRate::new(1, 12).unwrap();
        assert_eq!(
            box_to_pieces.convert(Quantity::from_milli(1_500)),
            Quantity::from_units(18)
        );

        let pieces_to_kg = ConversionRate::new(4, 1).unwrap();
        assert_eq!(
            pieces_to_kg.convert(Quantity::from_units(10)),
            Quantity::from_milli(2_500)
        );

        // 2 / 3 of a thousandth rounds up, 1 / 3 rounds down
        let thirds = ConversionRate::new(3, 1).unwrap();
        assert_eq!(thirds.convert(Quantity::from_milli(2)).milli(), 1);
        assert_eq!(thirds.convert(Quantity::from_milli(1)).milli(), 0);
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert!(ConversionRate::new(0, 1).is_err());
        assert!(ConversionRate::new(1, 0).is_err());
        assert!(ConversionRate::identity().is_identity());
    }

    #[test]
    fn test_rate_from_json_goes_through_new() {
        let ok: ConversionRate = serde_json::from_str(r#"{"from_units":1,"to_units":12}"#).unwrap();
        assert_eq!((ok.from_units(), ok.to_units()), (1, 12));
        assert!(ok.is_valid());

        let zero = serde_json::from_str::<ConversionRate>(r#"{"from_units":0,"to_units":12}"#);
        let err = zero.unwrap_err().to_string();
        assert!(err.contains("conversion rate must be positive"), "{err}");

        assert!(serde_json::from_str::<ConversionRate>(r#"{"from_units":3,"to_units":0}"#).is_err());
        assert_eq!(
            serde_json::to_string(&ConversionRate::new(3, 2).unwrap()).unwrap(),
            r#"{"from_units":3,"to_units":2}"#
        );
    }

    #[test]
    fn test_sum_and_neg() {
        let total: Quantity = [Quantity::from_units(3), -Quantity::from_milli(500)]
            .into_iter()
            .sum();
        assert_eq!(total, Quantity::from_milli(2_500));
    }
}
