//! # Weight Module
//!
//! Provides the `Weight` type for tare, net and gross masses.
//!
//! ## Why Integer Grams?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.6 × 3 = 1.7999999999999998  ❌ WRONG!                              │
//! │                                                                         │
//! │  Summing 40 pallet lines rounded to 2 decimals each drifts by up to    │
//! │  0.20 kg, and the drift lands in the (3102) net weight element.        │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Grams                                            │
//! │    600 g × 3 = 1800 g, exactly                                         │
//! │    Rounding to 0.01 kg happens ONCE, at presentation                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use agrilabel_core::weight::Weight;
//!
//! let tare = Weight::parse_lenient("0.6");     // 600 g
//! let line_tare = tare * 10 + Weight::from_kg(25);
//! assert_eq!(line_tare.format_kg(), "31.00");
//!
//! // Operator typed garbage: permissive boundary turns it into zero
//! assert!(Weight::parse_lenient("n/a").is_zero());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;

/// Grams per kilogram.
const GRAMS_PER_KG: i64 = 1000;

// =============================================================================
// Weight Type
// =============================================================================

/// A mass in grams.
///
/// ## Design Decisions
/// - **i64 (signed)**: a scale reading minus tare can go negative before
///   the net weight is clamped
/// - **Grams**: scales and tare sheets use at most 3 decimals of a kilogram,
///   so every operator input is represented exactly
/// - **Single field tuple struct**: zero-cost abstraction over i64
///
/// ## Where Weight is Used
/// ```text
/// Packaging.tare ──► ShipmentLine.packaging_tare (snapshot) ──┐
/// PalletType.tare ─► LinePallet.tare (snapshot) ──────────────┤
///                                                             ▼
///                          line_tare ──► net / gross ──► ShippingUnit totals
///                                                             │
///                                                             ▼
///                                              (3102) element, DDT totals
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Weight(i64);

impl Weight {
    /// Creates a weight from grams.
    #[inline]
    pub const fn from_grams(grams: i64) -> Self {
        Weight(grams)
    }

    /// Creates a weight from whole kilograms.
    ///
    /// ## Example
    /// ```rust
    /// use agrilabel_core::weight::Weight;
    ///
    /// assert_eq!(Weight::from_kg(25).grams(), 25_000);
    /// ```
    #[inline]
    pub const fn from_kg(kg: i64) -> Self {
        Weight(kg.saturating_mul(GRAMS_PER_KG))
    }

    /// Returns the value in grams.
    #[inline]
    pub const fn grams(&self) -> i64 {
        self.0
    }

    /// Returns zero weight.
    #[inline]
    pub const fn zero() -> Self {
        Weight(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is greater than zero.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is less than zero.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the weight, or zero if it is negative.
    #[inline]
    pub fn clamp_non_negative(self) -> Self {
        self.max(Weight::zero())
    }

    /// Multiplies a per-collo weight by a collo count, saturating at the
    /// i64 bounds.
    #[inline]
    pub const fn multiply_count(&self, count: u32) -> Self {
        Weight(self.0.saturating_mul(count as i64))
    }

    /// Returns the weight in hundredths of a kilogram, rounded half away
    /// from zero.
    ///
    /// This is the value encoded by AI (3102): `89.50 kg → 8950`.
    ///
    /// ## Example
    /// ```rust
    /// use agrilabel_core::weight::Weight;
    ///
    /// assert_eq!(Weight::from_grams(89_500).hundredths(), 8950);
    /// assert_eq!(Weight::from_grams(1_005).hundredths(), 101);
    /// assert_eq!(Weight::from_grams(1_004).hundredths(), 100);
    /// ```
    pub const fn hundredths(&self) -> i64 {
        if self.0 >= 0 {
            self.0.saturating_add(5) / 10
        } else {
            -(self.0.saturating_neg().saturating_add(5) / 10)
        }
    }

    /// Formats the weight in kilograms with two decimals ("31.00").
    ///
    /// ## Note
    /// This is the ONLY place weights are rounded. Totals are summed in
    /// grams and formatted afterwards.
    pub fn format_kg(&self) -> String {
        let hundredths = self.hundredths();
        let sign = if hundredths < 0 { "-" } else { "" };
        let abs = hundredths.abs();
        format!("{}{}.{:02}", sign, abs / 100, abs % 100)
    }

    /// Parses an operator-entered weight in kilograms, never failing.
    ///
    /// ## Permissive Input Policy
    /// Mirrors how the weighing screen has always behaved: the longest
    /// numeric prefix is used (`"12.5kg"` → 12.5 kg), a comma is accepted as
    /// decimal separator, and anything non-numeric becomes zero. More than
    /// three decimals are rounded half-up to the gram.
    ///
    /// ## Example
    /// ```rust
    /// use agrilabel_core::weight::Weight;
    ///
    /// assert_eq!(Weight::parse_lenient("120,50").grams(), 120_500);
    /// assert_eq!(Weight::parse_lenient("12.5kg").grams(), 12_500);
    /// assert_eq!(Weight::parse_lenient("").grams(), 0);
    /// assert_eq!(Weight::parse_lenient("abc").grams(), 0);
    /// ```
    pub fn parse_lenient(input: &str) -> Self {
        scan_grams(input.trim_start())
            .map(|scanned| Weight(scanned.grams))
            .unwrap_or_default()
    }

    /// Parses a weight in kilograms, rejecting anything that is not a
    /// complete decimal number.
    ///
    /// ## Example
    /// ```rust
    /// use agrilabel_core::weight::Weight;
    ///
    /// assert_eq!(Weight::parse_strict("0.6", "tare").unwrap().grams(), 600);
    /// assert!(Weight::parse_strict("12.5kg", "tare").is_err());
    /// assert!(Weight::parse_strict("", "tare").is_err());
    /// ```
    pub fn parse_strict(input: &str, field: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::required(field));
        }

        match scan_grams(trimmed) {
            Some(scanned) if scanned.consumed == trimmed.len() => Ok(Weight(scanned.grams)),
            _ => Err(ValidationError::invalid_format(
                field,
                format!("'{}' is not a weight in kg", trimmed),
            )),
        }
    }
}

// =============================================================================
// Decimal Scanner
// =============================================================================

/// Result of scanning a decimal kilogram prefix.
struct Scanned {
    grams: i64,
    consumed: usize,
}

/// Scans `[+-]digits[(.|,)digits]` from the start of `input`.
///
/// Returns `None` when no digit is present or the value overflows i64 grams.
fn scan_grams(input: &str) -> Option<Scanned> {
    let bytes = input.as_bytes();
    let mut i = 0;

    let negative = match bytes.first() {
        Some(b'-') => {
            i = 1;
            true
        }
        Some(b'+') => {
            i = 1;
            false
        }
        _ => false,
    };

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = &input[int_start..i];

    let mut frac_digits = "";
    if i < bytes.len() && (bytes[i] == b'.' || bytes[i] == b',') {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > frac_start || !int_digits.is_empty() {
            frac_digits = &input[frac_start..j];
            i = j;
        }
    }

    if int_digits.is_empty() && frac_digits.is_empty() {
        return None;
    }

    let whole: i64 = if int_digits.is_empty() {
        0
    } else {
        int_digits.parse().ok()?
    };

    let frac = frac_digits.as_bytes();
    let mut frac_grams: i64 = 0;
    for (k, digit) in frac.iter().take(3).enumerate() {
        frac_grams += i64::from(digit - b'0') * 10_i64.pow(2 - k as u32);
    }
    if frac.get(3).is_some_and(|d| *d >= b'5') {
        frac_grams += 1;
    }

    let grams = whole.checked_mul(GRAMS_PER_KG)?.checked_add(frac_grams)?;

    Some(Scanned {
        grams: if negative { -grams } else { grams },
        consumed: i,
    })
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows kilograms with two decimals and the unit.
impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kg", self.format_kg())
    }
}

/// Default weight is zero.
impl Default for Weight {
    fn default() -> Self {
        Weight::zero()
    }
}

// Arithmetic saturates: an absurd operator entry ends up out of range for
// the label instead of wrapping into a plausible weight.
impl Add for Weight {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Weight(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Weight {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Weight {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Weight(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Weight {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

/// Multiplication by a collo count.
impl Mul<u32> for Weight {
    type Output = Self;

    #[inline]
    fn mul(self, count: u32) -> Self {
        self.multiply_count(count)
    }
}

impl Sum for Weight {
    fn sum<I: Iterator<Item = Weight>>(iter: I) -> Self {
        iter.fold(Weight::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Weight> for Weight {
    fn sum<I: Iterator<Item = &'a Weight>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_kg_and_grams() {
        assert_eq!(Weight::from_kg(25).grams(), 25_000);
        assert_eq!(Weight::from_grams(600).grams(), 600);
    }

    #[test]
    fn test_format_kg() {
        assert_eq!(Weight::from_grams(31_000).format_kg(), "31.00");
        assert_eq!(Weight::from_grams(89_500).format_kg(), "89.50");
        assert_eq!(Weight::from_grams(0).format_kg(), "0.00");
        assert_eq!(Weight::from_grams(1_005).format_kg(), "1.01");
        assert_eq!(Weight::from_grams(-2_500).format_kg(), "-2.50");
        assert_eq!(format!("{}", Weight::from_grams(600)), "0.60 kg");
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(Weight::parse_lenient("120.50").grams(), 120_500);
        assert_eq!(Weight::parse_lenient(" 0.6").grams(), 600);
        assert_eq!(Weight::parse_lenient("25").grams(), 25_000);
        assert_eq!(Weight::parse_lenient("1,25").grams(), 1_250);
        assert_eq!(Weight::parse_lenient(".5").grams(), 500);
        assert_eq!(Weight::parse_lenient("5.").grams(), 5_000);
        assert_eq!(Weight::parse_lenient("-3").grams(), -3_000);
        assert_eq!(Weight::parse_lenient("0.0005").grams(), 1);
        assert_eq!(Weight::parse_lenient("0.0004").grams(), 0);
        assert_eq!(Weight::parse_lenient("12kg").grams(), 12_000);
        assert!(Weight::parse_lenient("").is_zero());
        assert!(Weight::parse_lenient("-").is_zero());
        assert!(Weight::parse_lenient(".").is_zero());
        assert!(Weight::parse_lenient("kg12").is_zero());
        assert!(Weight::parse_lenient("99999999999999999999").is_zero());
    }

    #[test]
    fn test_parse_strict() {
        assert_eq!(Weight::parse_strict("1.5", "tare").unwrap().grams(), 1_500);
        assert_eq!(Weight::parse_strict(" 2 ", "tare").unwrap().grams(), 2_000);
        assert!(matches!(
            Weight::parse_strict("  ", "tare"),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            Weight::parse_strict("1.5.2", "tare"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_arithmetic() {
        let tare = Weight::from_grams(600);
        let pallet = Weight::from_kg(25);
        assert_eq!((tare * 10 + pallet).grams(), 31_000);
        assert_eq!((pallet - tare).grams(), 24_400);

        let mut acc = Weight::zero();
        acc += pallet;
        acc -= tare;
        assert_eq!(acc.grams(), 24_400);
    }

    #[test]
    fn test_arithmetic_saturates() {
        let huge = Weight::from_grams(i64::MAX - 1);
        assert_eq!(huge.multiply_count(10_000).grams(), i64::MAX);
        assert_eq!((huge + Weight::from_kg(1)).grams(), i64::MAX);
        assert_eq!((Weight::from_grams(i64::MIN) - Weight::from_kg(1)).grams(), i64::MIN);
        assert_eq!(Weight::from_kg(i64::MAX).grams(), i64::MAX);

        let mut acc = huge;
        acc += huge;
        assert_eq!(acc.grams(), i64::MAX);
        acc = Weight::from_grams(i64::MIN);
        acc -= huge;
        assert_eq!(acc.grams(), i64::MIN);

        assert_eq!(Weight::from_grams(i64::MAX).hundredths(), i64::MAX / 10);
        assert_eq!(Weight::from_grams(i64::MIN).hundredths(), -(i64::MAX / 10));
    }

    #[test]
    fn test_clamp_non_negative() {
        assert!(Weight::from_grams(-1).clamp_non_negative().is_zero());
        assert_eq!(Weight::from_grams(7).clamp_non_negative().grams(), 7);
    }

    #[test]
    fn test_sum() {
        let weights = [Weight::from_grams(100), Weight::from_grams(250)];
        let total: Weight = weights.iter().sum();
        assert_eq!(total.grams(), 350);
    }

    /// Summing many 0.01 kg-ish values in grams never drifts
    #[test]
    fn test_no_accumulated_rounding_drift() {
        let line = Weight::parse_lenient("0.333");
        let total: Weight = std::iter::repeat(line).take(300).sum();
        assert_eq!(total.grams(), 99_900);
        assert_eq!(total.format_kg(), "99.90");
    }
}
