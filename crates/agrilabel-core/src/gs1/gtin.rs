//! GTIN normalization to canonical GTIN-14.
//!
//! ```text
//! " 8012345-000012 "  ──strip──►  8012345000012  (13 digits)
//!                                  │
//!                     body 801234500001, check 2 ✓
//!                                  │
//!                     pad ───────► 08012345000012 (GTIN-14)
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use ts_rs::TS;

use crate::error::{Gs1Error, Gs1Result};
use crate::gs1::check_digit;

/// Digit counts GS1 assigns to GTIN-8, GTIN-12 (UPC-A), GTIN-13 and GTIN-14.
pub const GTIN_LENGTHS: [usize; 4] = [8, 12, 13, 14];

/// A validated GTIN in canonical 14-digit form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, TS)]
#[ts(export)]
pub struct Gtin(String);

impl Gtin {
    /// Validates raw operator input and returns the canonical GTIN-14.
    ///
    /// Non-digit characters (spaces, dashes) are stripped first. The
    /// remaining digits must be a GTIN-8/12/13/14 with a correct check
    /// digit; nothing is ever coerced into a valid code.
    ///
    /// ## Example
    /// ```rust
    /// use agrilabel_core::gs1::Gtin;
    ///
    /// let gtin = Gtin::normalize("8012345000012").unwrap();
    /// assert_eq!(gtin.as_str(), "08012345000012");
    ///
    /// assert!(Gtin::normalize("8012345000013").is_err()); // bad check digit
    /// assert!(Gtin::normalize("801234500001").is_err());  // wrong check digit for GTIN-12
    /// ```
    pub fn normalize(raw: &str) -> Gs1Result<Self> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

        if !GTIN_LENGTHS.contains(&digits.len()) {
            return Err(Gs1Error::InvalidGtinLength {
                length: digits.len(),
            });
        }

        check_digit::verify(&digits)?;

        Ok(Gtin(format!("{:0>14}", digits)))
    }

    /// Returns the 14-digit canonical form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Gtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Gtin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Stored values are re-validated on the way in.
impl<'de> Deserialize<'de> for Gtin {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Gtin::normalize(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_each_length() {
        assert_eq!(Gtin::normalize("96385074").unwrap().as_str(), "00000096385074");
        assert_eq!(Gtin::normalize("036000291452").unwrap().as_str(), "00036000291452");
        assert_eq!(Gtin::normalize("8012345000029").unwrap().as_str(), "08012345000029");
        assert_eq!(Gtin::normalize("18012345000026").unwrap().as_str(), "18012345000026");
    }

    #[test]
    fn test_strips_separators() {
        let gtin = Gtin::normalize(" 80-12345 000012 ").unwrap();
        assert_eq!(gtin.as_str(), "08012345000012");
    }

    #[test]
    fn test_rejects_lengths() {
        for raw in ["", "1234567", "123456789", "12345678901", "123456789012345"] {
            assert!(
                matches!(Gtin::normalize(raw), Err(Gs1Error::InvalidGtinLength { .. })),
                "{raw} should fail on length"
            );
        }
    }

    #[test]
    fn test_rejects_check_digit() {
        assert!(matches!(
            Gtin::normalize("8012345000019"),
            Err(Gs1Error::CheckDigitMismatch { expected: 2, found: 9, .. })
        ));
    }

    #[test]
    fn test_serde_revalidates() {
        let gtin = Gtin::normalize("8012345000012").unwrap();
        let json = serde_json::to_string(&gtin).unwrap();
        assert_eq!(json, "\"08012345000012\"");

        let back: Gtin = serde_json::from_str(&json).unwrap();
        assert_eq!(back, gtin);

        assert!(serde_json::from_str::<Gtin>("\"08012345000013\"").is_err());
    }
}
