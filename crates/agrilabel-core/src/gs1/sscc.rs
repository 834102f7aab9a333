//! SSCC-18 generation.
//!
//! ## Structure
//! ```text
//! ┌───┬───────────────┬─────────────────────┬───┐
//! │ 0 │ 8 0 1 2 3 4 5 │ 0 0 0 0 0 0 0 0 1   │ 2 │
//! └───┴───────────────┴─────────────────────┴───┘
//!  ext  company prefix   serial (zero-padded)  check
//!  └──────────────── body: 17 digits ────────┘
//! ```
//!
//! Generation is a pure function of (extension, prefix, serial). The same
//! call produces the "next SSCC" preview and the identifier assigned when a
//! unit is finalized; only the ledger consumes serial numbers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use ts_rs::TS;

use crate::error::{Gs1Error, Gs1Result};
use crate::gs1::check_digit;

/// Length of an SSCC without its check digit.
pub const SSCC_BODY_LEN: usize = 17;

/// Length of a complete SSCC.
pub const SSCC_LEN: usize = 18;

/// A validated 18-digit Serial Shipping Container Code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, TS)]
#[ts(export)]
pub struct Sscc(String);

impl Sscc {
    /// Builds the SSCC for a serial number.
    ///
    /// ## Errors
    /// - `InvalidExtensionDigit` if `extension` > 9
    /// - `InvalidInput` if the prefix is empty or not all digits
    /// - `PrefixTooLong` if the prefix leaves no room in the 17-digit body
    /// - `SerialOverflow` if the serial needs more digits than remain;
    ///   it is never truncated or wrapped
    ///
    /// ## Example
    /// ```rust
    /// use agrilabel_core::gs1::Sscc;
    ///
    /// let sscc = Sscc::generate(0, "8012345", 1).unwrap();
    /// assert_eq!(sscc.as_str(), "080123450000000012");
    /// ```
    pub fn generate(extension: u8, company_prefix: &str, serial: u64) -> Gs1Result<Self> {
        if extension > 9 {
            return Err(Gs1Error::InvalidExtensionDigit(extension));
        }

        validate_company_prefix(company_prefix)?;

        let width = SSCC_BODY_LEN - 1 - company_prefix.len();
        let serial_digits = serial.to_string();
        if serial_digits.len() > width {
            return Err(Gs1Error::SerialOverflow { serial, width });
        }

        let body = format!("{}{}{:0>width$}", extension, company_prefix, serial_digits);
        debug_assert_eq!(body.len(), SSCC_BODY_LEN);

        let check = check_digit::compute(&body)?;
        Ok(Sscc(format!("{}{}", body, check)))
    }

    /// Parses and validates an existing 18-digit SSCC.
    pub fn parse(raw: &str) -> Gs1Result<Self> {
        if raw.len() != SSCC_LEN || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Gs1Error::InvalidInput {
                input: raw.to_string(),
                reason: format!("an SSCC is exactly {} digits", SSCC_LEN),
            });
        }

        check_digit::verify(raw)?;
        Ok(Sscc(raw.to_string()))
    }

    /// Returns the 18 digits.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Largest serial that still fits next to a prefix of this length.
///
/// ## Example
/// ```rust
/// use agrilabel_core::gs1::sscc::max_serial;
///
/// assert_eq!(max_serial("8012345"), Some(999_999_999));
/// ```
pub fn max_serial(company_prefix: &str) -> Option<u64> {
    let width = (SSCC_BODY_LEN - 1).checked_sub(company_prefix.len())?;
    if width == 0 {
        return None;
    }
    10_u64.checked_pow(width as u32).map(|limit| limit - 1)
}

/// Validates a GS1 company prefix for SSCC use.
pub fn validate_company_prefix(company_prefix: &str) -> Gs1Result<()> {
    if company_prefix.is_empty() || !company_prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Gs1Error::InvalidInput {
            input: company_prefix.to_string(),
            reason: "company prefix must be decimal digits".to_string(),
        });
    }

    let max = SSCC_BODY_LEN - 1;
    if company_prefix.len() > max {
        return Err(Gs1Error::PrefixTooLong {
            length: company_prefix.len(),
            max,
        });
    }

    Ok(())
}

impl fmt::Display for Sscc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Sscc {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Sscc {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Sscc::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_reference_value() {
        let sscc = Sscc::generate(0, "8012345", 1).unwrap();
        assert_eq!(sscc.as_str(), "080123450000000012");
        assert_eq!(sscc.as_str().len(), SSCC_LEN);
    }

    #[test]
    fn test_generate_is_idempotent() {
        let a = Sscc::generate(0, "8012345", 42).unwrap();
        let b = Sscc::generate(0, "8012345", 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_serial_fills_remaining_width() {
        let sscc = Sscc::generate(3, "8012345", 999_999_999).unwrap();
        assert!(sscc.as_str().starts_with("38012345999999999"));
    }

    #[test]
    fn test_serial_overflow_is_reported() {
        assert_eq!(
            Sscc::generate(0, "8012345", 1_000_000_000),
            Err(Gs1Error::SerialOverflow {
                serial: 1_000_000_000,
                width: 9
            })
        );
    }

    #[test]
    fn test_prefix_limits() {
        assert!(Sscc::generate(0, "801234567890123", 1).is_ok());
        assert_eq!(
            Sscc::generate(0, "8012345678901234", 1),
            Err(Gs1Error::SerialOverflow { serial: 1, width: 0 })
        );
        assert_eq!(
            Sscc::generate(0, "80123456789012345", 1),
            Err(Gs1Error::PrefixTooLong { length: 17, max: 16 })
        );
        assert!(matches!(
            Sscc::generate(0, "", 1),
            Err(Gs1Error::InvalidInput { .. })
        ));
        assert!(matches!(
            Sscc::generate(0, "80A2345", 1),
            Err(Gs1Error::InvalidInput { .. })
        ));
        assert_eq!(
            Sscc::generate(10, "8012345", 1),
            Err(Gs1Error::InvalidExtensionDigit(10))
        );
    }

    #[test]
    fn test_max_serial() {
        assert_eq!(max_serial("8012345"), Some(999_999_999));
        assert_eq!(max_serial("801234567890123"), Some(9));
        assert_eq!(max_serial("8012345678901234"), None);
    }

    #[test]
    fn test_parse() {
        assert!(Sscc::parse("080123450000000012").is_ok());
        assert!(matches!(
            Sscc::parse("080123450000000013"),
            Err(Gs1Error::CheckDigitMismatch { .. })
        ));
        assert!(matches!(
            Sscc::parse("08012345000000001"),
            Err(Gs1Error::InvalidInput { .. })
        ));
    }
}
