//! GS1 Mod-10 check digit.
//!
//! ```text
//! body:     0 8 0 1 2 3 4 5 0 0 0 0 0 0 0 0 1
//! weights:  3 1 3 1 3 1 3 1 3 1 3 1 3 1 3 1 3   ← counted from the RIGHT
//! check  = (10 − (Σ digit×weight mod 10)) mod 10
//! ```
//!
//! Weights are anchored on the rightmost body digit, so the same routine
//! serves GTIN-8/12/13/14 and SSCC-18.

use crate::error::{Gs1Error, Gs1Result};

/// Computes the check digit for a body of decimal digits.
///
/// ## Errors
/// `InvalidInput` when `body` is empty or contains a non-digit.
///
/// ## Example
/// ```rust
/// use agrilabel_core::gs1::check_digit::compute;
///
/// // GTIN-13 8012345000012 → body 801234500001, check digit 2
/// assert_eq!(compute("801234500001").unwrap(), 2);
/// ```
pub fn compute(body: &str) -> Gs1Result<u8> {
    let sum = weighted_sum(body)?;
    Ok(((10 - sum % 10) % 10) as u8)
}

/// Checks a full code whose last digit is its check digit.
///
/// ## Errors
/// - `InvalidInput` for fewer than two characters or non-digits
/// - `CheckDigitMismatch` when the trailing digit is wrong
pub fn verify(code: &str) -> Gs1Result<()> {
    if code.len() < 2 || !code.is_ascii() {
        return Err(Gs1Error::InvalidInput {
            input: code.to_string(),
            reason: "a code needs at least one body digit and a check digit".to_string(),
        });
    }

    let (body, check) = code.split_at(code.len() - 1);
    let found = digit_value(check).ok_or_else(|| Gs1Error::InvalidInput {
        input: code.to_string(),
        reason: "check digit is not a decimal digit".to_string(),
    })?;

    let expected = compute(body)?;
    if expected != found {
        return Err(Gs1Error::CheckDigitMismatch {
            code: code.to_string(),
            expected,
            found,
        });
    }

    Ok(())
}

/// Σ digit × weight, weight 3 on even positions counted from the right.
fn weighted_sum(body: &str) -> Gs1Result<u32> {
    if body.is_empty() {
        return Err(Gs1Error::InvalidInput {
            input: String::new(),
            reason: "no digits".to_string(),
        });
    }

    body.bytes().rev().enumerate().try_fold(0u32, |sum, (pos, b)| {
        if !b.is_ascii_digit() {
            return Err(Gs1Error::InvalidInput {
                input: body.to_string(),
                reason: format!("'{}' is not a decimal digit", b as char),
            });
        }
        let digit = u32::from(b - b'0');
        let weight = if pos % 2 == 0 { 3 } else { 1 };
        Ok(sum + digit * weight)
    })
}

fn digit_value(s: &str) -> Option<u8> {
    match s.as_bytes() {
        [b] if b.is_ascii_digit() => Some(b - b'0'),
        _ => None,
    }
}
