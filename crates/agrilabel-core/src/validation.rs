//! # Validation Module
//!
//! Master data and document field validation.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Input boundary                                                │
//! │  ├── parse_count_lenient / Weight::parse_lenient (never fail)          │
//! │  └── parse_count_strict  / Weight::parse_strict  (opt-in)              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Article: code, description, GTIN, origin, fixed unit weight       │
//! │  ├── Packaging / pallet type: id, name, non-negative tare              │
//! │  ├── Recipient: code, name, address                                    │
//! │  └── Serial settings, document numbers                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── PRIMARY KEY / UNIQUE (sscc, document number)                      │
//! │  └── CHECK constraints on tares                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use agrilabel_core::validation::{normalize_origin, parse_count_lenient};
//!
//! assert_eq!(normalize_origin(" it ").unwrap(), "IT");
//! assert_eq!(parse_count_lenient("12 colli"), 12);
//! ```

use crate::error::{Gs1Error, ValidationError};
use crate::gs1::Gtin;
use crate::types::{Article, Packaging, PalletType, Recipient, WeighingMode};
use crate::weight::Weight;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of master data codes and ids.
const MAX_CODE_LEN: usize = 50;

/// Maximum length of names and descriptions.
const MAX_NAME_LEN: usize = 200;

/// Maximum length of a transport document number.
const MAX_DOCUMENT_NUMBER_LEN: usize = 20;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a business key (article code, recipient code, packaging id).
///
/// ## Example
/// ```rust
/// use agrilabel_core::validation::validate_code;
///
/// assert!(validate_code("code", "ART01").is_ok());
/// assert!(validate_code("code", "  ").is_err());
/// assert!(validate_code("code", "ART 01").is_err());
/// ```
pub fn validate_code(field: &str, code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::required(field));
    }

    if code.len() > MAX_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_CODE_LEN,
        });
    }

    if code.chars().any(char::is_whitespace) {
        return Err(ValidationError::invalid_format(field, "must not contain spaces"));
    }

    Ok(())
}

/// Validates a required free-text field.
pub fn validate_text(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Normalizes a country of origin.
///
/// ## Rules
/// - ISO 3166 alpha-2 (`IT`, `ES`) or numeric (`380`)
/// - Stored upper-case
pub fn normalize_origin(origin: &str) -> ValidationResult<String> {
    let origin = origin.trim().to_uppercase();

    let alpha2 = origin.len() == 2 && origin.bytes().all(|b| b.is_ascii_uppercase());
    let numeric = origin.len() == 3 && origin.bytes().all(|b| b.is_ascii_digit());

    if alpha2 || numeric {
        Ok(origin)
    } else {
        Err(ValidationError::invalid_format(
            "origin",
            "use an ISO alpha-2 code (IT) or a 3-digit numeric code (380)",
        ))
    }
}

/// Normalizes a GTIN entered on the article form.
pub fn normalize_gtin(raw: &str) -> ValidationResult<Gtin> {
    Gtin::normalize(raw).map_err(|source| ValidationError::Gs1 {
        field: "gtin".to_string(),
        source,
    })
}

fn validate_tare(field: &str, tare: Weight) -> ValidationResult<()> {
    if tare.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Master Data
// =============================================================================

/// Validates an article before it enters the catalog.
///
/// Fixed-weight articles need a unit weight, otherwise every line would
/// compute a zero net.
pub fn validate_article(article: &Article) -> ValidationResult<()> {
    validate_code("code", &article.code)?;
    validate_text("description", &article.description)?;
    normalize_origin(&article.origin)?;

    if article.weighing_mode == WeighingMode::Fixed && !article.unit_weight.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "unitWeight".to_string(),
        });
    }
    validate_tare("unitWeight", article.unit_weight)?;

    if let Some(packaging_id) = &article.default_packaging_id {
        validate_code("defaultPackagingId", packaging_id)?;
    }

    Ok(())
}

/// Validates a packaging record.
pub fn validate_packaging(packaging: &Packaging) -> ValidationResult<()> {
    validate_code("id", &packaging.id)?;
    validate_text("name", &packaging.name)?;
    validate_tare("tare", packaging.tare)
}

/// Validates a pallet type record.
pub fn validate_pallet_type(pallet: &PalletType) -> ValidationResult<()> {
    validate_code("id", &pallet.id)?;
    validate_text("name", &pallet.name)?;
    validate_tare("tare", pallet.tare)?;

    if let Some(max_load) = pallet.max_load {
        validate_tare("maxLoad", max_load)?;
    }

    Ok(())
}

/// Validates a recipient record.
pub fn validate_recipient(recipient: &Recipient) -> ValidationResult<()> {
    validate_code("code", &recipient.code)?;
    validate_text("name", &recipient.name)?;
    validate_text("address", &recipient.address)?;

    if let Some(email) = recipient.email.as_deref().map(str::trim) {
        if !email.is_empty() && !email.contains('@') {
            return Err(ValidationError::invalid_format("email", "missing '@'"));
        }
    }

    Ok(())
}

// =============================================================================
// Serial Settings & Documents
// =============================================================================

/// Validates a GS1 company prefix: 1 to 17 decimal digits.
pub fn validate_company_prefix(prefix: &str) -> ValidationResult<()> {
    if prefix.is_empty() {
        return Err(ValidationError::required("companyPrefix"));
    }

    if prefix.len() > 17 {
        return Err(ValidationError::TooLong {
            field: "companyPrefix".to_string(),
            max: 17,
        });
    }

    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::invalid_format(
            "companyPrefix",
            "must contain only digits",
        ));
    }

    Ok(())
}

/// Validates an SSCC extension digit.
pub fn validate_extension_digit(extension: u8) -> ValidationResult<()> {
    if extension > 9 {
        return Err(ValidationError::OutOfRange {
            field: "extensionDigit".to_string(),
            min: 0,
            max: 9,
        });
    }
    Ok(())
}

/// Validates a transport document number and returns it trimmed.
pub fn validate_document_number(number: &str) -> ValidationResult<String> {
    let number = number.trim();

    if number.is_empty() {
        return Err(ValidationError::required("number"));
    }

    if number.len() > MAX_DOCUMENT_NUMBER_LEN {
        return Err(ValidationError::TooLong {
            field: "number".to_string(),
            max: MAX_DOCUMENT_NUMBER_LEN,
        });
    }

    Ok(number.to_string())
}

/// Maps a GS1 error on a named field into a validation error.
pub fn gs1_field(field: &str, source: Gs1Error) -> ValidationError {
    ValidationError::Gs1 {
        field: field.to_string(),
        source,
    }
}

// =============================================================================
// Count Parsing
// =============================================================================

/// Parses a collo count, never failing.
///
/// Uses the leading digits like the weighing screen always has: `"12 colli"`
/// is 12, anything without leading digits is 0, negative counts are 0 and
/// values beyond `u32::MAX` saturate.
pub fn parse_count_lenient(input: &str) -> u32 {
    let input = input.trim_start();
    if input.starts_with('-') {
        return 0;
    }
    let input = input.strip_prefix('+').unwrap_or(input);

    input
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0_u32, |acc, digit| {
            acc.saturating_mul(10).saturating_add(u32::from(digit - b'0'))
        })
}

/// Parses a collo count, rejecting anything but a plain non-negative integer.
pub fn parse_count_strict(input: &str, field: &str) -> ValidationResult<u32> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::required(field));
    }

    trimmed.parse::<u32>().map_err(|_| {
        ValidationError::invalid_format(field, format!("'{}' is not a whole number", trimmed))
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnitOfMeasure;

    fn article() -> Article {
        Article {
            code: "ART02".to_string(),
            description: "Pere Abate 14/16".to_string(),
            gtin: Gtin::normalize("8012345000029").unwrap(),
            origin: "380".to_string(),
            unit_of_measure: UnitOfMeasure::Kg,
            weighing_mode: WeighingMode::Fixed,
            unit_weight: Weight::from_kg(15),
            default_packaging_id: Some("PACK02".to_string()),
        }
    }

    #[test]
    fn test_validate_article() {
        assert!(validate_article(&article()).is_ok());

        let mut no_weight = article();
        no_weight.unit_weight = Weight::zero();
        assert_eq!(
            validate_article(&no_weight),
            Err(ValidationError::MustBePositive {
                field: "unitWeight".to_string()
            })
        );

        let mut variable = no_weight.clone();
        variable.weighing_mode = WeighingMode::Variable;
        assert!(validate_article(&variable).is_ok());

        let mut no_description = article();
        no_description.description = " ".to_string();
        assert_eq!(
            validate_article(&no_description),
            Err(ValidationError::required("description"))
        );
    }

    #[test]
    fn test_normalize_origin() {
        assert_eq!(normalize_origin("it").unwrap(), "IT");
        assert_eq!(normalize_origin("380").unwrap(), "380");
        assert!(normalize_origin("ITA").is_err());
        assert!(normalize_origin("38").is_err());
        assert!(normalize_origin("").is_err());
    }

    #[test]
    fn test_normalize_gtin_maps_field() {
        assert_eq!(
            normalize_gtin("8012345000012").unwrap().as_str(),
            "08012345000012"
        );
        assert!(matches!(
            normalize_gtin("123"),
            Err(ValidationError::Gs1 { ref field, .. }) if field == "gtin"
        ));
    }

    #[test]
    fn test_validate_tares() {
        let packaging = Packaging {
            id: "PACK01".to_string(),
            name: "Cartone 40x60".to_string(),
            tare: Weight::from_grams(-1),
            is_pooling: false,
            width_mm: None,
            depth_mm: None,
            height_mm: None,
        };
        assert_eq!(
            validate_packaging(&packaging),
            Err(ValidationError::Negative {
                field: "tare".to_string()
            })
        );

        let packaging = Packaging {
            tare: Weight::zero(),
            ..packaging
        };
        assert!(validate_packaging(&packaging).is_ok());
    }

    #[test]
    fn test_validate_recipient() {
        let mut recipient = Recipient {
            code: "CL01".to_string(),
            name: "GDO Logistica Nord".to_string(),
            address: "Interporto Blocco A, 20100 Milano (MI)".to_string(),
            vat_number: None,
            email: Some("ordini.example.com".to_string()),
            phone: None,
        };
        assert!(validate_recipient(&recipient).is_err());

        recipient.email = Some("ordini@example.com".to_string());
        assert!(validate_recipient(&recipient).is_ok());
    }

    #[test]
    fn test_validate_company_prefix() {
        assert!(validate_company_prefix("8012345").is_ok());
        assert!(validate_company_prefix("").is_err());
        assert!(validate_company_prefix("80123A5").is_err());
        assert!(validate_company_prefix(&"8".repeat(18)).is_err());
        assert!(validate_extension_digit(9).is_ok());
        assert!(validate_extension_digit(10).is_err());
    }

    #[test]
    fn test_validate_document_number() {
        assert_eq!(validate_document_number(" 001/2024 ").unwrap(), "001/2024");
        assert!(validate_document_number("").is_err());
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count_lenient("10"), 10);
        assert_eq!(parse_count_lenient(" 7 colli"), 7);
        assert_eq!(parse_count_lenient("abc"), 0);
        assert_eq!(parse_count_lenient("-3"), 0);
        assert_eq!(parse_count_lenient("99999999999"), u32::MAX);

        assert_eq!(parse_count_strict("10", "count"), Ok(10));
        assert!(parse_count_strict("10.5", "count").is_err());
        assert!(parse_count_strict("", "count").is_err());
    }
}
