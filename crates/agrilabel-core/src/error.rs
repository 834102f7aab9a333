//! # Error Types
//!
//! Domain-specific error types for agrilabel-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  agrilabel-core errors (this file)                                     │
//! │  ├── Gs1Error         - Identifier / element string validation         │
//! │  ├── ValidationError  - Master data and document field validation      │
//! │  └── CoreError        - Ledger state violations (wraps both above)     │
//! │                                                                         │
//! │  agrilabel-db errors (separate crate)                                  │
//! │  └── DbError          - Persistence failures (wraps CoreError)         │
//! │                                                                         │
//! │  Flow: Gs1Error / ValidationError → CoreError → DbError → UI           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SSCC, ID, field, etc.)
//! 3. Errors are enum variants, never String
//! 4. Every failure is scoped to the single operation attempted

use thiserror::Error;

// =============================================================================
// GS1 Error
// =============================================================================

/// GS1 identifier and element string errors.
///
/// These block the operation entirely: no partial or best-effort
/// identifier is ever emitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Gs1Error {
    /// Input for a check digit computation is empty or not all digits.
    #[error("Invalid GS1 input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    /// GTIN digit count is not one of 8, 12, 13, 14.
    #[error("Invalid GTIN length {length}: expected 8, 12, 13 or 14 digits")]
    InvalidGtinLength { length: usize },

    /// Supplied check digit does not match the computed one.
    #[error("Check digit mismatch for {code}: expected {expected}, found {found}")]
    CheckDigitMismatch {
        code: String,
        expected: u8,
        found: u8,
    },

    /// Company prefix leaves no room for a serial number in the SSCC body.
    #[error("Company prefix has {length} digits, at most {max} allowed")]
    PrefixTooLong { length: usize, max: usize },

    /// Serial number does not fit in the digits left by the company prefix.
    #[error("Serial {serial} does not fit in {width} digits")]
    SerialOverflow { serial: u64, width: usize },

    /// Extension digit must be a single decimal digit.
    #[error("Invalid SSCC extension digit: {0}")]
    InvalidExtensionDigit(u8),

    /// Numeric element value exceeds the fixed width of its AI.
    ///
    /// ## When This Occurs
    /// - Net weight above 9999.99 kg for AI 3102
    /// - More than 99,999,999 colli for AI 37
    #[error("Value {value} out of range for AI ({ai})")]
    ElementOutOfRange { ai: String, value: String },

    /// Element value violates the AI's length or character set.
    #[error("Invalid value for AI ({ai}): {reason}")]
    InvalidElement { ai: String, reason: String },
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent ledger invariant violations. When one is returned no
/// state has been mutated.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Shipping unit cannot be found.
    #[error("Shipping unit not found: {0}")]
    UnitNotFound(String),

    /// Transport document cannot be found.
    #[error("Transport document not found: {0}")]
    DocumentNotFound(String),

    /// Recipient code is unknown to the catalog.
    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    /// Shipping unit is referenced by a transport document.
    ///
    /// ## User Workflow
    /// ```text
    /// Delete pallet 0801234...
    ///      │
    ///      ▼
    /// unit.document_id = Some("ddt-42")
    ///      │
    ///      ▼
    /// UnitLinkedToDocument → UI: "delete the DDT first"
    /// ```
    #[error("Shipping unit {unit_id} is linked to transport document {document_id}")]
    UnitLinkedToDocument {
        unit_id: String,
        document_id: String,
    },

    /// Unit selected for a document already belongs to a different document.
    #[error("Shipping unit {unit_id} already belongs to transport document {document_id}")]
    UnitAlreadyLinked {
        unit_id: String,
        document_id: String,
    },

    /// Unit selected for a document is addressed to a different recipient.
    #[error("Shipping unit {unit_id} is for recipient {unit_recipient}, document is for {document_recipient}")]
    RecipientMismatch {
        unit_id: String,
        unit_recipient: String,
        document_recipient: String,
    },

    /// A shipping unit must carry at least one line.
    #[error("Shipping unit has no lines")]
    EmptyUnit,

    /// A transport document must reference at least one shipping unit.
    #[error("Transport document has no shipping units")]
    EmptyDocument,

    /// Another document already uses this number.
    #[error("Transport document number {number} already used by {document_id}")]
    DuplicateDocumentNumber { number: String, document_id: String },

    /// An existing unit already carries this SSCC.
    ///
    /// Happens when the serial counter was moved back in settings.
    #[error("SSCC {0} is already assigned to another shipping unit")]
    DuplicateSscc(String),

    /// The serial counter cannot advance any further.
    #[error("Serial counter exhausted at {0}")]
    SerialExhausted(u64),

    /// GS1 error (wraps Gs1Error).
    #[error("GS1 error: {0}")]
    Gs1(#[from] Gs1Error),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when master data or document input doesn't meet
/// requirements. Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or more.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid origin code, non-numeric weight).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate article code).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// GTIN or other GS1 field failed GS1 validation.
    #[error("{field}: {source}")]
    Gs1 {
        field: String,
        #[source]
        source: Gs1Error,
    },
}

impl ValidationError {
    /// Shorthand for a `Required` error.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for an `InvalidFormat` error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience type alias for Results with Gs1Error.
pub type Gs1Result<T> = Result<T, Gs1Error>;

// =============================================================================
// Unit Tests
// =============================================================================
