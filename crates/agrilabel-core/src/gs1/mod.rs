//! # GS1 Identifiers
//!
//! Check digits, GTIN normalization, SSCC generation and the AI element
//! string printed on pallet labels.
//!
//! ```text
//! check_digit ◄── gtin
//!      ▲
//!      └───────── sscc ◄── payload ──► Gs1Payload
//! ```

pub mod check_digit;
pub mod gtin;
pub mod payload;
pub mod sscc;

pub use gtin::Gtin;
pub use payload::{build_payload, AiElement, ApplicationIdentifier, Gs1Payload, GROUP_SEPARATOR};
pub use sscc::Sscc;
