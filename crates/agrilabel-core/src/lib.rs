//! # agrilabel-core: GS1 Encoding & Weight Reconciliation Engine
//!
//! Pure business logic for labelling pallets of fresh produce and issuing
//! transport documents. No I/O happens in this crate.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        AgriLabel Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              UI (forms, label PDF, DDT PDF, barcodes)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ plain records (serde / ts-rs)          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            agrilabel-db: LedgerService, config, SQLite          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ agrilabel-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌───────┐ │   │
//! │  │  │   gs1    │ │  weight  │ │ weighing │ │  ledger  │ │catalog│ │   │
//! │  │  │ SSCC     │ │ grams    │ │ tare/net │ │ serial,  │ │master │ │   │
//! │  │  │ GTIN, AI │ │ parsing  │ │ edits    │ │ DDT links│ │ data  │ │   │
//! │  │  └──────────┘ └──────────┘ └──────────┘ └──────────┘ └───────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`gs1`] - Check digits, GTIN-14, SSCC-18, AI element strings
//! - [`weight`] - Exact mass type (integer grams)
//! - [`weighing`] - Line and unit tare/net/gross, operator edits
//! - [`ledger`] - Serial counter and unit ↔ document linkage
//! - [`document`] - Document numbers and product summaries
//! - [`catalog`] - Master data tables
//! - [`types`] - Domain records
//! - [`validation`] - Field and master data rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use agrilabel_core::{Catalog, ShipmentLedger, ShipmentLine, UnitDraft, Weight};
//! use chrono::Utc;
//!
//! let catalog = Catalog::with_defaults();
//! let mut ledger = ShipmentLedger::default();
//!
//! let line = ShipmentLine {
//!     article_code: Some("ART01".to_string()),
//!     count: 10,
//!     packaging_tare: Weight::from_grams(600),
//!     gross_weight: Weight::from_grams(95_000),
//!     ..ShipmentLine::new()
//! };
//! let draft = UnitDraft { recipient_code: "CL01".to_string(), lines: vec![line] };
//!
//! let transition = ledger.finalize_new_unit(&draft, &catalog, Utc::now()).unwrap();
//! // ... persist transition.changes() here ...
//! let unit = transition.commit(&mut ledger);
//!
//! assert_eq!(unit.sscc.as_str(), "080123450000000012");
//! assert_eq!(unit.net_weight.format_kg(), "89.00");
//! assert_eq!(ledger.serial().next_serial, 2);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod document;
pub mod error;
pub mod gs1;
pub mod ledger;
pub mod types;
pub mod validation;
pub mod weighing;
pub mod weight;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use catalog::Catalog;
pub use error::{CoreError, CoreResult, Gs1Error, Gs1Result, ValidationError};
pub use gs1::{Gs1Payload, Gtin, Sscc};
pub use ledger::{ChangeSet, LedgerStats, ShipmentLedger, Transition};
pub use types::*;
pub use weighing::{InputPolicy, LineEdit, LineWarning, UnitTotals};
pub use weight::Weight;
