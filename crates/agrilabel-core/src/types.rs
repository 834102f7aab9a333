//! # Domain Types
//!
//! Master data, shipping units and transport documents.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Master data (Catalog)                                                  │
//! │  ┌───────────────┐ ┌───────────────┐ ┌───────────────┐ ┌─────────────┐ │
//! │  │   Article     │ │  Packaging    │ │  PalletType   │ │  Recipient  │ │
//! │  │  code (key)   │ │  id, tare     │ │  id, tare     │ │  code (key) │ │
//! │  │  gtin (GTIN14)│ │  dimensions   │ │  max load     │ │  address    │ │
//! │  └───────┬───────┘ └───────┬───────┘ └───────┬───────┘ └──────┬──────┘ │
//! │          │ snapshot        │ snapshot        │                │        │
//! │  ┌───────▼─────────────────▼─────────────────▼───────┐        │        │
//! │  │ ShippingUnit (pallet)  sscc, lines[], totals      │◄───────┤        │
//! │  │   └── ShipmentLine     count, tares, gross, net   │        │        │
//! │  │         └── LinePallet instance id, tare          │        │        │
//! │  └───────────────────────▲───────────────────────────┘        │        │
//! │                          │ document_id / unit_ids             │        │
//! │  ┌───────────────────────┴───────────────────────────┐        │        │
//! │  │ TransportDocument (DDT)  number NNN/YYYY, carrier │◄───────┘        │
//! │  └───────────────────────────────────────────────────┘                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Packaging and pallet tares are copied into the line when selected. Editing
//! master data afterwards never changes the weight of an existing unit.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::gs1::{Gs1Payload, Gtin, Sscc};
use crate::weight::Weight;

// =============================================================================
// Unit of Measure
// =============================================================================

/// How an article is sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitOfMeasure {
    /// Sold by weight.
    Kg,
    /// Sold by piece. Always weighed as fixed.
    Pz,
}

impl Default for UnitOfMeasure {
    fn default() -> Self {
        UnitOfMeasure::Kg
    }
}

impl UnitOfMeasure {
    /// Label printed in document summaries.
    pub const fn label(&self) -> &'static str {
        match self {
            UnitOfMeasure::Kg => "KG",
            UnitOfMeasure::Pz => "PZ",
        }
    }
}

// =============================================================================
// Weighing Mode
// =============================================================================

/// Whether net weight comes from the article or from the scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum WeighingMode {
    /// Net = unit weight × count.
    Fixed,
    /// Net = scale reading − tare.
    Variable,
}

impl Default for WeighingMode {
    fn default() -> Self {
        WeighingMode::Variable
    }
}

// =============================================================================
// Article
// =============================================================================

/// A product the company ships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Business key, unique in the catalog.
    pub code: String,

    pub description: String,

    /// Canonical 14-digit GTIN.
    pub gtin: Gtin,

    /// ISO alpha-2 or 3-digit numeric country code, upper-case.
    pub origin: String,

    pub unit_of_measure: UnitOfMeasure,

    pub weighing_mode: WeighingMode,

    /// Net weight of one collo. Only meaningful for fixed-weight articles.
    pub unit_weight: Weight,

    /// Packaging pre-selected when the article is chosen on a line.
    pub default_packaging_id: Option<String>,
}

impl Article {
    /// True when net weight is derived from the unit weight rather than the scale.
    #[inline]
    pub fn is_fixed_weight(&self) -> bool {
        self.weighing_mode == WeighingMode::Fixed || self.unit_of_measure == UnitOfMeasure::Pz
    }
}

// =============================================================================
// Packaging & Pallet Types
// =============================================================================

/// A collo container (box, crate, returnable plastic crate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Packaging {
    pub id: String,
    pub name: String,
    /// Tare of one empty container.
    pub tare: Weight,
    /// Returnable container from a pooling circuit (CPR, IFCO).
    #[serde(default)]
    pub is_pooling: bool,
    pub width_mm: Option<u32>,
    pub depth_mm: Option<u32>,
    pub height_mm: Option<u32>,
}

/// A pallet base (EPAL, half pallet, plastic).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PalletType {
    pub id: String,
    pub name: String,
    pub tare: Weight,
    #[serde(default)]
    pub is_pooling: bool,
    pub width_mm: Option<u32>,
    pub depth_mm: Option<u32>,
    pub height_mm: Option<u32>,
    pub max_load: Option<Weight>,
}

// =============================================================================
// Recipient
// =============================================================================

/// Consignee of shipping units and transport documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub code: String,
    pub name: String,
    pub address: String,
    pub vat_number: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

// =============================================================================
// Shipment Line
// =============================================================================

/// A physical pallet base attached to a line.
///
/// Each instance has its own id so two pallets of the same type can be
/// detached independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LinePallet {
    pub instance_id: String,
    pub pallet_type_id: String,
    /// Pallet type name at time of attachment (frozen).
    pub name: String,
    /// Pallet type tare at time of attachment (frozen).
    pub tare: Weight,
}

/// One article/batch row within a shipping unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentLine {
    pub id: String,
    /// `None` until the operator picks an article.
    pub article_code: Option<String>,
    /// Lot code, free text as entered.
    pub batch: String,
    /// `YYYY-MM-DD` as entered, may be empty.
    pub harvest_date: String,
    /// Number of colli.
    pub count: u32,
    pub packaging_id: Option<String>,
    /// Packaging tare at time of selection (frozen).
    pub packaging_tare: Weight,
    pub pallets: Vec<LinePallet>,
    /// Scale reading. Derived for fixed-weight articles.
    pub gross_weight: Weight,
    /// Always derived, never entered.
    pub net_weight: Weight,
}

impl ShipmentLine {
    /// Creates an empty line with a fresh id.
    pub fn new() -> Self {
        ShipmentLine {
            id: uuid::Uuid::new_v4().to_string(),
            article_code: None,
            batch: String::new(),
            harvest_date: String::new(),
            count: 0,
            packaging_id: None,
            packaging_tare: Weight::zero(),
            pallets: Vec::new(),
            gross_weight: Weight::zero(),
            net_weight: Weight::zero(),
        }
    }

    /// Trimmed batch, `None` when blank.
    pub fn batch_code(&self) -> Option<&str> {
        let batch = self.batch.trim();
        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }
}

impl Default for ShipmentLine {
    fn default() -> Self {
        ShipmentLine::new()
    }
}

// =============================================================================
// Shipping Unit
// =============================================================================

/// A finalized pallet with its SSCC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ShippingUnit {
    pub id: String,
    /// Assigned at first finalization, never changes afterwards.
    pub sscc: Sscc,
    pub recipient_code: String,
    pub lines: Vec<ShipmentLine>,
    pub net_weight: Weight,
    pub gross_weight: Weight,
    pub tare_weight: Weight,
    /// Encodable label content derived from the lines.
    pub payload: Gs1Payload,
    /// Transport document this unit travels with.
    pub document_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl ShippingUnit {
    /// Total number of colli across all lines.
    pub fn total_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.count)).sum()
    }
}

// =============================================================================
// Transport Document
// =============================================================================

/// Documento di trasporto (DDT).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TransportDocument {
    pub id: String,
    /// `NNN/YYYY`.
    pub number: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub recipient_code: String,
    /// Ordered shipping unit ids.
    pub unit_ids: Vec<String>,
    pub notes: Option<String>,
    pub carrier_name: String,
    pub carrier_address: Option<String>,
    pub transport_reason: String,
    pub goods_appearance: String,
    /// Start of transport, as entered.
    pub transport_start: String,
    /// Porto / incoterm (e.g. "Franco", "Assegnato").
    pub port: String,
    pub license_plate: Option<String>,
    pub trailer_plate: Option<String>,
    /// Pallet places on the truck floor.
    pub pallet_count: u32,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Serial State
// =============================================================================

/// SSCC numbering state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SerialState {
    pub company_prefix: String,
    pub extension_digit: u8,
    /// Serial the next new unit receives.
    pub next_serial: u64,
}

impl Default for SerialState {
    fn default() -> Self {
        SerialState {
            company_prefix: "8012345".to_string(),
            extension_digit: 0,
            next_serial: 1,
        }
    }
}

// =============================================================================
// Drafts
// =============================================================================

/// Unit content submitted for finalization or update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UnitDraft {
    pub recipient_code: String,
    pub lines: Vec<ShipmentLine>,
}

/// Transport document submitted for creation or replacement.
///
/// `id` set means "replace this document".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDraft {
    pub id: Option<String>,
    pub number: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub recipient_code: String,
    pub unit_ids: Vec<String>,
    pub notes: Option<String>,
    pub carrier_name: String,
    pub carrier_address: Option<String>,
    pub transport_reason: String,
    pub goods_appearance: String,
    pub transport_start: String,
    pub port: String,
    pub license_plate: Option<String>,
    pub trailer_plate: Option<String>,
    /// Defaults to the number of selected units.
    pub pallet_count: Option<u32>,
}

impl DocumentDraft {
    /// Draft with the usual defaults for a sale shipped by the sender.
    pub fn new(number: impl Into<String>, date: NaiveDate, recipient_code: impl Into<String>) -> Self {
        DocumentDraft {
            id: None,
            number: number.into(),
            date,
            recipient_code: recipient_code.into(),
            unit_ids: Vec::new(),
            notes: None,
            carrier_name: "Mittente".to_string(),
            carrier_address: None,
            transport_reason: "Vendita".to_string(),
            goods_appearance: "Pedane".to_string(),
            transport_start: String::new(),
            port: "Franco".to_string(),
            license_plate: None,
            trailer_plate: None,
            pallet_count: None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
