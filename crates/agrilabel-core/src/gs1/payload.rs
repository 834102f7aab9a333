//! # GS1 Payload Builder
//!
//! Derives the Application Identifier element string printed on a pallet
//! label.
//!
//! ## Element Order
//! ```text
//! (00) SSCC ─────────────────────────────── always
//! (02) GTIN of contained goods ──────────── one article, not mixed
//! (37) collo count ──────────────────────── with (02), when > 0
//! (3102) net kg, 2 implied decimals ─────── net > 0
//! (10) batch ────────────────────────────── one batch, not mixed
//! (7007) harvest date YYYYMMDD ──────────── one date, 8 digits
//! ```
//!
//! ## Two Renderings
//! - **Human readable**: `(00)080123450000000012(3102)008950`
//! - **Barcode data**: AIs and values concatenated; a group separator
//!   (ASCII 29, FNC1 in the symbol) terminates every variable-length
//!   field that is not the last one
//!
//! Values that would produce an invalid symbol are rejected instead of
//! being truncated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use ts_rs::TS;

use crate::catalog::Catalog;
use crate::error::{Gs1Error, Gs1Result};
use crate::gs1::Sscc;
use crate::types::ShipmentLine;
use crate::weight::Weight;

/// ASCII 29, encoded as FNC1 in GS1-128.
pub const GROUP_SEPARATOR: char = '\u{1d}';

/// Largest value AI (3102) can carry: 9999.99 kg.
const MAX_NET_HUNDREDTHS: i64 = 999_999;

/// Largest value AI (37) can carry.
const MAX_COUNT: u64 = 99_999_999;

/// Maximum length of an AI (10) batch.
const MAX_BATCH_LEN: usize = 20;

// =============================================================================
// Application Identifiers
// =============================================================================

/// The Application Identifiers this system emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ApplicationIdentifier {
    #[serde(rename = "00")]
    Sscc,
    #[serde(rename = "02")]
    ContentGtin,
    #[serde(rename = "37")]
    Count,
    #[serde(rename = "3102")]
    NetWeightKg,
    #[serde(rename = "10")]
    Batch,
    #[serde(rename = "7007")]
    HarvestDate,
}

impl ApplicationIdentifier {
    /// The AI digits.
    pub const fn code(&self) -> &'static str {
        match self {
            ApplicationIdentifier::Sscc => "00",
            ApplicationIdentifier::ContentGtin => "02",
            ApplicationIdentifier::Count => "37",
            ApplicationIdentifier::NetWeightKg => "3102",
            ApplicationIdentifier::Batch => "10",
            ApplicationIdentifier::HarvestDate => "7007",
        }
    }

    /// Whether the field needs a separator when followed by another field.
    pub const fn is_variable_length(&self) -> bool {
        matches!(
            self,
            ApplicationIdentifier::Count | ApplicationIdentifier::Batch
        )
    }
}

/// One AI with its encoded value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AiElement {
    pub ai: ApplicationIdentifier,
    pub value: String,
}

impl AiElement {
    fn new(ai: ApplicationIdentifier, value: impl Into<String>) -> Self {
        AiElement {
            ai,
            value: value.into(),
        }
    }
}

// =============================================================================
// Payload
// =============================================================================

/// Label content for one shipping unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Gs1Payload {
    /// `(AI)value` form printed under the barcode. Bracket-aware renderers
    /// accept it as input too.
    pub human_readable: String,
    /// Raw symbol data with group separators.
    pub barcode_data: String,
    /// More than one article or more than one batch on the unit.
    pub mixed_content: bool,
    pub elements: Vec<AiElement>,
}

impl Gs1Payload {
    /// Value of an AI, if present.
    pub fn element(&self, ai: ApplicationIdentifier) -> Option<&str> {
        self.elements
            .iter()
            .find(|element| element.ai == ai)
            .map(|element| element.value.as_str())
    }

    fn from_elements(elements: Vec<AiElement>, mixed_content: bool) -> Self {
        let mut human_readable = String::new();
        let mut barcode_data = String::new();

        for (index, element) in elements.iter().enumerate() {
            human_readable.push('(');
            human_readable.push_str(element.ai.code());
            human_readable.push(')');
            human_readable.push_str(&element.value);

            barcode_data.push_str(element.ai.code());
            barcode_data.push_str(&element.value);
            let is_last = index + 1 == elements.len();
            if element.ai.is_variable_length() && !is_last {
                barcode_data.push(GROUP_SEPARATOR);
            }
        }

        Gs1Payload {
            human_readable,
            barcode_data,
            mixed_content,
            elements,
        }
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builds the payload for a unit's lines.
///
/// `net` is the unit's aggregate net weight. GTINs are resolved through the
/// catalog; an article code that no longer resolves omits (02) and (37).
///
/// (3102) is present whenever `net` is positive and carries the net rounded
/// to hundredths of a kilogram, so a net between 1 and 4 grams is encoded as
/// `(3102)000000`.
///
/// ## Errors
/// - `ElementOutOfRange` for net above 9999.99 kg or more than 8 count digits
/// - `InvalidElement` for a batch longer than 20 characters or outside
///   GS1 character set 82
pub fn build_payload(
    sscc: &Sscc,
    lines: &[ShipmentLine],
    net: Weight,
    catalog: &Catalog,
) -> Gs1Result<Gs1Payload> {
    let article_codes: BTreeSet<&str> = lines
        .iter()
        .filter_map(|line| line.article_code.as_deref())
        .filter(|code| !code.is_empty())
        .collect();
    let batches: BTreeSet<&str> = lines.iter().filter_map(ShipmentLine::batch_code).collect();
    let harvest_dates: BTreeSet<&str> = lines
        .iter()
        .map(|line| line.harvest_date.trim())
        .filter(|date| !date.is_empty())
        .collect();

    let mixed_content = article_codes.len() > 1 || batches.len() > 1;

    let mut elements = vec![AiElement::new(ApplicationIdentifier::Sscc, sscc.as_str())];

    if !mixed_content {
        let article = single(&article_codes).and_then(|code| catalog.article(code));
        if let Some(article) = article {
            elements.push(AiElement::new(
                ApplicationIdentifier::ContentGtin,
                article.gtin.as_str(),
            ));

            let count: u64 = lines.iter().map(|line| u64::from(line.count)).sum();
            if count > MAX_COUNT {
                return Err(Gs1Error::ElementOutOfRange {
                    ai: ApplicationIdentifier::Count.code().to_string(),
                    value: count.to_string(),
                });
            }
            if count > 0 {
                elements.push(AiElement::new(ApplicationIdentifier::Count, count.to_string()));
            }
        }
    }

    if net.is_positive() {
        let hundredths = net.hundredths();
        if hundredths > MAX_NET_HUNDREDTHS {
            return Err(Gs1Error::ElementOutOfRange {
                ai: ApplicationIdentifier::NetWeightKg.code().to_string(),
                value: net.format_kg(),
            });
        }
        elements.push(AiElement::new(
            ApplicationIdentifier::NetWeightKg,
            format!("{:06}", hundredths),
        ));
    }

    if !mixed_content {
        if let Some(batch) = single(&batches) {
            validate_batch(batch)?;
            elements.push(AiElement::new(ApplicationIdentifier::Batch, batch));
        }
    }

    if let Some(date) = single(&harvest_dates) {
        let compact: String = date.chars().filter(|c| *c != '-').collect();
        if compact.len() == 8 && compact.bytes().all(|b| b.is_ascii_digit()) {
            elements.push(AiElement::new(ApplicationIdentifier::HarvestDate, compact));
        }
    }

    Ok(Gs1Payload::from_elements(elements, mixed_content))
}

fn single<'a>(set: &BTreeSet<&'a str>) -> Option<&'a str> {
    if set.len() == 1 {
        set.iter().next().copied()
    } else {
        None
    }
}

fn validate_batch(batch: &str) -> Gs1Result<()> {
    let ai = ApplicationIdentifier::Batch.code();

    let length = batch.chars().count();
    if length > MAX_BATCH_LEN {
        return Err(Gs1Error::InvalidElement {
            ai: ai.to_string(),
            reason: format!("{} characters, at most {} allowed", length, MAX_BATCH_LEN),
        });
    }

    if let Some(bad) = batch.chars().find(|c| !is_cset82(*c)) {
        return Err(Gs1Error::InvalidElement {
            ai: ai.to_string(),
            reason: format!("character '{}' is not allowed in GS1 data", bad),
        });
    }

    Ok(())
}

/// GS1 character set 82.
fn is_cset82(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!\"%&'()*+,-./:;<=>?_".contains(c)
}

// =============================================================================
// Unit Tests
// =============================================================================
