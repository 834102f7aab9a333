//! # Transport Document Helpers
//!
//! Number suggestion and the product summary printed in the DDT body.
//!
//! ```text
//! Units on the document           Summary rows (grouped by article)
//! ┌──────────────────────┐        ┌───────────────────────────────────────┐
//! │ U1: ART01 L01 10 col │        │ ART01 KG 15 colli 134.25 kg L01, L02  │
//! │ U2: ART01 L02  5 col │ ─────► │ ART02 KG  4 colli  60.00 kg L07       │
//! │     ART02 L07  4 col │        ├───────────────────────────────────────┤
//! └──────────────────────┘        │ net │ tare │ gross  (Σ unit totals)   │
//!                                 └───────────────────────────────────────┘
//! ```

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::catalog::Catalog;
use crate::types::{ShippingUnit, TransportDocument, UnitOfMeasure};
use crate::weighing::UnitTotals;
use crate::weight::Weight;

/// Origin printed when a line's article is no longer in the catalog.
const FALLBACK_ORIGIN: &str = "ITALIA";

// =============================================================================
// Document Number
// =============================================================================

/// Suggests `NNN/YYYY` for a document dated `today`.
///
/// Takes the highest leading number among documents dated in the same year
/// and adds one. Advisory only: the operator may type any number, and
/// uniqueness is checked when the document is saved.
///
/// ## Example
/// ```rust
/// use agrilabel_core::document::suggest_document_number;
/// use agrilabel_core::types::TransportDocument;
/// use chrono::NaiveDate;
///
/// let none: Vec<TransportDocument> = Vec::new();
/// let today = NaiveDate::from_ymd_opt(2024, 9, 20).unwrap();
/// assert_eq!(suggest_document_number(&none, today), "001/2024");
/// ```
pub fn suggest_document_number<'a>(
    documents: impl IntoIterator<Item = &'a TransportDocument>,
    today: NaiveDate,
) -> String {
    let year = today.year();
    let max = documents
        .into_iter()
        .filter(|document| document.date.year() == year)
        .filter_map(|document| leading_number(&document.number))
        .max()
        .unwrap_or(0);

    format!("{:03}/{}", max.saturating_add(1), year)
}

/// Numeric part before the first `/`, ignoring anything unparsable.
fn leading_number(number: &str) -> Option<u32> {
    number.split('/').next()?.trim().parse().ok()
}

// =============================================================================
// Summary
// =============================================================================

/// One article row of the document body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub article_code: String,
    /// Article description, or the code when the article is gone.
    pub description: String,
    pub unit_of_measure: UnitOfMeasure,
    pub origin: String,
    pub count: u64,
    pub net_weight: Weight,
    /// Distinct batches in order of first appearance.
    pub batches: Vec<String>,
}

/// Product rows and weight totals of a transport document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub document_id: String,
    pub rows: Vec<SummaryRow>,
    pub total_count: u64,
    pub totals: UnitTotals,
}

/// Builds the summary for `document` from its units.
pub fn summarize(
    document: &TransportDocument,
    units: &[&ShippingUnit],
    catalog: &Catalog,
) -> DocumentSummary {
    let mut rows: Vec<SummaryRow> = Vec::new();

    for line in units.iter().flat_map(|unit| unit.lines.iter()) {
        let code = line.article_code.clone().unwrap_or_default();

        let index = match rows.iter().position(|row| row.article_code == code) {
            Some(index) => index,
            None => {
                let article = catalog.article(&code);
                rows.push(SummaryRow {
                    description: article.map_or_else(|| code.clone(), |a| a.description.clone()),
                    unit_of_measure: article.map_or(UnitOfMeasure::Kg, |a| a.unit_of_measure),
                    origin: article.map_or_else(|| FALLBACK_ORIGIN.to_string(), |a| a.origin.clone()),
                    article_code: code,
                    count: 0,
                    net_weight: Weight::zero(),
                    batches: Vec::new(),
                });
                rows.len() - 1
            }
        };

        let row = &mut rows[index];
        row.count += u64::from(line.count);
        row.net_weight += line.net_weight;
        if let Some(batch) = line.batch_code() {
            if !row.batches.iter().any(|known| known == batch) {
                row.batches.push(batch.to_string());
            }
        }
    }

    let totals = units
        .iter()
        .map(|unit| UnitTotals {
            net: unit.net_weight,
            gross: unit.gross_weight,
            tare: unit.tare_weight,
        })
        .fold(UnitTotals::default(), |acc, totals| acc + totals);

    DocumentSummary {
        document_id: document.id.clone(),
        total_count: rows.iter().map(|row| row.count).sum(),
        rows,
        totals,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
