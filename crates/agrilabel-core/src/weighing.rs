//! # Weighing
//!
//! Per-line and per-unit tare, net and gross computation.
//!
//! ## Line Formula
//! ```text
//! pallets_tare = Σ pallet.tare
//! line_tare    = packaging_tare × count + pallets_tare
//!
//!                   ┌─────────────────────────┬───────────────────────────┐
//!                   │ FIXED article or PZ     │ VARIABLE / no article     │
//! ┌─────────────────┼─────────────────────────┼───────────────────────────┤
//! │ net             │ unit_weight × count     │ max(0, gross − line_tare) │
//! │ gross           │ net + line_tare         │ scale reading (kept)      │
//! └─────────────────┴─────────────────────────┴───────────────────────────┘
//!
//! unit.net = Σ net      unit.gross = Σ gross      unit.tare = Σ line_tare
//! ```
//!
//! All arithmetic is in grams; nothing is rounded here.
//!
//! ## Operator Edits
//! [`apply_edit`] applies one [`LineEdit`] (pick article, pick packaging,
//! attach pallet, type count...) and recomputes the line. Lookups that find
//! incomplete master data produce [`LineWarning`]s instead of failing, so
//! the operator can keep weighing.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::catalog::Catalog;
use crate::types::{Article, LinePallet, ShipmentLine};
use crate::validation::{parse_count_lenient, parse_count_strict, ValidationResult};
use crate::weight::Weight;

// =============================================================================
// Line Computation
// =============================================================================

/// Sum of the pallet tares attached to a line.
pub fn pallets_tare(line: &ShipmentLine) -> Weight {
    line.pallets.iter().map(|pallet| pallet.tare).sum()
}

/// Packaging tare for every collo plus attached pallets.
pub fn line_tare(line: &ShipmentLine) -> Weight {
    line.packaging_tare.multiply_count(line.count) + pallets_tare(line)
}

/// Recomputes net (and for fixed-weight articles gross) for one line.
///
/// `article` is the line's resolved article; `None` takes the variable path.
///
/// ## Example
/// ```rust
/// use agrilabel_core::types::ShipmentLine;
/// use agrilabel_core::weighing::compute_line;
/// use agrilabel_core::weight::Weight;
///
/// let line = ShipmentLine {
///     count: 10,
///     packaging_tare: Weight::from_grams(600),
///     gross_weight: Weight::from_grams(120_500),
///     ..ShipmentLine::new()
/// };
/// let line = compute_line(&line, None);
/// assert_eq!(line.net_weight.format_kg(), "114.50");
/// ```
pub fn compute_line(line: &ShipmentLine, article: Option<&Article>) -> ShipmentLine {
    let mut line = line.clone();
    let tare = line_tare(&line);

    match article.filter(|article| article.is_fixed_weight()) {
        Some(article) => {
            line.net_weight = article.unit_weight.multiply_count(line.count);
            line.gross_weight = line.net_weight + tare;
        }
        None => {
            line.net_weight = (line.gross_weight - tare).clamp_non_negative();
        }
    }

    line
}

/// Recomputes a line, resolving its article through the catalog.
pub fn recompute(line: &ShipmentLine, catalog: &Catalog) -> ShipmentLine {
    let article = line
        .article_code
        .as_deref()
        .and_then(|code| catalog.article(code));
    compute_line(line, article)
}

/// True when the scale reading is below the line tare and net was clamped.
pub fn is_net_clamped(line: &ShipmentLine) -> bool {
    line.net_weight.is_zero() && line.gross_weight < line_tare(line)
}

// =============================================================================
// Aggregation
// =============================================================================

/// Aggregate weights of a shipping unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UnitTotals {
    pub net: Weight,
    pub gross: Weight,
    pub tare: Weight,
}

impl std::ops::Add for UnitTotals {
    type Output = UnitTotals;

    fn add(self, other: UnitTotals) -> UnitTotals {
        UnitTotals {
            net: self.net + other.net,
            gross: self.gross + other.gross,
            tare: self.tare + other.tare,
        }
    }
}

/// Sums already-computed lines.
pub fn aggregate(lines: &[ShipmentLine]) -> UnitTotals {
    lines
        .iter()
        .map(|line| UnitTotals {
            net: line.net_weight,
            gross: line.gross_weight,
            tare: line_tare(line),
        })
        .fold(UnitTotals::default(), |acc, totals| acc + totals)
}

/// Recomputes every line and aggregates the result.
pub fn recompute_all(lines: &[ShipmentLine], catalog: &Catalog) -> (Vec<ShipmentLine>, UnitTotals) {
    let lines: Vec<ShipmentLine> = lines.iter().map(|line| recompute(line, catalog)).collect();
    let totals = aggregate(&lines);
    (lines, totals)
}

// =============================================================================
// Input Policy
// =============================================================================

/// How operator-typed numbers are parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum InputPolicy {
    /// Non-numeric input becomes zero.
    #[default]
    Lenient,
    /// Non-numeric input is rejected.
    Strict,
}

impl InputPolicy {
    pub fn parse_weight(&self, input: &str, field: &str) -> ValidationResult<Weight> {
        match self {
            InputPolicy::Lenient => Ok(Weight::parse_lenient(input)),
            InputPolicy::Strict => Weight::parse_strict(input, field),
        }
    }

    pub fn parse_count(&self, input: &str, field: &str) -> ValidationResult<u32> {
        match self {
            InputPolicy::Lenient => Ok(parse_count_lenient(input)),
            InputPolicy::Strict => parse_count_strict(input, field),
        }
    }
}

// =============================================================================
// Line Edits
// =============================================================================

/// An operator edit on a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum LineEdit {
    /// Picks (or clears) the article; fills its default packaging.
    SelectArticle(Option<String>),
    /// Picks (or clears) the packaging; snapshots its tare.
    SelectPackaging(Option<String>),
    /// Adds one pallet base of the given type.
    AttachPallet(String),
    /// Removes one pallet base by instance id.
    DetachPallet(String),
    SetCount(u32),
    SetGrossWeight(Weight),
    SetBatch(String),
    SetHarvestDate(String),
}

/// Non-blocking notices produced while editing a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LineWarning {
    /// The article has no default packaging configured.
    NoDefaultPackaging { article: String },
    /// The article's default packaging is not in the catalog.
    DefaultPackagingNotFound {
        article: String,
        #[serde(rename = "packagingId")]
        packaging_id: String,
    },
    /// The article's default packaging has no tare.
    DefaultPackagingZeroTare {
        article: String,
        #[serde(rename = "packagingId")]
        packaging_id: String,
    },
    /// The selected packaging is not in the catalog; tare set to zero.
    UnknownPackaging {
        #[serde(rename = "packagingId")]
        packaging_id: String,
    },
    /// The pallet type is not in the catalog; nothing attached.
    UnknownPalletType {
        #[serde(rename = "palletTypeId")]
        pallet_type_id: String,
    },
    /// Scale reading is below the tare; net clamped to zero.
    NetClamped { gross: Weight, tare: Weight },
}

/// A recomputed line with the warnings its edit raised.
#[derive(Debug, Clone, PartialEq)]
pub struct EditedLine {
    pub line: ShipmentLine,
    pub warnings: Vec<LineWarning>,
}

/// Applies one edit and recomputes the line.
pub fn apply_edit(line: &ShipmentLine, edit: LineEdit, catalog: &Catalog) -> EditedLine {
    let mut line = line.clone();
    let mut warnings = Vec::new();

    match edit {
        LineEdit::SelectArticle(code) => {
            line.article_code = code.filter(|code| !code.is_empty());
            let article = line
                .article_code
                .as_deref()
                .and_then(|code| catalog.article(code));
            if let Some(article) = article {
                fill_default_packaging(&mut line, article, catalog, &mut warnings);
            }
        }
        LineEdit::SelectPackaging(id) => {
            line.packaging_id = id.filter(|id| !id.is_empty());
            line.packaging_tare = match line.packaging_id.as_deref() {
                Some(id) => match catalog.packaging(id) {
                    Some(packaging) => packaging.tare,
                    None => {
                        warnings.push(LineWarning::UnknownPackaging {
                            packaging_id: id.to_string(),
                        });
                        Weight::zero()
                    }
                },
                None => Weight::zero(),
            };
        }
        LineEdit::AttachPallet(pallet_type_id) => match catalog.pallet_type(&pallet_type_id) {
            Some(pallet_type) => line.pallets.push(LinePallet {
                instance_id: uuid::Uuid::new_v4().to_string(),
                pallet_type_id: pallet_type.id.clone(),
                name: pallet_type.name.clone(),
                tare: pallet_type.tare,
            }),
            None => warnings.push(LineWarning::UnknownPalletType { pallet_type_id }),
        },
        LineEdit::DetachPallet(instance_id) => {
            line.pallets.retain(|pallet| pallet.instance_id != instance_id);
        }
        LineEdit::SetCount(count) => line.count = count,
        LineEdit::SetGrossWeight(gross) => line.gross_weight = gross,
        LineEdit::SetBatch(batch) => line.batch = batch,
        LineEdit::SetHarvestDate(date) => line.harvest_date = date,
    }

    let line = recompute(&line, catalog);
    if is_net_clamped(&line) {
        warnings.push(LineWarning::NetClamped {
            gross: line.gross_weight,
            tare: line_tare(&line),
        });
    }

    EditedLine { line, warnings }
}

fn fill_default_packaging(
    line: &mut ShipmentLine,
    article: &Article,
    catalog: &Catalog,
    warnings: &mut Vec<LineWarning>,
) {
    let Some(packaging_id) = article.default_packaging_id.as_deref() else {
        warnings.push(LineWarning::NoDefaultPackaging {
            article: article.description.clone(),
        });
        return;
    };

    line.packaging_id = Some(packaging_id.to_string());
    match catalog.packaging(packaging_id) {
        Some(packaging) => {
            line.packaging_tare = packaging.tare;
            if packaging.tare.is_zero() {
                warnings.push(LineWarning::DefaultPackagingZeroTare {
                    article: article.description.clone(),
                    packaging_id: packaging_id.to_string(),
                });
            }
        }
        None => warnings.push(LineWarning::DefaultPackagingNotFound {
            article: article.description.clone(),
            packaging_id: packaging_id.to_string(),
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Packaging, UnitOfMeasure, WeighingMode};

    fn epal() -> LinePallet {
        LinePallet {
            instance_id: "p-1".to_string(),
            pallet_type_id: "PAL01".to_string(),
            name: "EPAL (80x120)".to_string(),
            tare: Weight::from_kg(25),
        }
    }

    fn variable_line() -> ShipmentLine {
        ShipmentLine {
            article_code: Some("ART01".to_string()),
            count: 10,
            packaging_id: Some("PACK01".to_string()),
            packaging_tare: Weight::from_grams(600),
            pallets: vec![epal()],
            gross_weight: Weight::from_grams(120_500),
            ..ShipmentLine::new()
        }
    }

    #[test]
    fn test_line_tare() {
        let line = variable_line();
        assert_eq!(pallets_tare(&line), Weight::from_kg(25));
        assert_eq!(line_tare(&line).format_kg(), "31.00");
    }

    #[test]
    fn test_variable_line_net() {
        let catalog = Catalog::with_defaults();
        let line = recompute(&variable_line(), &catalog);
        assert_eq!(line.net_weight.format_kg(), "89.50");
        assert_eq!(line.gross_weight.format_kg(), "120.50");
    }

    #[test]
    fn test_variable_line_clamps_at_zero() {
        let catalog = Catalog::with_defaults();
        let line = ShipmentLine {
            gross_weight: Weight::from_kg(20),
            ..variable_line()
        };
        let line = recompute(&line, &catalog);
        assert!(line.net_weight.is_zero());
        assert!(is_net_clamped(&line));
    }

    #[test]
    fn test_fixed_line_conserves_weight() {
        let catalog = Catalog::with_defaults();
        let line = ShipmentLine {
            article_code: Some("ART02".to_string()),
            count: 4,
            packaging_tare: Weight::from_grams(1_500),
            pallets: vec![epal()],
            gross_weight: Weight::from_kg(999),
            ..ShipmentLine::new()
        };
        let line = recompute(&line, &catalog);

        assert_eq!(line.net_weight, Weight::from_kg(60));
        assert_eq!(line.gross_weight, Weight::from_kg(91));
        assert_eq!(line.gross_weight - line_tare(&line), line.net_weight);
    }

    #[test]
    fn test_piece_articles_use_fixed_path() {
        let article = Article {
            code: "ART03".to_string(),
            description: "Meloni".to_string(),
            gtin: crate::gs1::Gtin::normalize("96385074").unwrap(),
            origin: "IT".to_string(),
            unit_of_measure: UnitOfMeasure::Pz,
            weighing_mode: WeighingMode::Variable,
            unit_weight: Weight::from_grams(1_250),
            default_packaging_id: None,
        };
        let line = ShipmentLine {
            count: 8,
            ..ShipmentLine::new()
        };
        let line = compute_line(&line, Some(&article));
        assert_eq!(line.net_weight, Weight::from_kg(10));
        assert_eq!(line.gross_weight, Weight::from_kg(10));
    }

    #[test]
    fn test_unknown_article_takes_variable_path() {
        let catalog = Catalog::with_defaults();
        let line = ShipmentLine {
            article_code: Some("GONE".to_string()),
            ..variable_line()
        };
        assert_eq!(recompute(&line, &catalog).net_weight.format_kg(), "89.50");
    }

    #[test]
    fn test_aggregate() {
        let catalog = Catalog::with_defaults();
        let fixed = ShipmentLine {
            article_code: Some("ART02".to_string()),
            count: 2,
            packaging_tare: Weight::from_grams(1_500),
            ..ShipmentLine::new()
        };
        let (lines, totals) = recompute_all(&[variable_line(), fixed], &catalog);

        assert_eq!(lines.len(), 2);
        assert_eq!(totals.net, Weight::from_grams(89_500 + 30_000));
        assert_eq!(totals.gross, Weight::from_grams(120_500 + 33_000));
        assert_eq!(totals.tare, Weight::from_grams(31_000 + 3_000));
    }

    #[test]
    fn test_absurd_tare_saturates_instead_of_overflowing() {
        let line = ShipmentLine {
            count: 10_000,
            packaging_tare: Weight::parse_lenient("9000000000000"),
            gross_weight: Weight::from_kg(500),
            ..ShipmentLine::new()
        };
        assert_eq!(line.packaging_tare.grams(), 9_000_000_000_000_000);

        let line = compute_line(&line, None);
        assert_eq!(line_tare(&line).grams(), i64::MAX);
        assert!(line.net_weight.is_zero());
        assert!(is_net_clamped(&line));

        let fixed = ShipmentLine {
            article_code: Some("ART02".to_string()),
            count: u32::MAX,
            packaging_tare: Weight::from_grams(i64::MAX / 2),
            ..ShipmentLine::new()
        };
        let fixed = recompute(&fixed, &Catalog::with_defaults());
        assert_eq!(fixed.gross_weight.grams(), i64::MAX);

        let totals = aggregate(&[line, fixed.clone(), fixed]);
        assert_eq!(totals.tare.grams(), i64::MAX);
        assert_eq!(totals.gross.grams(), i64::MAX);
        assert!(totals.net.is_positive());
    }

    #[test]
    fn test_select_article_fills_default_packaging() {
        let catalog = Catalog::with_defaults();
        let edited = apply_edit(
            &ShipmentLine::new(),
            LineEdit::SelectArticle(Some("ART01".to_string())),
            &catalog,
        );

        assert!(edited.warnings.is_empty());
        assert_eq!(edited.line.packaging_id.as_deref(), Some("PACK01"));
        assert_eq!(edited.line.packaging_tare, Weight::from_grams(600));
    }

    #[test]
    fn test_select_article_warnings() {
        let mut catalog = Catalog::with_defaults();
        let mut article = catalog.article("ART01").cloned().unwrap();

        article.default_packaging_id = None;
        catalog.save_article(article.clone()).unwrap();
        let edited = apply_edit(
            &ShipmentLine::new(),
            LineEdit::SelectArticle(Some("ART01".to_string())),
            &catalog,
        );
        assert!(matches!(
            edited.warnings.as_slice(),
            [LineWarning::NoDefaultPackaging { .. }]
        ));

        article.default_packaging_id = Some("PACK99".to_string());
        catalog.save_article(article.clone()).unwrap();
        let edited = apply_edit(
            &ShipmentLine::new(),
            LineEdit::SelectArticle(Some("ART01".to_string())),
            &catalog,
        );
        assert!(matches!(
            edited.warnings.as_slice(),
            [LineWarning::DefaultPackagingNotFound { .. }]
        ));

        catalog
            .save_packaging(Packaging {
                id: "PACK99".to_string(),
                name: "Sfuso".to_string(),
                tare: Weight::zero(),
                is_pooling: false,
                width_mm: None,
                depth_mm: None,
                height_mm: None,
            })
            .unwrap();
        let edited = apply_edit(
            &ShipmentLine::new(),
            LineEdit::SelectArticle(Some("ART01".to_string())),
            &catalog,
        );
        assert!(matches!(
            edited.warnings.as_slice(),
            [LineWarning::DefaultPackagingZeroTare { .. }]
        ));
    }

    #[test]
    fn test_attach_and_detach_pallets() {
        let catalog = Catalog::with_defaults();
        let line = ShipmentLine {
            gross_weight: Weight::from_kg(100),
            ..ShipmentLine::new()
        };

        let once = apply_edit(&line, LineEdit::AttachPallet("PAL01".to_string()), &catalog);
        let twice = apply_edit(&once.line, LineEdit::AttachPallet("PAL01".to_string()), &catalog);
        assert_eq!(twice.line.pallets.len(), 2);
        assert_ne!(twice.line.pallets[0].instance_id, twice.line.pallets[1].instance_id);
        assert_eq!(twice.line.net_weight, Weight::from_kg(50));

        let first = twice.line.pallets[0].instance_id.clone();
        let detached = apply_edit(&twice.line, LineEdit::DetachPallet(first), &catalog);
        assert_eq!(detached.line.pallets.len(), 1);
        assert_eq!(detached.line.net_weight, Weight::from_kg(75));

        let unknown = apply_edit(&line, LineEdit::AttachPallet("PAL99".to_string()), &catalog);
        assert!(unknown.line.pallets.is_empty());
        assert_eq!(unknown.warnings.len(), 1);
    }

    #[test]
    fn test_snapshot_survives_master_data_change() {
        let mut catalog = Catalog::with_defaults();
        let edited = apply_edit(
            &variable_line(),
            LineEdit::SelectPackaging(Some("PACK03".to_string())),
            &catalog,
        );
        assert_eq!(edited.line.packaging_tare, Weight::from_grams(1_200));

        let mut crate_type = catalog.packaging("PACK03").cloned().unwrap();
        crate_type.tare = Weight::from_kg(5);
        catalog.save_packaging(crate_type).unwrap();

        let recomputed = recompute(&edited.line, &catalog);
        assert_eq!(recomputed.packaging_tare, Weight::from_grams(1_200));
    }

    #[test]
    fn test_set_gross_reports_clamp() {
        let catalog = Catalog::with_defaults();
        let edited = apply_edit(
            &variable_line(),
            LineEdit::SetGrossWeight(Weight::from_kg(10)),
            &catalog,
        );
        assert!(edited.line.net_weight.is_zero());
        assert!(matches!(
            edited.warnings.as_slice(),
            [LineWarning::NetClamped { .. }]
        ));
    }

    #[test]
    fn test_input_policy() {
        assert_eq!(
            InputPolicy::Lenient.parse_weight("abc", "gross"),
            Ok(Weight::zero())
        );
        assert!(InputPolicy::Strict.parse_weight("abc", "gross").is_err());
        assert_eq!(InputPolicy::Lenient.parse_count("x", "count"), Ok(0));
        assert!(InputPolicy::Strict.parse_count("x", "count").is_err());
    }
}
