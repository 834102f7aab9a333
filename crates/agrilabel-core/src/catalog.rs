//! # Catalog
//!
//! In-memory master data: articles, packagings, pallet types, recipients.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Catalog                                                      │
//! │   articles      code ──► Article                              │
//! │   packagings    id   ──► Packaging                            │
//! │   pallet_types  id   ──► PalletType                           │
//! │   recipients    code ──► Recipient                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Saving a record with an existing key replaces it. Every record is
//! validated (and normalized) before it is stored.

use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::gs1::Gtin;
use crate::types::{Article, Packaging, PalletType, Recipient, UnitOfMeasure, WeighingMode};
use crate::validation::{
    normalize_origin, validate_article, validate_packaging, validate_pallet_type,
    validate_recipient, ValidationResult,
};
use crate::weight::Weight;

/// Master data lookup tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    articles: BTreeMap<String, Article>,
    packagings: BTreeMap<String, Packaging>,
    pallet_types: BTreeMap<String, PalletType>,
    recipients: BTreeMap<String, Recipient>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Catalog::default()
    }

    /// Catalog pre-loaded with the master data a new installation starts with.
    pub fn with_defaults() -> Self {
        let mut catalog = Catalog::new();
        for packaging in default_packagings() {
            catalog.packagings.insert(packaging.id.clone(), packaging);
        }
        for pallet in default_pallet_types() {
            catalog.pallet_types.insert(pallet.id.clone(), pallet);
        }
        for article in default_articles() {
            catalog.articles.insert(article.code.clone(), article);
        }
        for recipient in default_recipients() {
            catalog.recipients.insert(recipient.code.clone(), recipient);
        }
        catalog
    }

    /// Rebuilds a catalog from stored records without re-validating them.
    pub fn from_parts(
        articles: impl IntoIterator<Item = Article>,
        packagings: impl IntoIterator<Item = Packaging>,
        pallet_types: impl IntoIterator<Item = PalletType>,
        recipients: impl IntoIterator<Item = Recipient>,
    ) -> Self {
        Catalog {
            articles: articles.into_iter().map(|a| (a.code.clone(), a)).collect(),
            packagings: packagings.into_iter().map(|p| (p.id.clone(), p)).collect(),
            pallet_types: pallet_types.into_iter().map(|p| (p.id.clone(), p)).collect(),
            recipients: recipients.into_iter().map(|r| (r.code.clone(), r)).collect(),
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn article(&self, code: &str) -> Option<&Article> {
        self.articles.get(code)
    }

    pub fn packaging(&self, id: &str) -> Option<&Packaging> {
        self.packagings.get(id)
    }

    pub fn pallet_type(&self, id: &str) -> Option<&PalletType> {
        self.pallet_types.get(id)
    }

    pub fn recipient(&self, code: &str) -> Option<&Recipient> {
        self.recipients.get(code)
    }

    pub fn articles(&self) -> impl Iterator<Item = &Article> {
        self.articles.values()
    }

    pub fn packagings(&self) -> impl Iterator<Item = &Packaging> {
        self.packagings.values()
    }

    pub fn pallet_types(&self) -> impl Iterator<Item = &PalletType> {
        self.pallet_types.values()
    }

    pub fn recipients(&self) -> impl Iterator<Item = &Recipient> {
        self.recipients.values()
    }

    /// Articles whose code or description contains `query` (case-insensitive)
    /// or whose GTIN contains it.
    pub fn search_articles(&self, query: &str) -> Vec<&Article> {
        let needle = query.trim().to_lowercase();
        self.articles
            .values()
            .filter(|article| {
                needle.is_empty()
                    || article.code.to_lowercase().contains(&needle)
                    || article.description.to_lowercase().contains(&needle)
                    || article.gtin.as_str().contains(&needle)
            })
            .collect()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Validates and stores an article, returning the normalized record.
    ///
    /// ## Errors
    /// - Any article validation error
    /// - `Duplicate` if another article already uses the same GTIN
    pub fn save_article(&mut self, mut article: Article) -> ValidationResult<Article> {
        article.code = article.code.trim().to_string();
        article.description = article.description.trim().to_string();
        article.origin = normalize_origin(&article.origin)?;
        article.default_packaging_id = article
            .default_packaging_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        validate_article(&article)?;

        let clash = self
            .articles
            .values()
            .any(|other| other.code != article.code && other.gtin == article.gtin);
        if clash {
            return Err(ValidationError::Duplicate {
                field: "gtin".to_string(),
                value: article.gtin.to_string(),
            });
        }

        self.articles.insert(article.code.clone(), article.clone());
        Ok(article)
    }

    /// Validates and stores a packaging.
    pub fn save_packaging(&mut self, mut packaging: Packaging) -> ValidationResult<Packaging> {
        packaging.id = packaging.id.trim().to_string();
        packaging.name = packaging.name.trim().to_string();
        validate_packaging(&packaging)?;

        self.packagings.insert(packaging.id.clone(), packaging.clone());
        Ok(packaging)
    }

    /// Validates and stores a pallet type.
    pub fn save_pallet_type(&mut self, mut pallet: PalletType) -> ValidationResult<PalletType> {
        pallet.id = pallet.id.trim().to_string();
        pallet.name = pallet.name.trim().to_string();
        validate_pallet_type(&pallet)?;

        self.pallet_types.insert(pallet.id.clone(), pallet.clone());
        Ok(pallet)
    }

    /// Validates and stores a recipient.
    pub fn save_recipient(&mut self, mut recipient: Recipient) -> ValidationResult<Recipient> {
        recipient.code = recipient.code.trim().to_string();
        recipient.name = recipient.name.trim().to_string();
        recipient.address = recipient.address.trim().to_string();
        validate_recipient(&recipient)?;

        self.recipients
            .insert(recipient.code.clone(), recipient.clone());
        Ok(recipient)
    }

    /// Removes an article. Existing units keep their snapshots.
    pub fn remove_article(&mut self, code: &str) -> Option<Article> {
        self.articles.remove(code)
    }

    pub fn remove_packaging(&mut self, id: &str) -> Option<Packaging> {
        self.packagings.remove(id)
    }

    pub fn remove_pallet_type(&mut self, id: &str) -> Option<PalletType> {
        self.pallet_types.remove(id)
    }

    pub fn remove_recipient(&mut self, code: &str) -> Option<Recipient> {
        self.recipients.remove(code)
    }
}

// =============================================================================
// Default Master Data
// =============================================================================

fn packaging(id: &str, name: &str, tare_grams: i64, is_pooling: bool) -> Packaging {
    Packaging {
        id: id.to_string(),
        name: name.to_string(),
        tare: Weight::from_grams(tare_grams),
        is_pooling,
        width_mm: None,
        depth_mm: None,
        height_mm: None,
    }
}

fn pallet_type(id: &str, name: &str, tare_kg: i64, is_pooling: bool) -> PalletType {
    PalletType {
        id: id.to_string(),
        name: name.to_string(),
        tare: Weight::from_kg(tare_kg),
        is_pooling,
        width_mm: None,
        depth_mm: None,
        height_mm: None,
        max_load: None,
    }
}

/// Default packagings.
pub fn default_packagings() -> Vec<Packaging> {
    vec![
        packaging("PACK01", "Cartone 40x60", 600, false),
        packaging("PACK02", "Cassa Legno", 1_500, false),
        packaging("PACK03", "CPR 40x60", 1_200, true),
        packaging("PACK04", "IFCO 40x60", 1_100, true),
    ]
}

/// Default pallet types.
pub fn default_pallet_types() -> Vec<PalletType> {
    vec![
        pallet_type("PAL01", "EPAL (80x120)", 25, true),
        pallet_type("PAL02", "Philips (100x120)", 30, true),
        pallet_type("PAL03", "Mezza Pedana (60x80)", 12, false),
        pallet_type("PAL04", "Plastica (80x120)", 15, false),
    ]
}

/// Default articles.
pub fn default_articles() -> Vec<Article> {
    let mut articles = Vec::new();

    if let Ok(gtin) = Gtin::normalize("8012345000012") {
        articles.push(Article {
            code: "ART01".to_string(),
            description: "Mele Gala 75/80".to_string(),
            gtin,
            origin: "380".to_string(),
            unit_of_measure: UnitOfMeasure::Kg,
            weighing_mode: WeighingMode::Variable,
            unit_weight: Weight::zero(),
            default_packaging_id: Some("PACK01".to_string()),
        });
    }

    if let Ok(gtin) = Gtin::normalize("8012345000029") {
        articles.push(Article {
            code: "ART02".to_string(),
            description: "Pere Abate 14/16".to_string(),
            gtin,
            origin: "380".to_string(),
            unit_of_measure: UnitOfMeasure::Kg,
            weighing_mode: WeighingMode::Fixed,
            unit_weight: Weight::from_kg(15),
            default_packaging_id: Some("PACK02".to_string()),
        });
    }

    articles
}

/// Default recipients.
pub fn default_recipients() -> Vec<Recipient> {
    vec![Recipient {
        code: "CL01".to_string(),
        name: "GDO Logistica Nord".to_string(),
        address: "Interporto Blocco A, 20100 Milano (MI)".to_string(),
        vat_number: None,
        email: None,
        phone: None,
    }]
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_complete() {
        let catalog = Catalog::with_defaults();
        assert_eq!(catalog.articles().count(), 2);
        assert_eq!(catalog.packagings().count(), 4);
        assert_eq!(catalog.pallet_types().count(), 4);
        assert_eq!(catalog.recipients().count(), 1);

        assert_eq!(
            catalog.packaging("PACK01").map(|p| p.tare),
            Some(Weight::from_grams(600))
        );
        assert_eq!(
            catalog.article("ART02").map(|a| a.gtin.as_str()),
            Some("08012345000029")
        );
    }

    #[test]
    fn test_defaults_pass_validation() {
        for article in default_articles() {
            assert!(validate_article(&article).is_ok(), "{}", article.code);
        }
        for recipient in default_recipients() {
            assert!(validate_recipient(&recipient).is_ok());
        }
    }

    #[test]
    fn test_save_article_normalizes_and_replaces() {
        let mut catalog = Catalog::with_defaults();
        let mut article = catalog.article("ART01").cloned().unwrap();
        article.origin = " it ".to_string();
        article.description = "Mele Gala 70/75 ".to_string();
        article.default_packaging_id = Some(String::new());

        let saved = catalog.save_article(article).unwrap();
        assert_eq!(saved.origin, "IT");
        assert_eq!(saved.default_packaging_id, None);
        assert_eq!(catalog.articles().count(), 2);
        assert_eq!(
            catalog.article("ART01").map(|a| a.description.as_str()),
            Some("Mele Gala 70/75")
        );
    }

    #[test]
    fn test_save_article_rejects_shared_gtin() {
        let mut catalog = Catalog::with_defaults();
        let mut copy = catalog.article("ART01").cloned().unwrap();
        copy.code = "ART99".to_string();

        assert!(matches!(
            catalog.save_article(copy),
            Err(ValidationError::Duplicate { ref field, .. }) if field == "gtin"
        ));
    }

    #[test]
    fn test_search_articles() {
        let catalog = Catalog::with_defaults();
        assert_eq!(catalog.search_articles("pere").len(), 1);
        assert_eq!(catalog.search_articles("0801234500001").len(), 1);
        assert_eq!(catalog.search_articles("").len(), 2);
        assert!(catalog.search_articles("kiwi").is_empty());
    }
}
