//! # Ledger Service
//!
//! The single writer in front of the catalog and the shipment ledger.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UI command (finalize pallet, save DDT, ...)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock ledger (tokio Mutex) ─── one writer at a time                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  prepare: ShipmentLedger::op(&self, ...) → Transition { changes, .. }  │
//! │       │            └── Err → rejected, nothing written                  │
//! │       ▼                                                                 │
//! │  persist: ShipmentRepository::apply(changes) in one transaction        │
//! │       │            └── Err → rolled back, in-memory ledger untouched    │
//! │       ▼                                                                 │
//! │  commit: transition.commit(&mut ledger) → outcome                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The serial counter therefore advances exactly once per stored unit,
//! in memory and on disk alike.

use agrilabel_core::document::DocumentSummary;
use agrilabel_core::weighing::{self, EditedLine};
use agrilabel_core::{
    Article, Catalog, CoreResult, DocumentDraft, InputPolicy, LedgerStats, LineEdit, Packaging,
    PalletType, Recipient, SerialState, ShipmentLedger, ShipmentLine, ShippingUnit, Sscc,
    Transition, TransportDocument, UnitDraft, UnitTotals, ValidationError, Weight,
};
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::error::DbResult;
use crate::pool::Database;

/// Catalog and ledger state shared by every UI command.
#[derive(Debug)]
pub struct LedgerService {
    db: Database,
    catalog: RwLock<Catalog>,
    ledger: Mutex<ShipmentLedger>,
    input_policy: InputPolicy,
}

impl LedgerService {
    /// Loads catalog and ledger from `db`.
    ///
    /// `initial_serial` numbers the first unit of a database that has no
    /// stored counter yet; it is written immediately so that it survives
    /// a restart with a different configuration.
    pub async fn open(
        db: Database,
        initial_serial: SerialState,
        input_policy: InputPolicy,
    ) -> DbResult<Self> {
        let catalog = db.catalog().load().await?;

        if db.shipments().serial_state().await?.is_none() {
            info!(
                prefix = %initial_serial.company_prefix,
                next_serial = initial_serial.next_serial,
                "Storing initial serial state"
            );
            db.shipments().save_serial_state(&initial_serial).await?;
        }
        let ledger = db.shipments().load_ledger(initial_serial).await?;

        if !ledger.is_consistent() {
            warn!("Stored units and documents disagree on their links");
        }

        Ok(LedgerService {
            db,
            catalog: RwLock::new(catalog),
            ledger: Mutex::new(ledger),
            input_policy,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn input_policy(&self) -> InputPolicy {
        self.input_policy
    }

    // =========================================================================
    // Transaction Core
    // =========================================================================

    /// prepare → persist → commit under the ledger lock.
    async fn transact<T, F>(&self, operation: &'static str, prepare: F) -> DbResult<T>
    where
        F: FnOnce(&ShipmentLedger, &Catalog, DateTime<Utc>) -> CoreResult<Transition<T>>,
    {
        let catalog = self.catalog.read().await;
        let mut ledger = self.ledger.lock().await;

        let transition = match prepare(&ledger, &catalog, Utc::now()) {
            Ok(transition) => transition,
            Err(e) => {
                warn!(operation, error = %e, "Ledger operation rejected");
                return Err(e.into());
            }
        };

        if let Err(e) = self.db.shipments().apply(transition.changes()).await {
            error!(operation, error = %e, "Change set not stored, ledger unchanged");
            return Err(e);
        }

        let outcome = transition.commit(&mut ledger);
        info!(operation, next_serial = ledger.serial().next_serial, "Ledger operation committed");
        Ok(outcome)
    }

    // =========================================================================
    // Shipping Units
    // =========================================================================

    pub async fn finalize_new_unit(&self, draft: &UnitDraft) -> DbResult<ShippingUnit> {
        self.transact("finalize_new_unit", |ledger, catalog, now| {
            ledger.finalize_new_unit(draft, catalog, now)
        })
        .await
    }

    pub async fn update_existing_unit(&self, id: &str, draft: &UnitDraft) -> DbResult<ShippingUnit> {
        self.transact("update_existing_unit", |ledger, catalog, now| {
            ledger.update_existing_unit(id, draft, catalog, now)
        })
        .await
    }

    pub async fn delete_unit(&self, id: &str) -> DbResult<ShippingUnit> {
        self.transact("delete_unit", |ledger, _, _| ledger.delete_unit(id))
            .await
    }

    // =========================================================================
    // Transport Documents
    // =========================================================================

    pub async fn save_document(&self, draft: &DocumentDraft) -> DbResult<TransportDocument> {
        self.transact("save_document", |ledger, catalog, now| {
            ledger.create_or_replace_document(draft, catalog, now)
        })
        .await
    }

    pub async fn delete_document(&self, id: &str) -> DbResult<TransportDocument> {
        self.transact("delete_document", |ledger, _, now| {
            ledger.delete_document(id, now)
        })
        .await
    }

    pub async fn document_summary(&self, id: &str) -> DbResult<DocumentSummary> {
        let catalog = self.catalog.read().await;
        let ledger = self.ledger.lock().await;
        Ok(ledger.document_summary(id, &catalog)?)
    }

    pub async fn suggest_document_number(&self, today: NaiveDate) -> String {
        self.ledger.lock().await.suggest_document_number(today)
    }

    // =========================================================================
    // Serial Counter
    // =========================================================================

    pub async fn preview_next_sscc(&self) -> DbResult<Sscc> {
        Ok(self.ledger.lock().await.preview_next_sscc()?)
    }

    pub async fn set_serial_state(
        &self,
        company_prefix: &str,
        extension_digit: u8,
        next_serial: u64,
    ) -> DbResult<SerialState> {
        self.transact("set_serial_state", |ledger, _, _| {
            ledger.set_serial_state(company_prefix, extension_digit, next_serial)
        })
        .await
    }

    // =========================================================================
    // Line Composition
    // =========================================================================

    /// Applies one operator edit against the current catalog.
    pub async fn edit_line(&self, line: &ShipmentLine, edit: LineEdit) -> EditedLine {
        let catalog = self.catalog.read().await;
        weighing::apply_edit(line, edit, &catalog)
    }

    /// Recomputes the lines of a draft and returns the unit totals.
    pub async fn recompute_draft(&self, lines: &[ShipmentLine]) -> (Vec<ShipmentLine>, UnitTotals) {
        let catalog = self.catalog.read().await;
        weighing::recompute_all(lines, &catalog)
    }

    /// Parses a typed weight with the configured input policy.
    pub fn parse_weight(&self, input: &str, field: &str) -> Result<Weight, ValidationError> {
        self.input_policy.parse_weight(input, field)
    }

    /// Parses a typed collo count with the configured input policy.
    pub fn parse_count(&self, input: &str, field: &str) -> Result<u32, ValidationError> {
        self.input_policy.parse_count(input, field)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Runs `f` against the current ledger.
    pub async fn read<R>(&self, f: impl FnOnce(&ShipmentLedger) -> R) -> R {
        let ledger = self.ledger.lock().await;
        f(&ledger)
    }

    pub async fn ledger_snapshot(&self) -> ShipmentLedger {
        self.ledger.lock().await.clone()
    }

    pub async fn catalog_snapshot(&self) -> Catalog {
        self.catalog.read().await.clone()
    }

    pub async fn search_units(&self, query: &str) -> Vec<ShippingUnit> {
        self.read(|ledger| ledger.search_units(query).into_iter().cloned().collect())
            .await
    }

    pub async fn units_awaiting_document(&self) -> Vec<ShippingUnit> {
        self.read(|ledger| ledger.units_awaiting_document().into_iter().cloned().collect())
            .await
    }

    pub async fn units_available_for_document(
        &self,
        recipient_code: &str,
        editing: Option<&str>,
    ) -> Vec<ShippingUnit> {
        self.read(|ledger| {
            ledger
                .units_available_for_document(recipient_code, editing)
                .into_iter()
                .cloned()
                .collect()
        })
        .await
    }

    pub async fn stats(&self) -> LedgerStats {
        self.read(ShipmentLedger::stats).await
    }

    // =========================================================================
    // Master Data
    // =========================================================================
    // Validation runs on a copy; the live catalog is replaced only after the
    // row is stored.

    pub async fn save_article(&self, article: Article) -> DbResult<Article> {
        let mut catalog = self.catalog.write().await;
        let mut next = catalog.clone();
        let saved = next.save_article(article)?;
        self.db.catalog().save_article(&saved).await?;
        *catalog = next;
        debug!(code = %saved.code, "Article saved");
        Ok(saved)
    }

    pub async fn save_packaging(&self, packaging: Packaging) -> DbResult<Packaging> {
        let mut catalog = self.catalog.write().await;
        let mut next = catalog.clone();
        let saved = next.save_packaging(packaging)?;
        self.db.catalog().save_packaging(&saved).await?;
        *catalog = next;
        debug!(id = %saved.id, "Packaging saved");
        Ok(saved)
    }

    pub async fn save_pallet_type(&self, pallet: PalletType) -> DbResult<PalletType> {
        let mut catalog = self.catalog.write().await;
        let mut next = catalog.clone();
        let saved = next.save_pallet_type(pallet)?;
        self.db.catalog().save_pallet_type(&saved).await?;
        *catalog = next;
        debug!(id = %saved.id, "Pallet type saved");
        Ok(saved)
    }

    pub async fn save_recipient(&self, recipient: Recipient) -> DbResult<Recipient> {
        let mut catalog = self.catalog.write().await;
        let mut next = catalog.clone();
        let saved = next.save_recipient(recipient)?;
        self.db.catalog().save_recipient(&saved).await?;
        *catalog = next;
        debug!(code = %saved.code, "Recipient saved");
        Ok(saved)
    }

    /// Existing units keep their snapshots of removed master data.
    pub async fn remove_article(&self, code: &str) -> DbResult<bool> {
        let mut catalog = self.catalog.write().await;
        let removed = self.db.catalog().remove_article(code).await?;
        catalog.remove_article(code);
        Ok(removed)
    }

    pub async fn remove_packaging(&self, id: &str) -> DbResult<bool> {
        let mut catalog = self.catalog.write().await;
        let removed = self.db.catalog().remove_packaging(id).await?;
        catalog.remove_packaging(id);
        Ok(removed)
    }

    pub async fn remove_pallet_type(&self, id: &str) -> DbResult<bool> {
        let mut catalog = self.catalog.write().await;
        let removed = self.db.catalog().remove_pallet_type(id).await?;
        catalog.remove_pallet_type(id);
        Ok(removed)
    }

    pub async fn remove_recipient(&self, code: &str) -> DbResult<bool> {
        let mut catalog = self.catalog.write().await;
        let removed = self.db.catalog().remove_recipient(code).await?;
        catalog.remove_recipient(code);
        Ok(removed)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::DbConfig;
    use agrilabel_core::{CoreError, LinePallet};
    use std::sync::Arc;

    async fn service() -> LedgerService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.catalog().save_all(&Catalog::with_defaults()).await.unwrap();
        LedgerService::open(db, SerialState::default(), InputPolicy::Lenient)
            .await
            .unwrap()
    }

    fn apple_line() -> ShipmentLine {
        ShipmentLine {
            article_code: Some("ART01".to_string()),
            batch: "L01".to_string(),
            count: 10,
            packaging_id: Some("PACK01".to_string()),
            packaging_tare: Weight::from_grams(600),
            pallets: vec![LinePallet {
                instance_id: "p-1".to_string(),
                pallet_type_id: "PAL01".to_string(),
                name: "EPAL (80x120)".to_string(),
                tare: Weight::from_kg(25),
            }],
            gross_weight: Weight::from_grams(120_500),
            ..ShipmentLine::new()
        }
    }

    fn draft() -> UnitDraft {
        UnitDraft {
            recipient_code: "CL01".to_string(),
            lines: vec![apple_line()],
        }
    }

    #[tokio::test]
    async fn test_finalize_persists_and_advances_serial() {
        let service = service().await;

        let unit = service.finalize_new_unit(&draft()).await.unwrap();
        assert_eq!(unit.sscc.as_str(), "080123450000000012");
        assert_eq!(unit.net_weight.format_kg(), "89.50");
        assert!(unit.payload.human_readable.contains("(3102)008950"));

        let stored = service.database().shipments().get_unit(&unit.id).await.unwrap();
        assert_eq!(stored.as_ref(), Some(&unit));

        let serial = service.database().shipments().serial_state().await.unwrap().unwrap();
        assert_eq!(serial.next_serial, 2);
        assert_eq!(service.read(|l| l.serial().next_serial).await, 2);
    }

    #[tokio::test]
    async fn test_rejected_operation_changes_nothing() {
        let service = service().await;

        let empty = UnitDraft {
            recipient_code: "CL01".to_string(),
            lines: vec![],
        };
        let err = service.finalize_new_unit(&empty).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::EmptyUnit)));
        assert!(err.is_rejection());

        assert_eq!(service.read(|l| l.serial().next_serial).await, 1);
        assert!(service.database().shipments().list_units().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_leaves_serial_unchanged() {
        let service = service().await;
        service.finalize_new_unit(&draft()).await.unwrap();

        sqlx::query("DROP TABLE shipping_units")
            .execute(service.database().pool())
            .await
            .unwrap();

        let err = service.finalize_new_unit(&draft()).await.unwrap_err();
        assert!(!err.is_rejection());

        assert_eq!(service.read(|l| l.serial().next_serial).await, 2);
        assert_eq!(service.read(|l| l.units().len()).await, 1);
        let stored = service.database().shipments().serial_state().await.unwrap().unwrap();
        assert_eq!(stored.next_serial, 2);
    }

    #[tokio::test]
    async fn test_reload_reproduces_ledger() {
        let service = service().await;
        let first = service.finalize_new_unit(&draft()).await.unwrap();
        let second = service.finalize_new_unit(&draft()).await.unwrap();

        let today = NaiveDate::from_ymd_opt(2024, 9, 20).unwrap();
        let number = service.suggest_document_number(today).await;
        assert_eq!(number, "001/2024");

        let mut doc = DocumentDraft::new(number, today, "CL01");
        doc.unit_ids = vec![first.id.clone(), second.id.clone()];
        let document = service.save_document(&doc).await.unwrap();
        assert_eq!(document.pallet_count, 2);

        let summary = service.document_summary(&document.id).await.unwrap();
        assert_eq!(summary.total_count, 20);

        let before = service.ledger_snapshot().await;
        let db = service.database().clone();
        let reopened = LedgerService::open(db, SerialState::default(), InputPolicy::Lenient)
            .await
            .unwrap();

        assert_eq!(reopened.ledger_snapshot().await, before);
        assert_eq!(reopened.catalog_snapshot().await, service.catalog_snapshot().await);
        assert_eq!(reopened.stats().await.documents_issued, 1);
    }

    #[tokio::test]
    async fn test_delete_guard_and_document_release() {
        let service = service().await;
        let unit = service.finalize_new_unit(&draft()).await.unwrap();

        let today = NaiveDate::from_ymd_opt(2024, 9, 20).unwrap();
        let mut doc = DocumentDraft::new("001/2024", today, "CL01");
        doc.unit_ids = vec![unit.id.clone()];
        let document = service.save_document(&doc).await.unwrap();

        let err = service.delete_unit(&unit.id).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::UnitLinkedToDocument { .. })));

        assert!(service.units_awaiting_document().await.is_empty());
        service.delete_document(&document.id).await.unwrap();
        assert_eq!(service.units_awaiting_document().await.len(), 1);
        assert_eq!(
            service.units_available_for_document("CL01", None).await.len(),
            1
        );

        service.delete_unit(&unit.id).await.unwrap();
        assert_eq!(service.stats().await, LedgerStats::default());
        // Deleting never gives a serial back
        assert_eq!(
            service.preview_next_sscc().await.unwrap().as_str(),
            "080123450000000029"
        );
    }

    #[tokio::test]
    async fn test_serial_settings_are_persisted() {
        let service = service().await;

        service.set_serial_state("0123456", 3, 500).await.unwrap();
        let stored = service.database().shipments().serial_state().await.unwrap().unwrap();
        assert_eq!(stored.company_prefix, "0123456");
        assert_eq!(stored.next_serial, 500);

        assert!(service.set_serial_state("12A", 0, 1).await.is_err());
        assert_eq!(service.read(|l| l.serial().next_serial).await, 500);
    }

    #[tokio::test]
    async fn test_concurrent_finalize_gets_distinct_ssccs() {
        let service = Arc::new(service().await);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service.finalize_new_unit(&draft()).await.unwrap().sscc
            }));
        }

        let mut ssccs = Vec::new();
        for handle in handles {
            ssccs.push(handle.await.unwrap());
        }
        ssccs.sort();
        ssccs.dedup();

        assert_eq!(ssccs.len(), 8);
        assert_eq!(service.read(|l| l.serial().next_serial).await, 9);
    }

    #[tokio::test]
    async fn test_master_data_changes_are_stored() {
        let service = service().await;

        let mut recipient = service.catalog_snapshot().await.recipient("CL01").unwrap().clone();
        recipient.code = "CL02".to_string();
        recipient.name = "  Mercato Sud ".to_string();
        let saved = service.save_recipient(recipient).await.unwrap();
        assert_eq!(saved.name, "Mercato Sud");

        let mut bad = saved.clone();
        bad.name = String::new();
        assert!(service.save_recipient(bad).await.is_err());

        assert!(service.remove_packaging("PACK04").await.unwrap());

        let stored = service.database().catalog().load().await.unwrap();
        assert_eq!(stored.recipient("CL02").map(|r| r.name.as_str()), Some("Mercato Sud"));
        assert!(stored.packaging("PACK04").is_none());
        assert_eq!(stored, service.catalog_snapshot().await);
    }

    #[tokio::test]
    async fn test_line_edits_use_live_catalog() {
        let service = service().await;

        let edited = service
            .edit_line(&ShipmentLine::new(), LineEdit::SelectArticle(Some("ART01".to_string())))
            .await;
        assert_eq!(edited.line.article_code.as_deref(), Some("ART01"));

        let (lines, totals) = service.recompute_draft(&[apple_line()]).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(totals.net.format_kg(), "89.50");

        assert_eq!(service.parse_weight("abc", "gross").unwrap(), Weight::zero());
        assert_eq!(service.parse_count("12 colli", "count").unwrap(), 12);
    }
}
