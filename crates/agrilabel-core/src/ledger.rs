//! # Shipment Ledger
//!
//! Owns the SSCC serial counter and the links between shipping units and
//! transport documents.
//!
//! ## Transition Model
//! ```text
//! ┌────────────────┐  finalize_new_unit(draft)   ┌──────────────────────┐
//! │ ShipmentLedger │ ──────────────────────────► │ Transition<Unit>     │
//! │  (unchanged)   │        validate +           │  changes: ChangeSet  │
//! └───────▲────────┘        compute              │  outcome: Unit       │
//!         │                                      └──────────┬───────────┘
//!         │                                                 │
//!         │            persist ChangeSet (one DB tx)        │
//!         │  ◄───────── only on success ─────────────────── ┘
//!         │
//!   transition.commit(&mut ledger)  → serial + 1, unit stored
//! ```
//!
//! Every mutating operation takes `&self` and returns a [`Transition`]. The
//! ledger changes only when the transition is committed, so a failed save
//! never consumes a serial number or leaves half-updated links.
//!
//! ## Link Invariant
//! `unit.document_id == Some(d)` ⇔ `d.unit_ids` contains `unit.id`, for
//! every unit and every document. Each unit is on at most one document and
//! only on a document for its own recipient.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::catalog::Catalog;
use crate::document::{self, DocumentSummary};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::gs1::{build_payload, Sscc};
use crate::types::{
    DocumentDraft, SerialState, ShippingUnit, TransportDocument, UnitDraft,
};
use crate::validation::{
    validate_company_prefix, validate_document_number, validate_extension_digit,
};
use crate::weighing;
use crate::weight::Weight;

// =============================================================================
// Change Set & Transition
// =============================================================================

/// Records a transition writes. Persistence adapters store these verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// New serial state, when the counter or settings changed.
    pub serial: Option<SerialState>,
    pub upsert_units: Vec<ShippingUnit>,
    pub delete_units: Vec<String>,
    pub upsert_documents: Vec<TransportDocument>,
    pub delete_documents: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.serial.is_none()
            && self.upsert_units.is_empty()
            && self.delete_units.is_empty()
            && self.upsert_documents.is_empty()
            && self.delete_documents.is_empty()
    }
}

/// A validated, not yet applied ledger operation.
#[derive(Debug, Clone)]
#[must_use = "a transition does nothing until it is committed"]
pub struct Transition<T> {
    changes: ChangeSet,
    outcome: T,
}

impl<T> Transition<T> {
    fn new(changes: ChangeSet, outcome: T) -> Self {
        Transition { changes, outcome }
    }

    /// Records to persist before committing.
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// What the operation produced (the unit, the document...).
    pub fn outcome(&self) -> &T {
        &self.outcome
    }

    /// Applies the changes to `ledger` and returns the outcome.
    pub fn commit(self, ledger: &mut ShipmentLedger) -> T {
        ledger.apply(self.changes);
        self.outcome
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    pub total_units: usize,
    pub units_awaiting_document: usize,
    pub documents_issued: usize,
    pub total_net: Weight,
}

// =============================================================================
// Shipment Ledger
// =============================================================================

/// Shipping units, transport documents and the serial counter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipmentLedger {
    serial: SerialState,
    units: BTreeMap<String, ShippingUnit>,
    documents: BTreeMap<String, TransportDocument>,
}

impl ShipmentLedger {
    /// Empty ledger starting from `serial`.
    pub fn new(serial: SerialState) -> Self {
        ShipmentLedger {
            serial,
            units: BTreeMap::new(),
            documents: BTreeMap::new(),
        }
    }

    /// Rebuilds a ledger from stored records.
    pub fn from_parts(
        serial: SerialState,
        units: impl IntoIterator<Item = ShippingUnit>,
        documents: impl IntoIterator<Item = TransportDocument>,
    ) -> Self {
        ShipmentLedger {
            serial,
            units: units.into_iter().map(|u| (u.id.clone(), u)).collect(),
            documents: documents.into_iter().map(|d| (d.id.clone(), d)).collect(),
        }
    }

    fn apply(&mut self, changes: ChangeSet) {
        if let Some(serial) = changes.serial {
            self.serial = serial;
        }
        for id in &changes.delete_units {
            self.units.remove(id);
        }
        for unit in changes.upsert_units {
            self.units.insert(unit.id.clone(), unit);
        }
        for id in &changes.delete_documents {
            self.documents.remove(id);
        }
        for document in changes.upsert_documents {
            self.documents.insert(document.id.clone(), document);
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn serial(&self) -> &SerialState {
        &self.serial
    }

    pub fn unit(&self, id: &str) -> Option<&ShippingUnit> {
        self.units.get(id)
    }

    pub fn unit_by_sscc(&self, sscc: &str) -> Option<&ShippingUnit> {
        self.units.values().find(|unit| unit.sscc.as_str() == sscc)
    }

    pub fn document(&self, id: &str) -> Option<&TransportDocument> {
        self.documents.get(id)
    }

    /// All units, newest first.
    pub fn units(&self) -> Vec<&ShippingUnit> {
        let mut units: Vec<&ShippingUnit> = self.units.values().collect();
        sort_newest_first(&mut units);
        units
    }

    /// All documents, latest date first.
    pub fn documents(&self) -> Vec<&TransportDocument> {
        let mut documents: Vec<&TransportDocument> = self.documents.values().collect();
        documents.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        documents
    }

    /// Units of a document, in document order.
    pub fn document_units(&self, document: &TransportDocument) -> Vec<&ShippingUnit> {
        document
            .unit_ids
            .iter()
            .filter_map(|id| self.units.get(id))
            .collect()
    }

    /// Checks the unit ↔ document link invariant.
    pub fn is_consistent(&self) -> bool {
        let documents_ok = self.documents.values().all(|document| {
            document.unit_ids.iter().all(|unit_id| {
                self.units.get(unit_id).is_some_and(|unit| {
                    unit.document_id.as_deref() == Some(document.id.as_str())
                        && unit.recipient_code == document.recipient_code
                })
            })
        });

        let units_ok = self.units.values().all(|unit| match &unit.document_id {
            Some(document_id) => self
                .documents
                .get(document_id)
                .is_some_and(|document| document.unit_ids.contains(&unit.id)),
            None => true,
        });

        documents_ok && units_ok
    }

    // =========================================================================
    // Serial Counter
    // =========================================================================

    /// SSCC the next finalized unit will receive.
    pub fn preview_next_sscc(&self) -> CoreResult<Sscc> {
        Ok(Sscc::generate(
            self.serial.extension_digit,
            &self.serial.company_prefix,
            self.serial.next_serial,
        )?)
    }

    /// Replaces prefix, extension digit and next serial (settings screen).
    ///
    /// Rejected unless an SSCC can be produced for the new next serial.
    pub fn set_serial_state(
        &self,
        company_prefix: &str,
        extension_digit: u8,
        next_serial: u64,
    ) -> CoreResult<Transition<SerialState>> {
        let company_prefix = company_prefix.trim();
        validate_company_prefix(company_prefix)?;
        validate_extension_digit(extension_digit)?;
        Sscc::generate(extension_digit, company_prefix, next_serial)?;

        let serial = SerialState {
            company_prefix: company_prefix.to_string(),
            extension_digit,
            next_serial,
        };

        let changes = ChangeSet {
            serial: Some(serial.clone()),
            ..ChangeSet::default()
        };
        Ok(Transition::new(changes, serial))
    }

    // =========================================================================
    // Shipping Units
    // =========================================================================

    /// Finalizes a new shipping unit under the next SSCC.
    ///
    /// ## Errors
    /// - `Validation` / `RecipientNotFound` for a missing or unknown recipient
    /// - `EmptyUnit` when there are no lines
    /// - `Gs1` when the serial no longer fits or the payload is invalid
    /// - `DuplicateSscc` when the counter was rewound onto an existing unit
    pub fn finalize_new_unit(
        &self,
        draft: &UnitDraft,
        catalog: &Catalog,
        now: DateTime<Utc>,
    ) -> CoreResult<Transition<ShippingUnit>> {
        let recipient_code = check_recipient(&draft.recipient_code, catalog)?;
        if draft.lines.is_empty() {
            return Err(CoreError::EmptyUnit);
        }

        let sscc = self.preview_next_sscc()?;
        if self.unit_by_sscc(sscc.as_str()).is_some() {
            return Err(CoreError::DuplicateSscc(sscc.to_string()));
        }

        let current = self.serial.next_serial;
        let next_serial = current
            .checked_add(1)
            .ok_or(CoreError::SerialExhausted(current))?;

        let (lines, totals) = weighing::recompute_all(&draft.lines, catalog);
        let payload = build_payload(&sscc, &lines, totals.net, catalog)?;

        let unit = ShippingUnit {
            id: uuid::Uuid::new_v4().to_string(),
            sscc,
            recipient_code,
            lines,
            net_weight: totals.net,
            gross_weight: totals.gross,
            tare_weight: totals.tare,
            payload,
            document_id: None,
            created_at: now,
            updated_at: now,
        };

        let changes = ChangeSet {
            serial: Some(SerialState {
                next_serial,
                ..self.serial.clone()
            }),
            upsert_units: vec![unit.clone()],
            ..ChangeSet::default()
        };
        Ok(Transition::new(changes, unit))
    }

    /// Re-saves an existing unit with new content.
    ///
    /// Weights and payload are recomputed; id, SSCC, document link and
    /// creation time are kept. The serial counter is not touched.
    pub fn update_existing_unit(
        &self,
        id: &str,
        draft: &UnitDraft,
        catalog: &Catalog,
        now: DateTime<Utc>,
    ) -> CoreResult<Transition<ShippingUnit>> {
        let existing = self
            .units
            .get(id)
            .ok_or_else(|| CoreError::UnitNotFound(id.to_string()))?;
        let recipient_code = check_recipient(&draft.recipient_code, catalog)?;
        if draft.lines.is_empty() {
            return Err(CoreError::EmptyUnit);
        }

        if let Some(document) = existing
            .document_id
            .as_deref()
            .and_then(|document_id| self.documents.get(document_id))
        {
            if document.recipient_code != recipient_code {
                return Err(CoreError::RecipientMismatch {
                    unit_id: existing.id.clone(),
                    unit_recipient: recipient_code,
                    document_recipient: document.recipient_code.clone(),
                });
            }
        }

        let (lines, totals) = weighing::recompute_all(&draft.lines, catalog);
        let payload = build_payload(&existing.sscc, &lines, totals.net, catalog)?;

        let unit = ShippingUnit {
            id: existing.id.clone(),
            sscc: existing.sscc.clone(),
            recipient_code,
            lines,
            net_weight: totals.net,
            gross_weight: totals.gross,
            tare_weight: totals.tare,
            payload,
            document_id: existing.document_id.clone(),
            created_at: existing.created_at,
            updated_at: now,
        };

        let changes = ChangeSet {
            upsert_units: vec![unit.clone()],
            ..ChangeSet::default()
        };
        Ok(Transition::new(changes, unit))
    }

    /// Deletes a unit that is not on any transport document.
    pub fn delete_unit(&self, id: &str) -> CoreResult<Transition<ShippingUnit>> {
        let unit = self
            .units
            .get(id)
            .ok_or_else(|| CoreError::UnitNotFound(id.to_string()))?;

        if let Some(document_id) = &unit.document_id {
            return Err(CoreError::UnitLinkedToDocument {
                unit_id: unit.id.clone(),
                document_id: document_id.clone(),
            });
        }

        let changes = ChangeSet {
            delete_units: vec![unit.id.clone()],
            ..ChangeSet::default()
        };
        Ok(Transition::new(changes, unit.clone()))
    }

    // =========================================================================
    // Transport Documents
    // =========================================================================

    /// Creates a document, or replaces the one named by `draft.id`.
    ///
    /// ## Link Update
    /// ```text
    /// before:  U1 → D   U2 → D   U3 → ∅
    /// draft:   D = [U2, U3]
    /// after:   U1 → ∅   U2 → D   U3 → D
    /// ```
    ///
    /// ## Errors
    /// - `Validation` for a blank number or recipient
    /// - `RecipientNotFound`, `DocumentNotFound`, `UnitNotFound`
    /// - `EmptyDocument` when no unit is selected
    /// - `DuplicateDocumentNumber` when another document has the number
    /// - `RecipientMismatch` / `UnitAlreadyLinked` for ineligible units
    pub fn create_or_replace_document(
        &self,
        draft: &DocumentDraft,
        catalog: &Catalog,
        now: DateTime<Utc>,
    ) -> CoreResult<Transition<TransportDocument>> {
        let number = validate_document_number(&draft.number)?;
        let recipient_code = check_recipient(&draft.recipient_code, catalog)?;

        let editing = match draft.id.as_deref() {
            Some(id) => Some(
                self.documents
                    .get(id)
                    .ok_or_else(|| CoreError::DocumentNotFound(id.to_string()))?,
            ),
            None => None,
        };
        let editing_id = editing.map(|document| document.id.as_str());

        let mut seen = HashSet::new();
        let selection: Vec<String> = draft
            .unit_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty() && seen.insert(*id))
            .map(str::to_string)
            .collect();
        if selection.is_empty() {
            return Err(CoreError::EmptyDocument);
        }

        if let Some(other) = self
            .documents
            .values()
            .find(|other| Some(other.id.as_str()) != editing_id && other.number == number)
        {
            return Err(CoreError::DuplicateDocumentNumber {
                number,
                document_id: other.id.clone(),
            });
        }

        for unit_id in &selection {
            let unit = self
                .units
                .get(unit_id)
                .ok_or_else(|| CoreError::UnitNotFound(unit_id.clone()))?;

            if unit.recipient_code != recipient_code {
                return Err(CoreError::RecipientMismatch {
                    unit_id: unit.id.clone(),
                    unit_recipient: unit.recipient_code.clone(),
                    document_recipient: recipient_code,
                });
            }

            if let Some(linked) = unit.document_id.as_deref() {
                if Some(linked) != editing_id {
                    return Err(CoreError::UnitAlreadyLinked {
                        unit_id: unit.id.clone(),
                        document_id: linked.to_string(),
                    });
                }
            }
        }

        let id = editing_id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let pallet_count = draft
            .pallet_count
            .unwrap_or_else(|| u32::try_from(selection.len()).unwrap_or(u32::MAX));

        let selected: HashSet<&str> = selection.iter().map(String::as_str).collect();
        let mut upsert_units = Vec::new();
        for unit in self.units.values() {
            let linked_here = unit.document_id.as_deref() == Some(id.as_str());
            let wanted = selected.contains(unit.id.as_str());
            if linked_here != wanted {
                let mut relinked = unit.clone();
                relinked.document_id = if wanted { Some(id.clone()) } else { None };
                relinked.updated_at = now;
                upsert_units.push(relinked);
            }
        }

        let document = TransportDocument {
            id,
            number,
            date: draft.date,
            recipient_code,
            unit_ids: selection,
            notes: non_blank(&draft.notes),
            carrier_name: draft.carrier_name.trim().to_string(),
            carrier_address: non_blank(&draft.carrier_address),
            transport_reason: draft.transport_reason.trim().to_string(),
            goods_appearance: draft.goods_appearance.trim().to_string(),
            transport_start: draft.transport_start.trim().to_string(),
            port: draft.port.trim().to_string(),
            license_plate: non_blank(&draft.license_plate),
            trailer_plate: non_blank(&draft.trailer_plate),
            pallet_count,
            created_at: editing.map_or(now, |document| document.created_at),
            updated_at: now,
        };

        let changes = ChangeSet {
            upsert_units,
            upsert_documents: vec![document.clone()],
            ..ChangeSet::default()
        };
        Ok(Transition::new(changes, document))
    }

    /// Deletes a document; its units become available again.
    pub fn delete_document(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<Transition<TransportDocument>> {
        let document = self
            .documents
            .get(id)
            .ok_or_else(|| CoreError::DocumentNotFound(id.to_string()))?;

        let upsert_units = self
            .units
            .values()
            .filter(|unit| unit.document_id.as_deref() == Some(id))
            .map(|unit| {
                let mut unlinked = unit.clone();
                unlinked.document_id = None;
                unlinked.updated_at = now;
                unlinked
            })
            .collect();

        let changes = ChangeSet {
            upsert_units,
            delete_documents: vec![document.id.clone()],
            ..ChangeSet::default()
        };
        Ok(Transition::new(changes, document.clone()))
    }

    /// Suggested number for a new document dated `today`.
    pub fn suggest_document_number(&self, today: NaiveDate) -> String {
        document::suggest_document_number(self.documents.values(), today)
    }

    /// Product summary and weight totals of a document.
    pub fn document_summary(&self, id: &str, catalog: &Catalog) -> CoreResult<DocumentSummary> {
        let document = self
            .documents
            .get(id)
            .ok_or_else(|| CoreError::DocumentNotFound(id.to_string()))?;
        Ok(document::summarize(document, &self.document_units(document), catalog))
    }

    // =========================================================================
    // Archive Queries
    // =========================================================================

    /// Units whose SSCC, a batch or an article code contains `query`
    /// (case-insensitive). A blank query returns every unit.
    pub fn search_units(&self, query: &str) -> Vec<&ShippingUnit> {
        let needle = query.trim().to_lowercase();
        let mut units: Vec<&ShippingUnit> = self
            .units
            .values()
            .filter(|unit| {
                needle.is_empty()
                    || unit.sscc.as_str().contains(&needle)
                    || unit.lines.iter().any(|line| {
                        line.batch.to_lowercase().contains(&needle)
                            || line
                                .article_code
                                .as_deref()
                                .is_some_and(|code| code.to_lowercase().contains(&needle))
                    })
            })
            .collect();
        sort_newest_first(&mut units);
        units
    }

    /// Units not yet on any document.
    pub fn units_awaiting_document(&self) -> Vec<&ShippingUnit> {
        let mut units: Vec<&ShippingUnit> = self
            .units
            .values()
            .filter(|unit| unit.document_id.is_none())
            .collect();
        sort_newest_first(&mut units);
        units
    }

    /// Units that may be selected on a document for `recipient_code`.
    ///
    /// When editing, the document's own units stay selectable.
    pub fn units_available_for_document(
        &self,
        recipient_code: &str,
        editing: Option<&str>,
    ) -> Vec<&ShippingUnit> {
        let mut units: Vec<&ShippingUnit> = self
            .units
            .values()
            .filter(|unit| unit.recipient_code == recipient_code)
            .filter(|unit| match unit.document_id.as_deref() {
                None => true,
                Some(linked) => Some(linked) == editing,
            })
            .collect();
        sort_newest_first(&mut units);
        units
    }

    /// Dashboard counters.
    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            total_units: self.units.len(),
            units_awaiting_document: self
                .units
                .values()
                .filter(|unit| unit.document_id.is_none())
                .count(),
            documents_issued: self.documents.len(),
            total_net: self.units.values().map(|unit| unit.net_weight).sum(),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn check_recipient(code: &str, catalog: &Catalog) -> CoreResult<String> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ValidationError::required("recipientCode").into());
    }
    if catalog.recipient(code).is_none() {
        return Err(CoreError::RecipientNotFound(code.to_string()));
    }
    Ok(code.to_string())
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn sort_newest_first(units: &mut [&ShippingUnit]) {
    units.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.sscc.cmp(&a.sscc))
    });
}

// =============================================================================
// Unit Tests
// =============================================================================
