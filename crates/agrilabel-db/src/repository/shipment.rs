//! # Shipment Repository
//!
//! Serial counter, shipping units and transport documents.
//!
//! ## Applying a Change Set
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    1. serial_state         (counter moved or settings changed)         │
//! │    2. upsert documents     (new links have a target)                   │
//! │    3. upsert units         (document_id set or cleared)                │
//! │    4. delete units                                                     │
//! │    5. delete documents     (no unit points at them any more)           │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any failure → ROLLBACK: nothing of the change set is stored.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use agrilabel_core::{
    ChangeSet, Gs1Payload, SerialState, ShipmentLedger, ShipmentLine, ShippingUnit, Sscc,
    TransportDocument, Weight,
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct SerialRow {
    company_prefix: String,
    extension_digit: i64,
    next_serial: i64,
}

impl TryFrom<SerialRow> for SerialState {
    type Error = DbError;

    fn try_from(row: SerialRow) -> DbResult<Self> {
        let extension_digit = u8::try_from(row.extension_digit)
            .map_err(|e| DbError::corrupt("serial state", "1", e))?;
        let next_serial =
            u64::try_from(row.next_serial).map_err(|e| DbError::corrupt("serial state", "1", e))?;
        Ok(SerialState {
            company_prefix: row.company_prefix,
            extension_digit,
            next_serial,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UnitRow {
    id: String,
    sscc: String,
    recipient_code: String,
    lines_json: String,
    net_weight_grams: i64,
    gross_weight_grams: i64,
    tare_weight_grams: i64,
    payload_json: String,
    document_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UnitRow> for ShippingUnit {
    type Error = DbError;

    fn try_from(row: UnitRow) -> DbResult<Self> {
        let sscc = Sscc::parse(&row.sscc).map_err(|e| DbError::corrupt("shipping unit", &row.id, e))?;
        let lines: Vec<ShipmentLine> = serde_json::from_str(&row.lines_json)?;
        let payload: Gs1Payload = serde_json::from_str(&row.payload_json)?;

        Ok(ShippingUnit {
            id: row.id,
            sscc,
            recipient_code: row.recipient_code,
            lines,
            net_weight: Weight::from_grams(row.net_weight_grams),
            gross_weight: Weight::from_grams(row.gross_weight_grams),
            tare_weight: Weight::from_grams(row.tare_weight_grams),
            payload,
            document_id: row.document_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    number: String,
    date: NaiveDate,
    recipient_code: String,
    unit_ids_json: String,
    notes: Option<String>,
    carrier_name: String,
    carrier_address: Option<String>,
    transport_reason: String,
    goods_appearance: String,
    transport_start: String,
    port: String,
    license_plate: Option<String>,
    trailer_plate: Option<String>,
    pallet_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for TransportDocument {
    type Error = DbError;

    fn try_from(row: DocumentRow) -> DbResult<Self> {
        let unit_ids: Vec<String> = serde_json::from_str(&row.unit_ids_json)?;
        let pallet_count = u32::try_from(row.pallet_count)
            .map_err(|e| DbError::corrupt("transport document", &row.id, e))?;

        Ok(TransportDocument {
            id: row.id,
            number: row.number,
            date: row.date,
            recipient_code: row.recipient_code,
            unit_ids,
            notes: row.notes,
            carrier_name: row.carrier_name,
            carrier_address: row.carrier_address,
            transport_reason: row.transport_reason,
            goods_appearance: row.goods_appearance,
            transport_start: row.transport_start,
            port: row.port,
            license_plate: row.license_plate,
            trailer_plate: row.trailer_plate,
            pallet_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the shipment ledger.
///
/// ## Usage
/// ```rust,ignore
/// let ledger = db.shipments().load_ledger(SerialState::default()).await?;
/// let transition = ledger.finalize_new_unit(&draft, &catalog, Utc::now())?;
/// db.shipments().apply(transition.changes()).await?;
/// let unit = transition.commit(&mut ledger);
/// ```
#[derive(Debug, Clone)]
pub struct ShipmentRepository {
    pool: SqlitePool,
}

impl ShipmentRepository {
    /// Creates a new ShipmentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShipmentRepository { pool }
    }

    /// Stored serial state, if one was ever written.
    pub async fn serial_state(&self) -> DbResult<Option<SerialState>> {
        let row = sqlx::query_as::<_, SerialRow>(
            r#"
            SELECT company_prefix, extension_digit, next_serial
            FROM serial_state
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(SerialState::try_from).transpose()
    }

    /// Writes the serial state outside of any change set (seeding).
    pub async fn save_serial_state(&self, serial: &SerialState) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        upsert_serial(&mut conn, serial).await
    }

    pub async fn list_units(&self) -> DbResult<Vec<ShippingUnit>> {
        sqlx::query_as::<_, UnitRow>(
            r#"
            SELECT id, sscc, recipient_code, lines_json,
                   net_weight_grams, gross_weight_grams, tare_weight_grams,
                   payload_json, document_id, created_at, updated_at
            FROM shipping_units
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(ShippingUnit::try_from)
        .collect()
    }

    pub async fn get_unit(&self, id: &str) -> DbResult<Option<ShippingUnit>> {
        sqlx::query_as::<_, UnitRow>(
            r#"
            SELECT id, sscc, recipient_code, lines_json,
                   net_weight_grams, gross_weight_grams, tare_weight_grams,
                   payload_json, document_id, created_at, updated_at
            FROM shipping_units
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(ShippingUnit::try_from)
        .transpose()
    }

    pub async fn list_documents(&self) -> DbResult<Vec<TransportDocument>> {
        sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, number, date, recipient_code, unit_ids_json, notes,
                   carrier_name, carrier_address, transport_reason, goods_appearance,
                   transport_start, port, license_plate, trailer_plate, pallet_count,
                   created_at, updated_at
            FROM transport_documents
            ORDER BY date DESC, number DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(TransportDocument::try_from)
        .collect()
    }

    /// Rebuilds the ledger; `initial_serial` is used when none is stored.
    pub async fn load_ledger(&self, initial_serial: SerialState) -> DbResult<ShipmentLedger> {
        let serial = self.serial_state().await?.unwrap_or(initial_serial);
        let units = self.list_units().await?;
        let documents = self.list_documents().await?;

        info!(
            units = units.len(),
            documents = documents.len(),
            next_serial = serial.next_serial,
            "Ledger loaded"
        );

        Ok(ShipmentLedger::from_parts(serial, units, documents))
    }

    /// Stores a change set atomically.
    pub async fn apply(&self, changes: &ChangeSet) -> DbResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        if let Some(serial) = &changes.serial {
            upsert_serial(&mut tx, serial).await?;
        }
        for document in &changes.upsert_documents {
            upsert_document(&mut tx, document).await?;
        }
        for unit in &changes.upsert_units {
            upsert_unit(&mut tx, unit).await?;
        }
        for id in &changes.delete_units {
            sqlx::query("DELETE FROM shipping_units WHERE id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        for id in &changes.delete_documents {
            sqlx::query("DELETE FROM transport_documents WHERE id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(
            serial = changes.serial.is_some(),
            upsert_units = changes.upsert_units.len(),
            delete_units = changes.delete_units.len(),
            upsert_documents = changes.upsert_documents.len(),
            delete_documents = changes.delete_documents.len(),
            "Change set applied"
        );
        Ok(())
    }
}

// =============================================================================
// Writes
// =============================================================================

async fn upsert_serial(conn: &mut SqliteConnection, serial: &SerialState) -> DbResult<()> {
    let next_serial = i64::try_from(serial.next_serial)
        .map_err(|e| DbError::corrupt("serial state", "1", e))?;

    sqlx::query(
        r#"
        INSERT INTO serial_state (id, company_prefix, extension_digit, next_serial)
        VALUES (1, ?1, ?2, ?3)
        ON CONFLICT(id) DO UPDATE SET
            company_prefix = excluded.company_prefix,
            extension_digit = excluded.extension_digit,
            next_serial = excluded.next_serial
        "#,
    )
    .bind(&serial.company_prefix)
    .bind(i64::from(serial.extension_digit))
    .bind(next_serial)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn upsert_unit(conn: &mut SqliteConnection, unit: &ShippingUnit) -> DbResult<()> {
    let lines_json = serde_json::to_string(&unit.lines)?;
    let payload_json = serde_json::to_string(&unit.payload)?;

    sqlx::query(
        r#"
        INSERT INTO shipping_units (
            id, sscc, recipient_code, lines_json,
            net_weight_grams, gross_weight_grams, tare_weight_grams,
            payload_json, document_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(id) DO UPDATE SET
            sscc = excluded.sscc,
            recipient_code = excluded.recipient_code,
            lines_json = excluded.lines_json,
            net_weight_grams = excluded.net_weight_grams,
            gross_weight_grams = excluded.gross_weight_grams,
            tare_weight_grams = excluded.tare_weight_grams,
            payload_json = excluded.payload_json,
            document_id = excluded.document_id,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&unit.id)
    .bind(unit.sscc.as_str())
    .bind(&unit.recipient_code)
    .bind(lines_json)
    .bind(unit.net_weight.grams())
    .bind(unit.gross_weight.grams())
    .bind(unit.tare_weight.grams())
    .bind(payload_json)
    .bind(&unit.document_id)
    .bind(unit.created_at)
    .bind(unit.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn upsert_document(conn: &mut SqliteConnection, document: &TransportDocument) -> DbResult<()> {
    let unit_ids_json = serde_json::to_string(&document.unit_ids)?;

    sqlx::query(
        r#"
        INSERT INTO transport_documents (
            id, number, date, recipient_code, unit_ids_json, notes,
            carrier_name, carrier_address, transport_reason, goods_appearance,
            transport_start, port, license_plate, trailer_plate, pallet_count,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
        ON CONFLICT(id) DO UPDATE SET
            number = excluded.number,
            date = excluded.date,
            recipient_code = excluded.recipient_code,
            unit_ids_json = excluded.unit_ids_json,
            notes = excluded.notes,
            carrier_name = excluded.carrier_name,
            carrier_address = excluded.carrier_address,
            transport_reason = excluded.transport_reason,
            goods_appearance = excluded.goods_appearance,
            transport_start = excluded.transport_start,
            port = excluded.port,
            license_plate = excluded.license_plate,
            trailer_plate = excluded.trailer_plate,
            pallet_count = excluded.pallet_count,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&document.id)
    .bind(&document.number)
    .bind(document.date)
    .bind(&document.recipient_code)
    .bind(unit_ids_json)
    .bind(&document.notes)
    .bind(&document.carrier_name)
    .bind(&document.carrier_address)
    .bind(&document.transport_reason)
    .bind(&document.goods_appearance)
    .bind(&document.transport_start)
    .bind(&document.port)
    .bind(&document.license_plate)
    .bind(&document.trailer_plate)
    .bind(i64::from(document.pallet_count))
    .bind(document.created_at)
    .bind(document.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
