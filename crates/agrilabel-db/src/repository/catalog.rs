//! # Catalog Repository
//!
//! Master data tables: articles, packagings, pallet types, recipients.
//!
//! Records are validated by [`Catalog`] before they reach this layer;
//! loading rebuilds the catalog without validating again, so rows written
//! by an older version are still readable.

use agrilabel_core::{
    Article, Catalog, Gtin, Packaging, PalletType, Recipient, UnitOfMeasure, WeighingMode, Weight,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ArticleRow {
    code: String,
    description: String,
    gtin: String,
    origin: String,
    unit_of_measure: UnitOfMeasure,
    weighing_mode: WeighingMode,
    unit_weight_grams: i64,
    default_packaging_id: Option<String>,
}

impl TryFrom<ArticleRow> for Article {
    type Error = DbError;

    fn try_from(row: ArticleRow) -> DbResult<Self> {
        let gtin = Gtin::normalize(&row.gtin).map_err(|e| DbError::corrupt("article", &row.code, e))?;
        Ok(Article {
            code: row.code,
            description: row.description,
            gtin,
            origin: row.origin,
            unit_of_measure: row.unit_of_measure,
            weighing_mode: row.weighing_mode,
            unit_weight: Weight::from_grams(row.unit_weight_grams),
            default_packaging_id: row.default_packaging_id,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PackagingRow {
    id: String,
    name: String,
    tare_grams: i64,
    is_pooling: bool,
    width_mm: Option<i64>,
    depth_mm: Option<i64>,
    height_mm: Option<i64>,
}

impl From<PackagingRow> for Packaging {
    fn from(row: PackagingRow) -> Self {
        Packaging {
            id: row.id,
            name: row.name,
            tare: Weight::from_grams(row.tare_grams),
            is_pooling: row.is_pooling,
            width_mm: dimension(row.width_mm),
            depth_mm: dimension(row.depth_mm),
            height_mm: dimension(row.height_mm),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PalletTypeRow {
    id: String,
    name: String,
    tare_grams: i64,
    is_pooling: bool,
    width_mm: Option<i64>,
    depth_mm: Option<i64>,
    height_mm: Option<i64>,
    max_load_grams: Option<i64>,
}

impl From<PalletTypeRow> for PalletType {
    fn from(row: PalletTypeRow) -> Self {
        PalletType {
            id: row.id,
            name: row.name,
            tare: Weight::from_grams(row.tare_grams),
            is_pooling: row.is_pooling,
            width_mm: dimension(row.width_mm),
            depth_mm: dimension(row.depth_mm),
            height_mm: dimension(row.height_mm),
            max_load: row.max_load_grams.map(Weight::from_grams),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RecipientRow {
    code: String,
    name: String,
    address: String,
    vat_number: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

impl From<RecipientRow> for Recipient {
    fn from(row: RecipientRow) -> Self {
        Recipient {
            code: row.code,
            name: row.name,
            address: row.address,
            vat_number: row.vat_number,
            email: row.email,
            phone: row.phone,
        }
    }
}

fn dimension(value: Option<i64>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for master data.
///
/// ## Usage
/// ```rust,ignore
/// let catalog = db.catalog().load().await?;
/// db.catalog().save_article(&article).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Loads every master data table into a [`Catalog`].
    pub async fn load(&self) -> DbResult<Catalog> {
        let articles = sqlx::query_as::<_, ArticleRow>(
            r#"
            SELECT code, description, gtin, origin, unit_of_measure,
                   weighing_mode, unit_weight_grams, default_packaging_id
            FROM articles
            ORDER BY code
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Article::try_from)
        .collect::<DbResult<Vec<_>>>()?;

        let packagings = sqlx::query_as::<_, PackagingRow>(
            r#"
            SELECT id, name, tare_grams, is_pooling, width_mm, depth_mm, height_mm
            FROM packagings
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let pallet_types = sqlx::query_as::<_, PalletTypeRow>(
            r#"
            SELECT id, name, tare_grams, is_pooling, width_mm, depth_mm, height_mm,
                   max_load_grams
            FROM pallet_types
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let recipients = sqlx::query_as::<_, RecipientRow>(
            r#"
            SELECT code, name, address, vat_number, email, phone
            FROM recipients
            ORDER BY code
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(
            articles = articles.len(),
            packagings = packagings.len(),
            pallet_types = pallet_types.len(),
            recipients = recipients.len(),
            "Catalog loaded"
        );

        Ok(Catalog::from_parts(
            articles,
            packagings.into_iter().map(Packaging::from),
            pallet_types.into_iter().map(PalletType::from),
            recipients.into_iter().map(Recipient::from),
        ))
    }

    /// True when no master data has been stored yet.
    pub async fn is_empty(&self) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT (SELECT COUNT(*) FROM articles)
                 + (SELECT COUNT(*) FROM packagings)
                 + (SELECT COUNT(*) FROM pallet_types)
                 + (SELECT COUNT(*) FROM recipients)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count == 0)
    }

    /// Stores every record of `catalog` in one transaction.
    pub async fn save_all(&self, catalog: &Catalog) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        for packaging in catalog.packagings() {
            upsert_packaging(&mut tx, packaging).await?;
        }
        for pallet in catalog.pallet_types() {
            upsert_pallet_type(&mut tx, pallet).await?;
        }
        for article in catalog.articles() {
            upsert_article(&mut tx, article).await?;
        }
        for recipient in catalog.recipients() {
            upsert_recipient(&mut tx, recipient).await?;
        }

        tx.commit().await?;
        info!("Catalog saved");
        Ok(())
    }

    pub async fn save_article(&self, article: &Article) -> DbResult<()> {
        debug!(code = %article.code, "Saving article");
        let mut conn = self.pool.acquire().await?;
        upsert_article(&mut conn, article).await
    }

    pub async fn save_packaging(&self, packaging: &Packaging) -> DbResult<()> {
        debug!(id = %packaging.id, "Saving packaging");
        let mut conn = self.pool.acquire().await?;
        upsert_packaging(&mut conn, packaging).await
    }

    pub async fn save_pallet_type(&self, pallet: &PalletType) -> DbResult<()> {
        debug!(id = %pallet.id, "Saving pallet type");
        let mut conn = self.pool.acquire().await?;
        upsert_pallet_type(&mut conn, pallet).await
    }

    pub async fn save_recipient(&self, recipient: &Recipient) -> DbResult<()> {
        debug!(code = %recipient.code, "Saving recipient");
        let mut conn = self.pool.acquire().await?;
        upsert_recipient(&mut conn, recipient).await
    }

    /// Deletes an article. Returns false if it did not exist.
    pub async fn remove_article(&self, code: &str) -> DbResult<bool> {
        self.remove("DELETE FROM articles WHERE code = ?1", code).await
    }

    pub async fn remove_packaging(&self, id: &str) -> DbResult<bool> {
        self.remove("DELETE FROM packagings WHERE id = ?1", id).await
    }

    pub async fn remove_pallet_type(&self, id: &str) -> DbResult<bool> {
        self.remove("DELETE FROM pallet_types WHERE id = ?1", id).await
    }

    pub async fn remove_recipient(&self, code: &str) -> DbResult<bool> {
        self.remove("DELETE FROM recipients WHERE code = ?1", code).await
    }

    async fn remove(&self, sql: &str, key: &str) -> DbResult<bool> {
        debug!(key = %key, "Removing master data record");
        let result = sqlx::query(sql).bind(key).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Upserts
// =============================================================================

async fn upsert_article(conn: &mut SqliteConnection, article: &Article) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO articles (
            code, description, gtin, origin, unit_of_measure,
            weighing_mode, unit_weight_grams, default_packaging_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(code) DO UPDATE SET
            description = excluded.description,
            gtin = excluded.gtin,
            origin = excluded.origin,
            unit_of_measure = excluded.unit_of_measure,
            weighing_mode = excluded.weighing_mode,
            unit_weight_grams = excluded.unit_weight_grams,
            default_packaging_id = excluded.default_packaging_id
        "#,
    )
    .bind(&article.code)
    .bind(&article.description)
    .bind(article.gtin.as_str())
    .bind(&article.origin)
    .bind(article.unit_of_measure)
    .bind(article.weighing_mode)
    .bind(article.unit_weight.grams())
    .bind(&article.default_packaging_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn upsert_packaging(conn: &mut SqliteConnection, packaging: &Packaging) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO packagings (id, name, tare_grams, is_pooling, width_mm, depth_mm, height_mm)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            tare_grams = excluded.tare_grams,
            is_pooling = excluded.is_pooling,
            width_mm = excluded.width_mm,
            depth_mm = excluded.depth_mm,
            height_mm = excluded.height_mm
        "#,
    )
    .bind(&packaging.id)
    .bind(&packaging.name)
    .bind(packaging.tare.grams())
    .bind(packaging.is_pooling)
    .bind(packaging.width_mm.map(i64::from))
    .bind(packaging.depth_mm.map(i64::from))
    .bind(packaging.height_mm.map(i64::from))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn upsert_pallet_type(conn: &mut SqliteConnection, pallet: &PalletType) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO pallet_types (
            id, name, tare_grams, is_pooling, width_mm, depth_mm, height_mm, max_load_grams
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            tare_grams = excluded.tare_grams,
            is_pooling = excluded.is_pooling,
            width_mm = excluded.width_mm,
            depth_mm = excluded.depth_mm,
            height_mm = excluded.height_mm,
            max_load_grams = excluded.max_load_grams
        "#,
    )
    .bind(&pallet.id)
    .bind(&pallet.name)
    .bind(pallet.tare.grams())
    .bind(pallet.is_pooling)
    .bind(pallet.width_mm.map(i64::from))
    .bind(pallet.depth_mm.map(i64::from))
    .bind(pallet.height_mm.map(i64::from))
    .bind(pallet.max_load.map(|w| w.grams()))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn upsert_recipient(conn: &mut SqliteConnection, recipient: &Recipient) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO recipients (code, name, address, vat_number, email, phone)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(code) DO UPDATE SET
            name = excluded.name,
            address = excluded.address,
            vat_number = excluded.vat_number,
            email = excluded.email,
            phone = excluded.phone
        "#,
    )
    .bind(&recipient.code)
    .bind(&recipient.name)
    .bind(&recipient.address)
    .bind(&recipient.vat_number)
    .bind(&recipient.email)
    .bind(&recipient.phone)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
