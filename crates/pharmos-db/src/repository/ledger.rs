//! # Stock Ledger
//!
//! The only sanctioned mutation path for batch quantity-on-hand.
//!
//! ## Conditional Deduct
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WRONG (check-then-act race)          RIGHT (one conditional update)   │
//! │                                                                         │
//! │  T1: SELECT quantity → 5              T1: UPDATE batches               │
//! │  T2: SELECT quantity → 5                    SET quantity = quantity - 3│
//! │  T1: UPDATE quantity = 5 - 3               WHERE id = ? AND            │
//! │  T2: UPDATE quantity = 5 - 4                     quantity >= 3         │
//! │      → both sold, stock lies              RETURNING quantity  → 2      │
//! │                                       T2: same with 4 → no row         │
//! │                                           → InsufficientStock          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SQLite evaluates the predicate and the write atomically, so two sales can
//! never both take the last units. The ledger emits no audit events; the
//! billing coordinator decides what to log (including low stock).
//!
//! ## Executors
//! [`deduct_on`] and [`restore_on`] take a `&mut SqliteConnection`, so the
//! coordinator can run them on an open transaction (`&mut *tx`) while
//! [`StockLedger`] runs them on a pooled connection.

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult, LedgerError, LedgerResult};
use pharmos_core::Batch;

const SELECT_BATCH: &str = r#"
    SELECT
        b.id,
        b.product_id,
        p.name AS product_name,
        b.lot_number,
        b.quantity,
        b.unit_cost_cents,
        b.unit_price_cents,
        b.expiry_date,
        b.created_at,
        b.updated_at
    FROM batches b
    JOIN products p ON p.id = b.product_id
"#;

/// Input for registering a new batch (seed data and tests).
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub product_id: String,
    pub lot_number: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub unit_price_cents: i64,
    pub expiry_date: Option<NaiveDate>,
}

/// Pool-backed stock ledger.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    /// Creates a new StockLedger.
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    /// Looks up a batch.
    ///
    /// ## Returns
    /// * `Ok(Batch)` - Batch found (with its product name)
    /// * `Err(LedgerError::NotFound)` - No such batch
    pub async fn get_batch(&self, batch_id: &str) -> LedgerResult<Batch> {
        let mut conn = self.pool.acquire().await?;
        get_batch_on(&mut conn, batch_id).await
    }

    /// Deducts `quantity` from a batch and returns what remains.
    pub async fn deduct(&self, batch_id: &str, quantity: i64) -> LedgerResult<i64> {
        let mut conn = self.pool.acquire().await?;
        deduct_on(&mut conn, batch_id, quantity).await
    }

    /// Adds `quantity` back to a batch and returns the new quantity.
    pub async fn restore(&self, batch_id: &str, quantity: i64) -> LedgerResult<i64> {
        let mut conn = self.pool.acquire().await?;
        restore_on(&mut conn, batch_id, quantity).await
    }

    /// Lists the batches of a product, earliest expiry first.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<Batch>> {
        let sql = format!(
            "{} WHERE b.product_id = ?1 ORDER BY b.expiry_date IS NULL, b.expiry_date, b.lot_number",
            SELECT_BATCH
        );

        let batches = sqlx::query_as::<_, Batch>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(batches)
    }

    /// Registers a new batch.
    ///
    /// Direct stock editing is not part of billing; this exists for the seed
    /// tool and tests.
    pub async fn insert_batch(&self, new: NewBatch) -> DbResult<Batch> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(lot_number = %new.lot_number, quantity = new.quantity, "Inserting batch");

        sqlx::query(
            r#"
            INSERT INTO batches (
                id, product_id, lot_number, quantity,
                unit_cost_cents, unit_price_cents, expiry_date,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7,
                ?8, ?8
            )
            "#,
        )
        .bind(&id)
        .bind(&new.product_id)
        .bind(&new.lot_number)
        .bind(new.quantity)
        .bind(new.unit_cost_cents)
        .bind(new.unit_price_cents)
        .bind(new.expiry_date)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let mut conn = self.pool.acquire().await?;
        get_batch_on(&mut conn, &id).await.map_err(|e| match e {
            LedgerError::Db(db) => db,
            other => DbError::Internal(other.to_string()),
        })
    }
}

// =============================================================================
// Connection-Level Operations
// =============================================================================

/// Looks up a batch on an existing connection.
pub async fn get_batch_on(conn: &mut SqliteConnection, batch_id: &str) -> LedgerResult<Batch> {
    let sql = format!("{} WHERE b.id = ?1", SELECT_BATCH);

    sqlx::query_as::<_, Batch>(&sql)
        .bind(batch_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| LedgerError::NotFound(batch_id.to_string()))
}

/// Deducts stock with a single conditional update.
///
/// ## Guarantees
/// - Either the whole quantity is taken and the result is ≥ 0,
/// - or nothing changes and `InsufficientStock` / `NotFound` is returned.
///
/// `updated_at` is bumped on success.
pub async fn deduct_on(
    conn: &mut SqliteConnection,
    batch_id: &str,
    quantity: i64,
) -> LedgerResult<i64> {
    if quantity <= 0 {
        return Err(LedgerError::InvalidQuantity(quantity));
    }

    let remaining: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE batches SET
            quantity = quantity - ?2,
            updated_at = ?3
        WHERE id = ?1 AND quantity >= ?2
        RETURNING quantity
        "#,
    )
    .bind(batch_id)
    .bind(quantity)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(remaining) = remaining {
        debug!(batch_id = %batch_id, quantity, remaining, "Stock deducted");
        return Ok(remaining);
    }

    // No row updated: either the batch is missing or it holds too little.
    let batch = get_batch_on(conn, batch_id).await?;

    warn!(
        batch_id = %batch_id,
        available = batch.quantity,
        requested = quantity,
        "Deduct rejected: insufficient stock"
    );

    Err(LedgerError::InsufficientStock {
        batch_id: batch.id,
        lot_number: batch.lot_number,
        available: batch.quantity,
        requested: quantity,
    })
}

/// Adds stock back. No upper bound: a batch may always regain what it held.
pub async fn restore_on(
    conn: &mut SqliteConnection,
    batch_id: &str,
    quantity: i64,
) -> LedgerResult<i64> {
    if quantity <= 0 {
        return Err(LedgerError::InvalidQuantity(quantity));
    }

    let restored: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE batches SET
            quantity = quantity + ?2,
            updated_at = ?3
        WHERE id = ?1
        RETURNING quantity
        "#,
    )
    .bind(batch_id)
    .bind(quantity)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    match restored {
        Some(quantity_now) => {
            debug!(batch_id = %batch_id, quantity, quantity_now, "Stock restored");
            Ok(quantity_now)
        }
        None => Err(LedgerError::NotFound(batch_id.to_string())),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn setup(quantity: i64) -> (Database, Batch) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert("Paracetamol 500mg", Some("Cipla"))
            .await
            .unwrap();
        let batch = db
            .ledger()
            .insert_batch(NewBatch {
                product_id: product.id,
                lot_number: "LOT-001".to_string(),
                quantity,
                unit_cost_cents: 700,
                unit_price_cents: 1000,
                expiry_date: NaiveDate::from_ymd_opt(2030, 12, 31),
            })
            .await
            .unwrap();
        (db, batch)
    }

    #[tokio::test]
    async fn test_get_batch_joins_product_name() {
        let (db, batch) = setup(5).await;

        let fetched = db.ledger().get_batch(&batch.id).await.unwrap();
        assert_eq!(fetched.product_name, "Paracetamol 500mg");
        assert_eq!(fetched.quantity, 5);
        assert_eq!(fetched.expiry_date, NaiveDate::from_ymd_opt(2030, 12, 31));

        assert!(matches!(
            db.ledger().get_batch("missing").await,
            Err(LedgerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_deduct_reduces_quantity() {
        let (db, batch) = setup(5).await;

        assert_eq!(db.ledger().deduct(&batch.id, 3).await.unwrap(), 2);
        assert_eq!(db.ledger().get_batch(&batch.id).await.unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_deduct_never_goes_negative() {
        let (db, batch) = setup(5).await;
        let ledger = db.ledger();

        let mut on_hand = 5;
        for requested in [2, 4, 3, 1, 1, 7] {
            match ledger.deduct(&batch.id, requested).await {
                Ok(remaining) => {
                    on_hand -= requested;
                    assert_eq!(remaining, on_hand);
                }
                Err(LedgerError::InsufficientStock {
                    available,
                    requested: r,
                    ..
                }) => {
                    assert_eq!(available, on_hand);
                    assert_eq!(r, requested);
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
            let now = ledger.get_batch(&batch.id).await.unwrap().quantity;
            assert!(now >= 0);
            assert_eq!(now, on_hand);
        }
        assert_eq!(on_hand, 0);
    }

    #[tokio::test]
    async fn test_deduct_missing_batch() {
        let (db, _) = setup(5).await;
        assert!(matches!(
            db.ledger().deduct("missing", 1).await,
            Err(LedgerError::NotFound(id)) if id == "missing"
        ));
    }

    #[tokio::test]
    async fn test_deduct_rejects_non_positive_quantity() {
        let (db, batch) = setup(5).await;
        assert!(matches!(
            db.ledger().deduct(&batch.id, 0).await,
            Err(LedgerError::InvalidQuantity(0))
        ));
        assert_eq!(db.ledger().get_batch(&batch.id).await.unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_restore_round_trip() {
        let (db, batch) = setup(8).await;
        let ledger = db.ledger();

        for q in 1..=8 {
            ledger.deduct(&batch.id, q).await.unwrap();
            assert_eq!(ledger.restore(&batch.id, q).await.unwrap(), 8);
        }
    }

    #[tokio::test]
    async fn test_restore_has_no_upper_bound() {
        let (db, batch) = setup(1).await;
        assert_eq!(db.ledger().restore(&batch.id, 50).await.unwrap(), 51);
        assert!(matches!(
            db.ledger().restore("missing", 1).await,
            Err(LedgerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_deduct_inside_rolled_back_transaction() {
        let (db, batch) = setup(5).await;

        {
            let mut tx = db.pool().begin().await.unwrap();
            assert_eq!(deduct_on(&mut tx, &batch.id, 4).await.unwrap(), 1);
            // dropped without commit
        }

        assert_eq!(db.ledger().get_batch(&batch.id).await.unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_list_for_product() {
        let (db, batch) = setup(5).await;
        let batches = db.ledger().list_for_product(&batch.product_id).await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].lot_number, "LOT-001");
    }
}
