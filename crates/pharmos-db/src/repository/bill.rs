//! # Bill Repository
//!
//! Persistence for bills and bill items.
//!
//! ## Bill Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Bill Lifecycle                                    │
//! │                                                                         │
//! │  Draft (client only, never stored)                                     │
//! │     │                                                                   │
//! │     │  BillingCoordinator::create_bill                                 │
//! │     │  └── insert_bill_on + insert_item_on (inside the deduct tx)      │
//! │     ▼                                                                   │
//! │  Active                                                                │
//! │     │                                                                   │
//! │     │  BillingCoordinator::cancel_bill                                 │
//! │     │  └── cancel_on: UPDATE … WHERE status = 'active' (inside tx)     │
//! │     ▼                                                                   │
//! │  Cancelled (terminal)                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes only happen on a connection handed in by the coordinator, so they
//! always share its transaction. Reads go through [`BillRepository`].

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use pharmos_core::{Bill, BillItem, BillStatus, BillWithItems};

const BILL_COLUMNS: &str = r#"
    id, bill_number, customer_name, customer_phone,
    doctor_id, doctor_name, payment_method, discount_bps,
    subtotal_cents, discount_cents, total_cents, status,
    created_at, created_by, cancelled_at, cancelled_by
"#;

/// Default page size for [`BillRepository::list`].
pub const DEFAULT_BILL_LIMIT: u32 = 50;

/// Largest page size for [`BillRepository::list`].
pub const MAX_BILL_LIMIT: u32 = 500;

/// Filter for listing bills, newest first.
#[derive(Debug, Clone, Default)]
pub struct BillFilter {
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
    pub status: Option<BillStatus>,
    pub limit: Option<u32>,
}

impl BillFilter {
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_BILL_LIMIT)
            .clamp(1, MAX_BILL_LIMIT)
    }
}

/// Read-side repository for bills.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Gets a bill by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bill>> {
        let mut conn = self.pool.acquire().await?;
        get_on(&mut conn, id).await
    }

    /// Gets the items of a bill in line order.
    pub async fn get_items(&self, bill_id: &str) -> DbResult<Vec<BillItem>> {
        let mut conn = self.pool.acquire().await?;
        items_on(&mut conn, bill_id).await
    }

    /// Gets a bill together with its items.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No such bill
    pub async fn get_with_items(&self, id: &str) -> DbResult<BillWithItems> {
        let mut conn = self.pool.acquire().await?;
        let bill = get_on(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Bill", id))?;
        let items = items_on(&mut conn, id).await?;

        Ok(BillWithItems { bill, items })
    }

    /// Lists bills matching `filter`, newest first.
    pub async fn list(&self, filter: &BillFilter) -> DbResult<Vec<Bill>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM bills WHERE 1 = 1", BILL_COLUMNS));

        if let Some(from) = filter.from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND created_at < ").push_bind(to);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }

        qb.push(" ORDER BY created_at DESC, bill_number DESC LIMIT ")
            .push_bind(filter.effective_limit() as i64);

        let bills = qb.build_query_as::<Bill>().fetch_all(&self.pool).await?;

        debug!(count = bills.len(), "Listed bills");
        Ok(bills)
    }
}

// =============================================================================
// Connection-Level Operations
// =============================================================================

/// Reads a bill on an existing connection.
pub async fn get_on(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Bill>> {
    let sql = format!("SELECT {} FROM bills WHERE id = ?1", BILL_COLUMNS);

    let bill = sqlx::query_as::<_, Bill>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(bill)
}

/// Reads the items of a bill on an existing connection.
pub async fn items_on(conn: &mut SqliteConnection, bill_id: &str) -> DbResult<Vec<BillItem>> {
    let items = sqlx::query_as::<_, BillItem>(
        r#"
        SELECT
            id, bill_id, batch_id, product_name, lot_number,
            unit_price_cents, quantity, line_total_cents, position
        FROM bill_items
        WHERE bill_id = ?1
        ORDER BY position
        "#,
    )
    .bind(bill_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

/// Inserts the bill header.
///
/// ## Errors
/// * `DbError::UniqueViolation` - bill number already taken
pub async fn insert_bill_on(conn: &mut SqliteConnection, bill: &Bill) -> DbResult<()> {
    debug!(id = %bill.id, bill_number = %bill.bill_number, "Inserting bill");

    sqlx::query(
        r#"
        INSERT INTO bills (
            id, bill_number, customer_name, customer_phone,
            doctor_id, doctor_name, payment_method, discount_bps,
            subtotal_cents, discount_cents, total_cents, status,
            created_at, created_by, cancelled_at, cancelled_by
        ) VALUES (
            ?1, ?2, ?3, ?4,
            ?5, ?6, ?7, ?8,
            ?9, ?10, ?11, ?12,
            ?13, ?14, ?15, ?16
        )
        "#,
    )
    .bind(&bill.id)
    .bind(&bill.bill_number)
    .bind(&bill.customer_name)
    .bind(&bill.customer_phone)
    .bind(&bill.doctor_id)
    .bind(&bill.doctor_name)
    .bind(bill.payment_method)
    .bind(bill.discount_bps)
    .bind(bill.subtotal_cents)
    .bind(bill.discount_cents)
    .bind(bill.total_cents)
    .bind(bill.status)
    .bind(bill.created_at)
    .bind(&bill.created_by)
    .bind(bill.cancelled_at)
    .bind(&bill.cancelled_by)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts one bill item (snapshot of the batch at sale time).
pub async fn insert_item_on(conn: &mut SqliteConnection, item: &BillItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO bill_items (
            id, bill_id, batch_id, product_name, lot_number,
            unit_price_cents, quantity, line_total_cents, position
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9
        )
        "#,
    )
    .bind(&item.id)
    .bind(&item.bill_id)
    .bind(&item.batch_id)
    .bind(&item.product_name)
    .bind(&item.lot_number)
    .bind(item.unit_price_cents)
    .bind(item.quantity)
    .bind(item.line_total_cents)
    .bind(item.position)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Flips an active bill to cancelled.
///
/// ## Returns
/// * `Ok(true)` - This call cancelled the bill
/// * `Ok(false)` - The bill is missing or was already cancelled
pub async fn cancel_on(
    conn: &mut SqliteConnection,
    bill_id: &str,
    cancelled_by: &str,
    at: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE bills SET
            status = 'cancelled',
            cancelled_at = ?2,
            cancelled_by = ?3
        WHERE id = ?1 AND status = 'active'
        "#,
    )
    .bind(bill_id)
    .bind(at)
    .bind(cancelled_by)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use pharmos_core::PaymentMethod;

    fn bill(id: &str, number: &str, created_at: DateTime<Utc>) -> Bill {
        Bill {
            id: id.to_string(),
            bill_number: number.to_string(),
            customer_name: "Walk-in".to_string(),
            customer_phone: None,
            doctor_id: None,
            doctor_name: None,
            payment_method: PaymentMethod::Card,
            discount_bps: 500,
            subtotal_cents: 2000,
            discount_cents: 100,
            total_cents: 1900,
            status: BillStatus::Active,
            created_at,
            created_by: "u-1".to_string(),
            cancelled_at: None,
            cancelled_by: None,
        }
    }

    fn item(bill_id: &str, position: i64) -> BillItem {
        BillItem {
            id: format!("{}-{}", bill_id, position),
            bill_id: bill_id.to_string(),
            batch_id: "batch-x".to_string(),
            product_name: "Cetirizine 10mg".to_string(),
            lot_number: "LOT-9".to_string(),
            unit_price_cents: 1000,
            quantity: 1,
            line_total_cents: 1000,
            position,
        }
    }

    async fn store(db: &Database, b: &Bill, items: &[BillItem]) {
        let mut tx = db.pool().begin().await.unwrap();
        insert_bill_on(&mut tx, b).await.unwrap();
        for i in items {
            insert_item_on(&mut tx, i).await.unwrap();
        }
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        store(&db, &bill("b1", "BILL-1", Utc::now()), &[item("b1", 1), item("b1", 0)]).await;

        let loaded = db.bills().get_with_items("b1").await.unwrap();
        assert_eq!(loaded.bill.payment_method, PaymentMethod::Card);
        assert_eq!(loaded.bill.discount_bps, 500);
        assert_eq!(loaded.bill.status, BillStatus::Active);
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.items[0].position, 0);

        assert!(matches!(
            db.bills().get_with_items("nope").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_bill_number_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        store(&db, &bill("b1", "BILL-1", Utc::now()), &[]).await;

        let mut conn = db.pool().acquire().await.unwrap();
        let err = insert_bill_on(&mut conn, &bill("b2", "BILL-1", Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_cancel_only_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        store(&db, &bill("b1", "BILL-1", Utc::now()), &[]).await;

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(cancel_on(&mut conn, "b1", "admin-1", Utc::now()).await.unwrap());
        assert!(!cancel_on(&mut conn, "b1", "admin-1", Utc::now()).await.unwrap());
        assert!(!cancel_on(&mut conn, "missing", "admin-1", Utc::now()).await.unwrap());

        let b = get_on(&mut conn, "b1").await.unwrap().unwrap();
        assert_eq!(b.status, BillStatus::Cancelled);
        assert_eq!(b.cancelled_by.as_deref(), Some("admin-1"));
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        store(&db, &bill("old", "BILL-OLD", now - Duration::days(3)), &[]).await;
        store(&db, &bill("mid", "BILL-MID", now - Duration::days(1)), &[]).await;
        store(&db, &bill("new", "BILL-NEW", now), &[]).await;

        let all = db.bills().list(&BillFilter::default()).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);

        let recent = db
            .bills()
            .list(&BillFilter {
                from: Some(now - Duration::days(2)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);

        {
            let mut conn = db.pool().acquire().await.unwrap();
            cancel_on(&mut conn, "mid", "admin", now).await.unwrap();
        }
        let cancelled = db
            .bills()
            .list(&BillFilter {
                status: Some(BillStatus::Cancelled),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id, "mid");

        let one = db
            .bills()
            .list(&BillFilter {
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn test_effective_limit_clamped() {
        assert_eq!(BillFilter::default().effective_limit(), DEFAULT_BILL_LIMIT);
        let f = BillFilter {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(f.effective_limit(), 1);
        let f = BillFilter {
            limit: Some(10_000),
            ..Default::default()
        };
        assert_eq!(f.effective_limit(), MAX_BILL_LIMIT);
    }
}
