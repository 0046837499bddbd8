//! # Billing Coordinator
//!
//! The only component that creates or cancels bills. It owns the ordering
//! across the stock ledger, bill persistence and the audit log.
//!
//! ## create_bill
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. validate_bill ─────────────► Validation (no side effects)          │
//! │  ┌─────────────────── bounded by operation timeout ────────────────┐  │
//! │  │ 2. resolve doctor + batches ──► NotFound                        │  │
//! │  │    price lines from the batch (client prices ignored)           │  │
//! │  │ 3. soft availability check ───► InsufficientStock               │  │
//! │  │ 4. ONE TRANSACTION                                              │  │
//! │  │    deduct_on(line 1) … deduct_on(line n)  conditional updates   │  │
//! │  │    insert_bill_on + insert_item_on  (renumber once if taken)    │  │
//! │  │    COMMIT                                                       │  │
//! │  └─────────────────────────────────────────────────────────────────┘  │
//! │       any error / timeout → tx dropped → every deduction rolled back   │
//! │                                                                         │
//! │  5. audit (best effort): BILL_CREATED, STOCK_SOLD ×n, STOCK_LOW        │
//! │  6. BillReceipt                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## cancel_bill
//! One transaction: `active → cancelled` conditional update, then restore
//! every item. A second cancel finds no active row and restores nothing.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, LedgerError};
use crate::pool::Database;
use crate::repository::audit::AuditLog;
use crate::repository::bill::{self, BillFilter};
use crate::repository::ledger::{self, StockLedger};
use pharmos_core::billing::{
    check_availability, check_expiry, generate_bill_number, price_lines, totals_for,
    validate_bill, BillLineRequest, BillReceipt, BillTotals, CreateBillRequest,
};
use pharmos_core::receipt::Receipt;
use pharmos_core::{
    AuditEventType, Batch, Bill, BillItem, BillStatus, BillWithItems, Caller, CoreError,
    FieldError, DEFAULT_LOW_STOCK_THRESHOLD,
};

// =============================================================================
// Policy
// =============================================================================

/// Deployment-level billing settings.
#[derive(Debug, Clone)]
pub struct BillingPolicy {
    /// A batch at or below this quantity after a sale raises `STOCK_LOW`.
    pub low_stock_threshold: i64,
    /// Deadline for create (lookups through commit) and cancel.
    pub operation_timeout: Duration,
    /// Printed at the top of receipts.
    pub store_name: String,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        BillingPolicy {
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            operation_timeout: Duration::from_secs(10),
            store_name: "Pharmos Pharmacy".to_string(),
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Everything `create_bill` / `cancel_bill` can fail with.
///
/// None of these leave a partial deduction behind.
#[derive(Debug, Error)]
pub enum BillingError {
    /// Bad input; fix and retry.
    #[error("Validation failed: {} problem(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Insufficient stock in batch {lot_number} ({batch_id}): available {available}, requested {requested}")]
    InsufficientStock {
        batch_id: String,
        lot_number: String,
        available: i64,
        requested: i64,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Bill already cancelled: {0}")]
    AlreadyCancelled(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Persistence error: {0}")]
    Persistence(DbError),
}

impl BillingError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        BillingError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

impl From<DbError> for BillingError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => BillingError::NotFound { entity, id },
            other => BillingError::Persistence(other),
        }
    }
}

impl From<LedgerError> for BillingError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(id) => BillingError::not_found("Batch", id),
            LedgerError::InsufficientStock {
                batch_id,
                lot_number,
                available,
                requested,
            } => BillingError::InsufficientStock {
                batch_id,
                lot_number,
                available,
                requested,
            },
            LedgerError::InvalidQuantity(q) => BillingError::Validation(vec![FieldError::new(
                "quantity",
                format!("quantity must be positive, got {}", q),
            )]),
            LedgerError::Db(db) => db.into(),
        }
    }
}

impl From<CoreError> for BillingError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock {
                batch_id,
                lot_number,
                available,
                requested,
            } => BillingError::InsufficientStock {
                batch_id,
                lot_number,
                available,
                requested,
            },
            CoreError::BatchNotFound(id) => BillingError::not_found("Batch", id),
            CoreError::Validation(v) => BillingError::Validation(vec![v.into()]),
        }
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// Unique column named by SQLite when a bill number is already taken.
const BILL_NUMBER_COLUMN: &str = "bills.bill_number";

/// A committed bill, before auditing.
struct PlacedBill {
    bill: Bill,
    items: Vec<BillItem>,
    totals: BillTotals,
    remaining: Vec<i64>,
}

/// Orchestrates bill creation and cancellation.
#[derive(Debug, Clone)]
pub struct BillingCoordinator {
    db: Database,
    policy: BillingPolicy,
    audit: AuditLog,
}

impl BillingCoordinator {
    pub fn new(db: Database, policy: BillingPolicy) -> Self {
        let audit = db.audit().with_source("billing");
        BillingCoordinator { db, policy, audit }
    }

    pub fn policy(&self) -> &BillingPolicy {
        &self.policy
    }

    /// Creates a bill: validates, deducts all stock in one transaction,
    /// persists, logs, and returns the receipt.
    pub async fn create_bill(
        &self,
        request: &CreateBillRequest,
        caller: &Caller,
    ) -> Result<BillReceipt, BillingError> {
        // 1. Field rules
        let errors = validate_bill(request);
        if !errors.is_empty() {
            debug!(count = errors.len(), "Bill request rejected by validation");
            return Err(BillingError::Validation(errors));
        }

        // 2-4. Lookups through commit share one deadline
        let PlacedBill {
            bill,
            items,
            totals,
            remaining,
        } = match timeout(
            self.policy.operation_timeout,
            self.place_bill(request, caller),
        )
        .await
        {
            Ok(Ok(placed)) => placed,
            Ok(Err(err)) => {
                self.report_failure("create_bill", &err, request_context(request, caller))
                    .await;
                return Err(err);
            }
            Err(_) => {
                let err = BillingError::Timeout(self.policy.operation_timeout);
                self.report_failure("create_bill", &err, request_context(request, caller))
                    .await;
                return Err(err);
            }
        };

        info!(
            bill_id = %bill.id,
            bill_number = %bill.bill_number,
            items = items.len(),
            total_cents = bill.total_cents,
            created_by = %caller.user_id,
            "Bill created"
        );

        // 5. Audit trail
        self.log_bill_created(&bill, &items, &remaining).await;

        // 6. Receipt
        let receipt = Receipt::from_bill(&self.policy.store_name, &bill, &items);

        Ok(BillReceipt {
            bill_id: bill.id,
            bill_number: bill.bill_number,
            subtotal: totals.subtotal,
            discount_amount: totals.discount_amount,
            total: totals.total,
            receipt,
        })
    }

    /// Cancels an active bill and restores exactly what it deducted.
    pub async fn cancel_bill(&self, bill_id: &str, caller: &Caller) -> Result<Bill, BillingError> {
        let now = Utc::now();

        let (bill, items) = match timeout(
            self.policy.operation_timeout,
            self.persist_cancel(bill_id, &caller.user_id, now),
        )
        .await
        {
            Ok(Ok(done)) => done,
            Ok(Err(err)) => {
                self.report_failure("cancel_bill", &err, json!({ "billId": bill_id }))
                    .await;
                return Err(err);
            }
            Err(_) => {
                let err = BillingError::Timeout(self.policy.operation_timeout);
                self.report_failure("cancel_bill", &err, json!({ "billId": bill_id }))
                    .await;
                return Err(err);
            }
        };

        info!(
            bill_id = %bill.id,
            bill_number = %bill.bill_number,
            cancelled_by = %caller.user_id,
            "Bill cancelled"
        );

        self.audit
            .append(
                AuditEventType::BillCancelled,
                json!({
                    "billId": bill.id,
                    "billNumber": bill.bill_number,
                    "cancelledBy": caller.user_id,
                    "totalCents": bill.total_cents,
                }),
                format!("Bill {} cancelled by {}", bill.bill_number, caller.user_id),
            )
            .await;

        for (item, quantity_now) in &items {
            self.audit
                .append(
                    AuditEventType::StockRestored,
                    json!({
                        "billId": bill.id,
                        "batchId": item.batch_id,
                        "lotNumber": item.lot_number,
                        "quantity": item.quantity,
                        "quantityNow": quantity_now,
                    }),
                    format!(
                        "Restored {} of {} (lot {})",
                        item.quantity, item.product_name, item.lot_number
                    ),
                )
                .await;
        }

        Ok(bill)
    }

    /// Gets a bill with its items.
    pub async fn get_bill(&self, bill_id: &str) -> Result<BillWithItems, BillingError> {
        Ok(self.db.bills().get_with_items(bill_id).await?)
    }

    /// Builds the structured receipt of a stored bill.
    pub async fn receipt(&self, bill_id: &str) -> Result<Receipt, BillingError> {
        let BillWithItems { bill, items } = self.get_bill(bill_id).await?;
        Ok(Receipt::from_bill(&self.policy.store_name, &bill, &items))
    }

    /// Lists bills for reporting consumers.
    pub async fn list_bills(&self, filter: &BillFilter) -> Result<Vec<Bill>, BillingError> {
        Ok(self.db.bills().list(filter).await?)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    async fn load_batches(
        &self,
        lines: &[BillLineRequest],
    ) -> Result<HashMap<String, Batch>, BillingError> {
        let ledger: StockLedger = self.db.ledger();
        let mut batches = HashMap::with_capacity(lines.len());

        for line in lines {
            if batches.contains_key(&line.batch_id) {
                continue;
            }
            let batch = ledger.get_batch(&line.batch_id).await?;
            batches.insert(line.batch_id.clone(), batch);
        }

        Ok(batches)
    }

    /// Resolves server state, prices the request and commits the bill.
    async fn place_bill(
        &self,
        request: &CreateBillRequest,
        caller: &Caller,
    ) -> Result<PlacedBill, BillingError> {
        let doctor = match request.doctor() {
            Some(doctor_id) => Some(
                self.db
                    .doctors()
                    .get_by_id(doctor_id)
                    .await?
                    .ok_or_else(|| BillingError::not_found("Doctor", doctor_id))?,
            ),
            None => None,
        };

        let batches = self.load_batches(&request.items).await?;

        let expired = check_expiry(&request.items, &batches, Utc::now().date_naive());
        if !expired.is_empty() {
            return Err(BillingError::Validation(expired));
        }

        log_price_mismatches(&request.items, &batches);
        let lines = price_lines(&request.items, &batches)?;

        // Soft check; the ledger has the final word
        check_availability(&request.items, &batches)?;

        let totals = totals_for(&lines, request.discount_rate());
        let now = Utc::now();
        let mut bill = Bill {
            id: Uuid::new_v4().to_string(),
            bill_number: generate_bill_number(now),
            customer_name: request.customer_name.trim().to_string(),
            customer_phone: request.phone(),
            doctor_id: doctor.as_ref().map(|d| d.id.clone()),
            doctor_name: doctor.map(|d| d.name),
            payment_method: request.payment_method,
            discount_bps: request.discount_rate().bps(),
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount_amount.cents(),
            total_cents: totals.total.cents(),
            status: BillStatus::Active,
            created_at: now,
            created_by: caller.user_id.clone(),
            cancelled_at: None,
            cancelled_by: None,
        };

        let items: Vec<BillItem> = lines
            .iter()
            .enumerate()
            .map(|(position, line)| BillItem {
                id: Uuid::new_v4().to_string(),
                bill_id: bill.id.clone(),
                batch_id: line.batch_id.clone(),
                product_name: line.product_name.clone(),
                lot_number: line.lot_number.clone(),
                unit_price_cents: line.unit_price.cents(),
                quantity: line.quantity,
                line_total_cents: line.line_total.cents(),
                position: position as i64,
            })
            .collect();

        let remaining = self.persist_new_bill(&mut bill, &items).await?;

        Ok(PlacedBill {
            bill,
            items,
            totals,
            remaining,
        })
    }

    /// Persists a new bill, renumbering it once if its number is taken.
    async fn persist_new_bill(
        &self,
        bill: &mut Bill,
        items: &[BillItem],
    ) -> Result<Vec<i64>, BillingError> {
        match self.persist_bill(bill, items).await {
            Err(BillingError::Persistence(DbError::UniqueViolation { ref field, .. }))
                if field == BILL_NUMBER_COLUMN =>
            {
                let fresh = generate_bill_number(bill.created_at);
                let taken = std::mem::replace(&mut bill.bill_number, fresh);
                warn!(
                    taken = %taken,
                    bill_number = %bill.bill_number,
                    "Bill number collision, retrying with a new number"
                );
                self.persist_bill(bill, items).await
            }
            result => result,
        }
    }

    /// Deducts every line and writes the bill in one transaction.
    ///
    /// Returns the post-deduction quantity of each line, in line order.
    async fn persist_bill(&self, bill: &Bill, items: &[BillItem]) -> Result<Vec<i64>, BillingError> {
        let mut tx = self.db.pool().begin().await.map_err(DbError::transaction)?;

        let mut remaining = Vec::with_capacity(items.len());
        for item in items {
            remaining.push(ledger::deduct_on(&mut tx, &item.batch_id, item.quantity).await?);
        }

        bill::insert_bill_on(&mut tx, bill).await?;
        for item in items {
            bill::insert_item_on(&mut tx, item).await?;
        }

        tx.commit().await.map_err(DbError::transaction)?;
        Ok(remaining)
    }

    async fn persist_cancel(
        &self,
        bill_id: &str,
        cancelled_by: &str,
        at: DateTime<Utc>,
    ) -> Result<(Bill, Vec<(BillItem, i64)>), BillingError> {
        let mut tx = self.db.pool().begin().await.map_err(DbError::transaction)?;

        if !bill::cancel_on(&mut tx, bill_id, cancelled_by, at).await? {
            return Err(match bill::get_on(&mut tx, bill_id).await? {
                Some(_) => BillingError::AlreadyCancelled(bill_id.to_string()),
                None => BillingError::not_found("Bill", bill_id),
            });
        }

        let items = bill::items_on(&mut tx, bill_id).await?;
        let mut restored = Vec::with_capacity(items.len());
        for item in items {
            let quantity_now = ledger::restore_on(&mut tx, &item.batch_id, item.quantity).await?;
            restored.push((item, quantity_now));
        }

        let bill = bill::get_on(&mut tx, bill_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Bill", bill_id))?;

        tx.commit().await.map_err(DbError::transaction)?;
        Ok((bill, restored))
    }

    async fn log_bill_created(&self, bill: &Bill, items: &[BillItem], remaining: &[i64]) {
        self.audit
            .append(
                AuditEventType::BillCreated,
                json!({ "bill": bill, "items": items }),
                format!(
                    "Bill {} created for {} ({} items, total {})",
                    bill.bill_number,
                    bill.customer_name,
                    items.len(),
                    bill.total()
                ),
            )
            .await;

        for (item, left) in items.iter().zip(remaining) {
            self.audit
                .append(
                    AuditEventType::StockSold,
                    json!({
                        "billId": bill.id,
                        "billNumber": bill.bill_number,
                        "batchId": item.batch_id,
                        "lotNumber": item.lot_number,
                        "productName": item.product_name,
                        "quantity": item.quantity,
                        "remaining": left,
                    }),
                    format!(
                        "Sold {} of {} (lot {})",
                        item.quantity, item.product_name, item.lot_number
                    ),
                )
                .await;
        }

        // One STOCK_LOW per batch, using its quantity after the last line.
        let mut last_seen: Vec<(&BillItem, i64)> = Vec::new();
        for (item, left) in items.iter().zip(remaining) {
            match last_seen.iter_mut().find(|(i, _)| i.batch_id == item.batch_id) {
                Some(entry) => entry.1 = *left,
                None => last_seen.push((item, *left)),
            }
        }

        for (item, left) in last_seen {
            if left <= self.policy.low_stock_threshold {
                warn!(
                    batch_id = %item.batch_id,
                    lot_number = %item.lot_number,
                    remaining = left,
                    "Low stock"
                );
                self.audit
                    .append(
                        AuditEventType::StockLow,
                        json!({
                            "batchId": item.batch_id,
                            "lotNumber": item.lot_number,
                            "productName": item.product_name,
                            "remaining": left,
                            "threshold": self.policy.low_stock_threshold,
                        }),
                        format!(
                            "{} (lot {}) is low: {} left",
                            item.product_name, item.lot_number, left
                        ),
                    )
                    .await;
            }
        }
    }

    /// Records storage failures and timeouts as SYSTEM_ERROR events.
    async fn report_failure(&self, operation: &str, err: &BillingError, context: serde_json::Value) {
        match err {
            BillingError::Persistence(_) | BillingError::Timeout(_) => {
                warn!(operation, error = %err, "Billing operation failed and was rolled back");
                self.audit
                    .append(
                        AuditEventType::SystemError,
                        json!({
                            "operation": operation,
                            "error": err.to_string(),
                            "context": context,
                        }),
                        format!("{} failed: {}", operation, err),
                    )
                    .await;
            }
            _ => debug!(operation, error = %err, "Billing operation rejected"),
        }
    }
}

/// Context attached to a SYSTEM_ERROR raised by `create_bill`.
fn request_context(request: &CreateBillRequest, caller: &Caller) -> serde_json::Value {
    json!({
        "customerName": request.customer_name,
        "lines": request.items.len(),
        "createdBy": caller.user_id,
    })
}

fn log_price_mismatches(lines: &[BillLineRequest], batches: &HashMap<String, Batch>) {
    for line in lines {
        if let (Some(client), Some(batch)) = (line.unit_price_cents, batches.get(&line.batch_id)) {
            if client != batch.unit_price_cents {
                debug!(
                    batch_id = %batch.id,
                    client_price_cents = client,
                    price_cents = batch.unit_price_cents,
                    "Client price ignored"
                );
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
