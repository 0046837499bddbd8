//! # Billing Module
//!
//! Pure bill computation: request shape, validation, authoritative line
//! pricing, the soft availability check and totals.
//!
//! ## Where This Sits in create_bill
//! ```text
//! CreateBillRequest (JSON)
//!      │
//!      ▼
//! validate_bill ────────────► Vec<FieldError>  (no side effects)
//!      │
//!      ▼
//! (coordinator loads batches)
//!      │
//!      ▼
//! price_lines ──────────────► Vec<PricedLine>  (server price, snapshots)
//!      │
//!      ▼
//! check_availability ───────► InsufficientStock (soft; ledger decides)
//!      │
//!      ▼
//! compute_totals ───────────► BillTotals
//! ```

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, FieldError};
use crate::money::{DiscountRate, Money};
use crate::receipt::Receipt;
use crate::types::{Batch, PaymentMethod};
use crate::validation::{
    validate_discount_percent, validate_name, validate_phone, validate_price_cents,
    validate_quantity, validate_reference,
};
use crate::MAX_BILL_ITEMS;

// =============================================================================
// Request
// =============================================================================

/// A bill as submitted by the counter.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillRequest {
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Percentage, 0..=100.
    #[serde(default)]
    pub discount_percent: f64,
    pub items: Vec<BillLineRequest>,
}

/// One requested line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillLineRequest {
    pub batch_id: String,
    pub quantity: i64,
    /// Price the client displayed. Advisory only.
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
}

impl CreateBillRequest {
    pub fn discount_rate(&self) -> DiscountRate {
        DiscountRate::from_percentage(self.discount_percent)
    }

    /// Trimmed phone, `None` when blank.
    pub fn phone(&self) -> Option<String> {
        self.customer_phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
    }

    /// Doctor reference, `None` when blank.
    pub fn doctor(&self) -> Option<&str> {
        self.doctor_id
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Checks a request against the field rules and collects every problem.
///
/// An empty vector means the request is well-formed. Stock levels are not
/// consulted here; see [`check_availability`].
pub fn validate_bill(request: &CreateBillRequest) -> Vec<FieldError> {
    let mut errors: Vec<FieldError> = Vec::new();

    if let Err(e) = validate_name("customerName", &request.customer_name) {
        errors.push(e.into());
    }

    if let Some(phone) = &request.customer_phone {
        if let Err(e) = validate_phone("customerPhone", phone) {
            errors.push(e.into());
        }
    }

    if let Err(e) = validate_discount_percent("discountPercent", request.discount_percent) {
        errors.push(e.into());
    }

    if request.items.is_empty() {
        errors.push(FieldError::new("items", "at least one item is required"));
    } else if request.items.len() > MAX_BILL_ITEMS {
        errors.push(FieldError::new(
            "items",
            format!("at most {} items are allowed", MAX_BILL_ITEMS),
        ));
    }

    for (i, line) in request.items.iter().enumerate() {
        if let Err(e) = validate_reference(&format!("items[{}].batchId", i), &line.batch_id) {
            errors.push(e.into());
        }
        if let Err(e) = validate_quantity(&format!("items[{}].quantity", i), line.quantity) {
            errors.push(e.into());
        }
        if let Some(price) = line.unit_price_cents {
            if let Err(e) = validate_price_cents(&format!("items[{}].unitPriceCents", i), price) {
                errors.push(e.into());
            }
        }
    }

    errors
}

/// Rejects lines that would sell from an expired batch on `today`.
pub fn check_expiry(
    lines: &[BillLineRequest],
    batches: &HashMap<String, Batch>,
    today: NaiveDate,
) -> Vec<FieldError> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| {
            let batch = batches.get(&line.batch_id)?;
            batch.is_expired(today).then(|| {
                FieldError::new(
                    format!("items[{}].batchId", i),
                    format!("batch {} is expired", batch.lot_number),
                )
            })
        })
        .collect()
}

// =============================================================================
// Pricing
// =============================================================================

/// A line priced from server state, ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricedLine {
    pub batch_id: String,
    pub product_name: String,
    pub lot_number: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
}

impl PricedLine {
    fn amount(&self) -> LineAmount {
        LineAmount::new(self.unit_price, self.quantity)
    }
}

/// Prices every requested line from its batch.
///
/// ## Authoritative Pricing
/// The unit price, product name and lot number come from `batches`. A
/// client-supplied `unit_price_cents` is never used.
pub fn price_lines(
    lines: &[BillLineRequest],
    batches: &HashMap<String, Batch>,
) -> CoreResult<Vec<PricedLine>> {
    lines
        .iter()
        .map(|line| {
            let batch = batches
                .get(&line.batch_id)
                .ok_or_else(|| CoreError::BatchNotFound(line.batch_id.clone()))?;
            let unit_price = batch.unit_price();

            Ok(PricedLine {
                batch_id: batch.id.clone(),
                product_name: batch.product_name.clone(),
                lot_number: batch.lot_number.clone(),
                unit_price,
                quantity: line.quantity,
                line_total: unit_price.multiply_quantity(line.quantity),
            })
        })
        .collect()
}

/// Soft per-line check that each batch currently holds the requested quantity.
///
/// Availability can change before the deduction runs, so the stock ledger's
/// conditional update remains the final authority.
pub fn check_availability(
    lines: &[BillLineRequest],
    batches: &HashMap<String, Batch>,
) -> CoreResult<()> {
    for line in lines {
        let batch = batches
            .get(&line.batch_id)
            .ok_or_else(|| CoreError::BatchNotFound(line.batch_id.clone()))?;

        if !batch.can_supply(line.quantity) {
            return Err(CoreError::InsufficientStock {
                batch_id: batch.id.clone(),
                lot_number: batch.lot_number.clone(),
                available: batch.quantity,
                requested: line.quantity,
            });
        }
    }

    Ok(())
}

// =============================================================================
// Totals
// =============================================================================

/// Price and quantity of one line, the only inputs totals depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmount {
    pub unit_price: Money,
    pub quantity: i64,
}

impl LineAmount {
    pub const fn new(unit_price: Money, quantity: i64) -> Self {
        LineAmount {
            unit_price,
            quantity,
        }
    }

    #[inline]
    pub const fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Computed bill totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillTotals {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub total: Money,
}

/// Computes subtotal, discount and total.
///
/// The subtotal is exact. The discount is rounded half-up to the minor unit
/// exactly once; the total is `subtotal - discount_amount`.
pub fn compute_totals(lines: &[LineAmount], discount: DiscountRate) -> BillTotals {
    let subtotal: Money = lines.iter().map(LineAmount::line_total).sum();
    let discount_amount = subtotal.discount(discount);

    BillTotals {
        subtotal,
        discount_amount,
        total: subtotal - discount_amount,
    }
}

/// Totals for already priced lines.
pub fn totals_for(lines: &[PricedLine], discount: DiscountRate) -> BillTotals {
    let amounts: Vec<LineAmount> = lines.iter().map(PricedLine::amount).collect();
    compute_totals(&amounts, discount)
}

// =============================================================================
// Bill Number
// =============================================================================

/// Generates a human-readable bill number: `BILL-YYYYMMDD-HHMMSS-XXXXXXXX`.
///
/// The timestamp keeps numbers roughly monotonic; the eight hex characters
/// (32 bits of a UUID v4) separate bills created in the same second.
/// Uniqueness is finally enforced by the database.
pub fn generate_bill_number(at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("BILL-{}-{}", at.format("%Y%m%d-%H%M%S"), suffix)
}

// =============================================================================
// Receipt Handed Back to the Caller
// =============================================================================

/// The outcome of a successful `create_bill`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillReceipt {
    pub bill_id: String,
    pub bill_number: String,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub total: Money,
    pub receipt: Receipt,
}

// =============================================================================
// Unit Tests
// =============================================================================
