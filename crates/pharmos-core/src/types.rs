//! # Domain Types
//!
//! Core domain types used throughout Pharmos.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Batch       │   │      Bill       │   │   AuditEvent    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  lot_number     │   │  bill_number    │   │  event_type     │       │
//! │  │  quantity       │◄──│  status         │   │  payload (JSON) │       │
//! │  │  unit_price     │   │  items[]        │   │  description    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    BillItem     │   │   BillStatus    │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  batch_id (ref) │   │  Active         │   │  Cash  Card     │       │
//! │  │  price snapshot │   │  Cancelled      │   │  Upi   Credit   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (`bill_number`, `lot_number`) - human-readable

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::access::Role;
use crate::money::{DiscountRate, Money};

// =============================================================================
// Product & Batch
// =============================================================================

/// A product in the catalogue (read-only directory).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub manufacturer: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A specific lot of a product with its own stock level and pricing.
///
/// `quantity` is only mutated through the stock ledger's deduct/restore.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: String,
    pub product_id: String,
    /// Joined from the product directory.
    pub product_name: String,
    pub lot_number: String,
    /// Quantity on hand. Never negative.
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub unit_price_cents: i64,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Returns the selling price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the purchase cost as Money.
    #[inline]
    pub fn unit_cost(&self) -> Money {
        Money::from_cents(self.unit_cost_cents)
    }

    /// Checks whether the batch currently holds at least `quantity` units.
    pub fn can_supply(&self, quantity: i64) -> bool {
        self.quantity >= quantity
    }

    /// Checks whether the batch is past its expiry date on `today`.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < today)
    }
}

// =============================================================================
// Doctor
// =============================================================================

/// A prescribing doctor (read-only directory).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialization: Option<String>,
    pub phone: Option<String>,
}

// =============================================================================
// Bill Status
// =============================================================================

/// The status of a persisted bill.
///
/// ```text
/// Draft (client only) ──► Active ──► Cancelled (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    /// Persisted; stock deducted.
    Active,
    /// Stock restored. No further transitions.
    Cancelled,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Active => "active",
            BillStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for BillStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(BillStatus::Active),
            "cancelled" => Ok(BillStatus::Cancelled),
            other => Err(format!("unknown bill status '{}'", other)),
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    /// Settled later (account customers).
    Credit,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::Credit => "credit",
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

// =============================================================================
// Bill
// =============================================================================

/// One completed customer transaction.
///
/// Logically immutable after creation; the only change ever applied is the
/// `Active → Cancelled` transition.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: String,
    /// Human-readable, unique, timestamp-based.
    pub bill_number: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub doctor_id: Option<String>,
    /// Doctor display name at time of sale (frozen).
    pub doctor_name: Option<String>,
    pub payment_method: PaymentMethod,
    pub discount_bps: u32,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub status: BillStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
}

impl Bill {
    #[inline]
    pub fn discount_rate(&self) -> DiscountRate {
        DiscountRate::from_bps(self.discount_bps)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn discount_amount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.status == BillStatus::Cancelled
    }
}

// =============================================================================
// Bill Item
// =============================================================================

/// A line item in a bill.
/// Uses the snapshot pattern to freeze batch data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillItem {
    pub id: String,
    pub bill_id: String,
    /// Reference, not ownership: the batch may change or disappear later.
    pub batch_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    /// Lot number at time of sale (frozen).
    pub lot_number: String,
    /// Unit price at time of sale (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// Always unit_price × quantity, computed server side.
    pub line_total_cents: i64,
    /// Order of the line within the bill.
    pub position: i64,
}

impl BillItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// A bill together with its ordered line items.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillWithItems {
    pub bill: Bill,
    pub items: Vec<BillItem>,
}

// =============================================================================
// Audit Events
// =============================================================================

/// Kinds of domain events recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    BillCreated,
    StockSold,
    StockLow,
    BillCancelled,
    StockRestored,
    SystemError,
}

impl AuditEventType {
    pub const ALL: [AuditEventType; 6] = [
        AuditEventType::BillCreated,
        AuditEventType::StockSold,
        AuditEventType::StockLow,
        AuditEventType::BillCancelled,
        AuditEventType::StockRestored,
        AuditEventType::SystemError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::BillCreated => "BILL_CREATED",
            AuditEventType::StockSold => "STOCK_SOLD",
            AuditEventType::StockLow => "STOCK_LOW",
            AuditEventType::BillCancelled => "BILL_CANCELLED",
            AuditEventType::StockRestored => "STOCK_RESTORED",
            AuditEventType::SystemError => "SYSTEM_ERROR",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        AuditEventType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown event type '{}'", s))
    }
}

/// An append-only audit record.
///
/// References to bills and batches live inside `payload` and are not
/// enforced, so the log outlives the entities it mentions.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: String,
    pub event_type: AuditEventType,
    /// Structured payload as JSON text.
    pub payload: String,
    pub description: String,
    /// Component that emitted the event (e.g. "billing").
    pub source: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Parses the payload back into JSON. Malformed payloads yield `Null`.
    pub fn payload_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.payload).unwrap_or(serde_json::Value::Null)
    }
}

// =============================================================================
// Caller
// =============================================================================

/// The authenticated caller, as handed over by the identity layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Caller {
            user_id: user_id.into(),
            role,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(quantity: i64, expiry: Option<NaiveDate>) -> Batch {
        let now = Utc::now();
        Batch {
            id: "b-1".to_string(),
            product_id: "p-1".to_string(),
            product_name: "Paracetamol 500mg".to_string(),
            lot_number: "LOT-001".to_string(),
            quantity,
            unit_cost_cents: 700,
            unit_price_cents: 1000,
            expiry_date: expiry,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_batch_can_supply() {
        let b = batch(5, None);
        assert!(b.can_supply(5));
        assert!(!b.can_supply(6));
        assert_eq!(b.unit_price().cents(), 1000);
    }

    #[test]
    fn test_batch_expiry() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        assert!(batch(1, NaiveDate::from_ymd_opt(2026, 5, 31)).is_expired(today));
        assert!(!batch(1, Some(today)).is_expired(today));
        assert!(!batch(1, None).is_expired(today));
    }

    #[test]
    fn test_event_type_round_trip_names() {
        for t in AuditEventType::ALL {
            assert_eq!(t.as_str().parse::<AuditEventType>().unwrap(), t);
        }
        assert_eq!(
            "stock_low".parse::<AuditEventType>().unwrap(),
            AuditEventType::StockLow
        );
        assert!("EXPLODED".parse::<AuditEventType>().is_err());
    }

    #[test]
    fn test_event_type_serializes_screaming_snake() {
        let json = serde_json::to_string(&AuditEventType::BillCreated).unwrap();
        assert_eq!(json, "\"BILL_CREATED\"");
    }

    #[test]
    fn test_bill_status_parse() {
        assert_eq!("Active".parse::<BillStatus>().unwrap(), BillStatus::Active);
        assert_eq!(
            "cancelled".parse::<BillStatus>().unwrap(),
            BillStatus::Cancelled
        );
        assert!("draft".parse::<BillStatus>().is_err());
    }

    #[test]
    fn test_payment_method_json() {
        let m: PaymentMethod = serde_json::from_str("\"upi\"").unwrap();
        assert_eq!(m, PaymentMethod::Upi);
        assert_eq!(PaymentMethod::default(), PaymentMethod::Cash);
        assert_eq!(PaymentMethod::Card.to_string(), "CARD");
    }
}
