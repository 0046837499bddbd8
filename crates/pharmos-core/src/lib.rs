//! # pharmos-core: Pure Business Logic for Pharmos
//!
//! This crate holds the billing rules of the pharmacy back end as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Pharmos Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Single-page frontend                            │   │
//! │  │    Stock lookup ──► Bill form ──► Receipt ──► Reports           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ REST (apps/api)                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               pharmos-db (Coordinator + Repositories)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ pharmos-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────┐  │   │
//! │  │   │  types  │ │  money  │ │ billing │ │validation│ │ access │  │   │
//! │  │   │  Batch  │ │  Money  │ │ totals  │ │  rules   │ │ roles  │  │   │
//! │  │   │  Bill   │ │Discount │ │ pricing │ │  checks  │ │        │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └──────────┘ └────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Batch, Bill, BillItem, AuditEvent, ...)
//! - [`money`] - Money and DiscountRate with integer arithmetic
//! - [`billing`] - Bill totals, line pricing, availability check
//! - [`validation`] - Field rules and bill request validation
//! - [`receipt`] - Structured receipt and plain-text rendering
//! - [`access`] - Role capability table
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use pharmos_core::billing::{compute_totals, LineAmount};
//! use pharmos_core::money::{DiscountRate, Money};
//!
//! let lines = [LineAmount::new(Money::from_cents(5000), 2)];
//! let totals = compute_totals(&lines, DiscountRate::from_bps(1000));
//!
//! assert_eq!(totals.subtotal.cents(), 10000);
//! assert_eq!(totals.discount_amount.cents(), 1000);
//! assert_eq!(totals.total.cents(), 9000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod billing;
pub mod error;
pub mod money;
pub mod receipt;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{Action, Role};
pub use error::{CoreError, FieldError, ValidationError};
pub use money::{DiscountRate, Money};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed in a single bill.
pub const MAX_BILL_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// Guards against typing 1000 instead of 10 at the counter.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Default low-stock threshold: a batch at or below this quantity after a
/// sale triggers a `STOCK_LOW` event.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;
