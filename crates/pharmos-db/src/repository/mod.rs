//! # Repository Module
//!
//! Database repository implementations for Pharmos.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  BillingCoordinator / REST handler                                     │
//! │       │                                                                 │
//! │       │  db.ledger().get_batch(id)                                     │
//! │       ▼                                                                 │
//! │  StockLedger / BillRepository / AuditLog / ...                         │
//! │       │                                                                 │
//! │       │  SQL (runtime-bound parameters)                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Mutations that must share a transaction are free functions taking     │
//! │  `&mut SqliteConnection` (ledger::deduct_on, bill::insert_bill_on, …). │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ledger::StockLedger`] - Batch lookups, conditional deduct, restore
//! - [`bill::BillRepository`] - Bill reads and listing
//! - [`audit::AuditLog`] - Append-only event log
//! - [`doctor::DoctorRepository`] - Doctor directory lookups
//! - [`product::ProductRepository`] - Product directory lookups

pub mod audit;
pub mod bill;
pub mod doctor;
pub mod ledger;
pub mod product;
