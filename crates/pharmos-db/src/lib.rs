//! # pharmos-db: Database Layer for Pharmos
//!
//! SQLite storage for the pharmacy core, the stock ledger, and the billing
//! coordinator that owns the transaction boundary.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Pharmos Data Flow                                │
//! │                                                                         │
//! │  HTTP handler (POST /api/v1/bills)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   pharmos-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌────────────────────┐                                        │   │
//! │  │   │ BillingCoordinator │  validate → deduct → persist → audit   │   │
//! │  │   │   (billing.rs)     │                                        │   │
//! │  │   └─────────┬──────────┘                                        │   │
//! │  │             │                                                   │   │
//! │  │   ┌─────────┴─────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄───│ StockLedger   │    │  (embedded)  │  │   │
//! │  │   │  SqlitePool   │    │ BillRepo      │    │ 001_init.sql │  │   │
//! │  │   │               │    │ AuditLog      │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL)                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and ledger error types
//! - [`repository`] - Stock ledger, bills, audit log, directories
//! - [`billing`] - The billing coordinator
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pharmos_db::{BillingCoordinator, BillingPolicy, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("pharmos.db")).await?;
//! let billing = BillingCoordinator::new(db.clone(), BillingPolicy::default());
//!
//! let receipt = billing.create_bill(&request, &caller).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use billing::{BillingCoordinator, BillingError, BillingPolicy};
pub use error::{DbError, LedgerError};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::audit::{AuditLog, EventFilter};
pub use repository::bill::{BillFilter, BillRepository};
pub use repository::doctor::DoctorRepository;
pub use repository::ledger::{NewBatch, StockLedger};
pub use repository::product::ProductRepository;
