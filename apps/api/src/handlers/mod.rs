//! # HTTP Handlers
//!
//! Each handler: extract identity, check the capability, call into
//! pharmos-db, map the result.
//!
//! ## Handler Categories
//! - [`bills`] - create, list, get, cancel, receipt
//! - [`batches`] - stock lookups
//! - [`events`] - audit log queries
//! - [`health`] - liveness and database check

pub mod batches;
pub mod bills;
pub mod events;
pub mod health;
