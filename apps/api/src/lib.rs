//! # Pharmos API
//!
//! REST surface of the billing and inventory core.
//!
//! ## Routes
//! ```text
//! GET  /health
//! POST /api/v1/bills                      create (201 + BillReceipt)
//! GET  /api/v1/bills                      list (?from&to&status&limit)
//! GET  /api/v1/bills/:id                  bill + items
//! POST /api/v1/bills/:id/cancel           cancel, restore stock
//! GET  /api/v1/bills/:id/receipt          text (default) or ?format=json
//! GET  /api/v1/batches/:id                current batch state
//! GET  /api/v1/products/:id/batches       batches of a product
//! GET  /api/v1/events                     audit log (?type&from&to&limit)
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use pharmos_db::{BillingCoordinator, Database};

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub billing: BillingCoordinator,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        let billing = BillingCoordinator::new(db.clone(), config.billing_policy());
        AppState {
            db,
            billing,
            config: Arc::new(config),
        }
    }
}

/// Builds the router with tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/bills",
            post(handlers::bills::create_bill).get(handlers::bills::list_bills),
        )
        .route("/bills/:id", get(handlers::bills::get_bill))
        .route("/bills/:id/cancel", post(handlers::bills::cancel_bill))
        .route("/bills/:id/receipt", get(handlers::bills::get_receipt))
        .route("/batches/:id", get(handlers::batches::get_batch))
        .route(
            "/products/:id/batches",
            get(handlers::batches::list_product_batches),
        )
        .route("/events", get(handlers::events::list_events));

    let cors = if state.config.cors_permissive {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
