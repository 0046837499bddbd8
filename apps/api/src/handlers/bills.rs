//! # Bill Handlers
//!
//! ```text
//! POST /api/v1/bills                 CreateBill   → 201 BillReceipt
//! GET  /api/v1/bills                 ViewBill     → [Bill]
//! GET  /api/v1/bills/:id             ViewBill     → BillWithItems
//! POST /api/v1/bills/:id/cancel      CancelBill   → Bill
//! GET  /api/v1/bills/:id/receipt     ViewBill     → text/plain | Receipt
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::identity::{require, Identity};
use crate::AppState;
use pharmos_core::billing::{BillReceipt, CreateBillRequest};
use pharmos_core::{Action, Bill, BillStatus, BillWithItems};
use pharmos_db::BillFilter;

/// Query string of `GET /api/v1/bills`.
#[derive(Debug, Default, Deserialize)]
pub struct ListBillsQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub status: Option<BillStatus>,
    pub limit: Option<u32>,
}

/// Query string of the receipt endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ReceiptQuery {
    /// `text` (default) or `json`.
    pub format: Option<String>,
    pub width: Option<usize>,
}

pub async fn create_bill(
    State(state): State<AppState>,
    Identity(caller): Identity,
    body: Result<Json<CreateBillRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BillReceipt>), ApiError> {
    require(&caller, Action::CreateBill)?;
    let Json(request) = body?;

    debug!(items = request.items.len(), user_id = %caller.user_id, "create_bill");

    let receipt = state.billing.create_bill(&request, &caller).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn list_bills(
    State(state): State<AppState>,
    Identity(caller): Identity,
    query: Result<Query<ListBillsQuery>, QueryRejection>,
) -> Result<Json<Vec<Bill>>, ApiError> {
    require(&caller, Action::ViewBill)?;
    let Query(query) = query?;

    let filter = BillFilter {
        from: query.from,
        to: query.to,
        status: query.status,
        limit: query.limit,
    };

    Ok(Json(state.billing.list_bills(&filter).await?))
}

pub async fn get_bill(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Path(id): Path<String>,
) -> Result<Json<BillWithItems>, ApiError> {
    require(&caller, Action::ViewBill)?;
    Ok(Json(state.billing.get_bill(&id).await?))
}

pub async fn cancel_bill(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Path(id): Path<String>,
) -> Result<Json<Bill>, ApiError> {
    require(&caller, Action::CancelBill)?;

    let bill = state.billing.cancel_bill(&id, &caller).await?;
    info!(bill_id = %bill.id, user_id = %caller.user_id, "Cancel request completed");
    Ok(Json(bill))
}

pub async fn get_receipt(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Path(id): Path<String>,
    query: Result<Query<ReceiptQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    require(&caller, Action::ViewBill)?;
    let Query(query) = query?;

    let receipt = state.billing.receipt(&id).await?;

    match query.format.as_deref() {
        Some("json") => Ok(Json(receipt).into_response()),
        None | Some("text") => {
            let width = query.width.unwrap_or(state.config.receipt_width);
            Ok((
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                receipt.render_text(width),
            )
                .into_response())
        }
        Some(other) => Err(ApiError::validation(vec![pharmos_core::FieldError::new(
            "format",
            format!("unknown receipt format '{}'", other),
        )])),
    }
}
