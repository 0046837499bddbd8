//! Stock lookups. Read-only; quantities change only through billing.

use axum::extract::{Path, State};
use axum::Json;

use crate::error::ApiError;
use crate::identity::{require, Identity};
use crate::AppState;
use pharmos_core::{Action, Batch};

pub async fn get_batch(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Path(id): Path<String>,
) -> Result<Json<Batch>, ApiError> {
    require(&caller, Action::ViewStock)?;
    Ok(Json(state.db.ledger().get_batch(&id).await?))
}

pub async fn list_product_batches(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Path(product_id): Path<String>,
) -> Result<Json<Vec<Batch>>, ApiError> {
    require(&caller, Action::ViewStock)?;

    if state.db.products().get_by_id(&product_id).await?.is_none() {
        return Err(ApiError::not_found("Product", &product_id));
    }

    Ok(Json(state.db.ledger().list_for_product(&product_id).await?))
}
