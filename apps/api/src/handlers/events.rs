//! Audit log queries.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ApiError;
use crate::identity::{require, Identity};
use crate::AppState;
use pharmos_core::{Action, AuditEvent, AuditEventType};
use pharmos_db::EventFilter;

/// Query string of `GET /api/v1/events`.
#[derive(Debug, Default, Deserialize)]
pub struct ListEventsQuery {
    #[serde(rename = "type")]
    pub event_type: Option<AuditEventType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

pub async fn list_events(
    State(state): State<AppState>,
    Identity(caller): Identity,
    query: Result<Query<ListEventsQuery>, QueryRejection>,
) -> Result<Json<Vec<AuditEvent>>, ApiError> {
    require(&caller, Action::ViewEvents)?;
    let Query(query) = query?;

    let filter = EventFilter {
        event_type: query.event_type,
        from: query.from,
        to: query.to,
        limit: query.limit,
    };

    Ok(Json(state.db.audit().query(&filter).await?))
}
