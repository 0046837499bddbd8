//! # Audit Log
//!
//! Append-only record of domain events.
//!
//! ## Two Sinks
//! ```text
//! append(type, payload, description)
//!      │
//!      ├──► audit_events row      (retried once)
//!      │
//!      └──► tracing, target "audit"  (always)
//! ```
//!
//! The log is observability, not a correctness dependency: [`AuditLog::append`]
//! never returns an error. A row that cannot be written after the retry is
//! reported at `error` level and the caller carries on.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::DbResult;
use pharmos_core::{AuditEvent, AuditEventType};

/// Default number of events returned by [`AuditLog::query`].
pub const DEFAULT_EVENT_LIMIT: u32 = 100;

/// Largest number of events returned by [`AuditLog::query`].
pub const MAX_EVENT_LIMIT: u32 = 500;

/// Read filter for the audit log.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub event_type: Option<AuditEventType>,
    /// Inclusive lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl EventFilter {
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_EVENT_LIMIT)
            .clamp(1, MAX_EVENT_LIMIT)
    }
}

/// The audit log.
#[derive(Debug, Clone)]
pub struct AuditLog {
    pool: SqlitePool,
    source: String,
}

impl AuditLog {
    /// Creates an audit log that stamps events with `source`.
    pub fn new(pool: SqlitePool, source: impl Into<String>) -> Self {
        AuditLog {
            pool,
            source: source.into(),
        }
    }

    /// Same log, different source label.
    pub fn with_source(&self, source: impl Into<String>) -> Self {
        AuditLog {
            pool: self.pool.clone(),
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Appends an event and returns its ID. Never fails.
    pub async fn append(
        &self,
        event_type: AuditEventType,
        payload: Value,
        description: impl Into<String>,
    ) -> String {
        let event = AuditEvent {
            id: Uuid::new_v4().to_string(),
            event_type,
            payload: payload.to_string(),
            description: description.into(),
            source: self.source.clone(),
            created_at: Utc::now(),
        };

        info!(
            target: "audit",
            event_id = %event.id,
            event_type = %event.event_type,
            source = %event.source,
            payload = %event.payload,
            "{}",
            event.description
        );

        if let Err(first) = self.insert(&event).await {
            warn!(event_id = %event.id, error = %first, "Audit insert failed, retrying");

            if let Err(second) = self.insert(&event).await {
                error!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    error = %second,
                    "AuditLogFailure: event not persisted"
                );
            }
        }

        event.id
    }

    /// Appends an event, surfacing storage errors.
    pub async fn try_append(
        &self,
        event_type: AuditEventType,
        payload: Value,
        description: impl Into<String>,
    ) -> DbResult<AuditEvent> {
        let event = AuditEvent {
            id: Uuid::new_v4().to_string(),
            event_type,
            payload: payload.to_string(),
            description: description.into(),
            source: self.source.clone(),
            created_at: Utc::now(),
        };

        self.insert(&event).await?;
        Ok(event)
    }

    async fn insert(&self, event: &AuditEvent) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_events (
                id, event_type, payload, description, source, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&event.id)
        .bind(event.event_type)
        .bind(&event.payload)
        .bind(&event.description)
        .bind(&event.source)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Reads events matching `filter`, newest first.
    pub async fn query(&self, filter: &EventFilter) -> DbResult<Vec<AuditEvent>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, event_type, payload, description, source, created_at \
             FROM audit_events WHERE 1 = 1",
        );

        if let Some(event_type) = filter.event_type {
            qb.push(" AND event_type = ").push_bind(event_type);
        }
        if let Some(from) = filter.from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND created_at < ").push_bind(to);
        }

        qb.push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(filter.effective_limit() as i64);

        let events = qb
            .build_query_as::<AuditEvent>()
            .fetch_all(&self.pool)
            .await?;

        debug!(count = events.len(), "Queried audit events");
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use serde_json::json;

    #[tokio::test]
    async fn test_append_and_query_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let log = db.audit();

        let first = log
            .append(AuditEventType::BillCreated, json!({"billId": "b1"}), "Bill b1 created")
            .await;
        let second = log
            .append(AuditEventType::StockSold, json!({"batchId": "x", "quantity": 2}), "Sold 2")
            .await;

        let events = log.query(&EventFilter::default()).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, second);
        assert_eq!(events[1].id, first);
        assert_eq!(events[0].payload_json()["quantity"], 2);
        assert_eq!(events[1].source, "pharmos");
    }

    #[tokio::test]
    async fn test_query_by_type_and_limit() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let log = db.audit().with_source("billing");

        for i in 0..3 {
            log.append(AuditEventType::StockLow, json!({"i": i}), "low").await;
        }
        log.append(AuditEventType::BillCancelled, json!({}), "cancelled").await;

        let low = log
            .query(&EventFilter {
                event_type: Some(AuditEventType::StockLow),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(low.len(), 3);
        assert!(low.iter().all(|e| e.source == "billing"));

        let limited = log
            .query(&EventFilter {
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn test_query_by_time_range() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let log = db.audit();
        log.append(AuditEventType::SystemError, json!({}), "boom").await;

        let future = EventFilter {
            from: Some(Utc::now() + chrono::Duration::hours(1)),
            ..Default::default()
        };
        assert!(log.query(&future).await.unwrap().is_empty());

        let past = EventFilter {
            to: Some(Utc::now() + chrono::Duration::hours(1)),
            ..Default::default()
        };
        assert_eq!(log.query(&past).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_append_survives_storage_failure() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let log = db.audit();
        db.close().await;

        let id = log
            .append(AuditEventType::BillCreated, json!({}), "lost")
            .await;
        assert!(!id.is_empty());

        assert!(log
            .try_append(AuditEventType::BillCreated, json!({}), "lost")
            .await
            .is_err());
    }

    #[test]
    fn test_effective_limit() {
        assert_eq!(EventFilter::default().effective_limit(), 100);
        let f = EventFilter {
            limit: Some(9_999),
            ..Default::default()
        };
        assert_eq!(f.effective_limit(), 500);
    }
}
