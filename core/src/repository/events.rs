use crate::domain::DomainEvent;
use crate::error::DomainResult;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

/// Append-only persistence for [`DomainEvent`] — the audit trail of spec
/// §4.3. Rows are written in the same transaction as the aggregate change
/// that raised them and are never updated afterward.
pub struct EventRepository<'c> {
    conn: &'c Connection,
}

impl<'c> EventRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn append(&self, event: &DomainEvent) -> DomainResult<()> {
        self.conn.execute(
            "INSERT INTO domain_events (
                event_id, event_type, aggregate_type, aggregate_id, client_id, occurred_at,
                triggered_by, payload, critical
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            params![
                event.event_id.to_string(),
                event.event_type,
                event.aggregate_type,
                event.aggregate_id,
                event.client_id,
                event.occurred_at.to_rfc3339(),
                event.triggered_by,
                event.payload.to_string(),
                event.critical as i64,
            ],
        )?;
        Ok(())
    }

    pub fn list_for_aggregate(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> DomainResult<Vec<DomainEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, event_type, aggregate_type, aggregate_id, client_id, occurred_at,
                    triggered_by, payload, critical
             FROM domain_events WHERE aggregate_type = ?1 AND aggregate_id = ?2
             ORDER BY occurred_at",
        )?;
        let rows = stmt.query_map(params![aggregate_type, aggregate_id], row_to_event)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<DomainEvent> {
    let event_id: String = row.get(0)?;
    let occurred_at: String = row.get(5)?;
    let payload: String = row.get(7)?;
    Ok(DomainEvent {
        event_id: uuid::Uuid::parse_str(&event_id).unwrap(),
        event_type: row.get(1)?,
        aggregate_type: row.get(2)?,
        aggregate_id: row.get(3)?,
        client_id: row.get(4)?,
        occurred_at: DateTime::parse_from_rfc3339(&occurred_at)
            .unwrap()
            .with_timezone(&Utc),
        triggered_by: row.get(6)?,
        payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
        critical: row.get::<_, i64>(8)? != 0,
    })
}
