use crate::domain::{WorkOrder, WorkOrderStatus};
use crate::error::{DomainError, DomainResult};
use crate::repository::check_row_version;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;

pub struct WorkOrderRepository<'c> {
    conn: &'c Connection,
}

impl<'c> WorkOrderRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, wo: &WorkOrder) -> DomainResult<()> {
        self.conn.execute(
            "INSERT INTO work_orders (
                work_order_id, client_id, style_code, planned_qty, planned_ship_date,
                required_date, actual_delivery_date, status, active_before_hold,
                priority, ideal_cycle_time_minutes, created_at, row_version
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
            params![
                wo.work_order_id,
                wo.client_id,
                wo.style_code,
                wo.planned_qty,
                wo.planned_ship_date.map(|d| d.to_string()),
                wo.required_date.map(|d| d.to_string()),
                wo.actual_delivery_date.map(|d| d.to_string()),
                wo.status.as_str(),
                wo.active_before_hold.map(|s| s.as_str().to_string()),
                wo.priority,
                wo.ideal_cycle_time_minutes,
                wo.created_at.to_rfc3339(),
                wo.row_version,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, work_order_id: &str) -> DomainResult<WorkOrder> {
        self.conn
            .query_row(
                "SELECT work_order_id, client_id, style_code, planned_qty, planned_ship_date,
                        required_date, actual_delivery_date, status, active_before_hold,
                        priority, ideal_cycle_time_minutes, created_at, row_version
                 FROM work_orders WHERE work_order_id = ?1",
                params![work_order_id],
                row_to_work_order,
            )
            .optional()?
            .ok_or_else(|| DomainError::NotFound {
                entity: "WorkOrder".to_string(),
                id: work_order_id.to_string(),
            })
    }

    pub fn list_for_client(&self, client_id: &str) -> DomainResult<Vec<WorkOrder>> {
        let mut stmt = self.conn.prepare(
            "SELECT work_order_id, client_id, style_code, planned_qty, planned_ship_date,
                    required_date, actual_delivery_date, status, active_before_hold,
                    priority, ideal_cycle_time_minutes, created_at, row_version
             FROM work_orders WHERE client_id = ?1",
        )?;
        let rows = stmt.query_map(params![client_id], row_to_work_order)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Writes the new status (and, when entering/leaving `ON_HOLD`, the
    /// `active_before_hold` marker) guarded by optimistic locking.
    pub fn update_status(
        &self,
        work_order_id: &str,
        expected_row_version: i64,
        new_status: WorkOrderStatus,
        active_before_hold: Option<WorkOrderStatus>,
    ) -> DomainResult<()> {
        let current_version: i64 = self
            .conn
            .query_row(
                "SELECT row_version FROM work_orders WHERE work_order_id = ?1",
                params![work_order_id],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| DomainError::NotFound {
                entity: "WorkOrder".to_string(),
                id: work_order_id.to_string(),
            })?;
        check_row_version(expected_row_version, current_version, "WorkOrder")?;

        let changed = self.conn.execute(
            "UPDATE work_orders
             SET status = ?1, active_before_hold = ?2, row_version = row_version + 1
             WHERE work_order_id = ?3 AND row_version = ?4",
            params![
                new_status.as_str(),
                active_before_hold.map(|s| s.as_str().to_string()),
                work_order_id,
                expected_row_version,
            ],
        )?;
        if changed == 0 {
            return Err(DomainError::Stale {
                expected: expected_row_version,
                found: current_version + 1,
            });
        }
        Ok(())
    }

    pub fn record_delivery(
        &self,
        work_order_id: &str,
        delivered_on: NaiveDate,
    ) -> DomainResult<()> {
        self.conn.execute(
            "UPDATE work_orders SET actual_delivery_date = ?1 WHERE work_order_id = ?2",
            params![delivered_on.to_string(), work_order_id],
        )?;
        Ok(())
    }
}

fn row_to_work_order(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkOrder> {
    let planned_ship: Option<String> = row.get(4)?;
    let required: Option<String> = row.get(5)?;
    let actual_delivery: Option<String> = row.get(6)?;
    let status: String = row.get(7)?;
    let active_before_hold: Option<String> = row.get(8)?;
    let created_at: String = row.get(11)?;
    Ok(WorkOrder {
        work_order_id: row.get(0)?,
        client_id: row.get(1)?,
        style_code: row.get(2)?,
        planned_qty: row.get(3)?,
        planned_ship_date: planned_ship.map(|d| NaiveDate::from_str(&d).unwrap()),
        required_date: required.map(|d| NaiveDate::from_str(&d).unwrap()),
        actual_delivery_date: actual_delivery.map(|d| NaiveDate::from_str(&d).unwrap()),
        status: WorkOrderStatus::from_str(&status).unwrap(),
        active_before_hold: active_before_hold.map(|s| WorkOrderStatus::from_str(&s).unwrap()),
        priority: row.get(9)?,
        ideal_cycle_time_minutes: row.get(10)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .unwrap()
            .with_timezone(&Utc),
        row_version: row.get(12)?,
    })
}
