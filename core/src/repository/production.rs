use crate::domain::{DowntimeCategory, DowntimeEntry, ProductionEntry};
use crate::error::DomainResult;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use std::str::FromStr;

pub struct ProductionRepository<'c> {
    conn: &'c Connection,
}

impl<'c> ProductionRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, entry: &ProductionEntry) -> DomainResult<()> {
        self.conn.execute(
            "INSERT INTO production_entries (
                entry_id, client_id, work_order_id, product_id, shift_id, production_date,
                units_produced, run_time_hours, employees_assigned, defect_count, scrap_count,
                actual_cycle_time_minutes, created_by, created_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
            params![
                entry.entry_id,
                entry.client_id,
                entry.work_order_id,
                entry.product_id,
                entry.shift_id,
                entry.production_date.to_string(),
                entry.units_produced,
                entry.run_time_hours,
                entry.employees_assigned,
                entry.defect_count,
                entry.scrap_count,
                entry.actual_cycle_time_minutes,
                entry.created_by,
                entry.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn list_for_client_between(
        &self,
        client_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DomainResult<Vec<ProductionEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT entry_id, client_id, work_order_id, product_id, shift_id, production_date,
                    units_produced, run_time_hours, employees_assigned, defect_count, scrap_count,
                    actual_cycle_time_minutes, created_by, created_at
             FROM production_entries
             WHERE client_id = ?1 AND production_date BETWEEN ?2 AND ?3
             ORDER BY production_date",
        )?;
        let rows = stmt.query_map(
            params![client_id, from.to_string(), to.to_string()],
            row_to_entry,
        )?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn list_for_product(&self, product_id: &str, limit: usize) -> DomainResult<Vec<ProductionEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT entry_id, client_id, work_order_id, product_id, shift_id, production_date,
                    units_produced, run_time_hours, employees_assigned, defect_count, scrap_count,
                    actual_cycle_time_minutes, created_by, created_at
             FROM production_entries WHERE product_id = ?1
             ORDER BY production_date DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![product_id, limit as i64], row_to_entry)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProductionEntry> {
    let production_date: String = row.get(5)?;
    let created_at: String = row.get(13)?;
    Ok(ProductionEntry {
        entry_id: row.get(0)?,
        client_id: row.get(1)?,
        work_order_id: row.get(2)?,
        product_id: row.get(3)?,
        shift_id: row.get(4)?,
        production_date: NaiveDate::from_str(&production_date).unwrap(),
        units_produced: row.get(6)?,
        run_time_hours: row.get(7)?,
        employees_assigned: row.get(8)?,
        defect_count: row.get(9)?,
        scrap_count: row.get(10)?,
        actual_cycle_time_minutes: row.get(11)?,
        created_by: row.get(12)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .unwrap()
            .with_timezone(&Utc),
    })
}

pub struct DowntimeRepository<'c> {
    conn: &'c Connection,
}

impl<'c> DowntimeRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, entry: &DowntimeEntry) -> DomainResult<()> {
        self.conn.execute(
            "INSERT INTO downtime_entries (entry_id, client_id, equipment_id, reason_code, category, start_at, end_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![
                entry.entry_id,
                entry.client_id,
                entry.equipment_id,
                entry.reason_code,
                category_str(entry.category),
                entry.start_at.to_rfc3339(),
                entry.end_at.map(|d| d.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn list_for_client_between(
        &self,
        client_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<DowntimeEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT entry_id, client_id, equipment_id, reason_code, category, start_at, end_at
             FROM downtime_entries WHERE client_id = ?1 AND start_at BETWEEN ?2 AND ?3",
        )?;
        let rows = stmt.query_map(
            params![client_id, from.to_rfc3339(), to.to_rfc3339()],
            row_to_downtime,
        )?;
        Ok(rows.collect::<Result<_, _>>()?)
    }
}

fn category_str(category: DowntimeCategory) -> &'static str {
    match category {
        DowntimeCategory::Mechanical => "MECHANICAL",
        DowntimeCategory::Changeover => "CHANGEOVER",
        DowntimeCategory::Material => "MATERIAL",
        DowntimeCategory::Quality => "QUALITY",
        DowntimeCategory::Operator => "OPERATOR",
        DowntimeCategory::Other => "OTHER",
    }
}

fn category_from_str(s: &str) -> DowntimeCategory {
    match s {
        "MECHANICAL" => DowntimeCategory::Mechanical,
        "CHANGEOVER" => DowntimeCategory::Changeover,
        "MATERIAL" => DowntimeCategory::Material,
        "QUALITY" => DowntimeCategory::Quality,
        "OPERATOR" => DowntimeCategory::Operator,
        _ => DowntimeCategory::Other,
    }
}

fn row_to_downtime(row: &rusqlite::Row<'_>) -> rusqlite::Result<DowntimeEntry> {
    let category: String = row.get(4)?;
    let start_at: String = row.get(5)?;
    let end_at: Option<String> = row.get(6)?;
    Ok(DowntimeEntry {
        entry_id: row.get(0)?,
        client_id: row.get(1)?,
        equipment_id: row.get(2)?,
        reason_code: row.get(3)?,
        category: category_from_str(&category),
        start_at: DateTime::parse_from_rfc3339(&start_at)
            .unwrap()
            .with_timezone(&Utc),
        end_at: end_at.map(|s| DateTime::parse_from_rfc3339(&s).unwrap().with_timezone(&Utc)),
    })
}
