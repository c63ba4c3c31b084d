use crate::domain::{HoldDisposition, HoldEntry, HoldSeverity};
use crate::error::{DomainError, DomainResult};
use crate::repository::check_row_version;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

pub struct HoldRepository<'c> {
    conn: &'c Connection,
}

impl<'c> HoldRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, hold: &HoldEntry) -> DomainResult<()> {
        self.conn.execute(
            "INSERT INTO hold_entries (
                hold_id, client_id, work_order_id, quantity_held, reason, severity, description,
                required_action, initiated_by, initiated_at, resumed_at, disposition,
                released_quantity, approved_by, row_version
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)",
            params![
                hold.hold_id,
                hold.client_id,
                hold.work_order_id,
                hold.quantity_held,
                hold.reason,
                severity_str(hold.severity),
                hold.description,
                hold.required_action,
                hold.initiated_by,
                hold.initiated_at.to_rfc3339(),
                hold.resumed_at.map(|d| d.to_rfc3339()),
                hold.disposition.map(disposition_str),
                hold.released_quantity,
                hold.approved_by,
                hold.row_version,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, hold_id: &str) -> DomainResult<HoldEntry> {
        self.conn
            .query_row(
                "SELECT hold_id, client_id, work_order_id, quantity_held, reason, severity,
                        description, required_action, initiated_by, initiated_at, resumed_at,
                        disposition, released_quantity, approved_by, row_version
                 FROM hold_entries WHERE hold_id = ?1",
                params![hold_id],
                row_to_hold,
            )
            .optional()?
            .ok_or_else(|| DomainError::NotFound {
                entity: "HoldEntry".to_string(),
                id: hold_id.to_string(),
            })
    }

    pub fn list_open_for_work_order(&self, work_order_id: &str) -> DomainResult<Vec<HoldEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT hold_id, client_id, work_order_id, quantity_held, reason, severity,
                    description, required_action, initiated_by, initiated_at, resumed_at,
                    disposition, released_quantity, approved_by, row_version
             FROM hold_entries WHERE work_order_id = ?1 AND resumed_at IS NULL",
        )?;
        let rows = stmt.query_map(params![work_order_id], row_to_hold)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn list_open_for_client(&self, client_id: &str) -> DomainResult<Vec<HoldEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT hold_id, client_id, work_order_id, quantity_held, reason, severity,
                    description, required_action, initiated_by, initiated_at, resumed_at,
                    disposition, released_quantity, approved_by, row_version
             FROM hold_entries WHERE client_id = ?1 AND resumed_at IS NULL",
        )?;
        let rows = stmt.query_map(params![client_id], row_to_hold)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn resume(
        &self,
        hold_id: &str,
        expected_row_version: i64,
        resumed_at: DateTime<Utc>,
        disposition: HoldDisposition,
        released_quantity: i64,
        approved_by: &str,
    ) -> DomainResult<()> {
        let current_version: i64 = self
            .conn
            .query_row(
                "SELECT row_version FROM hold_entries WHERE hold_id = ?1",
                params![hold_id],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| DomainError::NotFound {
                entity: "HoldEntry".to_string(),
                id: hold_id.to_string(),
            })?;
        check_row_version(expected_row_version, current_version, "HoldEntry")?;

        let changed = self.conn.execute(
            "UPDATE hold_entries
             SET resumed_at = ?1, disposition = ?2, released_quantity = ?3, approved_by = ?4,
                 row_version = row_version + 1
             WHERE hold_id = ?5 AND row_version = ?6",
            params![
                resumed_at.to_rfc3339(),
                disposition_str(disposition),
                released_quantity,
                approved_by,
                hold_id,
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
}

fn severity_str(s: HoldSeverity) -> &'static str {
    match s {
        HoldSeverity::Critical => "CRITICAL",
        HoldSeverity::High => "HIGH",
        HoldSeverity::Medium => "MEDIUM",
        HoldSeverity::Low => "LOW",
    }
}

fn severity_from_str(s: &str) -> HoldSeverity {
    match s {
        "CRITICAL" => HoldSeverity::Critical,
        "HIGH" => HoldSeverity::High,
        "MEDIUM" => HoldSeverity::Medium,
        _ => HoldSeverity::Low,
    }
}

fn disposition_str(d: HoldDisposition) -> &'static str {
    match d {
        HoldDisposition::Release => "RELEASE",
        HoldDisposition::Rework => "REWORK",
        HoldDisposition::Scrap => "SCRAP",
        HoldDisposition::Rts => "RTS",
        HoldDisposition::UseAsIs => "USE_AS_IS",
    }
}

fn disposition_from_str(s: &str) -> HoldDisposition {
    match s {
        "RELEASE" => HoldDisposition::Release,
        "REWORK" => HoldDisposition::Rework,
        "SCRAP" => HoldDisposition::Scrap,
        "RTS" => HoldDisposition::Rts,
        _ => HoldDisposition::UseAsIs,
    }
}

fn row_to_hold(row: &rusqlite::Row<'_>) -> rusqlite::Result<HoldEntry> {
    let severity: String = row.get(5)?;
    let initiated_at: String = row.get(9)?;
    let resumed_at: Option<String> = row.get(10)?;
    let disposition: Option<String> = row.get(11)?;
    Ok(HoldEntry {
        hold_id: row.get(0)?,
        client_id: row.get(1)?,
        work_order_id: row.get(2)?,
        quantity_held: row.get(3)?,
        reason: row.get(4)?,
        severity: severity_from_str(&severity),
        description: row.get(6)?,
        required_action: row.get(7)?,
        initiated_by: row.get(8)?,
        initiated_at: DateTime::parse_from_rfc3339(&initiated_at)
            .unwrap()
            .with_timezone(&Utc),
        resumed_at: resumed_at.map(|s| DateTime::parse_from_rfc3339(&s).unwrap().with_timezone(&Utc)),
        disposition: disposition.map(|s| disposition_from_str(&s)),
        released_quantity: row.get(12)?,
        approved_by: row.get(13)?,
        row_version: row.get(14)?,
    })
}
