use crate::domain::{AttendanceEntry, AttendanceStatus};
use crate::error::DomainResult;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use std::str::FromStr;

pub struct AttendanceRepository<'c> {
    conn: &'c Connection,
}

impl<'c> AttendanceRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, entry: &AttendanceEntry) -> DomainResult<()> {
        self.conn.execute(
            "INSERT INTO attendance_entries (
                entry_id, client_id, employee_id, attendance_date, shift_id, status,
                absence_reason, is_excused, scheduled_hours, actual_hours, clock_in, clock_out
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
            params![
                entry.entry_id,
                entry.client_id,
                entry.employee_id,
                entry.attendance_date.to_string(),
                entry.shift_id,
                status_str(entry.status),
                entry.absence_reason,
                entry.is_excused as i64,
                entry.scheduled_hours,
                entry.actual_hours,
                entry.clock_in.map(|d| d.to_rfc3339()),
                entry.clock_out.map(|d| d.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn list_for_employee_between(
        &self,
        employee_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DomainResult<Vec<AttendanceEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT entry_id, client_id, employee_id, attendance_date, shift_id, status,
                    absence_reason, is_excused, scheduled_hours, actual_hours, clock_in, clock_out
             FROM attendance_entries
             WHERE employee_id = ?1 AND attendance_date BETWEEN ?2 AND ?3
             ORDER BY attendance_date",
        )?;
        let rows = stmt.query_map(
            params![employee_id, from.to_string(), to.to_string()],
            row_to_entry,
        )?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn list_for_client_between(
        &self,
        client_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DomainResult<Vec<AttendanceEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT entry_id, client_id, employee_id, attendance_date, shift_id, status,
                    absence_reason, is_excused, scheduled_hours, actual_hours, clock_in, clock_out
             FROM attendance_entries
             WHERE client_id = ?1 AND attendance_date BETWEEN ?2 AND ?3",
        )?;
        let rows = stmt.query_map(
            params![client_id, from.to_string(), to.to_string()],
            row_to_entry,
        )?;
        Ok(rows.collect::<Result<_, _>>()?)
    }
}

fn status_str(status: AttendanceStatus) -> &'static str {
    match status {
        AttendanceStatus::Present => "PRESENT",
        AttendanceStatus::Absent => "ABSENT",
        AttendanceStatus::Late => "LATE",
        AttendanceStatus::HalfDay => "HALF_DAY",
        AttendanceStatus::Leave => "LEAVE",
    }
}

fn status_from_str(s: &str) -> AttendanceStatus {
    match s {
        "PRESENT" => AttendanceStatus::Present,
        "ABSENT" => AttendanceStatus::Absent,
        "LATE" => AttendanceStatus::Late,
        "HALF_DAY" => AttendanceStatus::HalfDay,
        _ => AttendanceStatus::Leave,
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<AttendanceEntry> {
    let attendance_date: String = row.get(3)?;
    let status: String = row.get(5)?;
    let clock_in: Option<String> = row.get(10)?;
    let clock_out: Option<String> = row.get(11)?;
    Ok(AttendanceEntry {
        entry_id: row.get(0)?,
        client_id: row.get(1)?,
        employee_id: row.get(2)?,
        attendance_date: NaiveDate::from_str(&attendance_date).unwrap(),
        shift_id: row.get(4)?,
        status: status_from_str(&status),
        absence_reason: row.get(6)?,
        is_excused: row.get::<_, i64>(7)? != 0,
        scheduled_hours: row.get(8)?,
        actual_hours: row.get(9)?,
        clock_in: clock_in.map(|s| DateTime::parse_from_rfc3339(&s).unwrap().with_timezone(&Utc)),
        clock_out: clock_out.map(|s| DateTime::parse_from_rfc3339(&s).unwrap().with_timezone(&Utc)),
    })
}
