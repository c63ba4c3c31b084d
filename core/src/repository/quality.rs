use crate::domain::{InspectionStage, QualityEntry};
use crate::error::DomainResult;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

pub struct QualityRepository<'c> {
    conn: &'c Connection,
}

impl<'c> QualityRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, entry: &QualityEntry) -> DomainResult<()> {
        self.conn.execute(
            "INSERT INTO quality_entries (
                entry_id, client_id, work_order_id, product_id, inspected_qty, defect_qty,
                rejected_qty, inspection_stage, primary_defect_type_id, severity, disposition,
                inspector_id, inspected_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
            params![
                entry.entry_id,
                entry.client_id,
                entry.work_order_id,
                entry.product_id,
                entry.inspected_qty,
                entry.defect_qty,
                entry.rejected_qty,
                stage_str(entry.inspection_stage),
                entry.primary_defect_type_id,
                entry.severity,
                entry.disposition,
                entry.inspector_id,
                entry.inspected_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn list_for_work_order(&self, work_order_id: &str) -> DomainResult<Vec<QualityEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT entry_id, client_id, work_order_id, product_id, inspected_qty, defect_qty,
                    rejected_qty, inspection_stage, primary_defect_type_id, severity, disposition,
                    inspector_id, inspected_at
             FROM quality_entries WHERE work_order_id = ?1",
        )?;
        let rows = stmt.query_map(params![work_order_id], row_to_entry)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn list_for_client_between(
        &self,
        client_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<QualityEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT entry_id, client_id, work_order_id, product_id, inspected_qty, defect_qty,
                    rejected_qty, inspection_stage, primary_defect_type_id, severity, disposition,
                    inspector_id, inspected_at
             FROM quality_entries WHERE client_id = ?1 AND inspected_at BETWEEN ?2 AND ?3",
        )?;
        let rows = stmt.query_map(
            params![client_id, from.to_rfc3339(), to.to_rfc3339()],
            row_to_entry,
        )?;
        Ok(rows.collect::<Result<_, _>>()?)
    }
}

fn stage_str(stage: InspectionStage) -> &'static str {
    match stage {
        InspectionStage::Incoming => "INCOMING",
        InspectionStage::InProcess => "IN_PROCESS",
        InspectionStage::Final => "FINAL",
    }
}

fn stage_from_str(s: &str) -> InspectionStage {
    match s {
        "INCOMING" => InspectionStage::Incoming,
        "IN_PROCESS" => InspectionStage::InProcess,
        _ => InspectionStage::Final,
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<QualityEntry> {
    let stage: String = row.get(7)?;
    let inspected_at: String = row.get(12)?;
    Ok(QualityEntry {
        entry_id: row.get(0)?,
        client_id: row.get(1)?,
        work_order_id: row.get(2)?,
        product_id: row.get(3)?,
        inspected_qty: row.get(4)?,
        defect_qty: row.get(5)?,
        rejected_qty: row.get(6)?,
        inspection_stage: stage_from_str(&stage),
        primary_defect_type_id: row.get(8)?,
        severity: row.get(9)?,
        disposition: row.get(10)?,
        inspector_id: row.get(11)?,
        inspected_at: DateTime::parse_from_rfc3339(&inspected_at)
            .unwrap()
            .with_timezone(&Utc),
    })
}
