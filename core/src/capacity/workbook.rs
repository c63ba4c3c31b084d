//! The 13-worksheet capacity workbook (spec §4.9). Sheets 1-6 and 9-13 are
//! plain typed rows the caller loads; sheets 7-8 (`ComponentCheck`,
//! `CapacityAnalysis`) are derived and never hand-edited.

use crate::error::{DomainError, DomainResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRow {
    pub order_id: String,
    pub product_code: String,
    pub qty: i64,
    pub due_date: NaiveDate,
    pub priority: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterCalendarRow {
    pub date: NaiveDate,
    pub is_working: bool,
    pub hours_available: f64,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionLineRow {
    pub line_id: String,
    pub name: String,
    pub capacity_units_per_hour: f64,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionStandardRow {
    pub line_id: String,
    pub product_code: String,
    pub cycle_time_minutes: f64,
    pub setup_minutes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomRow {
    pub product_code: String,
    pub component_code: String,
    pub qty_per_unit: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSnapshotRow {
    pub component_code: String,
    pub on_hand: f64,
    pub as_of_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionScheduleRow {
    pub order_id: String,
    pub line_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub committed_qty: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiTrackingRow {
    pub date: NaiveDate,
    pub kpi: String,
    pub scheduled: f64,
    pub achieved: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardInputs {
    pub planning_horizon_days: i64,
    pub buffer_pct: f64,
    pub target_utilization_pct: f64,
}

/// One tenant's capacity workbook. `version` backs the optimistic-locking
/// save (spec §4.9 "Idempotent save"); `history` is the bounded undo/redo
/// snapshot stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workbook {
    pub client_id: String,
    pub orders: Vec<OrderRow>,
    pub master_calendar: Vec<MasterCalendarRow>,
    pub production_lines: Vec<ProductionLineRow>,
    pub production_standards: Vec<ProductionStandardRow>,
    pub bom: Vec<BomRow>,
    pub stock_snapshot: Vec<StockSnapshotRow>,
    pub production_schedule: Vec<ProductionScheduleRow>,
    pub what_if_scenarios: Vec<Scenario>,
    pub kpi_tracking: Vec<KpiTrackingRow>,
    pub dashboard_inputs: DashboardInputs,
    pub instructions: String,
    pub version: i64,
    #[serde(skip)]
    history: Vec<WorkbookSnapshot>,
    #[serde(skip)]
    redo_stack: Vec<WorkbookSnapshot>,
    #[serde(skip)]
    history_limit: usize,
}

use super::scenario::Scenario;

#[derive(Debug, Clone)]
struct WorkbookSnapshot {
    orders: Vec<OrderRow>,
    master_calendar: Vec<MasterCalendarRow>,
    production_lines: Vec<ProductionLineRow>,
    production_standards: Vec<ProductionStandardRow>,
    bom: Vec<BomRow>,
    stock_snapshot: Vec<StockSnapshotRow>,
    production_schedule: Vec<ProductionScheduleRow>,
}

impl Workbook {
    pub fn new(client_id: impl Into<String>, history_limit: usize) -> Self {
        Workbook {
            client_id: client_id.into(),
            orders: Vec::new(),
            master_calendar: Vec::new(),
            production_lines: Vec::new(),
            production_standards: Vec::new(),
            bom: Vec::new(),
            stock_snapshot: Vec::new(),
            production_schedule: Vec::new(),
            what_if_scenarios: Vec::new(),
            kpi_tracking: Vec::new(),
            dashboard_inputs: DashboardInputs {
                planning_horizon_days: 30,
                buffer_pct: 10.0,
                target_utilization_pct: 85.0,
            },
            instructions: String::new(),
            version: 1,
            history: Vec::new(),
            redo_stack: Vec::new(),
            history_limit: history_limit.max(1),
        }
    }

    fn snapshot(&self) -> WorkbookSnapshot {
        WorkbookSnapshot {
            orders: self.orders.clone(),
            master_calendar: self.master_calendar.clone(),
            production_lines: self.production_lines.clone(),
            production_standards: self.production_standards.clone(),
            bom: self.bom.clone(),
            stock_snapshot: self.stock_snapshot.clone(),
            production_schedule: self.production_schedule.clone(),
        }
    }

    fn restore(&mut self, snap: WorkbookSnapshot) {
        self.orders = snap.orders;
        self.master_calendar = snap.master_calendar;
        self.production_lines = snap.production_lines;
        self.production_standards = snap.production_standards;
        self.bom = snap.bom;
        self.stock_snapshot = snap.stock_snapshot;
        self.production_schedule = snap.production_schedule;
    }

    /// Pushes the current state onto the undo stack before a mutation.
    /// Clears the redo stack, per spec §9 ("redo stack cleared on new
    /// mutation").
    pub fn checkpoint(&mut self) {
        if self.history.len() >= self.history_limit {
            self.history.remove(0);
        }
        self.history.push(self.snapshot());
        self.redo_stack.clear();
    }

    pub fn undo(&mut self) -> DomainResult<()> {
        let snap = self.history.pop().ok_or_else(|| DomainError::Conflict {
            key: "workbook_undo".to_string(),
            reason: "no undo history available".to_string(),
        })?;
        self.redo_stack.push(self.snapshot());
        self.restore(snap);
        Ok(())
    }

    pub fn redo(&mut self) -> DomainResult<()> {
        let snap = self.redo_stack.pop().ok_or_else(|| DomainError::Conflict {
            key: "workbook_redo".to_string(),
            reason: "no redo history available".to_string(),
        })?;
        self.history.push(self.snapshot());
        self.restore(snap);
        Ok(())
    }

    /// Idempotent save (spec §4.9): a clean save is a no-op; a dirty save
    /// must match `expected_version` or fail with `ERR_STALE`.
    pub fn save(&mut self, expected_version: i64, dirty: bool) -> DomainResult<i64> {
        if !dirty {
            return Ok(self.version);
        }
        if expected_version != self.version {
            return Err(DomainError::Stale {
                expected: expected_version,
                found: self.version,
            });
        }
        self.version += 1;
        Ok(self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_restores_previous_state_and_redo_reapplies() {
        let mut wb = Workbook::new("C1", 50);
        wb.checkpoint();
        wb.orders.push(OrderRow {
            order_id: "O1".into(),
            product_code: "P1".into(),
            qty: 10,
            due_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            priority: 1,
        });
        assert_eq!(wb.orders.len(), 1);

        wb.undo().unwrap();
        assert_eq!(wb.orders.len(), 0);

        wb.redo().unwrap();
        assert_eq!(wb.orders.len(), 1);
    }

    #[test]
    fn save_rejects_stale_version() {
        let mut wb = Workbook::new("C1", 50);
        let err = wb.save(999, true).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Stale);
    }

    #[test]
    fn clean_save_is_a_no_op() {
        let mut wb = Workbook::new("C1", 50);
        let version = wb.save(1, false).unwrap();
        assert_eq!(version, 1);
    }
}
