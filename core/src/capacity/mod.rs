//! Capacity planning & scenario simulation (C9, spec §4.9).

mod analysis;
mod mrp;
mod scenario;
mod workbook;

pub use analysis::{analyze_capacity, CapacityAnalysisRow};
pub use mrp::{check_components, ComponentCheckRow};
pub use scenario::{run_scenario, Scenario, ScenarioDelta, ScenarioType};
pub use workbook::{
    BomRow, DashboardInputs, KpiTrackingRow, MasterCalendarRow, OrderRow, ProductionLineRow,
    ProductionScheduleRow, ProductionStandardRow, StockSnapshotRow, Workbook,
};
