use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkOrderStatus {
    Received,
    Dispatched,
    InWip,
    OnHold,
    Completed,
    Shipped,
    Closed,
    Cancelled,
    Rejected,
}

impl WorkOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkOrderStatus::Received => "RECEIVED",
            WorkOrderStatus::Dispatched => "DISPATCHED",
            WorkOrderStatus::InWip => "IN_WIP",
            WorkOrderStatus::OnHold => "ON_HOLD",
            WorkOrderStatus::Completed => "COMPLETED",
            WorkOrderStatus::Shipped => "SHIPPED",
            WorkOrderStatus::Closed => "CLOSED",
            WorkOrderStatus::Cancelled => "CANCELLED",
            WorkOrderStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkOrderStatus::Closed | WorkOrderStatus::Cancelled | WorkOrderStatus::Rejected
        )
    }
}

impl std::str::FromStr for WorkOrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECEIVED" => Ok(WorkOrderStatus::Received),
            "DISPATCHED" => Ok(WorkOrderStatus::Dispatched),
            "IN_WIP" => Ok(WorkOrderStatus::InWip),
            "ON_HOLD" => Ok(WorkOrderStatus::OnHold),
            "COMPLETED" => Ok(WorkOrderStatus::Completed),
            "SHIPPED" => Ok(WorkOrderStatus::Shipped),
            "CLOSED" => Ok(WorkOrderStatus::Closed),
            "CANCELLED" => Ok(WorkOrderStatus::Cancelled),
            "REJECTED" => Ok(WorkOrderStatus::Rejected),
            other => Err(format!("unknown work order status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    pub work_order_id: String,
    pub client_id: String,
    pub style_code: String,
    pub planned_qty: i64,
    pub planned_ship_date: Option<NaiveDate>,
    pub required_date: Option<NaiveDate>,
    pub actual_delivery_date: Option<NaiveDate>,
    pub status: WorkOrderStatus,
    /// Status the order held immediately before entering `ON_HOLD`,
    /// restored on resume (spec §4.5).
    pub active_before_hold: Option<WorkOrderStatus>,
    pub priority: i64,
    pub ideal_cycle_time_minutes: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub row_version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionEntry {
    pub entry_id: String,
    pub client_id: String,
    pub work_order_id: Option<String>,
    pub product_id: String,
    pub shift_id: String,
    pub production_date: NaiveDate,
    pub units_produced: i64,
    pub run_time_hours: f64,
    pub employees_assigned: i64,
    pub defect_count: i64,
    pub scrap_count: i64,
    /// Derived: `run_time_hours * 60 / units_produced` when available;
    /// otherwise resolved through the inference chain (spec §4.7).
    pub actual_cycle_time_minutes: Option<f64>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl ProductionEntry {
    pub fn inspected_qty(&self) -> i64 {
        self.units_produced + self.defect_count + self.scrap_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DowntimeCategory {
    Mechanical,
    Changeover,
    Material,
    Quality,
    Operator,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DowntimeEntry {
    pub entry_id: String,
    pub client_id: String,
    pub equipment_id: String,
    pub reason_code: String,
    pub category: DowntimeCategory,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
}

impl DowntimeEntry {
    pub fn duration_minutes(&self) -> Option<f64> {
        self.end_at
            .map(|end| (end - self.start_at).num_seconds() as f64 / 60.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldSeverity {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldDisposition {
    Release,
    Rework,
    Scrap,
    Rts,
    UseAsIs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldEntry {
    pub hold_id: String,
    pub client_id: String,
    pub work_order_id: String,
    pub quantity_held: i64,
    pub reason: String,
    pub severity: HoldSeverity,
    pub description: String,
    pub required_action: String,
    pub initiated_by: String,
    pub initiated_at: DateTime<Utc>,
    pub resumed_at: Option<DateTime<Utc>>,
    pub disposition: Option<HoldDisposition>,
    pub released_quantity: Option<i64>,
    pub approved_by: Option<String>,
    pub row_version: i64,
}

impl HoldEntry {
    pub fn is_active(&self) -> bool {
        self.resumed_at.is_none()
    }

    pub fn duration_from(&self, now: DateTime<Utc>) -> chrono::Duration {
        self.resumed_at.unwrap_or(now) - self.initiated_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    HalfDay,
    Leave,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub entry_id: String,
    pub client_id: String,
    pub employee_id: String,
    pub attendance_date: NaiveDate,
    pub shift_id: String,
    pub status: AttendanceStatus,
    pub absence_reason: Option<String>,
    pub is_excused: bool,
    pub scheduled_hours: f64,
    pub actual_hours: f64,
    pub clock_in: Option<DateTime<Utc>>,
    pub clock_out: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InspectionStage {
    Incoming,
    InProcess,
    Final,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityEntry {
    pub entry_id: String,
    pub client_id: String,
    pub work_order_id: String,
    pub product_id: String,
    pub inspected_qty: i64,
    pub defect_qty: i64,
    pub rejected_qty: i64,
    pub inspection_stage: InspectionStage,
    pub primary_defect_type_id: Option<String>,
    pub severity: String,
    pub disposition: String,
    pub inspector_id: String,
    pub inspected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartOpportunities {
    pub product_id: String,
    pub client_id: String,
    pub opportunities_per_unit: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefectType {
    pub defect_type_id: String,
    /// `None` = global catalog entry, visible to every tenant.
    pub client_id: Option<String>,
    pub name: String,
    pub category: String,
    pub default_severity: String,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(WorkOrderStatus::Closed.is_terminal());
        assert!(WorkOrderStatus::Cancelled.is_terminal());
        assert!(WorkOrderStatus::Rejected.is_terminal());
        assert!(!WorkOrderStatus::InWip.is_terminal());
    }

    #[test]
    fn inspected_qty_sums_produced_and_inspected_losses() {
        let entry = ProductionEntry {
            entry_id: "e1".into(),
            client_id: "c1".into(),
            work_order_id: None,
            product_id: "p1".into(),
            shift_id: "s1".into(),
            production_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            units_produced: 480,
            run_time_hours: 8.0,
            employees_assigned: 4,
            defect_count: 5,
            scrap_count: 2,
            actual_cycle_time_minutes: None,
            created_by: "u1".into(),
            created_at: Utc::now(),
        };
        assert_eq!(entry.inspected_qty(), 487);
    }
}
