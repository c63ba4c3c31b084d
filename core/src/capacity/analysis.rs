//! Capacity analysis (spec §4.9 "Capacity analysis").

use super::workbook::{MasterCalendarRow, OrderRow, ProductionLineRow, ProductionStandardRow};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CapacityAnalysisRow {
    pub line_id: String,
    pub date: NaiveDate,
    pub demand_hours: f64,
    pub available_hours: f64,
    pub utilization_pct: Option<f64>,
    pub bottleneck_flag: bool,
}

/// For each working day and line: `demand_hours = Σ order_qty ×
/// cycle_time_minutes / 60` over orders assignable to that line;
/// `utilization = demand / available`; bottleneck when utilization > 1.0.
pub fn analyze_capacity(
    calendar: &[MasterCalendarRow],
    lines: &[ProductionLineRow],
    standards: &[ProductionStandardRow],
    orders: &[OrderRow],
) -> Vec<CapacityAnalysisRow> {
    let working_days: Vec<&MasterCalendarRow> =
        calendar.iter().filter(|d| d.is_working).collect();

    let mut rows = Vec::new();
    for line in lines.iter().filter(|l| l.active) {
        let line_standards: Vec<&ProductionStandardRow> =
            standards.iter().filter(|s| s.line_id == line.line_id).collect();

        let demand_hours: f64 = orders
            .iter()
            .filter_map(|order| {
                line_standards
                    .iter()
                    .find(|s| s.product_code == order.product_code)
                    .map(|s| order.qty as f64 * s.cycle_time_minutes / 60.0)
            })
            .sum();

        for day in &working_days {
            let available = day.hours_available;
            let utilization_pct = if available > 0.0 {
                Some(demand_hours / available * 100.0)
            } else {
                None
            };
            rows.push(CapacityAnalysisRow {
                line_id: line.line_id.clone(),
                date: day.date,
                demand_hours,
                available_hours: available,
                utilization_pct,
                bottleneck_flag: utilization_pct.map(|u| u > 100.0).unwrap_or(false),
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_bottleneck_over_full_utilization() {
        let calendar = vec![MasterCalendarRow {
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            is_working: true,
            hours_available: 8.0,
            notes: String::new(),
        }];
        let lines = vec![ProductionLineRow {
            line_id: "L1".into(),
            name: "Line 1".into(),
            capacity_units_per_hour: 10.0,
            active: true,
        }];
        let standards = vec![ProductionStandardRow {
            line_id: "L1".into(),
            product_code: "P1".into(),
            cycle_time_minutes: 10.0,
            setup_minutes: 0.0,
        }];
        let orders = vec![OrderRow {
            order_id: "O1".into(),
            product_code: "P1".into(),
            qty: 100,
            due_date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            priority: 1,
        }];
        let rows = analyze_capacity(&calendar, &lines, &standards, &orders);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].bottleneck_flag); // demand = 100*10/60 ≈ 16.7h > 8h available
    }
}
