//! What-if scenario engine (spec §4.9 "Scenario engine").

use super::mrp::check_components;
use super::analysis::analyze_capacity;
use super::workbook::Workbook;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioType {
    Overtime,
    SetupReduction,
    Subcontract,
    NewLine,
    ThreeShift,
    LeadTimeDelay,
    AbsenteeismSpike,
    MultiConstraint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub scenario_type: ScenarioType,
    pub params: serde_json::Value,
    pub result_summary: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioDelta {
    pub feasibility_change: i64,
    pub utilization_change_pct: f64,
    pub bottleneck_change: i64,
}

/// Applies `scenario` to a shadow copy of `base`, re-runs component check
/// and capacity analysis, and reports the deltas against the base
/// workbook's own analysis (spec §4.9: "deterministic transformation ...
/// into a shadow copy").
pub fn run_scenario(base: &Workbook, scenario: &Scenario) -> ScenarioDelta {
    let mut shadow = base.clone();
    apply_transform(&mut shadow, scenario);

    let base_check = check_components(&base.orders, &base.bom, &base.stock_snapshot);
    let shadow_check = check_components(&shadow.orders, &shadow.bom, &shadow.stock_snapshot);
    let base_feasible = base_check.iter().filter(|r| r.feasible).count() as i64;
    let shadow_feasible = shadow_check.iter().filter(|r| r.feasible).count() as i64;

    let base_analysis = analyze_capacity(
        &base.master_calendar,
        &base.production_lines,
        &base.production_standards,
        &base.orders,
    );
    let shadow_analysis = analyze_capacity(
        &shadow.master_calendar,
        &shadow.production_lines,
        &shadow.production_standards,
        &shadow.orders,
    );

    let avg_utilization = |rows: &[super::analysis::CapacityAnalysisRow]| -> f64 {
        let values: Vec<f64> = rows.iter().filter_map(|r| r.utilization_pct).collect();
        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    };
    let base_bottlenecks = base_analysis.iter().filter(|r| r.bottleneck_flag).count() as i64;
    let shadow_bottlenecks = shadow_analysis.iter().filter(|r| r.bottleneck_flag).count() as i64;

    ScenarioDelta {
        feasibility_change: shadow_feasible - base_feasible,
        utilization_change_pct: avg_utilization(&shadow_analysis) - avg_utilization(&base_analysis),
        bottleneck_change: shadow_bottlenecks - base_bottlenecks,
    }
}

fn apply_transform(shadow: &mut Workbook, scenario: &Scenario) {
    let param_f64 = |key: &str, default: f64| -> f64 {
        scenario
            .params
            .get(key)
            .and_then(|v| v.as_f64())
            .unwrap_or(default)
    };

    match scenario.scenario_type {
        ScenarioType::Overtime => {
            let extra_hours = param_f64("extra_hours_per_day", 2.0);
            for day in shadow.master_calendar.iter_mut() {
                if day.is_working {
                    day.hours_available += extra_hours;
                }
            }
        }
        ScenarioType::SetupReduction => {
            let reduction_pct = param_f64("reduction_pct", 20.0) / 100.0;
            for standard in shadow.production_standards.iter_mut() {
                standard.setup_minutes *= 1.0 - reduction_pct;
            }
        }
        ScenarioType::Subcontract => {
            let offload_pct = param_f64("offload_pct", 20.0) / 100.0;
            for order in shadow.orders.iter_mut() {
                order.qty = ((order.qty as f64) * (1.0 - offload_pct)).round() as i64;
            }
        }
        ScenarioType::NewLine => {
            shadow.production_lines.push(super::workbook::ProductionLineRow {
                line_id: format!("{}-scenario-line", scenario.id),
                name: "Scenario line".to_string(),
                capacity_units_per_hour: param_f64("capacity_units_per_hour", 50.0),
                active: true,
            });
        }
        ScenarioType::ThreeShift => {
            for day in shadow.master_calendar.iter_mut() {
                if day.is_working {
                    day.hours_available = 24.0;
                }
            }
        }
        ScenarioType::LeadTimeDelay => {
            let delay_days = param_f64("delay_days", 3.0) as i64;
            for order in shadow.orders.iter_mut() {
                order.due_date += chrono::Duration::days(delay_days);
            }
        }
        ScenarioType::AbsenteeismSpike => {
            let reduction_pct = param_f64("capacity_reduction_pct", 15.0) / 100.0;
            for day in shadow.master_calendar.iter_mut() {
                day.hours_available *= 1.0 - reduction_pct;
            }
        }
        ScenarioType::MultiConstraint => {
            apply_transform(
                shadow,
                &Scenario {
                    id: scenario.id.clone(),
                    name: scenario.name.clone(),
                    scenario_type: ScenarioType::Overtime,
                    params: scenario.params.clone(),
                    result_summary: None,
                },
            );
            apply_transform(
                shadow,
                &Scenario {
                    id: scenario.id.clone(),
                    name: scenario.name.clone(),
                    scenario_type: ScenarioType::AbsenteeismSpike,
                    params: scenario.params.clone(),
                    result_summary: None,
                },
            );
        }
    }
}
