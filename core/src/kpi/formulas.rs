//! The ten KPI formulas plus the OEE composite (spec §4.7).
//!
//! Each function takes already-filtered, already-windowed rows — the
//! caller (the service facade, or a future read model) is responsible for
//! tenant scoping and window selection; these stay pure so they're
//! deterministic and trivially unit-testable (spec §8 invariant 6).

use super::{safe_ratio, KpiValue};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

const EFFICIENCY_CAP_PCT: f64 = 150.0;
const PERFORMANCE_CAP_PCT: f64 = 100.0;

// ---- 1. WIP Aging ----------------------------------------------------

pub struct WipOrder {
    pub work_order_id: String,
    pub entered_wip_on: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct WipAgingReport {
    pub bucket_0_7: usize,
    pub bucket_8_14: usize,
    pub bucket_15_30: usize,
    pub bucket_over_30: usize,
    pub average_days: Option<f64>,
    pub max_days: Option<i64>,
}

pub fn wip_aging(open_orders: &[WipOrder], today: NaiveDate) -> WipAgingReport {
    let mut ages = Vec::with_capacity(open_orders.len());
    let mut report = WipAgingReport {
        bucket_0_7: 0,
        bucket_8_14: 0,
        bucket_15_30: 0,
        bucket_over_30: 0,
        average_days: None,
        max_days: None,
    };
    for order in open_orders {
        let age = (today - order.entered_wip_on).num_days();
        ages.push(age);
        match age {
            0..=7 => report.bucket_0_7 += 1,
            8..=14 => report.bucket_8_14 += 1,
            15..=30 => report.bucket_15_30 += 1,
            _ => report.bucket_over_30 += 1,
        }
    }
    if !ages.is_empty() {
        report.average_days = Some(ages.iter().sum::<i64>() as f64 / ages.len() as f64);
        report.max_days = ages.iter().copied().max();
    }
    report
}

// ---- 2. OTD ------------------------------------------------------------

pub struct DeliveredOrder {
    pub planned_ship_date: Option<NaiveDate>,
    pub required_date: Option<NaiveDate>,
    pub created_at: NaiveDate,
    pub lead_time_days: i64,
    pub actual_delivery_date: NaiveDate,
    /// A partial shipment is excluded from the OTD numerator even when on
    /// time (spec §4.7 #2).
    pub is_partial: bool,
}

impl DeliveredOrder {
    /// TRUE-OTD fallback chain: `planned_ship_date → required_date →
    /// computed(lead_time + created_at)`.
    fn target_date(&self) -> NaiveDate {
        self.planned_ship_date
            .or(self.required_date)
            .unwrap_or(self.created_at + chrono::Duration::days(self.lead_time_days))
    }
}

pub fn on_time_delivery(orders: &[DeliveredOrder]) -> KpiValue {
    let total = orders.len();
    if total == 0 {
        return KpiValue::no_data();
    }
    let on_time = orders
        .iter()
        .filter(|o| !o.is_partial && o.actual_delivery_date <= o.target_date())
        .count();
    KpiValue::of(on_time as f64 / total as f64 * 100.0)
}

// ---- 3. Efficiency ------------------------------------------------------

pub struct EfficiencyInput {
    pub units_produced: i64,
    pub ideal_cycle_time_minutes: f64,
}

pub fn efficiency(
    entries: &[EfficiencyInput],
    run_time_hours_total: f64,
    downtime_hours_total: f64,
) -> KpiValue {
    let standard_hours: f64 = entries
        .iter()
        .map(|e| e.units_produced as f64 * e.ideal_cycle_time_minutes / 60.0)
        .sum();
    let hours_available = run_time_hours_total - downtime_hours_total;
    let mut result = safe_ratio(standard_hours, hours_available);
    if let Some(v) = result.value.as_mut() {
        *v = (*v * 100.0).min(EFFICIENCY_CAP_PCT);
    }
    result
}

// ---- 4. PPM -------------------------------------------------------------

pub fn ppm(total_defects: i64, total_units_inspected: i64) -> KpiValue {
    safe_ratio(total_defects as f64, total_units_inspected as f64)
        .value
        .map(|v| KpiValue::of(v * 1_000_000.0))
        .unwrap_or_else(KpiValue::no_data)
}

// ---- 5. DPMO + sigma level ----------------------------------------------

pub struct DpmoResult {
    pub dpmo: KpiValue,
    pub sigma_level: Option<f64>,
}

pub fn dpmo(total_defects: i64, total_units: i64, opportunities_per_unit: f64) -> DpmoResult {
    let opportunities = total_units as f64 * opportunities_per_unit;
    let dpmo_value = safe_ratio(total_defects as f64, opportunities);
    let sigma_level = dpmo_value.value.map(|v| {
        let yield_fraction = (1.0 - v / 1_000_000.0).clamp(1e-9, 1.0 - 1e-9);
        inverse_normal_cdf(yield_fraction) + 1.5
    });
    DpmoResult {
        dpmo: match dpmo_value.value {
            Some(v) => KpiValue::of(v * 1_000_000.0),
            None => KpiValue::no_data(),
        },
        sigma_level,
    }
}

/// Acklam's rational approximation to the inverse standard normal CDF,
/// accurate to ~1.15e-9 absolute error — no external stats crate needed
/// for this one closed-form use.
fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    let p_low = 0.02425;
    if p < p_low {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - p_low {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

// ---- 6/7. FPY + RTY ------------------------------------------------------

pub fn fpy(units_passed_first_time: i64, total_units: i64) -> KpiValue {
    safe_ratio(units_passed_first_time as f64, total_units as f64)
        .value
        .map(|v| KpiValue::of(v * 100.0))
        .unwrap_or_else(KpiValue::no_data)
}

pub fn rty(stage_fpys: &[KpiValue]) -> KpiValue {
    if stage_fpys.is_empty() {
        return KpiValue::no_data();
    }
    let mut product = 1.0;
    for stage in stage_fpys {
        match stage.value {
            Some(v) => product *= v / 100.0,
            None => return KpiValue::no_data(),
        }
    }
    KpiValue::of(product * 100.0)
}

// ---- 8. Availability -----------------------------------------------------

pub fn availability(scheduled_hours: f64, downtime_hours: f64) -> KpiValue {
    let uptime = scheduled_hours - downtime_hours;
    safe_ratio(uptime, uptime + downtime_hours)
        .value
        .map(|v| KpiValue::of(v * 100.0))
        .unwrap_or_else(KpiValue::no_data)
}

// ---- 9. Performance -------------------------------------------------------

pub fn performance(
    ideal_cycle_time_minutes: f64,
    units_produced: i64,
    run_time_hours: f64,
    allow_over_performance: bool,
) -> KpiValue {
    let run_time_minutes = run_time_hours * 60.0;
    let mut result = safe_ratio(
        ideal_cycle_time_minutes * units_produced as f64,
        run_time_minutes,
    );
    if let Some(v) = result.value.as_mut() {
        *v *= 100.0;
        if !allow_over_performance {
            *v = v.min(PERFORMANCE_CAP_PCT);
        }
    }
    result
}

// ---- 10. Absenteeism + Bradford Factor -----------------------------------

pub fn absenteeism(unscheduled_absence_hours: f64, scheduled_hours: f64) -> KpiValue {
    safe_ratio(unscheduled_absence_hours, scheduled_hours)
        .value
        .map(|v| KpiValue::of(v * 100.0))
        .unwrap_or_else(KpiValue::no_data)
}

pub struct AbsenceSpell {
    pub employee_id: String,
    pub absent_days: i64,
}

/// Bradford Factor `S² × D` per employee, `S` = spell count, `D` = total
/// absent days in the window (spec glossary).
pub fn bradford_factor(spells: &[AbsenceSpell]) -> HashMap<String, i64> {
    let mut per_employee: HashMap<String, (i64, i64)> = HashMap::new();
    for spell in spells {
        let entry = per_employee.entry(spell.employee_id.clone()).or_default();
        entry.0 += 1; // spell count S
        entry.1 += spell.absent_days; // total days D
    }
    per_employee
        .into_iter()
        .map(|(id, (s, d))| (id, s * s * d))
        .collect()
}

// ---- composite OEE --------------------------------------------------------

pub fn oee(availability_pct: KpiValue, performance_pct: KpiValue, quality_pct: KpiValue) -> KpiValue {
    match (availability_pct.value, performance_pct.value, quality_pct.value) {
        (Some(a), Some(p), Some(q)) => KpiValue::of((a / 100.0) * (p / 100.0) * (q / 100.0) * 100.0),
        _ => KpiValue::no_data(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn efficiency_matches_scenario_a() {
        let entries = vec![EfficiencyInput {
            units_produced: 480,
            ideal_cycle_time_minutes: 0.5,
        }];
        let result = efficiency(&entries, 8.0, 0.0);
        assert!((result.value.unwrap() - 50.0).abs() < 1e-6);
    }

    #[test]
    fn oee_matches_scenario_f() {
        let result = oee(KpiValue::of(90.0), KpiValue::of(95.0), KpiValue::of(98.0));
        assert!((result.value.unwrap() - 83.79).abs() < 1e-2);
    }

    #[test]
    fn zero_denominator_is_no_data_not_nan() {
        let result = ppm(5, 0);
        assert!(result.value.is_none());
        assert_eq!(result.reason.as_deref(), Some("NO_DATA"));
    }

    #[test]
    fn efficiency_caps_at_150_percent() {
        let entries = vec![EfficiencyInput {
            units_produced: 10_000,
            ideal_cycle_time_minutes: 5.0,
        }];
        let result = efficiency(&entries, 1.0, 0.0);
        assert_eq!(result.value.unwrap(), EFFICIENCY_CAP_PCT);
    }

    #[test]
    fn bradford_factor_penalizes_frequent_short_spells() {
        let spells = vec![
            AbsenceSpell {
                employee_id: "E1".into(),
                absent_days: 1,
            },
            AbsenceSpell {
                employee_id: "E1".into(),
                absent_days: 1,
            },
            AbsenceSpell {
                employee_id: "E2".into(),
                absent_days: 2,
            },
        ];
        let result = bradford_factor(&spells);
        assert_eq!(result["E1"], 4 * 2); // S=2 spells, D=2 days -> 2^2 * 2 = 8
        assert_eq!(result["E2"], 1 * 2); // S=1, D=2 -> 2
    }
}
