//! KPI Engine (C7, spec §4.7): ten calculators, the cycle-time inference
//! chain, and the OEE composite. Every calculator is a pure function over
//! already-committed rows; the engine performs no mutation.

mod formulas;
mod inference;

pub use formulas::*;
pub use inference::{resolve_cycle_time, CycleTimeResult, InferenceSource};

use serde::Serialize;

/// Every KPI that can legitimately have no data returns this instead of
/// NaN/∞ (spec §4.7 edge cases, §8 invariant 5).
#[derive(Debug, Clone, Serialize)]
pub struct KpiValue {
    pub value: Option<f64>,
    pub reason: Option<String>,
}

impl KpiValue {
    pub fn of(value: f64) -> Self {
        KpiValue {
            value: Some(value),
            reason: None,
        }
    }

    pub fn no_data() -> Self {
        KpiValue {
            value: None,
            reason: Some("NO_DATA".to_string()),
        }
    }
}

/// Ratio helper used throughout: zero denominator becomes [`KpiValue::no_data`]
/// rather than propagating NaN/∞.
pub fn safe_ratio(numerator: f64, denominator: f64) -> KpiValue {
    if denominator == 0.0 {
        KpiValue::no_data()
    } else {
        KpiValue::of(numerator / denominator)
    }
}
