//! Exponential smoothing forecaster (C8, spec §4.8).

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ForecastMethod {
    Simple,
    Double,
    Linear,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastPoint {
    pub step: usize,
    pub value: f64,
    pub lower_95: f64,
    pub upper_95: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastResult {
    pub method: Option<ForecastMethod>,
    pub points: Vec<ForecastPoint>,
    pub reason: Option<String>,
}

const MIN_HISTORY_DAYS: usize = 7;
const DOUBLE_THRESHOLD: usize = 14;
const LINEAR_THRESHOLD: usize = 30;
const SMOOTHING_ALPHA: f64 = 0.3;
const SMOOTHING_BETA: f64 = 0.1;
const DAMPING_PHI: f64 = 0.9;

/// Auto-selects a smoothing method by history length and trend detection,
/// then forecasts `forecast_days` points with 95% confidence bands.
pub fn forecast_auto(history: &[f64], forecast_days: usize) -> ForecastResult {
    if history.len() < MIN_HISTORY_DAYS {
        return ForecastResult {
            method: None,
            points: Vec::new(),
            reason: Some("INSUFFICIENT_HISTORY".to_string()),
        };
    }

    let trending = has_trend(history);
    let method = if history.len() < DOUBLE_THRESHOLD {
        ForecastMethod::Simple
    } else if history.len() < LINEAR_THRESHOLD || !trending {
        ForecastMethod::Double
    } else {
        ForecastMethod::Linear
    };

    let (forecasts, residual_sigma) = match method {
        ForecastMethod::Simple => simple_exponential_smoothing(history, forecast_days),
        ForecastMethod::Double => double_exponential_smoothing(history, forecast_days),
        ForecastMethod::Linear => damped_linear_smoothing(history, forecast_days),
    };

    let points = forecasts
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            let h = (i + 1) as f64;
            let band = 1.96 * residual_sigma * h.sqrt();
            ForecastPoint {
                step: i + 1,
                value,
                lower_95: value - band,
                upper_95: value + band,
            }
        })
        .collect();

    ForecastResult {
        method: Some(method),
        points,
        reason: None,
    }
}

fn has_trend(history: &[f64]) -> bool {
    let n = history.len();
    let half = n / 2;
    if half == 0 {
        return false;
    }
    let first_avg: f64 = history[..half].iter().sum::<f64>() / half as f64;
    let second_avg: f64 = history[n - half..].iter().sum::<f64>() / half as f64;
    let spread = history.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(1.0);
    (second_avg - first_avg).abs() / spread > 0.05
}

fn residual_sigma(history: &[f64], fitted: &[f64]) -> f64 {
    let residuals: Vec<f64> = history
        .iter()
        .zip(fitted.iter())
        .map(|(actual, fit)| actual - fit)
        .collect();
    if residuals.is_empty() {
        return 0.0;
    }
    let mean = residuals.iter().sum::<f64>() / residuals.len() as f64;
    let variance =
        residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / residuals.len() as f64;
    variance.sqrt()
}

fn simple_exponential_smoothing(history: &[f64], forecast_days: usize) -> (Vec<f64>, f64) {
    let mut level = history[0];
    let mut fitted = Vec::with_capacity(history.len());
    for &actual in history {
        fitted.push(level);
        level = SMOOTHING_ALPHA * actual + (1.0 - SMOOTHING_ALPHA) * level;
    }
    let sigma = residual_sigma(history, &fitted);
    (vec![level; forecast_days], sigma)
}

fn double_exponential_smoothing(history: &[f64], forecast_days: usize) -> (Vec<f64>, f64) {
    let mut level = history[0];
    let mut trend = history[1] - history[0];
    let mut fitted = Vec::with_capacity(history.len());
    for &actual in history {
        fitted.push(level + trend);
        let prev_level = level;
        level = SMOOTHING_ALPHA * actual + (1.0 - SMOOTHING_ALPHA) * (level + trend);
        trend = SMOOTHING_BETA * (level - prev_level) + (1.0 - SMOOTHING_BETA) * trend;
    }
    let sigma = residual_sigma(history, &fitted);
    let forecasts = (1..=forecast_days)
        .map(|h| level + h as f64 * trend)
        .collect();
    (forecasts, sigma)
}

fn damped_linear_smoothing(history: &[f64], forecast_days: usize) -> (Vec<f64>, f64) {
    let mut level = history[0];
    let mut trend = history[1] - history[0];
    let mut fitted = Vec::with_capacity(history.len());
    for &actual in history {
        fitted.push(level + DAMPING_PHI * trend);
        let prev_level = level;
        level = SMOOTHING_ALPHA * actual + (1.0 - SMOOTHING_ALPHA) * (level + DAMPING_PHI * trend);
        trend = SMOOTHING_BETA * (level - prev_level) + (1.0 - SMOOTHING_BETA) * DAMPING_PHI * trend;
    }
    let sigma = residual_sigma(history, &fitted);
    let mut damp_sum = 0.0;
    let forecasts = (1..=forecast_days)
        .map(|h| {
            damp_sum += DAMPING_PHI.powi(h as i32);
            level + damp_sum * trend
        })
        .collect();
    (forecasts, sigma)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_history_returns_empty_with_reason() {
        let result = forecast_auto(&[1.0, 2.0, 3.0], 7);
        assert!(result.points.is_empty());
        assert_eq!(result.reason.as_deref(), Some("INSUFFICIENT_HISTORY"));
    }

    #[test]
    fn forecast_is_idempotent() {
        let history = vec![10.0, 11.0, 9.0, 10.5, 10.2, 9.8, 10.1, 10.3];
        let a = forecast_auto(&history, 5);
        let b = forecast_auto(&history, 5);
        for (pa, pb) in a.points.iter().zip(b.points.iter()) {
            assert_eq!(pa.value, pb.value);
        }
    }

    #[test]
    fn short_series_selects_simple_method() {
        let history = vec![10.0, 11.0, 9.0, 10.5, 10.2, 9.8, 10.1];
        let result = forecast_auto(&history, 3);
        assert_eq!(result.method, Some(ForecastMethod::Simple));
    }
}
