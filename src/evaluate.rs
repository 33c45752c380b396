//! Holdout backtesting and forecast accuracy metrics.

use crate::core::DemandSeries;
use crate::error::{DemandError, Result};
use crate::models::{forecast, ForecastOptions, ModelKind};
use crate::preprocess::MIN_HISTORY_DAYS;
use serde::Serialize;

/// Forecast accuracy over a holdout window.
///
/// `mape` is undefined when any actual is zero and `r_squared` is undefined
/// for a constant actual series; both report `None` rather than a sentinel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    /// Mean absolute percentage error, in percent.
    pub mape: Option<f64>,
    /// Symmetric MAPE, in percent. Zero-actual/zero-forecast steps
    /// contribute zero error.
    pub smape: f64,
    /// Coefficient of determination against the holdout mean.
    pub r_squared: Option<f64>,
    /// Mean signed error (forecast minus actual); positive means
    /// over-forecasting.
    pub bias: f64,
}

/// Compute accuracy metrics for aligned actual/predicted slices.
pub fn calculate_metrics(actual: &[f64], predicted: &[f64]) -> Result<AccuracyMetrics> {
    if actual.is_empty() {
        return Err(DemandError::Validation(
            "cannot compute metrics over an empty window".to_string(),
        ));
    }
    if actual.len() != predicted.len() {
        return Err(DemandError::LengthMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }
    let n = actual.len() as f64;

    let mse = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / n;
    let mae = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / n;
    let bias = predicted.iter().zip(actual).map(|(p, a)| p - a).sum::<f64>() / n;

    let mape = if actual.iter().any(|&a| a == 0.0) {
        None
    } else {
        Some(
            actual
                .iter()
                .zip(predicted)
                .map(|(a, p)| ((a - p) / a).abs())
                .sum::<f64>()
                / n
                * 100.0,
        )
    };

    let smape = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| {
            let denom = a.abs() + p.abs();
            if denom == 0.0 {
                0.0
            } else {
                2.0 * (a - p).abs() / denom
            }
        })
        .sum::<f64>()
        / n
        * 100.0;

    let actual_mean = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|a| (a - actual_mean).powi(2)).sum();
    let r_squared = if ss_tot > 0.0 {
        let ss_res: f64 = actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| (a - p).powi(2))
            .sum();
        Some(1.0 - ss_res / ss_tot)
    } else {
        None
    };

    Ok(AccuracyMetrics {
        mse,
        rmse: mse.sqrt(),
        mae,
        mape,
        smape,
        r_squared,
        bias,
    })
}

/// Outcome of a holdout backtest.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub model: String,
    /// Holdout window length in days.
    pub window: usize,
    pub metrics: AccuracyMetrics,
}

/// Default backtest window: a fifth of the history, at least two weeks.
pub fn default_holdout_window(n: usize) -> usize {
    MIN_HISTORY_DAYS.max(n / 5)
}

/// Backtest a model: train on all but the final window, forecast the window,
/// and score the forecast against the held-out actuals.
///
/// `window` defaults to [`default_holdout_window`]. The training split must
/// leave at least [`MIN_HISTORY_DAYS`] days.
pub fn evaluate(
    series: &DemandSeries,
    kind: ModelKind,
    options: &ForecastOptions,
    window: Option<usize>,
) -> Result<Evaluation> {
    let n = series.len();
    let window = window.unwrap_or_else(|| default_holdout_window(n));
    if window == 0 {
        return Err(DemandError::Validation(
            "holdout window must be positive".to_string(),
        ));
    }
    if n < window + MIN_HISTORY_DAYS {
        return Err(DemandError::InsufficientHistory {
            needed: window + MIN_HISTORY_DAYS,
            got: n,
        });
    }

    let (train, holdout) = series.split_holdout(window)?;
    let result = forecast(&train, kind, window, options)?;
    let metrics = calculate_metrics(holdout.quantities(), result.point())?;
    Ok(Evaluation {
        model: result.model().to_string(),
        window,
        metrics,
    })
}
