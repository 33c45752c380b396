//! ForecastResult: point forecast plus prediction interval over a horizon.

use crate::error::{DemandError, Result};
use crate::utils::{mean, normal_quantile};
use chrono::NaiveDate;
use serde::Serialize;

/// A forecast over a fixed daily horizon.
///
/// Invariants enforced at construction: dates/point/lower/upper all share the
/// horizon length and `lower ≤ point ≤ upper` holds for every step. The
/// structure is read-only after construction; scenario composition and
/// inventory optimization derive new values without mutating it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    model: String,
    dates: Vec<NaiveDate>,
    point: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    /// Confidence level of the interval, e.g. 0.95.
    confidence: f64,
    /// In-sample reconstruction aligned to the history, for display.
    /// NaN entries mark steps the model could not fit (warm-up rows).
    fitted: Option<Vec<f64>>,
}

impl ForecastResult {
    /// Build a forecast, validating lengths and bound ordering.
    pub fn new(
        model: impl Into<String>,
        dates: Vec<NaiveDate>,
        point: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
        confidence: f64,
    ) -> Result<Self> {
        let horizon = dates.len();
        for (name, len) in [("point", point.len()), ("lower", lower.len()), ("upper", upper.len())]
        {
            if len != horizon {
                return Err(DemandError::Validation(format!(
                    "{name} column has {len} entries for a {horizon}-day horizon"
                )));
            }
        }
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(DemandError::Validation(format!(
                "confidence level {confidence} must be in (0, 1)"
            )));
        }
        for step in 0..horizon {
            if lower[step] > point[step] || point[step] > upper[step] {
                return Err(DemandError::Validation(format!(
                    "interval disordered at step {step}: {} ≤ {} ≤ {} violated",
                    lower[step], point[step], upper[step]
                )));
            }
        }
        Ok(Self {
            model: model.into(),
            dates,
            point,
            lower,
            upper,
            confidence,
            fitted: None,
        })
    }

    /// Attach the in-sample fitted values.
    pub fn with_fitted(mut self, fitted: Vec<f64>) -> Self {
        self.fitted = Some(fitted);
        self
    }

    /// Name of the model that produced this forecast.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Horizon length in days.
    pub fn horizon(&self) -> usize {
        self.dates.len()
    }

    /// Forecast dates.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Point forecast per day.
    pub fn point(&self) -> &[f64] {
        &self.point
    }

    /// Lower interval bound per day.
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// Upper interval bound per day.
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Confidence level of the interval.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// In-sample fitted values, if the model provides them.
    pub fn fitted(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    /// Mean daily point forecast.
    pub fn mean_daily(&self) -> f64 {
        mean(&self.point)
    }

    /// Daily demand standard deviation implied by the interval width,
    /// assuming the interval is a symmetric normal quantile band.
    pub fn implied_daily_std(&self) -> f64 {
        if self.point.is_empty() {
            return f64::NAN;
        }
        let z = normal_quantile((1.0 + self.confidence) / 2.0);
        if !z.is_finite() || z <= 0.0 {
            return f64::NAN;
        }
        let mean_half_width = self
            .upper
            .iter()
            .zip(self.lower.iter())
            .map(|(u, l)| (u - l) / 2.0)
            .sum::<f64>()
            / self.point.len() as f64;
        mean_half_width / z
    }

    /// Rescale point and both bounds by a positive factor, preserving the
    /// spread ratio. A factor of exactly 1.0 reproduces `self` bit-for-bit.
    pub fn scaled(&self, model: impl Into<String>, factor: f64) -> Result<Self> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(DemandError::Validation(format!(
                "scale factor {factor} must be positive and finite"
            )));
        }
        Ok(Self {
            model: model.into(),
            dates: self.dates.clone(),
            point: self.point.iter().map(|v| v * factor).collect(),
            lower: self.lower.iter().map(|v| v * factor).collect(),
            upper: self.upper.iter().map(|v| v * factor).collect(),
            confidence: self.confidence,
            fitted: self
                .fitted
                .as_ref()
                .map(|f| f.iter().map(|v| v * factor).collect()),
        })
    }
}
