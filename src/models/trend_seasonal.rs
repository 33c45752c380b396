//! Linear trend with weekday (and optional monthly) seasonal components.

use crate::core::DemandSeries;
use crate::error::{DemandError, Result};
use crate::models::{Forecaster, PredictionBands};
use crate::utils::{mean, normal_quantile, std_dev};
use chrono::{Datelike, Duration, NaiveDate};

/// How seasonal effects combine with the trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonalityMode {
    /// `trend + effect`
    Additive,
    /// `trend * factor`; requires a strictly positive fitted trend.
    Multiplicative,
}

const MIN_OBSERVATIONS: usize = 14;
/// Monthly effects need enough coverage to be meaningful.
const MONTHLY_THRESHOLD: usize = 60;

/// Decomposition-style forecaster: ordinary least squares trend on the day
/// index, weekday effects from the detrended series, monthly effects when the
/// history spans at least two months of data, and a holiday offset estimated
/// from flagged days.
///
/// Intervals widen with the horizon as `sigma * sqrt(1 + h / n)`.
#[derive(Debug)]
pub struct TrendSeasonal {
    mode: SeasonalityMode,
    intercept: f64,
    slope: f64,
    weekday: [f64; 7],
    monthly: Option<[f64; 12]>,
    holiday_effect: Option<f64>,
    residual_std: f64,
    n: usize,
    last_date: Option<NaiveDate>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
}

impl TrendSeasonal {
    pub fn new(mode: SeasonalityMode) -> Self {
        Self {
            mode,
            intercept: 0.0,
            slope: 0.0,
            weekday: [0.0; 7],
            monthly: None,
            holiday_effect: None,
            residual_std: 0.0,
            n: 0,
            last_date: None,
            fitted: None,
            residuals: None,
        }
    }

    fn neutral(&self) -> f64 {
        match self.mode {
            SeasonalityMode::Additive => 0.0,
            SeasonalityMode::Multiplicative => 1.0,
        }
    }

    fn compose(&self, trend: f64, effect: f64) -> f64 {
        match self.mode {
            SeasonalityMode::Additive => trend + effect,
            SeasonalityMode::Multiplicative => trend * effect,
        }
    }

    fn combine_effects(&self, weekday: f64, monthly: f64) -> f64 {
        match self.mode {
            SeasonalityMode::Additive => weekday + monthly,
            SeasonalityMode::Multiplicative => weekday * monthly,
        }
    }

    fn structural_value(&self, t: f64, date: NaiveDate) -> f64 {
        let trend = self.intercept + self.slope * t;
        let w = self.weekday[date.weekday().num_days_from_monday() as usize];
        let m = self
            .monthly
            .map(|months| months[date.month0() as usize])
            .unwrap_or_else(|| self.neutral());
        self.compose(trend, self.combine_effects(w, m))
    }
}

impl Forecaster for TrendSeasonal {
    fn fit(&mut self, series: &DemandSeries) -> Result<()> {
        let y = series.quantities();
        let n = y.len();
        if n < MIN_OBSERVATIONS {
            return Err(DemandError::InsufficientHistory {
                needed: MIN_OBSERVATIONS,
                got: n,
            });
        }

        // OLS of quantity on the day index.
        let t_bar = (n - 1) as f64 / 2.0;
        let y_bar = mean(y);
        let mut cov = 0.0;
        let mut var = 0.0;
        for (i, &value) in y.iter().enumerate() {
            let dt = i as f64 - t_bar;
            cov += dt * (value - y_bar);
            var += dt * dt;
        }
        self.slope = if var > 0.0 { cov / var } else { 0.0 };
        self.intercept = y_bar - self.slope * t_bar;

        let trend: Vec<f64> = (0..n).map(|i| self.intercept + self.slope * i as f64).collect();
        if self.mode == SeasonalityMode::Multiplicative && trend.iter().any(|&v| v <= 0.0) {
            return Err(DemandError::model_fit(
                self.name(),
                "multiplicative seasonality requires a strictly positive trend",
            ));
        }

        // Detrended values on the working scale of the chosen mode.
        let detrended: Vec<f64> = match self.mode {
            SeasonalityMode::Additive => y.iter().zip(&trend).map(|(v, t)| v - t).collect(),
            SeasonalityMode::Multiplicative => y.iter().zip(&trend).map(|(v, t)| v / t).collect(),
        };

        let mut weekday_sum = [0.0; 7];
        let mut weekday_count = [0usize; 7];
        for (date, value) in series.dates().iter().zip(&detrended) {
            let w = date.weekday().num_days_from_monday() as usize;
            weekday_sum[w] += value;
            weekday_count[w] += 1;
        }
        for w in 0..7 {
            self.weekday[w] = if weekday_count[w] > 0 {
                weekday_sum[w] / weekday_count[w] as f64
            } else {
                self.neutral()
            };
        }

        self.monthly = if n >= MONTHLY_THRESHOLD {
            let mut sum = [0.0; 12];
            let mut count = [0usize; 12];
            for (date, value) in series.dates().iter().zip(&detrended) {
                let w = self.weekday[date.weekday().num_days_from_monday() as usize];
                let leftover = match self.mode {
                    SeasonalityMode::Additive => value - w,
                    SeasonalityMode::Multiplicative => {
                        if w.abs() > f64::EPSILON {
                            value / w
                        } else {
                            1.0
                        }
                    }
                };
                let m = date.month0() as usize;
                sum[m] += leftover;
                count[m] += 1;
            }
            let mut months = [self.neutral(); 12];
            for m in 0..12 {
                if count[m] > 0 {
                    months[m] = sum[m] / count[m] as f64;
                }
            }
            Some(months)
        } else {
            None
        };

        let mut fitted: Vec<f64> = series
            .dates()
            .iter()
            .enumerate()
            .map(|(i, &date)| self.structural_value(i as f64, date))
            .collect();

        // Holiday offset from flagged days, folded into the fitted values.
        // Future holidays are unknown at predict time, so the offset only
        // sharpens the in-sample fit and the residual spread.
        self.holiday_effect = series.holidays().and_then(|flags| {
            let gaps: Vec<f64> = flags
                .iter()
                .zip(y.iter().zip(&fitted))
                .filter(|(&flag, _)| flag)
                .map(|(_, (actual, expected))| actual - expected)
                .collect();
            if gaps.is_empty() {
                None
            } else {
                Some(mean(&gaps))
            }
        });
        if let (Some(effect), Some(flags)) = (self.holiday_effect, series.holidays()) {
            for (value, &flag) in fitted.iter_mut().zip(flags) {
                if flag {
                    *value += effect;
                }
            }
        }

        let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(a, f)| a - f).collect();
        self.residual_std = std_dev(&residuals);
        self.n = n;
        self.last_date = Some(series.last_date());
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<PredictionBands> {
        let last_date = self.last_date.ok_or(DemandError::FitRequired)?;
        if !(level > 0.0 && level < 1.0) {
            return Err(DemandError::Validation(format!(
                "confidence level {level} must be in (0, 1)"
            )));
        }
        let z = normal_quantile((1.0 + level) / 2.0);

        let mut bands = PredictionBands::default();
        for step in 1..=horizon {
            let date = last_date + Duration::days(step as i64);
            let t = (self.n - 1 + step) as f64;
            // Demand is non-negative; a declining trend saturates at zero.
            let point = self.structural_value(t, date).max(0.0);
            let se = self.residual_std * (1.0 + step as f64 / self.n as f64).sqrt();
            bands.point.push(point);
            bands.lower.push((point - z * se).max(0.0).min(point));
            bands.upper.push((point + z * se).max(point));
        }
        Ok(bands)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> &'static str {
        "TrendSeasonal"
    }
}
