//! ARIMA-style autoregressive model fitted by conditional sum of squares.

use crate::core::DemandSeries;
use crate::error::{DemandError, Result};
use crate::models::{Forecaster, PredictionBands};
use crate::utils::{mean, minimize, normal_quantile, std_dev};
use chrono::NaiveDate;

/// ARIMA order: `p` autoregressive lags, `d` differencing passes,
/// `q` moving-average lags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl Default for ArOrder {
    fn default() -> Self {
        Self { p: 1, d: 1, q: 1 }
    }
}

const PARAM_BOUND: f64 = 0.95;
const MAX_ITERATIONS: usize = 500;

/// ARIMA(p, d, q) fitted by minimizing the conditional sum of squared
/// one-step errors with Nelder-Mead. Forecast intervals widen with
/// `sqrt(h)` in the usual random-walk fashion.
#[derive(Debug)]
pub struct Autoregressive {
    order: ArOrder,
    intercept: f64,
    phi: Vec<f64>,
    theta: Vec<f64>,
    sigma2: f64,
    history: Option<Vec<f64>>,
    diffed: Option<Vec<f64>>,
    diff_residuals: Option<Vec<f64>>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    last_date: Option<NaiveDate>,
}

impl Autoregressive {
    pub fn new(order: ArOrder) -> Self {
        Self {
            order,
            intercept: 0.0,
            phi: Vec::new(),
            theta: Vec::new(),
            sigma2: 0.0,
            history: None,
            diffed: None,
            diff_residuals: None,
            fitted: None,
            residuals: None,
            last_date: None,
        }
    }

    fn min_observations(&self) -> usize {
        self.order.d + self.order.p.max(self.order.q) + 8
    }
}

/// Apply first differencing `d` times.
fn difference(values: &[f64], d: usize) -> Vec<f64> {
    let mut out = values.to_vec();
    for _ in 0..d {
        out = out.windows(2).map(|w| w[1] - w[0]).collect();
    }
    out
}

/// Undo `d` rounds of differencing, anchoring each round on the history.
fn integrate(diff_forecast: &[f64], history: &[f64], d: usize) -> Vec<f64> {
    if d == 0 {
        return diff_forecast.to_vec();
    }
    let anchor_series = difference(history, d - 1);
    let mut level = *anchor_series
        .last()
        .expect("history outlives its differencing order");
    let mut cumulative = Vec::with_capacity(diff_forecast.len());
    for &step in diff_forecast {
        level += step;
        cumulative.push(level);
    }
    integrate(&cumulative, history, d - 1)
}

/// One-step residuals of an ARMA(p, q) recursion over `x`.
/// Errors before the AR warm-up are treated as zero.
fn arma_residuals(x: &[f64], intercept: f64, phi: &[f64], theta: &[f64]) -> Vec<f64> {
    let p = phi.len();
    let mut errors = vec![0.0; x.len()];
    for t in p..x.len() {
        let mut prediction = intercept;
        for (i, &coef) in phi.iter().enumerate() {
            prediction += coef * x[t - 1 - i];
        }
        for (j, &coef) in theta.iter().enumerate() {
            if t > j {
                prediction += coef * errors[t - 1 - j];
            }
        }
        errors[t] = x[t] - prediction;
    }
    errors
}

fn css(x: &[f64], params: &[f64], p: usize, q: usize) -> f64 {
    let intercept = params[0];
    let phi = &params[1..1 + p];
    let theta = &params[1 + p..1 + p + q];
    arma_residuals(x, intercept, phi, theta)
        .iter()
        .skip(p)
        .map(|e| e * e)
        .sum()
}

impl Forecaster for Autoregressive {
    fn fit(&mut self, series: &DemandSeries) -> Result<()> {
        let y = series.quantities();
        let needed = self.min_observations();
        if y.len() < needed {
            return Err(DemandError::InsufficientHistory {
                needed,
                got: y.len(),
            });
        }
        let ArOrder { p, d, q } = self.order;
        let x = difference(y, d);

        let x_mean = mean(&x);
        let x_std = std_dev(&x).max(1e-6);
        let mut initial = vec![x_mean];
        initial.extend(std::iter::repeat(0.1).take(p + q));
        let mut bounds = vec![(x_mean - 10.0 * x_std, x_mean + 10.0 * x_std)];
        bounds.extend(std::iter::repeat((-PARAM_BOUND, PARAM_BOUND)).take(p + q));

        let solution = minimize(
            |params| css(&x, params, p, q),
            &initial,
            &bounds,
            MAX_ITERATIONS,
        );
        if !solution.value.is_finite() {
            return Err(DemandError::model_fit(
                self.name(),
                "conditional sum of squares did not converge to a finite value",
            ));
        }

        self.intercept = solution.point[0];
        self.phi = solution.point[1..1 + p].to_vec();
        self.theta = solution.point[1 + p..1 + p + q].to_vec();

        let errors = arma_residuals(&x, self.intercept, &self.phi, &self.theta);
        let effective = x.len().saturating_sub(p).max(1);
        self.sigma2 = errors.iter().skip(p).map(|e| e * e).sum::<f64>() / effective as f64;

        // Fitted values on the original scale, reconstructable for d <= 1.
        // Warm-up steps stay NaN.
        let fitted = match d {
            0 => {
                let mut values = vec![f64::NAN; y.len()];
                for t in p..y.len() {
                    values[t] = x[t] - errors[t];
                }
                Some(values)
            }
            1 => {
                let mut values = vec![f64::NAN; y.len()];
                for t in p..x.len() {
                    values[t + 1] = y[t] + (x[t] - errors[t]);
                }
                Some(values)
            }
            _ => None,
        };
        self.residuals = fitted.as_ref().map(|values| {
            y.iter()
                .zip(values)
                .map(|(actual, value)| actual - value)
                .collect()
        });
        self.fitted = fitted;
        self.diff_residuals = Some(errors);
        self.history = Some(y.to_vec());
        self.diffed = Some(x);
        self.last_date = Some(series.last_date());
        Ok(())
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<PredictionBands> {
        let history = self.history.as_ref().ok_or(DemandError::FitRequired)?;
        let diffed = self.diffed.as_ref().ok_or(DemandError::FitRequired)?;
        let errors = self.diff_residuals.as_ref().ok_or(DemandError::FitRequired)?;
        if !(level > 0.0 && level < 1.0) {
            return Err(DemandError::Validation(format!(
                "confidence level {level} must be in (0, 1)"
            )));
        }

        // Recursive forecast on the differenced scale; future shocks are zero.
        let mut extended = diffed.clone();
        let mut extended_errors = errors.clone();
        let mut diff_forecast = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let t = extended.len();
            let mut prediction = self.intercept;
            for (i, &coef) in self.phi.iter().enumerate() {
                if t > i {
                    prediction += coef * extended[t - 1 - i];
                }
            }
            for (j, &coef) in self.theta.iter().enumerate() {
                if t > j {
                    prediction += coef * extended_errors[t - 1 - j];
                }
            }
            extended.push(prediction);
            extended_errors.push(0.0);
            diff_forecast.push(prediction);
        }

        let point = integrate(&diff_forecast, history, self.order.d);
        let z = normal_quantile((1.0 + level) / 2.0);
        let sigma = self.sigma2.sqrt();

        let mut bands = PredictionBands::default();
        for (step, &value) in point.iter().enumerate() {
            let se = sigma * ((step + 1) as f64).sqrt();
            // Demand is non-negative; a declining path saturates at zero.
            let value = value.max(0.0);
            bands.point.push(value);
            bands.lower.push((value - z * se).max(0.0).min(value));
            bands.upper.push((value + z * se).max(value));
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
        "Autoregressive"
    }
}
