//! Forecasting model adapters.
//!
//! All strategies implement the [`Forecaster`] trait and are selected through
//! [`ModelKind`]; [`forecast`] is the single entry point that fits a model and
//! assembles a [`ForecastResult`] for the requested horizon.

mod autoregressive;
mod ensemble;
mod feature_regression;
mod trend_seasonal;

pub use autoregressive::{ArOrder, Autoregressive};
pub use ensemble::{Ensemble, ENSEMBLE_MEMBERS};
pub use feature_regression::FeatureRegression;
pub use trend_seasonal::{SeasonalityMode, TrendSeasonal};

use crate::core::{DemandSeries, ForecastResult};
use crate::error::{DemandError, Result};

/// Point forecast plus interval bounds, one value per horizon step.
#[derive(Debug, Clone, Default)]
pub struct PredictionBands {
    pub point: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl PredictionBands {
    /// Number of steps.
    pub fn horizon(&self) -> usize {
        self.point.len()
    }
}

/// Common interface for all forecasting models.
///
/// Object-safe, usable as `Box<dyn Forecaster>`.
pub trait Forecaster {
    /// Fit the model to the demand series.
    fn fit(&mut self, series: &DemandSeries) -> Result<()>;

    /// Forecast `horizon` daily steps with an interval at `level` confidence.
    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<PredictionBands>;

    /// In-sample fitted values aligned to the training series
    /// (NaN entries mark warm-up rows the model could not fit).
    fn fitted_values(&self) -> Option<&[f64]>;

    /// Residuals (actual - fitted) on the model's working scale.
    fn residuals(&self) -> Option<&[f64]>;

    /// Display name of the model.
    fn name(&self) -> &'static str;

    /// Whether the model has been fitted.
    fn is_fitted(&self) -> bool {
        self.fitted_values().is_some()
    }
}

/// Type alias for boxed forecaster trait objects.
pub type BoxedForecaster = Box<dyn Forecaster>;

/// Available forecasting strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// Linear trend plus weekday/month seasonal components.
    TrendSeasonal,
    /// ARIMA(p, d, q) on the differenced series.
    Autoregressive,
    /// Gradient-boosted trees on lag/rolling/calendar features.
    FeatureRegression,
    /// Equal-weight combination of the three base strategies.
    Ensemble,
}

impl ModelKind {
    /// Display name used in results and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TrendSeasonal => "TrendSeasonal",
            Self::Autoregressive => "Autoregressive",
            Self::FeatureRegression => "FeatureRegression",
            Self::Ensemble => "Ensemble",
        }
    }
}

impl std::str::FromStr for ModelKind {
    type Err = DemandError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "trend_seasonal" | "trendseasonal" => Ok(Self::TrendSeasonal),
            "autoregressive" | "arima" => Ok(Self::Autoregressive),
            "feature_regression" | "featureregression" => Ok(Self::FeatureRegression),
            "ensemble" => Ok(Self::Ensemble),
            other => Err(DemandError::Validation(format!(
                "unknown model name: {other}"
            ))),
        }
    }
}

/// Options shared by the forecasting strategies.
#[derive(Debug, Clone)]
pub struct ForecastOptions {
    /// Confidence level for prediction intervals.
    pub confidence: f64,
    /// Seasonal composition mode for the trend/seasonality strategy.
    pub seasonality: SeasonalityMode,
    /// ARIMA order for the autoregressive strategy.
    pub ar_order: ArOrder,
    /// Boosting rounds for the feature-regression strategy.
    pub boost_rounds: usize,
    /// Shrinkage applied to each boosting round.
    pub learning_rate: f64,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            confidence: 0.95,
            seasonality: SeasonalityMode::Additive,
            ar_order: ArOrder::default(),
            boost_rounds: 150,
            learning_rate: 0.1,
        }
    }
}

impl ForecastOptions {
    fn validate(&self) -> Result<()> {
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(DemandError::Validation(format!(
                "confidence level {} must be in (0, 1)",
                self.confidence
            )));
        }
        if self.boost_rounds == 0 {
            return Err(DemandError::Validation(
                "boost_rounds must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(DemandError::Validation(format!(
                "learning rate {} must be in (0, 1]",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Instantiate an unfitted model for the given strategy.
pub fn build_model(kind: ModelKind, options: &ForecastOptions) -> BoxedForecaster {
    match kind {
        ModelKind::TrendSeasonal => Box::new(TrendSeasonal::new(options.seasonality)),
        ModelKind::Autoregressive => Box::new(Autoregressive::new(options.ar_order)),
        ModelKind::FeatureRegression => Box::new(
            FeatureRegression::new()
                .with_rounds(options.boost_rounds)
                .with_learning_rate(options.learning_rate),
        ),
        ModelKind::Ensemble => Box::new(Ensemble::standard(options)),
    }
}

/// Fit the selected model and forecast `horizon_days` ahead.
///
/// Any model failure is reported as [`DemandError::ModelFit`] carrying the
/// underlying cause, so multi-model callers can exclude the failed strategy
/// and keep the rest.
pub fn forecast(
    series: &DemandSeries,
    kind: ModelKind,
    horizon_days: usize,
    options: &ForecastOptions,
) -> Result<ForecastResult> {
    options.validate()?;
    if horizon_days == 0 {
        return Err(DemandError::Validation(
            "forecast horizon must be positive".to_string(),
        ));
    }

    let mut model = build_model(kind, options);
    model
        .fit(series)
        .map_err(|e| as_model_fit(kind.name(), e))?;
    let bands = model
        .predict_with_intervals(horizon_days, options.confidence)
        .map_err(|e| as_model_fit(kind.name(), e))?;

    let mut result = ForecastResult::new(
        model.name(),
        series.horizon_dates(horizon_days),
        bands.point,
        bands.lower,
        bands.upper,
        options.confidence,
    )?;
    if let Some(fitted) = model.fitted_values() {
        result = result.with_fitted(fitted.to_vec());
    }
    Ok(result)
}

fn as_model_fit(model: &str, err: DemandError) -> DemandError {
    match err {
        DemandError::ModelFit { .. } => err,
        other => DemandError::model_fit(model, other.to_string()),
    }
}

/// Result of running several strategies over the same series.
///
/// Failures stay labelled next to the successes so partial success is
/// representable: one broken model never hides the others.
#[derive(Debug)]
pub struct ModelComparison {
    outcomes: Vec<(ModelKind, Result<ForecastResult>)>,
}

impl ModelComparison {
    /// All outcomes in request order.
    pub fn outcomes(&self) -> &[(ModelKind, Result<ForecastResult>)] {
        &self.outcomes
    }

    /// Successfully produced forecasts.
    pub fn successes(&self) -> impl Iterator<Item = &ForecastResult> {
        self.outcomes.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    /// Failed models with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (ModelKind, &DemandError)> {
        self.outcomes
            .iter()
            .filter_map(|(k, r)| r.as_ref().err().map(|e| (*k, e)))
    }
}

/// Run every requested strategy, keeping per-model failures isolated.
pub fn compare_models(
    series: &DemandSeries,
    kinds: &[ModelKind],
    horizon_days: usize,
    options: &ForecastOptions,
) -> ModelComparison {
    let outcomes = kinds
        .iter()
        .map(|&kind| (kind, forecast(series, kind, horizon_days, options)))
        .collect();
    ModelComparison { outcomes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn make_series(n: usize) -> DemandSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..n as i64).map(|i| start + Duration::days(i)).collect();
        let values: Vec<f64> = (0..n)
            .map(|i| 100.0 + 0.3 * i as f64 + 10.0 * ((i % 7) as f64 - 3.0))
            .collect();
        DemandSeries::new(dates, values).unwrap()
    }

    #[test]
    fn model_kind_parses_wire_names() {
        assert_eq!(
            "trend_seasonal".parse::<ModelKind>().unwrap(),
            ModelKind::TrendSeasonal
        );
        assert_eq!(
            "autoregressive".parse::<ModelKind>().unwrap(),
            ModelKind::Autoregressive
        );
        assert_eq!(
            "feature_regression".parse::<ModelKind>().unwrap(),
            ModelKind::FeatureRegression
        );
        assert_eq!("ensemble".parse::<ModelKind>().unwrap(), ModelKind::Ensemble);
        assert!("prophet".parse::<ModelKind>().is_err());
    }

    #[test]
    fn forecast_horizon_matches_request() {
        let series = make_series(90);
        for kind in [ModelKind::TrendSeasonal, ModelKind::Autoregressive] {
            let result = forecast(&series, kind, 14, &ForecastOptions::default()).unwrap();
            assert_eq!(result.horizon(), 14);
            assert_eq!(result.dates().len(), 14);
            assert_eq!(
                result.dates()[0],
                series.last_date() + Duration::days(1)
            );
        }
    }

    #[test]
    fn forecast_rejects_zero_horizon() {
        let series = make_series(30);
        let result = forecast(
            &series,
            ModelKind::TrendSeasonal,
            0,
            &ForecastOptions::default(),
        );
        assert!(matches!(result, Err(DemandError::Validation(_))));
    }

    #[test]
    fn forecast_rejects_bad_confidence() {
        let series = make_series(30);
        let options = ForecastOptions {
            confidence: 1.5,
            ..Default::default()
        };
        let result = forecast(&series, ModelKind::TrendSeasonal, 7, &options);
        assert!(matches!(result, Err(DemandError::Validation(_))));
    }

    #[test]
    fn short_series_fails_as_model_fit() {
        let series = make_series(5);
        let result = forecast(
            &series,
            ModelKind::Autoregressive,
            7,
            &ForecastOptions::default(),
        );
        assert!(matches!(result, Err(DemandError::ModelFit { .. })));
    }

    #[test]
    fn comparison_keeps_partial_success() {
        // 40 points: enough for trend and ARIMA, not for feature regression
        // (needs 30 warm-up days plus training rows).
        let series = make_series(40);
        let comparison = compare_models(
            &series,
            &[
                ModelKind::TrendSeasonal,
                ModelKind::Autoregressive,
                ModelKind::FeatureRegression,
            ],
            7,
            &ForecastOptions::default(),
        );

        assert_eq!(comparison.outcomes().len(), 3);
        assert_eq!(comparison.successes().count(), 2);
        let failures: Vec<_> = comparison.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, ModelKind::FeatureRegression);
        assert!(matches!(failures[0].1, DemandError::ModelFit { .. }));
    }

    #[test]
    fn all_bands_are_ordered() {
        let series = make_series(120);
        for kind in [
            ModelKind::TrendSeasonal,
            ModelKind::Autoregressive,
            ModelKind::FeatureRegression,
            ModelKind::Ensemble,
        ] {
            let result = forecast(&series, kind, 10, &ForecastOptions::default())
                .unwrap_or_else(|e| panic!("{} failed: {e}", kind.name()));
            for i in 0..result.horizon() {
                assert!(
                    result.lower()[i] <= result.point()[i]
                        && result.point()[i] <= result.upper()[i],
                    "{} disordered at step {i}",
                    kind.name()
                );
            }
        }
    }
}
