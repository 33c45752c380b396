//! What-if scenario analysis on top of a base forecast.

use crate::core::ForecastResult;
use crate::error::{DemandError, Result};
use serde::Serialize;

/// A demand scenario expressed as multiplicative adjustments to a base
/// forecast: a promotional lift and a seasonal intensity factor.
///
/// The combined factor is `(1 + promotion_lift) * seasonality_factor` and
/// rescales the point forecast and both interval bounds together, so the
/// relative interval width is preserved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioTransform {
    pub name: String,
    /// Fractional demand lift from promotions, e.g. 0.2 for +20%.
    pub promotion_lift: f64,
    /// Seasonal intensity multiplier, 1.0 for a normal season.
    pub seasonality_factor: f64,
}

impl ScenarioTransform {
    pub fn new(name: impl Into<String>, promotion_lift: f64, seasonality_factor: f64) -> Self {
        Self {
            name: name.into(),
            promotion_lift,
            seasonality_factor,
        }
    }

    /// The untouched base scenario. Its combined factor is exactly 1.0, so
    /// applying it reproduces the base forecast bit-for-bit.
    pub fn baseline() -> Self {
        Self::new("Baseline", 0.0, 1.0)
    }

    /// Combined multiplicative factor applied to the base forecast.
    pub fn factor(&self) -> f64 {
        (1.0 + self.promotion_lift) * self.seasonality_factor
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(DemandError::Validation(
                "scenario name must not be empty".to_string(),
            ));
        }
        if !self.promotion_lift.is_finite() || self.promotion_lift <= -1.0 {
            return Err(DemandError::Validation(format!(
                "scenario '{}': promotion lift {} must be finite and greater than -1",
                self.name, self.promotion_lift
            )));
        }
        if !self.seasonality_factor.is_finite() || self.seasonality_factor <= 0.0 {
            return Err(DemandError::Validation(format!(
                "scenario '{}': seasonality factor {} must be positive and finite",
                self.name, self.seasonality_factor
            )));
        }
        Ok(())
    }
}

/// A scenario applied to a base forecast.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioForecast {
    pub name: String,
    /// The combined factor that produced this forecast.
    pub factor: f64,
    pub forecast: ForecastResult,
}

/// Standard scenario set: baseline, a 20% promotion, and high/low seasons.
pub fn standard_scenarios() -> Vec<ScenarioTransform> {
    vec![
        ScenarioTransform::baseline(),
        ScenarioTransform::new("Promotion", 0.2, 1.0),
        ScenarioTransform::new("High season", 0.0, 1.3),
        ScenarioTransform::new("Low season", 0.0, 0.7),
    ]
}

/// Apply each scenario to the base forecast.
///
/// The base forecast is never mutated; each scenario derives a fresh
/// rescaled copy. Scenario names must be unique within the set.
pub fn run_scenarios(
    base: &ForecastResult,
    scenarios: &[ScenarioTransform],
) -> Result<Vec<ScenarioForecast>> {
    let mut seen = std::collections::BTreeSet::new();
    for scenario in scenarios {
        scenario.validate()?;
        if !seen.insert(scenario.name.as_str()) {
            return Err(DemandError::Validation(format!(
                "duplicate scenario name '{}'",
                scenario.name
            )));
        }
    }

    scenarios
        .iter()
        .map(|scenario| {
            let factor = scenario.factor();
            Ok(ScenarioForecast {
                name: scenario.name.clone(),
                factor,
                forecast: base.scaled(base.model(), factor)?,
            })
        })
        .collect()
}

/// Forecast a series with the chosen model and apply each scenario to it.
pub fn forecast_scenarios(
    series: &crate::core::DemandSeries,
    kind: crate::models::ModelKind,
    horizon_days: usize,
    options: &crate::models::ForecastOptions,
    scenarios: &[ScenarioTransform],
) -> Result<Vec<ScenarioForecast>> {
    let base = crate::models::forecast(series, kind, horizon_days, options)?;
    run_scenarios(&base, scenarios)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn base_forecast() -> ForecastResult {
        let start = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..5).map(|i| start + Duration::days(i)).collect();
        ForecastResult::new(
            "TrendSeasonal",
            dates,
            vec![100.0, 110.0, 120.0, 130.0, 140.0],
            vec![90.0, 99.0, 108.0, 117.0, 126.0],
            vec![110.0, 121.0, 132.0, 143.0, 154.0],
            0.95,
        )
        .unwrap()
    }

    #[test]
    fn baseline_reproduces_base_exactly() {
        let base = base_forecast();
        let results = run_scenarios(&base, &[ScenarioTransform::baseline()]).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].forecast, base);
        assert_eq!(results[0].factor, 1.0);
    }

    #[test]
    fn lift_and_season_compose_multiplicatively() {
        let base = base_forecast();
        let scenario = ScenarioTransform::new("Promo in high season", 0.2, 1.5);
        assert_relative_eq!(scenario.factor(), 1.8, epsilon = 1e-12);

        let results = run_scenarios(&base, &[scenario]).unwrap();
        assert_relative_eq!(results[0].forecast.point()[0], 180.0, epsilon = 1e-9);
        assert_relative_eq!(results[0].forecast.lower()[0], 162.0, epsilon = 1e-9);
        assert_relative_eq!(results[0].forecast.upper()[0], 198.0, epsilon = 1e-9);
    }

    #[test]
    fn scaling_preserves_relative_interval_width() {
        let base = base_forecast();
        let results =
            run_scenarios(&base, &[ScenarioTransform::new("High", 0.0, 1.3)]).unwrap();
        let scaled = &results[0].forecast;
        for step in 0..base.horizon() {
            assert_relative_eq!(
                scaled.upper()[step] / scaled.point()[step],
                base.upper()[step] / base.point()[step],
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn base_forecast_is_untouched() {
        let base = base_forecast();
        let snapshot = base.clone();
        run_scenarios(&base, &standard_scenarios()).unwrap();
        assert_eq!(base, snapshot);
    }

    #[test]
    fn rejects_invalid_parameters() {
        let base = base_forecast();
        assert!(run_scenarios(&base, &[ScenarioTransform::new("bad", -1.0, 1.0)]).is_err());
        assert!(run_scenarios(&base, &[ScenarioTransform::new("bad", 0.0, 0.0)]).is_err());
        assert!(run_scenarios(&base, &[ScenarioTransform::new("bad", 0.0, -2.0)]).is_err());
        assert!(run_scenarios(&base, &[ScenarioTransform::new("", 0.0, 1.0)]).is_err());
    }

    #[test]
    fn rejects_duplicate_names() {
        let base = base_forecast();
        let scenarios = vec![
            ScenarioTransform::new("Same", 0.1, 1.0),
            ScenarioTransform::new("Same", 0.2, 1.0),
        ];
        assert!(matches!(
            run_scenarios(&base, &scenarios),
            Err(DemandError::Validation(_))
        ));
    }

    #[test]
    fn standard_set_has_unique_names_and_baseline() {
        let scenarios = standard_scenarios();
        let base = base_forecast();
        let results = run_scenarios(&base, &scenarios).unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].name, "Baseline");
    }
}
