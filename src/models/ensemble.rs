//! Equal-weight ensemble over the three base strategies.

use crate::core::DemandSeries;
use crate::error::{DemandError, Result};
use crate::models::{
    build_model, BoxedForecaster, ForecastOptions, Forecaster, ModelKind, PredictionBands,
};

/// Strategies combined by the standard ensemble.
pub const ENSEMBLE_MEMBERS: [ModelKind; 3] = [
    ModelKind::TrendSeasonal,
    ModelKind::Autoregressive,
    ModelKind::FeatureRegression,
];

/// Combines member forecasts conservatively: mean of the point forecasts,
/// minimum of the lower bounds, maximum of the upper bounds. A member that
/// fails to fit is excluded and recorded; the ensemble itself only fails
/// when every member does.
pub struct Ensemble {
    members: Vec<BoxedForecaster>,
    failures: Vec<(String, DemandError)>,
    fitted: bool,
}

impl std::fmt::Debug for Ensemble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ensemble")
            .field("members", &self.members.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("failures", &self.failures)
            .field("fitted", &self.fitted)
            .finish()
    }
}

impl Ensemble {
    /// Ensemble over [`ENSEMBLE_MEMBERS`] with shared options.
    pub fn standard(options: &ForecastOptions) -> Self {
        Self::from_members(
            ENSEMBLE_MEMBERS
                .iter()
                .map(|&kind| build_model(kind, options))
                .collect(),
        )
    }

    /// Ensemble over caller-supplied members.
    pub fn from_members(members: Vec<BoxedForecaster>) -> Self {
        Self {
            members,
            failures: Vec::new(),
            fitted: false,
        }
    }

    /// Members that failed to fit, with the error that excluded them.
    pub fn failures(&self) -> &[(String, DemandError)] {
        &self.failures
    }

    /// Number of members that fitted successfully.
    pub fn active_members(&self) -> usize {
        self.members.len()
    }
}

impl Forecaster for Ensemble {
    fn fit(&mut self, series: &DemandSeries) -> Result<()> {
        self.failures.clear();
        let members = std::mem::take(&mut self.members);
        for mut member in members {
            match member.fit(series) {
                Ok(()) => self.members.push(member),
                Err(err) => self.failures.push((member.name().to_string(), err)),
            }
        }
        if self.members.is_empty() {
            let summary = self
                .failures
                .iter()
                .map(|(name, err)| format!("{name}: {err}"))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(DemandError::model_fit(
                self.name(),
                format!("all members failed ({summary})"),
            ));
        }
        self.fitted = true;
        Ok(())
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<PredictionBands> {
        if !self.fitted {
            return Err(DemandError::FitRequired);
        }

        let mut member_bands = Vec::with_capacity(self.members.len());
        let mut predict_failures = Vec::new();
        for member in &self.members {
            match member.predict_with_intervals(horizon, level) {
                Ok(bands) => member_bands.push(bands),
                Err(err) => predict_failures.push(format!("{}: {err}", member.name())),
            }
        }
        if member_bands.is_empty() {
            return Err(DemandError::model_fit(
                self.name(),
                format!("no member produced a forecast ({})", predict_failures.join("; ")),
            ));
        }

        let count = member_bands.len() as f64;
        let mut combined = PredictionBands::default();
        for step in 0..horizon {
            let point = member_bands.iter().map(|b| b.point[step]).sum::<f64>() / count;
            let lower = member_bands
                .iter()
                .map(|b| b.lower[step])
                .fold(f64::INFINITY, f64::min);
            let upper = member_bands
                .iter()
                .map(|b| b.upper[step])
                .fold(f64::NEG_INFINITY, f64::max);
            combined.point.push(point);
            combined.lower.push(lower.min(point));
            combined.upper.push(upper.max(point));
        }
        Ok(combined)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        None
    }

    fn residuals(&self) -> Option<&[f64]> {
        None
    }

    fn name(&self) -> &'static str {
        "Ensemble"
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn daily_series(n: usize, f: impl Fn(usize) -> f64) -> DemandSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let dates: Vec<NaiveDate> = (0..n as i64).map(|i| start + Duration::days(i)).collect();
        DemandSeries::new(dates, (0..n).map(f).collect()).unwrap()
    }

    #[test]
    fn combines_all_members_on_long_history() {
        let series = daily_series(120, |i| 80.0 + 0.2 * i as f64 + (i % 7) as f64);
        let mut ensemble = Ensemble::standard(&ForecastOptions::default());
        ensemble.fit(&series).unwrap();
        assert_eq!(ensemble.active_members(), 3);
        assert!(ensemble.failures().is_empty());

        let bands = ensemble.predict_with_intervals(7, 0.95).unwrap();
        assert_eq!(bands.horizon(), 7);
        for step in 0..7 {
            assert!(bands.lower[step] <= bands.point[step]);
            assert!(bands.point[step] <= bands.upper[step]);
        }
    }

    #[test]
    fn excludes_members_that_cannot_fit() {
        // 40 days: feature regression needs 50, the other two fit.
        let series = daily_series(40, |i| 60.0 + (i % 7) as f64);
        let mut ensemble = Ensemble::standard(&ForecastOptions::default());
        ensemble.fit(&series).unwrap();
        assert_eq!(ensemble.active_members(), 2);
        assert_eq!(ensemble.failures().len(), 1);
        assert_eq!(ensemble.failures()[0].0, "FeatureRegression");
    }

    #[test]
    fn fails_when_every_member_fails() {
        let series = daily_series(5, |i| i as f64);
        let mut ensemble = Ensemble::standard(&ForecastOptions::default());
        assert!(matches!(
            ensemble.fit(&series),
            Err(DemandError::ModelFit { .. })
        ));
        assert!(matches!(
            ensemble.predict_with_intervals(7, 0.95),
            Err(DemandError::FitRequired)
        ));
    }

    #[test]
    fn interval_envelops_every_member() {
        let series = daily_series(120, |i| 100.0 + (i as f64 * 0.5).sin() * 15.0);
        let mut ensemble = Ensemble::standard(&ForecastOptions::default());
        ensemble.fit(&series).unwrap();
        let combined = ensemble.predict_with_intervals(5, 0.9).unwrap();

        for member in &ensemble.members {
            let bands = member.predict_with_intervals(5, 0.9).unwrap();
            for step in 0..5 {
                assert!(combined.lower[step] <= bands.lower[step] + 1e-9);
                assert!(combined.upper[step] >= bands.upper[step] - 1e-9);
            }
        }
    }
}
