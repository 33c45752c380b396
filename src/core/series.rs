//! DemandSeries: a gap-free daily demand history with optional covariates.

use crate::error::{DemandError, Result};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

/// A cleaned, daily demand series.
///
/// Invariants enforced at construction:
/// - at least one observation, dates strictly increasing with no gaps
///   (one entry per calendar day),
/// - quantities finite and non-negative,
/// - covariates aligned with the date index.
///
/// The series is construct-once: every pipeline stage borrows it immutably.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandSeries {
    dates: Vec<NaiveDate>,
    quantities: Vec<f64>,
    promotions: Option<Vec<bool>>,
    holidays: Option<Vec<bool>>,
    regressors: BTreeMap<String, Vec<f64>>,
}

impl DemandSeries {
    /// Create a series from aligned dates and quantities.
    pub fn new(dates: Vec<NaiveDate>, quantities: Vec<f64>) -> Result<Self> {
        if dates.is_empty() {
            return Err(DemandError::Validation("empty demand series".to_string()));
        }
        if dates.len() != quantities.len() {
            return Err(DemandError::LengthMismatch {
                expected: dates.len(),
                got: quantities.len(),
            });
        }
        for window in dates.windows(2) {
            if window[1] != window[0] + Duration::days(1) {
                return Err(DemandError::Validation(format!(
                    "dates must be consecutive calendar days; gap or overlap between {} and {}",
                    window[0], window[1]
                )));
            }
        }
        for (date, &q) in dates.iter().zip(quantities.iter()) {
            if !q.is_finite() {
                return Err(DemandError::Validation(format!(
                    "non-numeric quantity at {date}"
                )));
            }
            if q < 0.0 {
                return Err(DemandError::Validation(format!(
                    "negative quantity {q} at {date}"
                )));
            }
        }
        Ok(Self {
            dates,
            quantities,
            promotions: None,
            holidays: None,
            regressors: BTreeMap::new(),
        })
    }

    /// Attach a promotion flag column aligned with the date index.
    pub fn with_promotions(mut self, flags: Vec<bool>) -> Result<Self> {
        self.check_len(flags.len())?;
        self.promotions = Some(flags);
        Ok(self)
    }

    /// Attach a holiday flag column aligned with the date index.
    pub fn with_holidays(mut self, flags: Vec<bool>) -> Result<Self> {
        self.check_len(flags.len())?;
        self.holidays = Some(flags);
        Ok(self)
    }

    /// Attach a named numeric regressor aligned with the date index.
    pub fn with_regressor(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        self.check_len(values.len())?;
        self.regressors.insert(name.into(), values);
        Ok(self)
    }

    fn check_len(&self, got: usize) -> Result<()> {
        if got != self.dates.len() {
            return Err(DemandError::LengthMismatch {
                expected: self.dates.len(),
                got,
            });
        }
        Ok(())
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// True when the series holds no observations.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Date index.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Demand quantities.
    pub fn quantities(&self) -> &[f64] {
        &self.quantities
    }

    /// First observed date.
    pub fn start_date(&self) -> NaiveDate {
        self.dates[0]
    }

    /// Last observed date.
    pub fn last_date(&self) -> NaiveDate {
        *self.dates.last().expect("series is never empty")
    }

    /// Promotion flags, if supplied.
    pub fn promotions(&self) -> Option<&[bool]> {
        self.promotions.as_deref()
    }

    /// Holiday flags, if supplied.
    pub fn holidays(&self) -> Option<&[bool]> {
        self.holidays.as_deref()
    }

    /// Named regressor values.
    pub fn regressor(&self, name: &str) -> Option<&[f64]> {
        self.regressors.get(name).map(|v| v.as_slice())
    }

    /// All named regressors.
    pub fn regressors(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.regressors
    }

    /// Extract `[start, end)` as a new series, covariates included.
    pub fn slice(&self, start: usize, end: usize) -> Result<DemandSeries> {
        if start >= end || end > self.len() {
            return Err(DemandError::Validation(format!(
                "invalid slice [{start}, {end}) of series with {} points",
                self.len()
            )));
        }
        let mut sliced = DemandSeries::new(
            self.dates[start..end].to_vec(),
            self.quantities[start..end].to_vec(),
        )?;
        if let Some(flags) = &self.promotions {
            sliced = sliced.with_promotions(flags[start..end].to_vec())?;
        }
        if let Some(flags) = &self.holidays {
            sliced = sliced.with_holidays(flags[start..end].to_vec())?;
        }
        for (name, values) in &self.regressors {
            sliced = sliced.with_regressor(name.clone(), values[start..end].to_vec())?;
        }
        Ok(sliced)
    }

    /// Split off the final `window` days: `(training, held_out)`.
    pub fn split_holdout(&self, window: usize) -> Result<(DemandSeries, DemandSeries)> {
        if window == 0 || window >= self.len() {
            return Err(DemandError::Validation(format!(
                "holdout window {window} must be in 1..{}",
                self.len()
            )));
        }
        let cut = self.len() - window;
        Ok((self.slice(0, cut)?, self.slice(cut, self.len())?))
    }

    /// Dates for a forecast horizon starting the day after the last observation.
    pub fn horizon_dates(&self, horizon: usize) -> Vec<NaiveDate> {
        (1..=horizon as i64)
            .map(|offset| self.last_date() + Duration::days(offset))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn make_dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        (0..n as i64).map(|i| start + Duration::days(i)).collect()
    }

    #[test]
    fn constructs_valid_series() {
        let series = DemandSeries::new(make_dates(5), vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(series.len(), 5);
        assert_eq!(series.quantities(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(
            series.start_date(),
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
        );
        assert_eq!(
            series.last_date(),
            NaiveDate::from_ymd_opt(2023, 1, 5).unwrap()
        );
    }

    #[test]
    fn rejects_gapped_dates() {
        let mut dates = make_dates(5);
        dates.remove(2);
        let result = DemandSeries::new(dates, vec![1.0; 4]);
        assert!(matches!(result, Err(DemandError::Validation(_))));
    }

    #[test]
    fn rejects_duplicate_dates() {
        let mut dates = make_dates(4);
        dates[2] = dates[1];
        let result = DemandSeries::new(dates, vec![1.0; 4]);
        assert!(matches!(result, Err(DemandError::Validation(_))));
    }

    #[test]
    fn rejects_negative_and_non_finite_quantities() {
        assert!(DemandSeries::new(make_dates(3), vec![1.0, -2.0, 3.0]).is_err());
        assert!(DemandSeries::new(make_dates(3), vec![1.0, f64::NAN, 3.0]).is_err());
        assert!(DemandSeries::new(make_dates(3), vec![1.0, f64::INFINITY, 3.0]).is_err());
    }

    #[test]
    fn rejects_misaligned_covariates() {
        let series = DemandSeries::new(make_dates(4), vec![1.0; 4]).unwrap();
        assert!(matches!(
            series.with_promotions(vec![true; 3]),
            Err(DemandError::LengthMismatch { expected: 4, got: 3 })
        ));
    }

    #[test]
    fn slice_carries_covariates() {
        let series = DemandSeries::new(make_dates(6), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .unwrap()
            .with_promotions(vec![false, true, false, true, false, true])
            .unwrap()
            .with_regressor("price", vec![9.0, 9.0, 8.0, 8.0, 7.0, 7.0])
            .unwrap();

        let sliced = series.slice(2, 5).unwrap();
        assert_eq!(sliced.len(), 3);
        assert_eq!(sliced.quantities(), &[3.0, 4.0, 5.0]);
        assert_eq!(sliced.promotions(), Some([false, true, false].as_slice()));
        assert_eq!(sliced.regressor("price"), Some([8.0, 8.0, 7.0].as_slice()));
    }

    #[test]
    fn split_holdout_partitions_tail() {
        let series = DemandSeries::new(make_dates(10), (1..=10).map(f64::from).collect()).unwrap();
        let (train, test) = series.split_holdout(3).unwrap();
        assert_eq!(train.len(), 7);
        assert_eq!(test.len(), 3);
        assert_eq!(test.quantities(), &[8.0, 9.0, 10.0]);
        assert_eq!(test.start_date(), train.last_date() + Duration::days(1));
    }

    #[test]
    fn split_holdout_rejects_bad_windows() {
        let series = DemandSeries::new(make_dates(5), vec![1.0; 5]).unwrap();
        assert!(series.split_holdout(0).is_err());
        assert!(series.split_holdout(5).is_err());
    }

    #[test]
    fn horizon_dates_follow_last_observation() {
        let series = DemandSeries::new(make_dates(3), vec![1.0; 3]).unwrap();
        let horizon = series.horizon_dates(2);
        assert_eq!(
            horizon,
            vec![
                NaiveDate::from_ymd_opt(2023, 1, 4).unwrap(),
                NaiveDate::from_ymd_opt(2023, 1, 5).unwrap(),
            ]
        );
    }
}
