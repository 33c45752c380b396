//! FeatureFrame: lag, rolling, and calendar features derived from a series.

use crate::core::DemandSeries;
use crate::utils::{mean, std_dev};
use chrono::{Datelike, NaiveDate};

/// Lag offsets (in days) derived for every row.
pub const LAGS: [usize; 4] = [1, 7, 14, 30];

/// Rolling window sizes (in days) for mean/std features.
pub const ROLLING_WINDOWS: [usize; 2] = [7, 30];

/// A feature matrix aligned with a demand series.
///
/// Row `i` describes day `i` using only history strictly before it: lag-k
/// quantities, rolling mean/std over the preceding window, calendar parts of
/// the day itself, and the promotion/holiday flags for the day. Rows with
/// insufficient history hold `f64::NAN` in the affected columns; consumers
/// must either skip rows before [`FeatureFrame::first_complete`] or reject
/// the frame — undefined features are never zero-filled.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
    target: Vec<f64>,
    dates: Vec<NaiveDate>,
    first_complete: usize,
}

impl FeatureFrame {
    /// Derive the feature matrix for a series.
    pub fn from_series(series: &DemandSeries) -> Self {
        let quantities = series.quantities();
        let n = quantities.len();

        let mut rows = Vec::with_capacity(n);
        for i in 0..n {
            let promotion = flag_at(series.promotions(), i);
            let holiday = flag_at(series.holidays(), i);
            rows.push(feature_row(
                &quantities[..i],
                series.dates()[i],
                promotion,
                holiday,
            ));
        }

        // All lag/rolling columns are defined once the longest lookback fits.
        let longest = LAGS
            .into_iter()
            .chain(ROLLING_WINDOWS)
            .max()
            .expect("lag sets are non-empty");
        let first_complete = longest.min(n);

        Self {
            names: feature_names(),
            rows,
            target: quantities.to_vec(),
            dates: series.dates().to_vec(),
            first_complete,
        }
    }

    /// Column names, in row order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of rows (equals the series length).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the frame has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Feature vector for row `i`.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    /// Target (same-day demand) per row.
    pub fn target(&self) -> &[f64] {
        &self.target
    }

    /// Dates per row.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Index of the first row whose features are all defined.
    pub fn first_complete(&self) -> usize {
        self.first_complete
    }

    /// Rows with fully defined features, paired with their targets.
    pub fn complete_rows(&self) -> (Vec<&[f64]>, &[f64]) {
        (
            self.rows[self.first_complete..]
                .iter()
                .map(|r| r.as_slice())
                .collect(),
            &self.target[self.first_complete..],
        )
    }
}

fn flag_at(flags: Option<&[bool]>, i: usize) -> f64 {
    match flags {
        Some(values) if values[i] => 1.0,
        _ => 0.0,
    }
}

/// Column names in the fixed order used by [`feature_row`].
pub fn feature_names() -> Vec<String> {
    let mut names: Vec<String> = LAGS.iter().map(|k| format!("lag_{k}")).collect();
    for w in ROLLING_WINDOWS {
        names.push(format!("roll_mean_{w}"));
        names.push(format!("roll_std_{w}"));
    }
    names.extend(
        ["day_of_week", "month", "quarter", "promotion", "holiday"]
            .iter()
            .map(|s| s.to_string()),
    );
    names
}

/// Build one feature vector for a day, given the history strictly before it.
///
/// Lag and rolling entries are NaN when the history is too short; calendar
/// parts and flags are always defined. Used both for frame construction and
/// for the step-by-step pseudo-history fold in multi-day forecasting.
pub fn feature_row(history: &[f64], date: NaiveDate, promotion: f64, holiday: f64) -> Vec<f64> {
    let n = history.len();
    let mut row = Vec::with_capacity(feature_names().len());

    for lag in LAGS {
        row.push(if n >= lag { history[n - lag] } else { f64::NAN });
    }
    for window in ROLLING_WINDOWS {
        if n >= window {
            let tail = &history[n - window..];
            row.push(mean(tail));
            row.push(std_dev(tail));
        } else {
            row.push(f64::NAN);
            row.push(f64::NAN);
        }
    }
    row.push(date.weekday().num_days_from_monday() as f64);
    row.push(date.month() as f64);
    row.push(((date.month() - 1) / 3 + 1) as f64);
    row.push(promotion);
    row.push(holiday);
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn make_series(n: usize) -> DemandSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(); // a Monday
        let dates: Vec<NaiveDate> = (0..n as i64).map(|i| start + Duration::days(i)).collect();
        let values: Vec<f64> = (1..=n).map(|i| i as f64).collect();
        DemandSeries::new(dates, values).unwrap()
    }

    #[test]
    fn frame_shape_matches_series() {
        let series = make_series(40);
        let frame = FeatureFrame::from_series(&series);
        assert_eq!(frame.len(), 40);
        assert_eq!(frame.row(0).len(), frame.names().len());
        assert_eq!(frame.first_complete(), 30);
    }

    #[test]
    fn early_rows_are_undefined_not_zero() {
        let series = make_series(40);
        let frame = FeatureFrame::from_series(&series);
        // Row 0 has no history at all: every lag/rolling entry is NaN.
        let lag_count = LAGS.len() + 2 * ROLLING_WINDOWS.len();
        assert!(frame.row(0)[..lag_count].iter().all(|v| v.is_nan()));
        // Row 5 has lag_1 but not lag_7.
        assert_relative_eq!(frame.row(5)[0], 5.0, epsilon = 1e-12);
        assert!(frame.row(5)[1].is_nan());
    }

    #[test]
    fn complete_rows_have_no_nan() {
        let series = make_series(45);
        let frame = FeatureFrame::from_series(&series);
        let (rows, targets) = frame.complete_rows();
        assert_eq!(rows.len(), 15);
        assert_eq!(targets.len(), 15);
        for row in rows {
            assert!(row.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn lag_values_look_back_correctly() {
        let series = make_series(40);
        let frame = FeatureFrame::from_series(&series);
        // Row 30: history is quantities 1..=30, so lag_1 = 30, lag_30 = 1.
        assert_relative_eq!(frame.row(30)[0], 30.0, epsilon = 1e-12);
        assert_relative_eq!(frame.row(30)[3], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn rolling_features_use_preceding_window() {
        let series = make_series(40);
        let frame = FeatureFrame::from_series(&series);
        // Row 30, roll_mean_7 = mean(24..=30) = 27.
        let roll_mean_7_idx = LAGS.len();
        assert_relative_eq!(frame.row(30)[roll_mean_7_idx], 27.0, epsilon = 1e-12);
    }

    #[test]
    fn calendar_parts_track_the_date() {
        let series = make_series(10);
        let frame = FeatureFrame::from_series(&series);
        let dow_idx = LAGS.len() + 2 * ROLLING_WINDOWS.len();
        // 2023-01-02 is a Monday.
        assert_relative_eq!(frame.row(0)[dow_idx], 0.0, epsilon = 1e-12);
        assert_relative_eq!(frame.row(1)[dow_idx], 1.0, epsilon = 1e-12);
        assert_relative_eq!(frame.row(0)[dow_idx + 1], 1.0, epsilon = 1e-12); // January
        assert_relative_eq!(frame.row(0)[dow_idx + 2], 1.0, epsilon = 1e-12); // Q1
    }

    #[test]
    fn flags_flow_into_rows() {
        let series = make_series(5)
            .with_promotions(vec![true, false, true, false, true])
            .unwrap();
        let frame = FeatureFrame::from_series(&series);
        let promo_idx = frame.names().iter().position(|n| n == "promotion").unwrap();
        assert_relative_eq!(frame.row(0)[promo_idx], 1.0, epsilon = 1e-12);
        assert_relative_eq!(frame.row(1)[promo_idx], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn short_series_clamps_first_complete() {
        let series = make_series(10);
        let frame = FeatureFrame::from_series(&series);
        assert_eq!(frame.first_complete(), 10);
        let (rows, _) = frame.complete_rows();
        assert!(rows.is_empty());
    }
}
