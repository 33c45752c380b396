//! Gradient-boosted regression trees over lag, rolling, and calendar features.

use crate::core::{feature_row, DemandSeries, FeatureFrame, LAGS, ROLLING_WINDOWS};
use crate::error::{DemandError, Result};
use crate::models::{Forecaster, PredictionBands};
use crate::utils::{mean, quantile};
use chrono::{Duration, NaiveDate};

/// Training rows required after the lag/rolling warm-up.
const MIN_TRAINING_ROWS: usize = 20;
const DEFAULT_ROUNDS: usize = 150;
const DEFAULT_LEARNING_RATE: f64 = 0.1;
const MAX_DEPTH: usize = 3;
const MIN_LEAF: usize = 5;
/// Candidate split thresholds per feature.
const SPLIT_CANDIDATES: usize = 10;

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    root: Node,
}

impl Tree {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

/// Multi-step demand forecaster built on boosted depth-limited trees.
///
/// Rows before the 30-day feature warm-up are dropped, never zero-filled.
/// Multi-day forecasts feed each prediction back into a pseudo-history so
/// the lag and rolling features of later steps stay defined. Intervals come
/// from the empirical quantiles of the training residuals.
#[derive(Debug)]
pub struct FeatureRegression {
    rounds: usize,
    learning_rate: f64,
    base: f64,
    trees: Vec<Tree>,
    history: Vec<f64>,
    last_date: Option<NaiveDate>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
}

impl Default for FeatureRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureRegression {
    pub fn new() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
            learning_rate: DEFAULT_LEARNING_RATE,
            base: 0.0,
            trees: Vec::new(),
            history: Vec::new(),
            last_date: None,
            fitted: None,
            residuals: None,
        }
    }

    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        let raw = self.base
            + self
                .trees
                .iter()
                .map(|tree| self.learning_rate * tree.predict(row))
                .sum::<f64>();
        raw.max(0.0)
    }
}

fn grow(rows: &[&[f64]], targets: &[f64], indices: &[usize], depth: usize) -> Node {
    let leaf_value = mean(&indices.iter().map(|&i| targets[i]).collect::<Vec<f64>>());
    if depth >= MAX_DEPTH || indices.len() < 2 * MIN_LEAF {
        return Node::Leaf(leaf_value);
    }

    let mut best: Option<(usize, f64, Vec<usize>, Vec<usize>, f64)> = None;
    let parent_sse = sse(targets, indices, leaf_value);
    let feature_count = rows[0].len();

    for feature in 0..feature_count {
        let mut values: Vec<f64> = indices.iter().map(|&i| rows[i][feature]).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();
        if values.len() < 2 {
            continue;
        }
        for c in 1..=SPLIT_CANDIDATES {
            let threshold = quantile(&values, c as f64 / (SPLIT_CANDIDATES + 1) as f64);
            let (left, right): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| rows[i][feature] <= threshold);
            if left.len() < MIN_LEAF || right.len() < MIN_LEAF {
                continue;
            }
            let left_mean = mean(&left.iter().map(|&i| targets[i]).collect::<Vec<f64>>());
            let right_mean = mean(&right.iter().map(|&i| targets[i]).collect::<Vec<f64>>());
            let split_sse = sse(targets, &left, left_mean) + sse(targets, &right, right_mean);
            let gain = parent_sse - split_sse;
            if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.4) {
                best = Some((feature, threshold, left, right, gain));
            }
        }
    }

    match best {
        Some((feature, threshold, left, right, _)) => Node::Split {
            feature,
            threshold,
            left: Box::new(grow(rows, targets, &left, depth + 1)),
            right: Box::new(grow(rows, targets, &right, depth + 1)),
        },
        None => Node::Leaf(leaf_value),
    }
}

fn sse(targets: &[f64], indices: &[usize], center: f64) -> f64 {
    indices
        .iter()
        .map(|&i| (targets[i] - center).powi(2))
        .sum()
}

impl Forecaster for FeatureRegression {
    fn fit(&mut self, series: &DemandSeries) -> Result<()> {
        let frame = FeatureFrame::from_series(series);
        let (rows, targets) = frame.complete_rows();
        if rows.len() < MIN_TRAINING_ROWS {
            let warm_up = LAGS
                .into_iter()
                .chain(ROLLING_WINDOWS)
                .max()
                .expect("lag sets are non-empty");
            return Err(DemandError::InsufficientHistory {
                needed: warm_up + MIN_TRAINING_ROWS,
                got: series.len(),
            });
        }

        self.base = mean(targets);
        self.trees.clear();
        let indices: Vec<usize> = (0..rows.len()).collect();
        let mut predictions = vec![self.base; rows.len()];

        for _ in 0..self.rounds {
            let gradient: Vec<f64> = targets
                .iter()
                .zip(&predictions)
                .map(|(y, f)| y - f)
                .collect();
            if gradient.iter().map(|g| g * g).sum::<f64>() / (rows.len() as f64) < 1e-10 {
                break;
            }
            let tree = Tree {
                root: grow(&rows, &gradient, &indices, 0),
            };
            for (prediction, row) in predictions.iter_mut().zip(&rows) {
                *prediction += self.learning_rate * tree.predict(row);
            }
            self.trees.push(tree);
        }

        let mut fitted = vec![f64::NAN; series.len()];
        for (offset, prediction) in predictions.iter().enumerate() {
            fitted[frame.first_complete() + offset] = prediction.max(0.0);
        }
        let residuals: Vec<f64> = targets
            .iter()
            .zip(&predictions)
            .map(|(y, f)| y - f)
            .collect();

        self.history = series.quantities().to_vec();
        self.last_date = Some(series.last_date());
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<PredictionBands> {
        let last_date = self.last_date.ok_or(DemandError::FitRequired)?;
        let residuals = self.residuals.as_ref().ok_or(DemandError::FitRequired)?;
        if !(level > 0.0 && level < 1.0) {
            return Err(DemandError::Validation(format!(
                "confidence level {level} must be in (0, 1)"
            )));
        }

        let alpha = 1.0 - level;
        let lower_offset = quantile(residuals, alpha / 2.0);
        let upper_offset = quantile(residuals, 1.0 - alpha / 2.0);

        // Feed each prediction back as pseudo-history so later steps keep
        // their lag and rolling features defined.
        let mut pseudo_history = self.history.clone();
        let mut bands = PredictionBands::default();
        for step in 1..=horizon {
            let date = last_date + Duration::days(step as i64);
            let row = feature_row(&pseudo_history, date, 0.0, 0.0);
            let point = self.predict_row(&row);
            pseudo_history.push(point);
            bands.point.push(point);
            bands
                .lower
                .push((point + lower_offset).max(0.0).min(point));
            bands.upper.push((point + upper_offset).max(point));
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
        "FeatureRegression"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn daily_series(n: usize, f: impl Fn(usize) -> f64) -> DemandSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let dates: Vec<NaiveDate> = (0..n as i64).map(|i| start + Duration::days(i)).collect();
        DemandSeries::new(dates, (0..n).map(f).collect()).unwrap()
    }

    #[test]
    fn learns_weekday_split() {
        // Weekend demand triple the weekday demand; day_of_week carries it.
        let series = daily_series(120, |i| if i % 7 >= 5 { 300.0 } else { 100.0 });
        let mut model = FeatureRegression::new();
        model.fit(&series).unwrap();

        let bands = model.predict_with_intervals(7, 0.95).unwrap();
        // History ends on a Monday, so forecast steps 5 and 6 (indices 4
        // and 5) land on the weekend.
        assert!(bands.point[4] > 2.0 * bands.point[0]);
        assert!(bands.point[5] > 2.0 * bands.point[0]);
    }

    #[test]
    fn constant_series_predicts_constant() {
        let series = daily_series(60, |_| 42.0);
        let mut model = FeatureRegression::new();
        model.fit(&series).unwrap();
        let bands = model.predict_with_intervals(5, 0.95).unwrap();
        for step in 0..5 {
            assert_relative_eq!(bands.point[step], 42.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn rejects_short_history() {
        let series = daily_series(40, |i| i as f64);
        let mut model = FeatureRegression::new();
        assert!(matches!(
            model.fit(&series),
            Err(DemandError::InsufficientHistory { needed: 50, .. })
        ));
    }

    #[test]
    fn predictions_never_negative() {
        let series = daily_series(70, |i| if i % 3 == 0 { 0.0 } else { 2.0 });
        let mut model = FeatureRegression::new();
        model.fit(&series).unwrap();
        let bands = model.predict_with_intervals(14, 0.95).unwrap();
        for step in 0..14 {
            assert!(bands.lower[step] >= 0.0);
            assert!(bands.point[step] >= 0.0);
        }
    }

    #[test]
    fn fitted_marks_warm_up_as_nan() {
        let series = daily_series(60, |i| 10.0 + (i % 7) as f64);
        let mut model = FeatureRegression::new();
        model.fit(&series).unwrap();
        let fitted = model.fitted_values().unwrap();
        assert_eq!(fitted.len(), 60);
        assert!(fitted[..30].iter().all(|v| v.is_nan()));
        assert!(fitted[30..].iter().all(|v| v.is_finite()));
    }

    #[test]
    fn predict_before_fit_fails() {
        let model = FeatureRegression::new();
        assert!(matches!(
            model.predict_with_intervals(5, 0.95),
            Err(DemandError::FitRequired)
        ));
    }
}
