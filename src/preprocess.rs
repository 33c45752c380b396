//! Raw sales data cleaning: dedupe, clamp, gap fill, outlier flagging.

use crate::core::DemandSeries;
use crate::error::{DemandError, Result};
use crate::utils::{mean, std_dev};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use std::fmt;

/// Z-score magnitude beyond which a day is flagged as an outlier.
const OUTLIER_Z: f64 = 3.0;
/// Minimum cleaned history length for the pipeline to proceed.
pub const MIN_HISTORY_DAYS: usize = 14;

/// One raw sales observation as loaded from a file or upstream system.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub date: NaiveDate,
    pub quantity: f64,
    pub promotion: Option<bool>,
    pub holiday: Option<bool>,
    /// Extra numeric columns carried through as named regressors.
    pub regressors: BTreeMap<String, f64>,
}

impl RawRecord {
    pub fn new(date: NaiveDate, quantity: f64) -> Self {
        Self {
            date,
            quantity,
            promotion: None,
            holiday: None,
            regressors: BTreeMap::new(),
        }
    }
}

/// Unvalidated sales history, in no particular order.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub records: Vec<RawRecord>,
}

/// A non-fatal data quality finding surfaced during preprocessing.
///
/// Warnings describe repairs already applied (or anomalies left in place);
/// the cleaned series is usable regardless.
#[derive(Debug, Clone, PartialEq)]
pub enum DataWarning {
    /// Several records shared a date; their quantities were summed.
    DuplicateDates { date: NaiveDate, records: usize },
    /// A negative quantity was clamped to zero.
    NegativeClamped { date: NaiveDate, original: f64 },
    /// A record with a NaN or infinite quantity was dropped.
    NonNumericDropped { date: NaiveDate },
    /// Missing calendar days were filled by linear interpolation.
    GapFilled {
        start: NaiveDate,
        end: NaiveDate,
        days: usize,
    },
    /// A day sits more than three standard deviations from the mean.
    /// The value is kept as-is.
    Outlier {
        date: NaiveDate,
        quantity: f64,
        z_score: f64,
    },
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateDates { date, records } => {
                write!(f, "{records} records on {date} merged by summing quantities")
            }
            Self::NegativeClamped { date, original } => {
                write!(f, "negative quantity {original} on {date} clamped to 0")
            }
            Self::NonNumericDropped { date } => {
                write!(f, "non-numeric quantity on {date} dropped")
            }
            Self::GapFilled { start, end, days } => {
                write!(
                    f,
                    "{days} missing day(s) between {start} and {end} filled by interpolation"
                )
            }
            Self::Outlier {
                date,
                quantity,
                z_score,
            } => {
                write!(
                    f,
                    "quantity {quantity} on {date} is an outlier (z = {z_score:.2}), kept as-is"
                )
            }
        }
    }
}

#[derive(Debug, Clone)]
struct CleanDay {
    quantity: f64,
    promotion: Option<bool>,
    holiday: Option<bool>,
    regressors: BTreeMap<String, f64>,
}

/// Clean a raw table into a gap-free [`DemandSeries`].
///
/// Repairs, in order: drop non-numeric quantities, clamp negatives to zero,
/// merge duplicate dates by summing, fill calendar gaps by linear
/// interpolation. Days more than three standard deviations from the mean are
/// flagged but never altered. Every repair is reported as a [`DataWarning`].
pub fn preprocess(table: &RawTable) -> Result<(DemandSeries, Vec<DataWarning>)> {
    if table.records.is_empty() {
        return Err(DemandError::Validation(
            "no sales records provided".to_string(),
        ));
    }

    let mut warnings = Vec::new();

    // Drop non-numeric, clamp negatives, then merge duplicates by date.
    let mut by_date: BTreeMap<NaiveDate, (CleanDay, usize)> = BTreeMap::new();
    for record in &table.records {
        if !record.quantity.is_finite() {
            warnings.push(DataWarning::NonNumericDropped { date: record.date });
            continue;
        }
        let mut quantity = record.quantity;
        if quantity < 0.0 {
            warnings.push(DataWarning::NegativeClamped {
                date: record.date,
                original: quantity,
            });
            quantity = 0.0;
        }

        match by_date.get_mut(&record.date) {
            None => {
                by_date.insert(
                    record.date,
                    (
                        CleanDay {
                            quantity,
                            promotion: record.promotion,
                            holiday: record.holiday,
                            regressors: record.regressors.clone(),
                        },
                        1,
                    ),
                );
            }
            Some((day, count)) => {
                day.quantity += quantity;
                day.promotion = or_flags(day.promotion, record.promotion);
                day.holiday = or_flags(day.holiday, record.holiday);
                for (name, &value) in &record.regressors {
                    day.regressors
                        .entry(name.clone())
                        .and_modify(|v| *v += value)
                        .or_insert(value);
                }
                *count += 1;
            }
        }
    }
    for (&date, &(_, count)) in &by_date {
        if count > 1 {
            warnings.push(DataWarning::DuplicateDates {
                date,
                records: count,
            });
        }
    }
    if by_date.is_empty() {
        return Err(DemandError::Validation(
            "no usable sales records after cleaning".to_string(),
        ));
    }

    // Mean-merge regressors; quantities stay summed.
    let mut days: BTreeMap<NaiveDate, CleanDay> = BTreeMap::new();
    for (date, (mut day, count)) in by_date {
        if count > 1 {
            for value in day.regressors.values_mut() {
                *value /= count as f64;
            }
        }
        days.insert(date, day);
    }

    let regressor_names: Vec<String> = days
        .values()
        .flat_map(|d| d.regressors.keys().cloned())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    let has_promotions = days.values().any(|d| d.promotion.is_some());
    let has_holidays = days.values().any(|d| d.holiday.is_some());

    // Walk the full calendar range, interpolating across missing days.
    let start = *days.keys().next().expect("non-empty after cleaning");
    let end = *days.keys().next_back().expect("non-empty after cleaning");
    let observed: Vec<(NaiveDate, CleanDay)> = days.into_iter().collect();

    let mut dates = Vec::new();
    let mut quantities = Vec::new();
    let mut promotions = Vec::new();
    let mut holidays = Vec::new();
    let mut regressors: BTreeMap<String, Vec<f64>> = regressor_names
        .iter()
        .map(|name| (name.clone(), Vec::new()))
        .collect();

    let mut cursor = 0usize;
    let mut date = start;
    while date <= end {
        if observed[cursor].0 == date {
            let day = &observed[cursor].1;
            dates.push(date);
            quantities.push(day.quantity);
            promotions.push(day.promotion.unwrap_or(false));
            holidays.push(day.holiday.unwrap_or(false));
            for name in &regressor_names {
                regressors
                    .get_mut(name)
                    .expect("column preallocated")
                    .push(*day.regressors.get(name).unwrap_or(&f64::NAN));
            }
            cursor += 1;
        } else {
            // Interior gap: both neighbors exist by construction.
            let (prev_date, prev) = &observed[cursor - 1];
            let (next_date, next) = &observed[cursor];
            let span = (*next_date - *prev_date).num_days() as f64;
            let offset = (date - *prev_date).num_days() as f64;
            let frac = offset / span;

            // One warning per gap run, emitted at its first missing day.
            if date == *prev_date + Duration::days(1) {
                warnings.push(DataWarning::GapFilled {
                    start: *prev_date,
                    end: *next_date,
                    days: (span as usize) - 1,
                });
            }

            dates.push(date);
            quantities.push(prev.quantity + frac * (next.quantity - prev.quantity));
            promotions.push(false);
            holidays.push(false);
            for name in &regressor_names {
                let a = *prev.regressors.get(name).unwrap_or(&f64::NAN);
                let b = *next.regressors.get(name).unwrap_or(&f64::NAN);
                regressors
                    .get_mut(name)
                    .expect("column preallocated")
                    .push(a + frac * (b - a));
            }
        }
        date += Duration::days(1);
    }

    if quantities.len() < MIN_HISTORY_DAYS {
        return Err(DemandError::InsufficientHistory {
            needed: MIN_HISTORY_DAYS,
            got: quantities.len(),
        });
    }

    // Outliers are flagged, never altered.
    let center = mean(&quantities);
    let spread = std_dev(&quantities);
    if spread.is_finite() && spread > 0.0 {
        for (&date, &quantity) in dates.iter().zip(quantities.iter()) {
            let z = (quantity - center) / spread;
            if z.abs() > OUTLIER_Z {
                warnings.push(DataWarning::Outlier {
                    date,
                    quantity,
                    z_score: z,
                });
            }
        }
    }

    let mut series = DemandSeries::new(dates, quantities)?;
    if has_promotions {
        series = series.with_promotions(promotions)?;
    }
    if has_holidays {
        series = series.with_holidays(holidays)?;
    }
    for (name, values) in regressors {
        if values.iter().all(|v| v.is_finite()) {
            series = series.with_regressor(name, values)?;
        }
    }
    Ok((series, warnings))
}

fn or_flags(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (None, None) => None,
        (x, y) => Some(x.unwrap_or(false) || y.unwrap_or(false)),
    }
}
