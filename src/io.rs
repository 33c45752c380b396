//! CSV loading of raw sales history.

use crate::error::{DemandError, Result};
use crate::preprocess::{RawRecord, RawTable};
use chrono::NaiveDate;
use std::io::Read;
use std::path::Path;

/// Header names accepted for the date column, case-insensitive.
const DATE_HEADERS: [&str; 3] = ["date", "day", "order_date"];
/// Header names accepted for the demand column, case-insensitive.
const QUANTITY_HEADERS: [&str; 5] = ["sales", "quantity", "demand", "units", "qty"];
/// Date formats tried in order.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Read a sales history CSV file into a [`RawTable`].
///
/// See [`read_csv`] for the expected layout.
pub fn read_csv_path(path: impl AsRef<Path>) -> Result<RawTable> {
    let file = std::fs::File::open(path.as_ref()).map_err(|e| {
        DemandError::Io(format!("cannot open {}: {e}", path.as_ref().display()))
    })?;
    read_csv(file)
}

/// Read a sales history CSV into a [`RawTable`].
///
/// The header row must carry a date column and a demand column (recognized
/// names: date/day/order_date and sales/quantity/demand/units/qty). Optional
/// `promotion` and `holiday` columns are parsed as boolean flags; every other
/// numeric column is carried through as a named regressor. Unparseable
/// quantities become NaN and are repaired (with a warning) during
/// preprocessing; an unparseable date is a hard error.
pub fn read_csv<R: Read>(reader: R) -> Result<RawTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(|e| DemandError::Io(format!("cannot read csv header: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let date_col = find_column(&headers, &DATE_HEADERS).ok_or_else(|| {
        DemandError::Validation(format!(
            "no date column found; expected one of {DATE_HEADERS:?}, got {headers:?}"
        ))
    })?;
    let quantity_col = find_column(&headers, &QUANTITY_HEADERS).ok_or_else(|| {
        DemandError::Validation(format!(
            "no demand column found; expected one of {QUANTITY_HEADERS:?}, got {headers:?}"
        ))
    })?;
    let promotion_col = find_column(&headers, &["promotion", "promo"]);
    let holiday_col = find_column(&headers, &["holiday"]);

    let reserved = [Some(date_col), Some(quantity_col), promotion_col, holiday_col];
    let regressor_cols: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| !reserved.contains(&Some(*i)))
        .map(|(i, name)| (i, name.clone()))
        .collect();

    let mut records = Vec::new();
    for (line, row) in csv_reader.records().enumerate() {
        let row = row.map_err(|e| DemandError::Io(format!("csv row {}: {e}", line + 2)))?;
        let raw_date = row.get(date_col).unwrap_or("");
        let date = parse_date(raw_date).ok_or_else(|| {
            DemandError::Validation(format!(
                "unparseable date '{raw_date}' on row {}",
                line + 2
            ))
        })?;

        let quantity = row
            .get(quantity_col)
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(f64::NAN);

        let mut record = RawRecord::new(date, quantity);
        record.promotion = promotion_col.and_then(|col| parse_flag(row.get(col).unwrap_or("")));
        record.holiday = holiday_col.and_then(|col| parse_flag(row.get(col).unwrap_or("")));
        for (col, name) in &regressor_cols {
            if let Some(value) = row.get(*col).and_then(|v| v.parse::<f64>().ok()) {
                record.regressors.insert(name.clone(), value);
            }
        }
        records.push(record);
    }

    if records.is_empty() {
        return Err(DemandError::Validation(
            "csv contains no data rows".to_string(),
        ));
    }
    Ok(RawTable { records })
}

fn find_column(headers: &[String], candidates: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| candidates.iter().any(|c| h.eq_ignore_ascii_case(c)))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}
