//! Core data structures for demand forecasting.

mod features;
mod forecast;
mod series;

pub use features::{feature_names, feature_row, FeatureFrame, LAGS, ROLLING_WINDOWS};
pub use forecast::ForecastResult;
pub use series::DemandSeries;
