//! Demand forecasting and inventory optimization for retail products.
//!
//! The pipeline runs in stages: raw sales records are cleaned into a
//! gap-free [`core::DemandSeries`], one of several [`models`] produces a
//! [`core::ForecastResult`] with prediction intervals, and the forecast
//! drives [`scenario`] analysis, [`inventory`] policy optimization, and
//! [`costs`] comparison. [`evaluate`] backtests any model on a holdout
//! window.
//!
//! # Quick start
//!
//! ```
//! use chrono::{Duration, NaiveDate};
//! use demandcast::core::DemandSeries;
//! use demandcast::inventory::{optimize_inventory, CostParams};
//! use demandcast::models::{forecast, ForecastOptions, ModelKind};
//!
//! // Two months of daily sales with a weekly rhythm.
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let dates: Vec<NaiveDate> = (0..60).map(|i| start + Duration::days(i)).collect();
//! let sales: Vec<f64> = (0..60).map(|i| 100.0 + (i % 7) as f64 * 5.0).collect();
//! let series = DemandSeries::new(dates, sales).unwrap();
//!
//! // Two-week forecast with 95% intervals.
//! let result = forecast(
//!     &series,
//!     ModelKind::TrendSeasonal,
//!     14,
//!     &ForecastOptions::default(),
//! )
//! .unwrap();
//! assert_eq!(result.horizon(), 14);
//!
//! // Reorder policy at a 95% service level with a one-week lead time.
//! let costs = CostParams {
//!     holding_rate: 2.0,
//!     ordering_cost: 50.0,
//!     stockout_cost: 10.0,
//! };
//! let policy = optimize_inventory(&result, 7, 0.95, &costs, 1500.0).unwrap();
//! assert!(policy.reorder_point > policy.safety_stock);
//! ```

pub mod core;
pub mod costs;
pub mod error;
pub mod evaluate;
pub mod inventory;
pub mod io;
pub mod models;
pub mod preprocess;
pub mod scenario;
pub mod utils;

pub use error::{DemandError, Result};

/// Convenience re-exports of the types most callers need.
pub mod prelude {
    pub use crate::core::{DemandSeries, FeatureFrame, ForecastResult};
    pub use crate::costs::{cost_benefit, CostBenefitReport, CurrentPolicy, PolicyCost};
    pub use crate::error::{DemandError, Result};
    pub use crate::evaluate::{calculate_metrics, evaluate, AccuracyMetrics, Evaluation};
    pub use crate::inventory::{
        optimize_inventory, CostParams, InventoryPolicy, Recommendation, Severity,
    };
    pub use crate::io::{read_csv, read_csv_path};
    pub use crate::models::{
        compare_models, forecast, ForecastOptions, Forecaster, ModelComparison, ModelKind,
    };
    pub use crate::preprocess::{preprocess, DataWarning, RawRecord, RawTable};
    pub use crate::scenario::{
        forecast_scenarios, run_scenarios, standard_scenarios, ScenarioForecast,
        ScenarioTransform,
    };
}
