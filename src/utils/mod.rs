//! Shared numerical utilities.

pub mod optimize;
pub mod stats;

pub use optimize::{minimize, MinimizeResult};
pub use stats::{mean, normal_cdf, normal_quantile, quantile, std_dev, variance};
