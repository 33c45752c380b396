//! Statistical helper functions shared across the pipeline.

use statrs::distribution::{ContinuousCDF, Normal};

/// Quantile function (inverse CDF) of the standard normal distribution.
///
/// # Example
/// ```
/// use demandcast::utils::normal_quantile;
///
/// // 95% service level -> z ≈ 1.645
/// let z = normal_quantile(0.95);
/// assert!((z - 1.645).abs() < 0.01);
/// ```
pub fn normal_quantile(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    let standard = Normal::new(0.0, 1.0).expect("unit normal is always valid");
    standard.inverse_cdf(p)
}

/// CDF of the standard normal distribution.
pub fn normal_cdf(x: f64) -> f64 {
    let standard = Normal::new(0.0, 1.0).expect("unit normal is always valid");
    standard.cdf(x)
}

/// Mean of a slice (NaN for empty input).
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance with n-1 denominator (NaN when fewer than 2 points).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    sum_sq / (values.len() - 1) as f64
}

/// Sample standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Empirical quantile with linear interpolation between order statistics.
///
/// `p` is clamped to [0, 1]. Returns NaN for empty input.
pub fn quantile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let p = p.clamp(0.0, 1.0);
    let rank = p * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}
