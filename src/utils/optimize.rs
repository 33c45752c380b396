//! Derivative-free minimization used for model parameter estimation.

/// Outcome of a simplex minimization run.
#[derive(Debug, Clone)]
pub struct MinimizeResult {
    /// Best point found.
    pub point: Vec<f64>,
    /// Objective value at the best point.
    pub value: f64,
    /// Iterations performed.
    pub iterations: usize,
    /// Whether the spread of the simplex fell below tolerance.
    pub converged: bool,
}

/// Minimize `objective` with the Nelder-Mead simplex method.
///
/// Coordinates are clamped to `bounds` after every move, which is sufficient
/// for the stationarity/invertibility boxes the AR and MA coefficients live in.
///
/// # Example
/// ```
/// use demandcast::utils::minimize;
///
/// let result = minimize(
///     |x| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2),
///     &[0.0, 0.0],
///     &[(-10.0, 10.0), (-10.0, 10.0)],
///     500,
/// );
/// assert!((result.point[0] - 2.0).abs() < 0.01);
/// assert!((result.point[1] + 1.0).abs() < 0.01);
/// ```
pub fn minimize<F>(
    objective: F,
    initial: &[f64],
    bounds: &[(f64, f64)],
    max_iter: usize,
) -> MinimizeResult
where
    F: Fn(&[f64]) -> f64,
{
    const TOLERANCE: f64 = 1e-8;
    // Standard reflection/expansion/contraction/shrink coefficients.
    const ALPHA: f64 = 1.0;
    const GAMMA: f64 = 2.0;
    const RHO: f64 = 0.5;
    const SIGMA: f64 = 0.5;

    let n = initial.len();
    if n == 0 {
        return MinimizeResult {
            point: vec![],
            value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    let clamp = |point: &[f64]| -> Vec<f64> {
        point
            .iter()
            .zip(bounds.iter())
            .map(|(&x, &(lo, hi))| x.clamp(lo, hi))
            .collect()
    };

    // Build the initial simplex by perturbing one coordinate per vertex.
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(clamp(initial));
    for i in 0..n {
        let mut vertex = initial.to_vec();
        let step = if vertex[i].abs() > 1e-10 {
            0.05 * vertex[i].abs()
        } else {
            0.05
        };
        vertex[i] += step;
        simplex.push(clamp(&vertex));
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| objective(v)).collect();

    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iter {
        iterations += 1;

        // Order vertices best-to-worst.
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| {
            values[a]
                .partial_cmp(&values[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        if (values[n] - values[0]).abs() < TOLERANCE {
            converged = true;
            break;
        }

        // Centroid of all but the worst vertex.
        let mut centroid = vec![0.0; n];
        for vertex in simplex.iter().take(n) {
            for (c, &x) in centroid.iter_mut().zip(vertex.iter()) {
                *c += x / n as f64;
            }
        }

        let blend = |from: &[f64], coeff: f64| -> Vec<f64> {
            let moved: Vec<f64> = centroid
                .iter()
                .zip(from.iter())
                .map(|(&c, &w)| c + coeff * (c - w))
                .collect();
            clamp(&moved)
        };

        let reflected = blend(&simplex[n], ALPHA);
        let reflected_value = objective(&reflected);

        if reflected_value < values[0] {
            // Try to expand further in the same direction.
            let expanded = blend(&simplex[n], ALPHA * GAMMA);
            let expanded_value = objective(&expanded);
            if expanded_value < reflected_value {
                simplex[n] = expanded;
                values[n] = expanded_value;
            } else {
                simplex[n] = reflected;
                values[n] = reflected_value;
            }
            continue;
        }

        if reflected_value < values[n - 1] {
            simplex[n] = reflected;
            values[n] = reflected_value;
            continue;
        }

        // Contract toward the centroid.
        let contracted = blend(&simplex[n], -RHO);
        let contracted_value = objective(&contracted);
        if contracted_value < values[n] {
            simplex[n] = contracted;
            values[n] = contracted_value;
            continue;
        }

        // Shrink everything toward the best vertex.
        let best = simplex[0].clone();
        for i in 1..=n {
            let shrunk: Vec<f64> = best
                .iter()
                .zip(simplex[i].iter())
                .map(|(&b, &x)| b + SIGMA * (x - b))
                .collect();
            simplex[i] = clamp(&shrunk);
            values[i] = objective(&simplex[i]);
        }
    }

    let best = values
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);

    MinimizeResult {
        point: simplex[best].clone(),
        value: values[best],
        iterations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn minimizes_quadratic_bowl() {
        let result = minimize(
            |x| (x[0] - 3.0).powi(2) + 2.0 * (x[1] - 1.0).powi(2),
            &[0.0, 0.0],
            &[(-100.0, 100.0), (-100.0, 100.0)],
            1000,
        );
        assert!(result.converged);
        assert_relative_eq!(result.point[0], 3.0, epsilon = 1e-3);
        assert_relative_eq!(result.point[1], 1.0, epsilon = 1e-3);
        assert!(result.value < 1e-6);
    }

    #[test]
    fn respects_bounds() {
        // Unconstrained minimum at 5, bound caps at 2.
        let result = minimize(|x| (x[0] - 5.0).powi(2), &[0.0], &[(-2.0, 2.0)], 500);
        assert_relative_eq!(result.point[0], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn handles_rosenbrock() {
        let result = minimize(
            |x| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2),
            &[-1.0, 1.0],
            &[(-5.0, 5.0), (-5.0, 5.0)],
            5000,
        );
        assert!(result.value < 1e-3);
    }

    #[test]
    fn empty_input() {
        let result = minimize(|_| 0.0, &[], &[], 100);
        assert!(result.point.is_empty());
        assert!(!result.converged);
    }
}
