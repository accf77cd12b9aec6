//! Small statistics helpers
//!
//! Population statistics throughout; a series too short to define a value
//! yields `None` rather than zero.

use serde::{Deserialize, Serialize};

/// Below this a spread or denominator is treated as zero
pub const EPSILON: f64 = 1e-9;

/// Least-squares line fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub slope: f64,
    pub intercept: f64,
    /// Fraction of variance explained (0-1)
    pub r_squared: f64,
}

impl RegressionResult {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope.mul_add(x, self.intercept)
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Standard deviation over mean; needs two values and a positive mean
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    if m <= EPSILON {
        return None;
    }
    Some(std_dev(values)? / m)
}

/// Fit y = slope * x + intercept.
///
/// Returns `None` with fewer than two points or when every x is the same.
pub fn linear_regression(points: &[(f64, f64)]) -> Option<RegressionResult> {
    if points.len() < 2 {
        return None;
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (x, y) in points {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    if sxx <= EPSILON {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = slope.mul_add(-mean_x, mean_y);
    // A flat series is fitted exactly
    let r_squared = if syy <= EPSILON {
        1.0
    } else {
        (sxy * sxy) / (sxx * syy)
    };

    Some(RegressionResult {
        slope,
        intercept,
        r_squared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), Some(5.0));
        assert!((std_dev(&values).unwrap() - 2.0).abs() < 1e-12);
        assert_eq!(mean(&[]), None);
        assert_eq!(std_dev(&[]), None);
    }

    #[test]
    fn test_coefficient_of_variation() {
        assert_eq!(coefficient_of_variation(&[100.0]), None);
        assert_eq!(coefficient_of_variation(&[100.0, 100.0]), Some(0.0));
        let cv = coefficient_of_variation(&[90.0, 110.0]).unwrap();
        assert!((cv - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_regression_exact_line() {
        let fit = linear_regression(&[(0.0, 130.0), (1.0, 125.0), (2.0, 120.0)]).unwrap();
        assert!((fit.slope + 5.0).abs() < 1e-12);
        assert!((fit.intercept - 130.0).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert!((fit.predict(4.0) - 110.0).abs() < 1e-12);
    }

    #[test]
    fn test_regression_degenerate() {
        assert!(linear_regression(&[(1.0, 2.0)]).is_none());
        assert!(linear_regression(&[(1.0, 2.0), (1.0, 3.0)]).is_none());
    }
}
