//! Pearson correlation and ordinary least-squares simple linear regression.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::analyzers::utility::mean;
use crate::error::AnalysisError;

/// Smallest sample for which the t-test has at least one degree of freedom.
pub const MIN_SAMPLES: usize = 3;

/// Closed-form OLS fit of `y` on `x` together with its correlation test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fit {
    pub n: usize,
    pub r: f64,
    pub r_p_value: f64,
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub slope_p_value: f64,
    /// Standard error of the slope.
    pub stderr: f64,
}

impl Fit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Outcome of [`linregress`]. Consumers that draw or report the fitted line
/// must match on it; nothing is computed for the `Insufficient` case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Regression {
    Computed(Fit),
    Insufficient { n: usize },
}

impl Regression {
    pub fn fit(&self) -> Option<&Fit> {
        match self {
            Regression::Computed(fit) => Some(fit),
            Regression::Insufficient { .. } => None,
        }
    }
}

/// Splits out the pairs where both values are finite.
///
/// Returns `(x, y, dropped)`.
pub fn complete_pairs(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>, usize) {
    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (*a, *b))
        .unzip();
    let dropped = x.len().max(y.len()) - xs.len();
    (xs, ys, dropped)
}

/// Correlates `y` with `x` and fits `y = intercept + slope * x`.
///
/// Both p-values are two-sided and use `t = r * sqrt((n - 2) / (1 - r^2))`
/// against a Student-t distribution with `n - 2` degrees of freedom.
///
/// # Errors
///
/// * [`AnalysisError::InsufficientData`] if the slices differ in length or
///   hold non-finite values.
/// * [`AnalysisError::DegenerateInput`] if `x` or `y` is constant, which
///   leaves the correlation undefined.
pub fn linregress(x: &[f64], y: &[f64]) -> Result<Regression, AnalysisError> {
    if x.len() != y.len() {
        return Err(AnalysisError::InsufficientData(format!(
            "x has {} values but y has {}",
            x.len(),
            y.len()
        )));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(AnalysisError::InsufficientData(
            "inputs contain missing or non-finite values".to_string(),
        ));
    }

    let n = x.len();
    if n < MIN_SAMPLES {
        return Ok(Regression::Insufficient { n });
    }

    if is_constant(x) {
        return Err(AnalysisError::DegenerateInput(
            "green ratio has zero variance; slope is undefined".to_string(),
        ));
    }
    if is_constant(y) {
        return Err(AnalysisError::DegenerateInput(
            "temperature has zero variance; correlation is undefined".to_string(),
        ));
    }

    let x_mean = mean(x);
    let y_mean = mean(y);

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - x_mean;
        let dy = yi - y_mean;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    let r_squared = r * r;
    let df = (n - 2) as f64;

    let (p_value, stderr) = if r_squared >= 1.0 {
        (0.0, 0.0)
    } else {
        let t = r * (df / ((1.0 - r) * (1.0 + r))).sqrt();
        let dist = StudentsT::new(0.0, 1.0, df)
            .map_err(|e| AnalysisError::DegenerateInput(e.to_string()))?;
        (
            2.0 * dist.sf(t.abs()),
            ((1.0 - r_squared) * syy / sxx / df).sqrt(),
        )
    };

    Ok(Regression::Computed(Fit {
        n,
        r,
        r_p_value: p_value,
        slope,
        intercept,
        r_squared,
        slope_p_value: p_value,
        stderr,
    }))
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn computed(x: &[f64], y: &[f64]) -> Fit {
        match linregress(x, y).unwrap() {
            Regression::Computed(fit) => fit,
            other => panic!("expected a fit, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_line_is_recovered() {
        let x = [0.5, 1.0, 4.0, 7.5, 9.0, 12.0];
        let y: Vec<f64> = x.iter().map(|v| 2.5 * v - 3.0).collect();

        let fit = computed(&x, &y);

        assert!((fit.slope - 2.5).abs() < EPS);
        assert!((fit.intercept + 3.0).abs() < EPS);
        assert!((fit.r_squared - 1.0).abs() < EPS);
        assert!((fit.r.abs() - 1.0).abs() < EPS);
        assert!(fit.slope_p_value < 1e-6);
    }

    #[test]
    fn test_green_ratio_against_temperature() {
        let x = [10.0, 20.0, 30.0, 40.0, 50.0];
        let y = [15.0, 14.0, 13.0, 12.0, 11.0];

        let fit = computed(&x, &y);

        assert!((fit.slope + 0.1).abs() < EPS);
        assert!((fit.intercept - 16.0).abs() < EPS);
        assert!((fit.r + 1.0).abs() < EPS);
        assert!((fit.r_squared - 1.0).abs() < EPS);
        assert!((fit.predict(25.0) - 13.5).abs() < EPS);
    }

    #[test]
    fn test_noisy_fit_matches_reference_values() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 5.0, 4.0, 5.0];

        let fit = computed(&x, &y);

        assert!((fit.slope - 0.6).abs() < EPS);
        assert!((fit.intercept - 2.2).abs() < EPS);
        assert!((fit.r - 0.6f64.sqrt()).abs() < EPS);
        assert!((fit.r_squared - 0.6).abs() < EPS);
        assert!((fit.stderr - 0.08f64.sqrt()).abs() < EPS);
        assert!((fit.slope_p_value - 0.12403).abs() < 1e-4);
        assert_eq!(fit.r_p_value, fit.slope_p_value);
    }

    #[test]
    fn test_small_sample_is_insufficient() {
        assert_eq!(
            linregress(&[1.0, 2.0], &[3.0, 4.0]).unwrap(),
            Regression::Insufficient { n: 2 }
        );
        let empty = linregress(&[], &[]).unwrap();
        assert_eq!(empty, Regression::Insufficient { n: 0 });
        assert!(empty.fit().is_none());
    }

    #[test]
    fn test_constant_x_is_degenerate() {
        let err = linregress(&[0.1, 0.1, 0.1, 0.1], &[1.0, 2.0, 3.0, 4.0]).unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateInput(_)));
    }

    #[test]
    fn test_constant_y_is_degenerate() {
        let err = linregress(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]).unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateInput(_)));
    }

    #[test]
    fn test_length_mismatch_and_nan_are_rejected() {
        assert!(matches!(
            linregress(&[1.0, 2.0, 3.0], &[1.0, 2.0]),
            Err(AnalysisError::InsufficientData(_))
        ));
        assert!(matches!(
            linregress(&[1.0, f64::NAN, 3.0], &[1.0, 2.0, 3.0]),
            Err(AnalysisError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_complete_pairs() {
        let (x, y, dropped) = complete_pairs(
            &[1.0, f64::NAN, 3.0, f64::INFINITY],
            &[1.0, 2.0, f64::NAN, 4.0],
        );
        assert_eq!(x, vec![1.0]);
        assert_eq!(y, vec![1.0]);
        assert_eq!(dropped, 3);
    }
}
