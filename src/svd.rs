use log::{debug, trace, warn};
use nalgebra::{DMatrix, DVector, SVD};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SecsError};

/// Iterations allowed to the SVD for each singular value before giving up.
const SVD_ITERATIONS_PER_VALUE: usize = 100;

/// How small singular values are discarded when building the pseudo-inverse.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Truncation {
    /// Keep singular values `s >= epsilon * max(s)`.
    #[default]
    Relative,
    /// Keep the largest singular values until they hold `1 - epsilon` of the total energy
    /// (sum of squared singular values).
    Variance,
}

/// Amplitudes and their variances, one per column of the inverted system.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Inversion {
    pub amplitudes: Vec<f64>,
    /// Diagonal of the amplitude covariance, `+inf` when nothing constrains the system.
    pub variances: Vec<f64>,
}

impl Inversion {
    fn empty() -> Self {
        Self {
            amplitudes: vec![],
            variances: vec![],
        }
    }

    fn unconstrained(n: usize) -> Self {
        Self {
            amplitudes: vec![0.0; n],
            variances: vec![f64::INFINITY; n],
        }
    }
}

/// Checks that `epsilon` is a usable relative threshold.
pub fn validate_epsilon(epsilon: f64) -> Result<()> {
    if epsilon.is_finite() && epsilon > 0.0 && epsilon < 1.0 {
        Ok(())
    } else {
        Err(SecsError::InvalidRegularization(epsilon))
    }
}

/// Indices of the singular values kept in the pseudo-inverse. Zero singular values are
/// never kept.
fn retained_singular_values(s: &[f64], epsilon: f64, truncation: Truncation) -> Vec<usize> {
    let s_max = s.iter().copied().fold(0.0, f64::max);
    if s_max <= 0.0 {
        return vec![];
    }

    match truncation {
        Truncation::Relative => (0..s.len())
            .filter(|&k| s[k] > 0.0 && s[k] >= epsilon * s_max)
            .collect(),
        Truncation::Variance => {
            // nalgebra does not sort singular values
            let mut order: Vec<usize> = (0..s.len()).filter(|&k| s[k] > 0.0).collect();
            order.sort_by(|&a, &b| s[b].total_cmp(&s[a]));

            let total: f64 = s.iter().map(|v| v.powi(2)).sum();
            let mut energy = 0.0;
            let mut kept = Vec::with_capacity(order.len());

            for k in order {
                kept.push(k);
                energy += s[k].powi(2);
                if energy / total >= 1.0 - epsilon {
                    break;
                }
            }

            kept
        }
    }
}

/// Solves `t_flat * x = b_flat` in the least-squares sense with a truncated SVD pseudo-inverse.
///
/// `T = U S Vt`, the amplitudes are `V S+ Ut b` and the variance of amplitude `i` is
/// `sum_k V[i][k]^2 / s_k^2` over the retained singular values, i.e. the rows of `t_flat` are
/// assumed to carry unit variance. Callers with other uncertainties should scale rows of both
/// `t_flat` and `b_flat` beforehand.
///
/// Rows with a non-finite coefficient or observation are left out of the system.
///
/// # Degenerate systems
/// * no columns: empty result, `epsilon` is not even looked at
/// * no (usable) rows, or no retained singular value: zero amplitudes and `+inf` variances
///
/// # Errors
/// * [`SecsError::DimensionMismatch`] if `b_flat` does not have one value per row
/// * [`SecsError::InvalidRegularization`] if `epsilon` is not in `(0, 1)`
/// * [`SecsError::Decomposition`] if the SVD does not converge
pub fn solve_svd(
    t_flat: &Array2<f64>,
    b_flat: &Array1<f64>,
    epsilon: f64,
    truncation: Truncation,
) -> Result<Inversion> {
    let (rows, nsec) = t_flat.dim();

    if b_flat.len() != rows {
        return Err(SecsError::DimensionMismatch {
            what: "observed values",
            expected: rows,
            found: b_flat.len(),
        });
    }

    if nsec == 0 {
        return Ok(Inversion::empty());
    }

    validate_epsilon(epsilon)?;

    let usable: Vec<usize> = (0..rows)
        .filter(|&i| b_flat[i].is_finite() && t_flat.row(i).iter().all(|v| v.is_finite()))
        .collect();

    if usable.len() < rows {
        warn!(
            "leaving {} of {} rows with non-finite values out of the inversion",
            rows - usable.len(),
            rows
        );
    }

    if usable.is_empty() {
        debug!("no usable rows, {} amplitudes left unconstrained", nsec);
        return Ok(Inversion::unconstrained(nsec));
    }

    debug!("inverting a {}x{} system", usable.len(), nsec);

    let matrix = DMatrix::from_fn(usable.len(), nsec, |i, j| t_flat[[usable[i], j]]);
    let b = DVector::from_iterator(usable.len(), usable.iter().map(|&i| b_flat[i]));

    let max_iterations = SVD_ITERATIONS_PER_VALUE * usable.len().min(nsec).max(1);
    let svd = SVD::try_new(matrix, true, true, f64::EPSILON, max_iterations)
        .ok_or(SecsError::Decomposition)?;
    let (u, s, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, svd.singular_values, v_t),
        _ => return Err(SecsError::Decomposition),
    };

    let valid = retained_singular_values(s.as_slice(), epsilon, truncation);
    trace!(
        "singular values {:?}, keeping {:?}",
        s.as_slice(),
        valid.as_slice()
    );

    if valid.is_empty() {
        return Ok(Inversion::unconstrained(nsec));
    }

    let mut amplitudes = vec![0.0; nsec];
    let mut variances = vec![0.0; nsec];

    for &k in &valid {
        let coefficient = u.column(k).dot(&b) / s[k];
        let inv_s2 = s[k].powi(-2);

        for i in 0..nsec {
            let v = v_t[(k, i)];
            amplitudes[i] += coefficient * v;
            variances[i] += v.powi(2) * inv_s2;
        }
    }

    Ok(Inversion {
        amplitudes,
        variances,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::test::init_logger;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_solve_exact_system() {
        let t = array![[2.0, 0.0], [0.0, 1.0], [0.0, 0.0]];
        let b = array![4.0, -3.0, 0.0];

        let inv = solve_svd(&t, &b, 1e-6, Truncation::Relative).unwrap();

        assert_relative_eq!(inv.amplitudes.as_slice(), [2.0, -3.0].as_slice(), epsilon = 1e-12);
        assert_relative_eq!(inv.variances.as_slice(), [0.25, 1.0].as_slice(), epsilon = 1e-12);
    }

    #[test]
    fn test_solve_least_squares() {
        // Fitting a line through (0, 1), (1, 3), (2, 5)
        let t = array![[1.0, 0.0], [1.0, 1.0], [1.0, 2.0]];
        let b = array![1.0, 3.0, 5.0];

        let inv = solve_svd(&t, &b, 1e-6, Truncation::Relative).unwrap();

        assert_relative_eq!(inv.amplitudes[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(inv.amplitudes[1], 2.0, epsilon = 1e-12);
        // diagonal of (Tt T)^-1 = [[3, 3], [3, 5]]^-1
        assert_relative_eq!(inv.variances[0], 5.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(inv.variances[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_underdetermined_minimum_norm() {
        let t = array![[1.0, 1.0]];
        let b = array![2.0];

        let inv = solve_svd(&t, &b, 0.01, Truncation::Relative).unwrap();

        assert_relative_eq!(inv.amplitudes.as_slice(), [1.0, 1.0].as_slice(), epsilon = 1e-12);
        assert_relative_eq!(inv.variances.as_slice(), [0.25, 0.25].as_slice(), epsilon = 1e-12);
    }

    #[test]
    fn test_small_singular_values_are_truncated() {
        let t = array![[1.0, 0.0], [0.0, 1e-3]];
        let b = array![1.0, 1.0];

        let kept = solve_svd(&t, &b, 1e-4, Truncation::Relative).unwrap();
        assert_relative_eq!(kept.amplitudes[1], 1e3, max_relative = 1e-9);
        assert_relative_eq!(kept.variances[1], 1e6, max_relative = 1e-9);

        let truncated = solve_svd(&t, &b, 1e-2, Truncation::Relative).unwrap();
        assert_relative_eq!(truncated.amplitudes[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(truncated.amplitudes[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(truncated.variances[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(truncated.variances[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_variance_truncation() {
        assert_eq!(
            retained_singular_values(&[1.0, 10.0, 0.1], 0.05, Truncation::Variance),
            vec![1]
        );
        assert_eq!(
            retained_singular_values(&[1.0, 10.0, 0.1], 0.001, Truncation::Variance),
            vec![1, 0]
        );
        assert_eq!(
            retained_singular_values(&[1.0, 10.0, 0.0], 1e-12, Truncation::Variance),
            vec![1, 0]
        );
    }

    #[test]
    fn test_relative_truncation() {
        assert_eq!(
            retained_singular_values(&[1.0, 10.0, 0.1], 0.05, Truncation::Relative),
            vec![0, 1]
        );
        assert!(retained_singular_values(&[0.0, 0.0], 0.05, Truncation::Relative).is_empty());
    }

    #[test]
    fn test_no_columns() {
        let t = Array2::<f64>::zeros((6, 0));
        let b = Array1::<f64>::ones(6);

        let inv = solve_svd(&t, &b, 0.05, Truncation::Relative).unwrap();
        assert!(inv.amplitudes.is_empty());
        assert!(inv.variances.is_empty());

        // any epsilon is fine when there is nothing to fit
        assert!(solve_svd(&t, &b, 7.0, Truncation::Relative).is_ok());
    }

    #[test]
    fn test_no_rows() {
        let t = Array2::<f64>::zeros((0, 3));
        let b = Array1::<f64>::zeros(0);

        let inv = solve_svd(&t, &b, 0.05, Truncation::Relative).unwrap();
        assert_eq!(inv.amplitudes, vec![0.0; 3]);
        assert_eq!(inv.variances, vec![f64::INFINITY; 3]);
    }

    #[test]
    fn test_nothing_retained() {
        let t = Array2::<f64>::zeros((3, 2));
        let b = array![1.0, 2.0, 3.0];

        let inv = solve_svd(&t, &b, 0.05, Truncation::Relative).unwrap();
        assert_eq!(inv.amplitudes, vec![0.0; 2]);
        assert_eq!(inv.variances, vec![f64::INFINITY; 2]);
    }

    #[test]
    fn test_non_finite_rows_are_dropped() {
        init_logger();

        let t = array![[f64::NEG_INFINITY, 0.0], [2.0, 0.0], [0.0, 1.0]];
        let b = array![10.0, 4.0, f64::NAN];

        let inv = solve_svd(&t, &b, 1e-6, Truncation::Relative).unwrap();
        assert_relative_eq!(inv.amplitudes[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(inv.amplitudes[1], 0.0, epsilon = 1e-12);
        assert!(inv.amplitudes.iter().all(|a| a.is_finite()));
    }

    #[test]
    fn test_errors() {
        let t = array![[1.0], [2.0]];

        assert!(matches!(
            solve_svd(&t, &array![1.0], 0.05, Truncation::Relative),
            Err(SecsError::DimensionMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));

        for epsilon in [0.0, 1.0, -0.1, f64::NAN] {
            assert!(matches!(
                solve_svd(&t, &array![1.0, 2.0], epsilon, Truncation::Relative),
                Err(SecsError::InvalidRegularization(_))
            ));
        }
    }
}
