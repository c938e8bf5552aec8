//! Linear algebra utilities
//!
//! Gaussian densities, Kalman measurement updates and log-domain helpers
//! shared by the IMM filters and the association sampler.

use nalgebra::{DMatrix, DVector};
use std::f64::consts::PI;

/// Compute multivariate Gaussian PDF
///
/// Computes the probability density function of a multivariate Gaussian
/// distribution at a given point.
///
/// # Arguments
/// * `x` - Point to evaluate (column vector)
/// * `mu` - Mean vector
/// * `sigma` - Covariance matrix
///
/// # Returns
/// Probability density value
pub fn gaussian_pdf(x: &DVector<f64>, mu: &DVector<f64>, sigma: &DMatrix<f64>) -> f64 {
    let n = x.len() as f64;
    let diff = x - mu;

    let det = sigma.determinant();
    if det <= 0.0 {
        return 0.0; // Singular covariance
    }

    // Cholesky decomposition for numerical stability
    match sigma.clone().cholesky() {
        Some(chol) => {
            let inv_sigma_diff = chol.solve(&diff);
            let mahalanobis = diff.dot(&inv_sigma_diff);

            let coeff = 1.0 / ((2.0 * PI).powf(n / 2.0) * det.sqrt());
            coeff * (-0.5 * mahalanobis).exp()
        }
        None => 0.0, // Failed Cholesky
    }
}

/// Compute log Gaussian PDF for numerical stability
///
/// # Arguments
/// * `x` - Point to evaluate
/// * `mu` - Mean vector
/// * `sigma` - Covariance matrix
///
/// # Returns
/// Log probability density
pub fn log_gaussian_pdf(x: &DVector<f64>, mu: &DVector<f64>, sigma: &DMatrix<f64>) -> f64 {
    let n = x.len() as f64;
    let diff = x - mu;

    let det = sigma.determinant();
    if det <= 0.0 {
        return f64::NEG_INFINITY;
    }

    match sigma.clone().cholesky() {
        Some(chol) => {
            let inv_sigma_diff = chol.solve(&diff);
            let mahalanobis = diff.dot(&inv_sigma_diff);

            -0.5 * (n * (2.0 * PI).ln() + det.ln() + mahalanobis)
        }
        None => f64::NEG_INFINITY,
    }
}

/// Kalman filter update step
///
/// Performs a single Kalman filter measurement update
///
/// # Arguments
/// * `x_pred` - Predicted state mean
/// * `p_pred` - Predicted state covariance
/// * `z` - Measurement
/// * `h` - Measurement matrix
/// * `r` - Measurement noise covariance
///
/// # Returns
/// Tuple of (updated mean, updated covariance, likelihood)
pub fn kalman_update(
    x_pred: &DVector<f64>,
    p_pred: &DMatrix<f64>,
    z: &DVector<f64>,
    h: &DMatrix<f64>,
    r: &DMatrix<f64>,
) -> (DVector<f64>, DMatrix<f64>, f64) {
    // Innovation
    let z_pred = h * x_pred;
    let innovation = z - &z_pred;

    // Innovation covariance
    let s = h * p_pred * h.transpose() + r;

    // Kalman gain: K = P Hᵀ S⁻¹ via the Cholesky solve of S X = H P
    let k = match s.clone().cholesky() {
        Some(chol) => chol.solve(&(h * p_pred)).transpose(),
        None => {
            // Fallback to plain inverse
            match s.clone().try_inverse() {
                Some(s_inv) => p_pred * h.transpose() * s_inv,
                None => return (x_pred.clone(), p_pred.clone(), 0.0),
            }
        }
    };

    // Updated state
    let x_updated = x_pred + &k * &innovation;

    // Updated covariance (Joseph form for numerical stability)
    let i_minus_kh = DMatrix::identity(x_pred.len(), x_pred.len()) - &k * h;
    let p_updated = &i_minus_kh * p_pred * i_minus_kh.transpose() + &k * r * k.transpose();

    // Likelihood of the innovation under the predicted observation density
    let likelihood = gaussian_pdf(&innovation, &DVector::zeros(innovation.len()), &s);

    (x_updated, p_updated, likelihood)
}

/// Compute log-sum-exp for numerical stability
///
/// Computes log(sum(exp(x))) in a numerically stable way
///
/// # Arguments
/// * `values` - Vector of log values
///
/// # Returns
/// Log of sum of exponentials
pub fn log_sum_exp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }

    let max_val = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max_val.is_infinite() && max_val < 0.0 {
        return f64::NEG_INFINITY;
    }

    let sum: f64 = values.iter().map(|v| (v - max_val).exp()).sum();
    max_val + sum.ln()
}

/// Normalize log weights
///
/// Convert log weights to normalized linear weights
///
/// # Arguments
/// * `log_weights` - Vector of log weights
///
/// # Returns
/// Normalized weights
pub fn normalize_log_weights(log_weights: &[f64]) -> Vec<f64> {
    let log_sum = log_sum_exp(log_weights);
    log_weights.iter().map(|w| (w - log_sum).exp()).collect()
}

/// Make matrix symmetric
///
/// Ensures a matrix is symmetric by averaging with its transpose
pub fn symmetrize(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    0.5 * (matrix + matrix.transpose())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_gaussian_pdf_standard_normal() {
        let x = DVector::from_vec(vec![0.0]);
        let mu = DVector::from_vec(vec![0.0]);
        let sigma = DMatrix::from_vec(1, 1, vec![1.0]);

        let p = gaussian_pdf(&x, &mu, &sigma);
        assert_abs_diff_eq!(p, 1.0 / (2.0 * PI).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_log_gaussian_pdf_matches_pdf() {
        let x = DVector::from_vec(vec![1.0, -0.5]);
        let mu = DVector::from_vec(vec![0.2, 0.1]);
        let sigma = DMatrix::from_diagonal(&DVector::from_vec(vec![2.0, 0.5]));

        let p = gaussian_pdf(&x, &mu, &sigma);
        let lp = log_gaussian_pdf(&x, &mu, &sigma);
        assert_abs_diff_eq!(lp, p.ln(), epsilon = 1e-10);
    }

    #[test]
    fn test_kalman_update_pulls_towards_measurement() {
        let x = DVector::from_vec(vec![0.0, 0.0]);
        let p = DMatrix::identity(2, 2) * 10.0;
        let z = DVector::from_vec(vec![1.0]);
        let h = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
        let r = DMatrix::from_vec(1, 1, vec![0.1]);

        let (x_upd, p_upd, lik) = kalman_update(&x, &p, &z, &h, &r);

        // With a tight measurement the state moves almost all the way
        assert!(x_upd[0] > 0.9);
        assert!(p_upd[(0, 0)] < p[(0, 0)]);
        assert!(lik > 0.0);
    }

    #[test]
    fn test_log_sum_exp() {
        let vals = vec![0.0_f64.ln(), 1.0_f64.ln(), 2.0_f64.ln()];
        assert_abs_diff_eq!(log_sum_exp(&vals), 3.0_f64.ln(), epsilon = 1e-12);

        assert_eq!(log_sum_exp(&[]), f64::NEG_INFINITY);
        assert_eq!(
            log_sum_exp(&[f64::NEG_INFINITY, f64::NEG_INFINITY]),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn test_normalize_log_weights() {
        let lw = vec![0.0, 0.0, 0.0, 0.0];
        let w = normalize_log_weights(&lw);
        for wi in &w {
            assert_abs_diff_eq!(*wi, 0.25, epsilon = 1e-12);
        }
    }
}
