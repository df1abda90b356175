//! Log-domain math shared by the accumulator, trainer, and scorer.
//!
//! The E-step and the scorer must evaluate per-frame log-densities with
//! identical semantics, so both call through here.

use std::f64::consts::PI;

/// Numerically stable log(sum(exp(v))): subtract the max before
/// exponentiating, add it back after.
///
/// For a single value returns exactly that value. Not defined for an
/// empty slice; callers always pass K >= 1 entries.
pub fn log_sum_exp(v: &[f64]) -> f64 {
    let m = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if m.is_infinite() {
        return m;
    }
    let s: f64 = v.iter().map(|&x| (x - m).exp()).sum();
    m + s.ln()
}

/// Log-density of a diagonal-covariance multivariate normal at `x`.
///
/// `-0.5 * (D*ln(2pi) + sum(ln var[d])) - 0.5 * sum((x[d]-mean[d])^2 / var[d])`
///
/// `x`, `mean`, and `var` must all have the same length; variances must be
/// strictly positive (the trainer's flooring guarantees this).
pub fn log_gaussian_diag(x: &[f32], mean: &[f64], var: &[f64]) -> f64 {
    let d_len = x.len();

    let mut log_det = 0.0;
    let mut quad = 0.0;
    for d in 0..d_len {
        let vd = var[d];
        let diff = f64::from(x[d]) - mean[d];
        log_det += vd.ln();
        quad += (diff * diff) / vd;
    }

    let log_norm = -0.5 * (d_len as f64 * (2.0 * PI).ln() + log_det);
    log_norm - 0.5 * quad
}
