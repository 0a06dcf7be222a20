//! Standard normal helpers shared by the acquisition strategies.

use libm::erfc;

const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// Standard normal PDF.
#[inline]
pub(crate) fn norm_pdf(x: f64) -> f64 {
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Standard normal CDF.
#[inline]
pub(crate) fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / core::f64::consts::SQRT_2)
}

/// `ln Φ(x)`, accurate in the far left tail where `Φ(x)` underflows.
pub(crate) fn log_norm_cdf(x: f64) -> f64 {
    if x > -20.0 {
        return norm_cdf(x).max(f64::MIN_POSITIVE).ln();
    }
    // Asymptotic expansion: Φ(x) ≈ φ(x)/(-x) (1 - 1/x² + 3/x⁴ - 15/x⁶)
    let x2 = x * x;
    -0.5 * x2 - (-x).ln() - 0.5 * (core::f64::consts::TAU).ln()
        + (1.0 - 1.0 / x2 + 3.0 / (x2 * x2) - 15.0 / (x2 * x2 * x2)).ln()
}

/// Inverse Mills ratio `φ(x)/Φ(x)`, stable for large negative `x`.
pub(crate) fn mills_ratio(x: f64) -> f64 {
    if x > -20.0 {
        norm_pdf(x) / norm_cdf(x).max(f64::MIN_POSITIVE)
    } else {
        (norm_pdf(x).ln() - log_norm_cdf(x)).exp()
    }
}

/// Moments of `N(mean, var)` truncated to `(-inf, upper]`.
///
/// Returns `(mean, var)` of the truncated distribution.
pub(crate) fn truncated_above(mean: f64, var: f64, upper: f64) -> (f64, f64) {
    let sd = var.max(1e-300).sqrt();
    let beta = (upper - mean) / sd;
    let r = mills_ratio(beta);
    let m = mean - sd * r;
    let v = var * (1.0 - beta * r - r * r).max(1e-10);
    (m, v)
}

/// Moments of `N(mean, var)` truncated to `[lower, inf)`.
pub(crate) fn truncated_below(mean: f64, var: f64, lower: f64) -> (f64, f64) {
    let (m, v) = truncated_above(-mean, var, -lower);
    (-m, v)
}
