//! Squared-exponential ARD kernel and Gram-matrix inversion.

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};

use super::Hyperparameters;

/// Diagonal jitter added on top of the noise variance.
pub(crate) const JITTER: f64 = 1e-10;

/// Squared-exponential kernel with ARD lengthscales.
///
/// `k(a, b) = σ_f² exp(-½ Σ ((a_i - b_i) / ℓ_i)²)`
#[must_use]
#[inline]
pub fn sq_exp(a: &[f64], b: &[f64], hp: &Hyperparameters) -> f64 {
    let mut r_sq = 0.0;
    for ((ai, bi), l) in a.iter().zip(b).zip(&hp.length_scales) {
        let d = (ai - bi) / l;
        r_sq += d * d;
    }
    hp.signal_variance * (-0.5 * r_sq).exp()
}

/// Noisy Gram matrix `K + (σ_n² + jitter) I`.
#[must_use]
pub fn gram(x: &[Vec<f64>], hp: &Hyperparameters) -> DMatrix<f64> {
    let n = x.len();
    let diag = hp.noise_variance + JITTER;
    DMatrix::from_fn(n, n, |i, j| {
        let k = sq_exp(&x[i], &x[j], hp);
        if i == j { k + diag } else { k }
    })
}

/// Cross-covariance vector `k(x*, X)`.
#[must_use]
pub fn cross_cov(x_star: &[f64], x: &[Vec<f64>], hp: &Hyperparameters) -> DVector<f64> {
    DVector::from_fn(x.len(), |i, _| sq_exp(x_star, &x[i], hp))
}

/// Builds inverse Gram matrices for one hyperparameter sample.
///
/// The default implementation is [`CholeskyGram`]. Implementations must
/// return [`Error::NotPositiveDefinite`] rather than a garbage inverse when
/// the matrix cannot be factorized; the caller fills in the sample index.
pub trait GramBuilder {
    /// Returns `(K(x, x) + σ_n² I)⁻¹`.
    ///
    /// # Errors
    ///
    /// [`Error::NotPositiveDefinite`] when factorization fails.
    fn inverse_gram(&self, x: &[Vec<f64>], hp: &Hyperparameters) -> Result<DMatrix<f64>>;

    /// Extends `inverse` (for `x[..n-1]`) to the inverse for all of `x`.
    ///
    /// Uses the block (Schur complement) identity. Implementations may
    /// override this with a full rebuild.
    ///
    /// # Errors
    ///
    /// [`Error::NotPositiveDefinite`] when the Schur complement is not
    /// positive, [`Error::Internal`] when shapes disagree.
    fn extend_inverse(
        &self,
        inverse: &DMatrix<f64>,
        x: &[Vec<f64>],
        hp: &Hyperparameters,
    ) -> Result<DMatrix<f64>> {
        let n = x.len();
        if n == 0 || inverse.nrows() != n - 1 || inverse.ncols() != n - 1 {
            return Err(Error::Internal("extend_inverse: cache shape mismatch"));
        }
        let (old, new) = x.split_at(n - 1);
        let b = cross_cov(&new[0], old, hp);
        let c = hp.signal_variance + hp.noise_variance + JITTER;
        let v = inverse * &b;
        let s = c - b.dot(&v);
        if !(s > 0.0 && s.is_finite()) {
            return Err(Error::NotPositiveDefinite { sample: 0 });
        }
        let inv_s = 1.0 / s;
        let mut out = DMatrix::zeros(n, n);
        let top = inverse + (&v * v.transpose()) * inv_s;
        out.view_mut((0, 0), (n - 1, n - 1)).copy_from(&top);
        for i in 0..n - 1 {
            out[(i, n - 1)] = -v[i] * inv_s;
            out[(n - 1, i)] = -v[i] * inv_s;
        }
        out[(n - 1, n - 1)] = inv_s;
        Ok(out)
    }
}

/// Inverts the Gram matrix through its Cholesky factor.
#[derive(Clone, Copy, Debug, Default)]
pub struct CholeskyGram;

impl GramBuilder for CholeskyGram {
    fn inverse_gram(&self, x: &[Vec<f64>], hp: &Hyperparameters) -> Result<DMatrix<f64>> {
        let k = gram(x, hp);
        let chol = nalgebra::linalg::Cholesky::new(k)
            .ok_or(Error::NotPositiveDefinite { sample: 0 })?;
        Ok(chol.inverse())
    }
}
