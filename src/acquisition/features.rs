//! Approximate posterior function draws from random Fourier features.
//!
//! A squared-exponential kernel with lengthscales `ℓ` and amplitude `σ_f²`
//! is approximated by `M` features
//! `φ_j(x) = sqrt(2σ_f²/M) cos(w_j·x + b_j)` with `w_j ~ N(0, diag(ℓ⁻²))`
//! and `b_j ~ U(0, 2π)`. A prior draw `f = φᵀθ`, `θ ~ N(0, I)`, is moved to
//! the posterior by pathwise conditioning:
//! `θ ← θ + Φᵀ(ΦΦᵀ + σ_n² I)⁻¹(y - Φθ - ε)`, `ε ~ N(0, σ_n² I)`.

use nalgebra::linalg::Cholesky;
use nalgebra::{DMatrix, DVector};

use super::AcquisitionContext;
use crate::error::{Error, Result};
use crate::rng_util::{f64_range, standard_normal};
use crate::surrogate::SurrogateState;
use crate::surrogate::kernel::JITTER;

/// One approximate posterior sample of the latent function, in modeling units.
#[derive(Clone, Debug)]
pub struct FunctionSample {
    /// `M × d` frequencies.
    w: DMatrix<f64>,
    /// Phases.
    b: DVector<f64>,
    /// Feature weights.
    theta: DVector<f64>,
    /// `sqrt(2σ_f²/M)`.
    amplitude: f64,
}

impl FunctionSample {
    /// Draws a posterior function sample under hyperparameter sample `m`.
    ///
    /// # Errors
    ///
    /// [`Error::NotPositiveDefinite`] if the feature-space system cannot be
    /// factorized.
    #[allow(clippy::cast_precision_loss)]
    pub fn draw(
        state: &SurrogateState,
        m: usize,
        n_features: usize,
        rng: &mut fastrand::Rng,
    ) -> Result<Self> {
        let hp = &state.hyperparameters()[m];
        let d = state.dim();
        let n_features = n_features.max(1);
        let w = DMatrix::from_fn(n_features, d, |_, j| {
            standard_normal(rng) / hp.length_scales[j]
        });
        let b = DVector::from_fn(n_features, |_, _| {
            f64_range(rng, 0.0, core::f64::consts::TAU)
        });
        let theta = DVector::from_fn(n_features, |_, _| standard_normal(rng));
        let mut sample = Self {
            w,
            b,
            theta,
            amplitude: (2.0 * hp.signal_variance / n_features as f64).sqrt(),
        };

        let points = state.points();
        if points.is_empty() {
            return Ok(sample);
        }
        let n = points.len();
        let phi = DMatrix::from_fn(n, n_features, |i, j| sample.feature(j, &points[i]));
        let noise = hp.noise_variance;
        let y = DVector::from_column_slice(&state.current_targets());
        let eps = DVector::from_fn(n, |_, _| noise.sqrt() * standard_normal(rng));
        let residual = y - &phi * &sample.theta - eps;

        let mut system = &phi * phi.transpose();
        for i in 0..n {
            system[(i, i)] += noise + JITTER;
        }
        let chol = Cholesky::new(system).ok_or(Error::NotPositiveDefinite { sample: m })?;
        sample.theta += phi.transpose() * chol.solve(&residual);
        Ok(sample)
    }

    fn phase(&self, j: usize, x: &[f64]) -> f64 {
        self.w
            .row(j)
            .iter()
            .zip(x)
            .map(|(w, xi)| w * xi)
            .sum::<f64>()
            + self.b[j]
    }

    fn feature(&self, j: usize, x: &[f64]) -> f64 {
        self.amplitude * self.phase(j, x).cos()
    }

    /// Sampled function value at `x`.
    #[must_use]
    pub fn value(&self, x: &[f64]) -> f64 {
        (0..self.theta.len())
            .map(|j| self.theta[j] * self.feature(j, x))
            .sum()
    }

    /// Gradient of [`value`](Self::value) at `x`.
    #[must_use]
    pub fn gradient(&self, x: &[f64]) -> Vec<f64> {
        let mut grad = vec![0.0; x.len()];
        for j in 0..self.theta.len() {
            let coef = -self.theta[j] * self.amplitude * self.phase(j, x).sin();
            for (g, w) in grad.iter_mut().zip(self.w.row(j).iter()) {
                *g += coef * w;
            }
        }
        grad
    }
}

/// `nK` sampled maximizers `(x*, y*)` for every hyperparameter sample.
pub(crate) fn sample_maxima(
    ctx: &AcquisitionContext<'_>,
    rng: &mut fastrand::Rng,
) -> Result<Vec<Vec<(Vec<f64>, f64)>>> {
    let seeds = ctx.all_seeds();
    let mut out = Vec::with_capacity(ctx.state.n_samples());
    for m in 0..ctx.state.n_samples() {
        let mut maxima = Vec::with_capacity(ctx.n_k);
        for _ in 0..ctx.n_k {
            let sample = FunctionSample::draw(ctx.state, m, ctx.n_features, rng)?;
            let f = |x: &[f64]| sample.value(x);
            let g = |x: &[f64]| sample.gradient(x);
            maxima.push(ctx.optimizer.maximize(&f, Some(&g), ctx.domain, &seeds, rng)?);
        }
        out.push(maxima);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surrogate::Hyperparameters;
    use crate::surrogate::kernel::CholeskyGram;

    fn state() -> SurrogateState {
        let mut s = SurrogateState::new(1, false);
        for (x, y) in [(0.1, 1.0), (0.5, -0.5), (0.9, 0.7)] {
            s.append(vec![x], y).unwrap();
        }
        s.set_hyperparameters(vec![Hyperparameters::new(vec![0.2], 1.0, 1e-4)]);
        s.rebuild_caches(&CholeskyGram).unwrap();
        s
    }

    #[test]
    fn posterior_draws_pass_near_data() {
        let s = state();
        let mut rng = fastrand::Rng::with_seed(21);
        for _ in 0..5 {
            let f = FunctionSample::draw(&s, 0, 2000, &mut rng).unwrap();
            for (x, y) in s.points().iter().zip(s.values()) {
                assert!((f.value(x) - y).abs() < 0.1, "f({x:?}) = {}", f.value(x));
            }
        }
    }

    #[test]
    fn draws_average_to_posterior_mean() {
        let s = state();
        let mut rng = fastrand::Rng::with_seed(22);
        let x = [0.3];
        let n = 200;
        let avg = (0..n)
            .map(|_| FunctionSample::draw(&s, 0, 500, &mut rng).unwrap().value(&x))
            .sum::<f64>()
            / f64::from(n);
        let (mean, var) = s.predict_sample(0, &x);
        assert!((avg - mean).abs() < 4.0 * (var / f64::from(n)).sqrt() + 0.05);
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let s = state();
        let mut rng = fastrand::Rng::with_seed(23);
        let f = FunctionSample::draw(&s, 0, 100, &mut rng).unwrap();
        let h = 1e-6;
        let fd = (f.value(&[0.4 + h]) - f.value(&[0.4 - h])) / (2.0 * h);
        assert!((f.gradient(&[0.4])[0] - fd).abs() < 1e-4);
    }
}
