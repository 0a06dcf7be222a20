//! Joint entropy search over `(x*, y*)`.

use nalgebra::DVector;

use super::features::sample_maxima;
use super::{Acquisition, AcquisitionContext, Proposal, maximize_score};
use crate::error::Result;
use crate::normal::truncated_above;
use crate::surrogate::SurrogateState;
use crate::surrogate::kernel::{JITTER, sq_exp};

/// Entropy reduction of `y(x)` from learning a sampled optimum `(x*, y*)`.
///
/// For every sampled pair the GP is conditioned on the noise-free
/// pseudo-observation `f(x*) = y*`, and the resulting predictive is
/// truncated above at `y*`. The score is
/// `½ ln(σ² + σ_n²) - mean_k ½ ln(σ_k² + σ_n²)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JointEntropySearch;

/// Per-optimum quantities that do not depend on the candidate.
pub(crate) struct OptimumCache {
    pub(crate) x_star: Vec<f64>,
    pub(crate) y_star: f64,
    /// `K⁻¹ k(X, x*)`.
    pub(crate) k_inv_k: DVector<f64>,
    /// Posterior mean at `x*`.
    pub(crate) mean: f64,
    /// Posterior variance at `x*`.
    pub(crate) var: f64,
}

impl OptimumCache {
    pub(crate) fn new(
        ctx: &AcquisitionContext<'_>,
        m: usize,
        x_star: Vec<f64>,
        y_star: f64,
    ) -> Option<Self> {
        let k = ctx.state.cross_covariance(m, &x_star);
        let (mean, var) = ctx.state.predict_from_cov(m, &k);
        let k_inv_k = ctx.state.inverse_gram(m)? * &k;
        Some(Self {
            x_star,
            y_star,
            k_inv_k,
            mean,
            var: var + JITTER,
        })
    }

    /// Posterior covariance between `f(x)` and `f(x*)`.
    pub(crate) fn covariance(
        &self,
        state: &SurrogateState,
        m: usize,
        x: &[f64],
        k_x: &DVector<f64>,
    ) -> f64 {
        sq_exp(x, &self.x_star, &state.hyperparameters()[m]) - k_x.dot(&self.k_inv_k)
    }
}

pub(crate) fn optimum_caches(
    ctx: &AcquisitionContext<'_>,
    maxima: Vec<Vec<(Vec<f64>, f64)>>,
) -> Vec<Vec<OptimumCache>> {
    maxima
        .into_iter()
        .enumerate()
        .map(|(m, pairs)| {
            pairs
                .into_iter()
                .filter_map(|(x, y)| OptimumCache::new(ctx, m, x, y))
                .collect()
        })
        .collect()
}

impl Acquisition for JointEntropySearch {
    #[allow(clippy::cast_precision_loss)]
    fn propose(&self, ctx: &AcquisitionContext<'_>, rng: &mut fastrand::Rng) -> Result<Proposal> {
        let optima = optimum_caches(ctx, sample_maxima(ctx, rng)?);
        let state = ctx.state;
        let score = |x: &[f64]| -> f64 {
            let n_m = state.n_samples();
            let mut total = 0.0;
            for (m, optima) in optima.iter().enumerate() {
                let noise = ctx.noise(m);
                let k_x = state.cross_covariance(m, x);
                let (mean, var) = state.predict_from_cov(m, &k_x);
                if optima.is_empty() {
                    continue;
                }
                let conditioned: f64 = optima
                    .iter()
                    .map(|opt| {
                        let c = opt.covariance(state, m, x, &k_x);
                        let mean_c = mean + c / opt.var * (opt.y_star - opt.mean);
                        let var_c = (var - c * c / opt.var).max(0.0);
                        let (_, var_t) = truncated_above(mean_c, var_c, opt.y_star);
                        0.5 * (var_t + noise).ln()
                    })
                    .sum::<f64>()
                    / optima.len() as f64;
                total += 0.5 * (var + noise).ln() - conditioned;
            }
            total / n_m.max(1) as f64
        };
        maximize_score(ctx, rng, &score)
    }
}
