//! Predictive entropy search.

use super::features::sample_maxima;
use super::joint::optimum_caches;
use super::{Acquisition, AcquisitionContext, Proposal, maximize_score};
use crate::error::Result;
use crate::normal::{mills_ratio, truncated_below};

/// Minimum variance kept after moment matching.
const MIN_VAR: f64 = 1e-10;

/// Predictive entropy search with sampled maximizers `x*`.
///
/// For each sampled `x*` the posterior of `f(x*)` is moment-matched under
/// `f(x*) ≥ y⁺` and propagated to `f(x)`. The constraint `f(x) ≤ f(x*)` is
/// then moment-matched on the bivariate Gaussian. The score is
/// `½ ln(σ² + σ_n²) - mean_k ½ ln(σ_k² + σ_n²)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PredictiveEntropySearch;

/// Variance of `f(x)` after the two moment-matching steps.
///
/// `var` and `cov` are the posterior variance of `f(x)` and its covariance
/// with `f(x*)`; `star_mean` and `star_var` are the posterior moments of
/// `f(x*)`.
pub(crate) fn constrained_variance(
    mean: f64,
    var: f64,
    cov: f64,
    star_mean: f64,
    star_var: f64,
    y_best: f64,
) -> f64 {
    // f(x*) >= y⁺
    let (star_mean_t, star_var_t) = truncated_below(star_mean, star_var, y_best);
    let gain = cov / star_var;
    let mean_x = mean + gain * (star_mean_t - star_mean);
    let var_x = (var - gain * cov + gain * gain * star_var_t).max(0.0);
    let cov_t = gain * star_var_t;

    // f(x) <= f(x*)
    let var_d = (star_var_t + var_x - 2.0 * cov_t).max(MIN_VAR);
    let z = (star_mean_t - mean_x) / var_d.sqrt();
    let r = mills_ratio(z);
    let shrink = (var_x - cov_t).powi(2) / var_d * r * (z + r);
    (var_x - shrink).max(MIN_VAR)
}

impl Acquisition for PredictiveEntropySearch {
    #[allow(clippy::cast_precision_loss)]
    fn propose(&self, ctx: &AcquisitionContext<'_>, rng: &mut fastrand::Rng) -> Result<Proposal> {
        let optima = optimum_caches(ctx, sample_maxima(ctx, rng)?);
        let state = ctx.state;
        let y_best = state.best_modeled();
        let score = |x: &[f64]| -> f64 {
            let mut total = 0.0;
            for (m, optima) in optima.iter().enumerate() {
                if optima.is_empty() {
                    continue;
                }
                let noise = ctx.noise(m);
                let k_x = state.cross_covariance(m, x);
                let (mean, var) = state.predict_from_cov(m, &k_x);
                let constrained: f64 = optima
                    .iter()
                    .map(|opt| {
                        let cov = opt.covariance(state, m, x, &k_x);
                        let v = constrained_variance(mean, var, cov, opt.mean, opt.var, y_best);
                        0.5 * (v + noise).ln()
                    })
                    .sum::<f64>()
                    / optima.len() as f64;
                total += 0.5 * (var + noise).ln() - constrained;
            }
            total / state.n_samples().max(1) as f64
        };
        maximize_score(ctx, rng, &score)
    }
}
