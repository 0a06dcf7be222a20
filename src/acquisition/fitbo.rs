//! Fast information-theoretic Bayesian optimization.

use nalgebra::DVector;

use super::max_value::gumbel_samples;
use super::{Acquisition, AcquisitionContext, Proposal, maximize_score};
use crate::error::Result;

/// FITBO with Gumbel samples of the offset `η`.
///
/// For each `η` the square-root warp `g = sqrt(2(η - y))` is fitted with the
/// cached inverse Gram matrix, and `f = η - ½ g²` is moment-matched to a
/// Gaussian: mean `η - ½(μ_g² + σ_g²)`, variance `½σ_g⁴ + μ_g²σ_g²`. The
/// score is the entropy of the moment-matched mixture over `η` minus the
/// mean entropy of its components.
#[derive(Clone, Copy, Debug, Default)]
pub struct Fitbo;

/// `½ ln` of the mixture variance minus the mean `½ ln` of component variances.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn mixture_entropy_gap(components: &[(f64, f64)], noise: f64) -> f64 {
    if components.is_empty() {
        return 0.0;
    }
    let n = components.len() as f64;
    let mean = components.iter().map(|(m, _)| m).sum::<f64>() / n;
    let second = components.iter().map(|(m, v)| v + m * m).sum::<f64>() / n;
    let mixture_var = (second - mean * mean).max(0.0);
    let component_entropy = components
        .iter()
        .map(|(_, v)| 0.5 * (v + noise).ln())
        .sum::<f64>()
        / n;
    0.5 * (mixture_var + noise).ln() - component_entropy
}

impl Acquisition for Fitbo {
    #[allow(clippy::cast_precision_loss)]
    fn propose(&self, ctx: &AcquisitionContext<'_>, rng: &mut fastrand::Rng) -> Result<Proposal> {
        let state = ctx.state;
        let targets = state.modeled_values();
        // (η, K⁻¹ g) per hyperparameter sample
        let warped: Vec<Vec<(f64, DVector<f64>)>> = gumbel_samples(ctx, rng)
            .into_iter()
            .enumerate()
            .map(|(m, etas)| {
                etas.into_iter()
                    .filter_map(|eta| {
                        let g = targets.map(|y| (2.0 * (eta - y)).max(0.0).sqrt());
                        state.inverse_gram(m).map(|inv| (eta, inv * g))
                    })
                    .collect()
            })
            .collect();

        let score = |x: &[f64]| -> f64 {
            let mut total = 0.0;
            for (m, warps) in warped.iter().enumerate() {
                let k_x = state.cross_covariance(m, x);
                let (_, var) = state.predict_from_cov(m, &k_x);
                let components: Vec<(f64, f64)> = warps
                    .iter()
                    .map(|(eta, alpha_g)| {
                        let mean_g = k_x.dot(alpha_g);
                        let f_mean = eta - 0.5 * (mean_g * mean_g + var);
                        let f_var = 0.5 * var * var + mean_g * mean_g * var;
                        (f_mean, f_var)
                    })
                    .collect();
                total += mixture_entropy_gap(&components, ctx.noise(m));
            }
            total / state.n_samples().max(1) as f64
        };
        maximize_score(ctx, rng, &score)
    }
}
