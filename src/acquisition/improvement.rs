//! Improvement-based and confidence-bound strategies.
//!
//! None of these report an acquisition value to the caller.

use super::max_value::gumbel_samples;
use super::{Acquisition, AcquisitionContext, Proposal, maximize_score, sample_average};
use crate::error::Result;
use crate::normal::{norm_cdf, norm_pdf};

const MIN_SD: f64 = 1e-12;

/// `E[max(f - target, 0)]` for `f ~ N(mean, sd²)`.
pub(crate) fn expected_improvement(mean: f64, sd: f64, target: f64) -> f64 {
    if sd < MIN_SD {
        return (mean - target).max(0.0);
    }
    let z = (mean - target) / sd;
    (mean - target) * norm_cdf(z) + sd * norm_pdf(z)
}

/// `Pr[f > target]` for `f ~ N(mean, sd²)`.
pub(crate) fn probability_of_improvement(mean: f64, sd: f64, target: f64) -> f64 {
    if sd < MIN_SD {
        return if mean > target { 1.0 } else { 0.0 };
    }
    norm_cdf((mean - target) / sd)
}

/// Expected improvement over the best modeled observation.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExpectedImprovement;

impl Acquisition for ExpectedImprovement {
    fn propose(&self, ctx: &AcquisitionContext<'_>, rng: &mut fastrand::Rng) -> Result<Proposal> {
        let best = ctx.state.best_modeled();
        let score = |x: &[f64]| {
            sample_average(ctx.state, x, |_, mean, var| {
                expected_improvement(mean, var.sqrt(), best)
            })
        };
        maximize_score(ctx, rng, &score)
    }
}

/// Probability of improving on the best modeled observation.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProbabilityOfImprovement;

impl Acquisition for ProbabilityOfImprovement {
    fn propose(&self, ctx: &AcquisitionContext<'_>, rng: &mut fastrand::Rng) -> Result<Proposal> {
        let best = ctx.state.best_modeled();
        let score = |x: &[f64]| {
            sample_average(ctx.state, x, |_, mean, var| {
                probability_of_improvement(mean, var.sqrt(), best)
            })
        };
        maximize_score(ctx, rng, &score)
    }
}

/// `μ + beta_t σ`.
#[derive(Clone, Copy, Debug, Default)]
pub struct UpperConfidenceBound;

impl Acquisition for UpperConfidenceBound {
    fn propose(&self, ctx: &AcquisitionContext<'_>, rng: &mut fastrand::Rng) -> Result<Proposal> {
        let beta = ctx.beta;
        let score =
            |x: &[f64]| sample_average(ctx.state, x, |_, mean, var| mean + beta * var.sqrt());
        maximize_score(ctx, rng, &score)
    }
}

/// Expected improvement averaged over a set of sampled max values.
///
/// Each hyperparameter sample contributes `mean_k EI(x; y*_k)` with the
/// `y*_k` drawn from the Gumbel approximation of `p(y*)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExpectedSetImprovement;

impl Acquisition for ExpectedSetImprovement {
    #[allow(clippy::cast_precision_loss)]
    fn propose(&self, ctx: &AcquisitionContext<'_>, rng: &mut fastrand::Rng) -> Result<Proposal> {
        let y_stars = gumbel_samples(ctx, rng);
        let score = |x: &[f64]| {
            sample_average(ctx.state, x, |m, mean, var| {
                let sd = var.sqrt();
                let set = &y_stars[m];
                set.iter()
                    .map(|y| expected_improvement(mean, sd, *y))
                    .sum::<f64>()
                    / set.len().max(1) as f64
            })
        };
        maximize_score(ctx, rng, &score)
    }
}
