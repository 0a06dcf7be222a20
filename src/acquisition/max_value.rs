//! Max-value entropy search and the Gumbel approximation of `p(y*)`.

use super::features::sample_maxima;
use super::{Acquisition, AcquisitionContext, Proposal, maximize_score};
use crate::error::Result;
use crate::normal::{log_norm_cdf, mills_ratio};
use crate::rng_util::gumbel_unit;

/// Random grid points per input dimension for the Gumbel fit.
const GRID_PER_DIM: usize = 100;
/// Bisection iterations when locating a quantile.
const BISECTION_STEPS: usize = 60;
/// Samples are kept at least this many noise deviations above the best target.
const NOISE_MARGIN: f64 = 5.0;
/// Predictive deviations below which a point carries no information.
const MIN_SD: f64 = 1e-10;

/// Where the `y*` samples come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaxValueSource {
    /// Gumbel fit of `Pr[y* < y]` (`MES-R`).
    Gumbel,
    /// Maxima of sampled posterior functions (`MES-G`).
    SampledFunctions,
}

/// Max-value entropy search.
///
/// Score per hyperparameter sample:
/// `mean_k [γ φ(γ) / (2 Φ(γ)) - ln Φ(γ)]` with `γ = (y*_k - μ(x)) / σ(x)`.
#[derive(Clone, Copy, Debug)]
pub struct MaxValueEntropySearch {
    source: MaxValueSource,
}

impl MaxValueEntropySearch {
    /// Creates the strategy for a sample source.
    #[must_use]
    pub fn new(source: MaxValueSource) -> Self {
        Self { source }
    }
}

impl Acquisition for MaxValueEntropySearch {
    fn propose(&self, ctx: &AcquisitionContext<'_>, rng: &mut fastrand::Rng) -> Result<Proposal> {
        let y_stars = match self.source {
            MaxValueSource::Gumbel => gumbel_samples(ctx, rng),
            MaxValueSource::SampledFunctions => sample_maxima(ctx, rng)?
                .into_iter()
                .map(|maxima| maxima.into_iter().map(|(_, y)| y).collect())
                .collect(),
        };
        let score = |x: &[f64]| {
            super::sample_average(ctx.state, x, |m, mean, var| {
                mes_score(mean, var.sqrt(), &y_stars[m])
            })
        };
        maximize_score(ctx, rng, &score)
    }
}

/// Per-sample MES score for a set of max values.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn mes_score(mean: f64, sd: f64, y_stars: &[f64]) -> f64 {
    if sd < MIN_SD || y_stars.is_empty() {
        return 0.0;
    }
    let total: f64 = y_stars
        .iter()
        .map(|y| {
            let gamma = (y - mean) / sd;
            0.5 * gamma * mills_ratio(gamma) - log_norm_cdf(gamma)
        })
        .sum();
    total / y_stars.len() as f64
}

/// `nK` Gumbel max-value samples for every hyperparameter sample, in
/// modeling units.
///
/// The distribution of `y*` is approximated by
/// `Pr[y* < y] ≈ Π_j Φ((y - μ_j) / σ_j)` over a random grid plus the data
/// points. Its quartiles fix a Gumbel location `a` and scale `b`, and each
/// sample is lifted to at least `y⁺ + 5 σ_n`.
pub(crate) fn gumbel_samples(
    ctx: &AcquisitionContext<'_>,
    rng: &mut fastrand::Rng,
) -> Vec<Vec<f64>> {
    let state = ctx.state;
    let mut grid: Vec<Vec<f64>> = (0..GRID_PER_DIM * ctx.domain.dim())
        .map(|_| ctx.domain.sample(rng))
        .collect();
    grid.extend(state.points().iter().cloned());
    let y_best = state.best_modeled();

    (0..state.n_samples())
        .map(|m| {
            let moments: Vec<(f64, f64)> = grid
                .iter()
                .map(|x| {
                    let (mean, var) = state.predict_sample(m, x);
                    (mean, var.sqrt().max(MIN_SD))
                })
                .collect();
            let (a, b) = fit_gumbel(&moments);
            let floor = y_best + NOISE_MARGIN * ctx.noise(m).sqrt();
            (0..ctx.n_k)
                .map(|_| (a + b * gumbel_unit(rng)).max(floor))
                .collect()
        })
        .collect()
}

/// Location and scale of the Gumbel fit to `Π Φ((y - μ_j)/σ_j)`.
pub(crate) fn fit_gumbel(moments: &[(f64, f64)]) -> (f64, f64) {
    let log_cdf = |y: f64| -> f64 {
        moments
            .iter()
            .map(|(mean, sd)| log_norm_cdf((y - mean) / sd))
            .sum()
    };
    let top = moments.iter().map(|(m, _)| *m).fold(f64::NEG_INFINITY, f64::max);
    let spread = moments.iter().map(|(_, s)| *s).fold(MIN_SD, f64::max);

    let quantile = |p: f64| -> f64 {
        let target = p.ln();
        let mut lo = top - 5.0 * spread;
        let mut hi = top + 5.0 * spread;
        for _ in 0..BISECTION_STEPS {
            if log_cdf(lo) < target {
                break;
            }
            lo -= 5.0 * spread;
        }
        for _ in 0..BISECTION_STEPS {
            if log_cdf(hi) > target {
                break;
            }
            hi += 5.0 * spread;
        }
        for _ in 0..BISECTION_STEPS {
            let mid = 0.5 * (lo + hi);
            if log_cdf(mid) < target {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    };

    let q25 = quantile(0.25);
    let q50 = quantile(0.5);
    let q75 = quantile(0.75);
    let denom = 4.0_f64.ln().ln() - (4.0_f64 / 3.0).ln().ln();
    let b = ((q75 - q25) / denom).max(MIN_SD);
    let a = q50 + b * 2.0_f64.ln().ln();
    (a, b)
}
