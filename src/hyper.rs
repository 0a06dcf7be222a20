//! Hyperparameter samplers.
//!
//! The engine keeps `nM` hyperparameter samples ("particles") and refreshes
//! them wholesale on a fixed schedule. A [`HyperSampler`] produces one such
//! set from the current observations.
//!
//! [`SliceSampler`] draws from the GP hyperparameter posterior (log marginal
//! likelihood under a uniform prior on log-hyperparameters) with
//! coordinate-wise slice sampling. [`FixedHyperparameters`] always returns
//! the same sample and is useful for tests and for point-estimate runs.

use nalgebra::DVector;

use crate::domain::Domain;
use crate::error::Result;
use crate::surrogate::kernel::gram;
use crate::surrogate::{Hyperparameters, SurrogateState};

/// Produces a fresh hyperparameter sample set.
pub trait HyperSampler {
    /// Returns exactly `n_m` samples for the current observations.
    ///
    /// `previous` is the currently active set (empty before the first
    /// refresh) and may be used to warm-start a chain.
    ///
    /// # Errors
    ///
    /// Implementation-defined; the engine aborts the run on any error.
    fn sample(
        &self,
        state: &SurrogateState,
        domain: &Domain,
        n_m: usize,
        previous: &[Hyperparameters],
        rng: &mut fastrand::Rng,
    ) -> Result<Vec<Hyperparameters>>;
}

/// Returns `n_m` copies of one fixed sample.
#[derive(Clone, Debug)]
pub struct FixedHyperparameters(pub Hyperparameters);

impl HyperSampler for FixedHyperparameters {
    fn sample(
        &self,
        _state: &SurrogateState,
        _domain: &Domain,
        n_m: usize,
        _previous: &[Hyperparameters],
        _rng: &mut fastrand::Rng,
    ) -> Result<Vec<Hyperparameters>> {
        Ok(vec![self.0.clone(); n_m])
    }
}

/// Default number of discarded sweeps before collecting.
const DEFAULT_BURN_IN: usize = 40;
/// Default number of sweeps between collected samples.
const DEFAULT_THIN: usize = 3;
/// Cap on stepping-out and shrinkage iterations per coordinate.
const MAX_SLICE_STEPS: usize = 50;

/// Slice sampler over `(ln ℓ_1..ln ℓ_d, ln σ_f², ln σ_n²)`.
///
/// The prior is uniform on a box in log space:
///
/// | Parameter | Range |
/// |-----------|-------|
/// | `ℓ_j` | `[0.01 r_j, 2 r_j]`, `r_j` the domain width in dimension `j` |
/// | `σ_f²` | `[0.01 v, 100 v]`, `v` the target variance (1 when undefined) |
/// | `σ_n²` | `[1e-6 v, 0.1 v]` |
///
/// # Examples
///
/// ```
/// use bayesopt::hyper::SliceSampler;
///
/// let sampler = SliceSampler::new().burn_in(20).thin(2);
/// ```
#[derive(Clone, Debug)]
pub struct SliceSampler {
    burn_in: usize,
    thin: usize,
}

impl Default for SliceSampler {
    fn default() -> Self {
        Self {
            burn_in: DEFAULT_BURN_IN,
            thin: DEFAULT_THIN,
        }
    }
}

impl SliceSampler {
    /// Creates a sampler with default burn-in and thinning.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of discarded sweeps.
    ///
    /// Default: 40.
    #[must_use]
    pub fn burn_in(mut self, n: usize) -> Self {
        self.burn_in = n;
        self
    }

    /// Sets the number of sweeps between kept samples.
    ///
    /// Default: 3.
    #[must_use]
    pub fn thin(mut self, n: usize) -> Self {
        self.thin = n.max(1);
        self
    }
}

/// Log-space prior box and the data the likelihood needs.
struct Posterior<'a> {
    x: &'a [Vec<f64>],
    y: DVector<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Posterior<'_> {
    fn unpack(theta: &[f64]) -> Hyperparameters {
        let d = theta.len() - 2;
        Hyperparameters::new(
            theta[..d].iter().map(|v| v.exp()).collect(),
            theta[d].exp(),
            theta[d + 1].exp(),
        )
    }

    /// Unnormalized log posterior; `-inf` outside the prior box or when the
    /// Gram matrix cannot be factorized.
    fn log_density(&self, theta: &[f64]) -> f64 {
        let inside = theta
            .iter()
            .zip(self.lower.iter().zip(&self.upper))
            .all(|(t, (lo, hi))| (*lo..=*hi).contains(t));
        if !inside {
            return f64::NEG_INFINITY;
        }
        if self.x.is_empty() {
            return 0.0;
        }
        let hp = Self::unpack(theta);
        let Some(chol) = nalgebra::linalg::Cholesky::new(gram(self.x, &hp)) else {
            return f64::NEG_INFINITY;
        };
        let alpha = chol.solve(&self.y);
        let log_det: f64 = chol.l_dirty().diagonal().iter().map(|v| v.ln()).sum();
        -0.5 * self.y.dot(&alpha) - log_det
    }
}

impl SliceSampler {
    /// Updates coordinate `i` of `theta` in place.
    fn step(
        post: &Posterior<'_>,
        theta: &mut [f64],
        current: f64,
        i: usize,
        rng: &mut fastrand::Rng,
    ) -> f64 {
        let width = 0.25 * (post.upper[i] - post.lower[i]);
        let log_y = current + rng.f64().max(f64::MIN_POSITIVE).ln();
        let x0 = theta[i];

        let mut left = x0 - width * rng.f64();
        let mut right = left + width;
        let mut probe = theta.to_vec();
        let eval = |v: f64, probe: &mut Vec<f64>| {
            probe[i] = v;
            post.log_density(probe)
        };

        for _ in 0..MAX_SLICE_STEPS {
            if left < post.lower[i] || eval(left, &mut probe) <= log_y {
                break;
            }
            left -= width;
        }
        for _ in 0..MAX_SLICE_STEPS {
            if right > post.upper[i] || eval(right, &mut probe) <= log_y {
                break;
            }
            right += width;
        }
        left = left.max(post.lower[i]);
        right = right.min(post.upper[i]);

        for _ in 0..MAX_SLICE_STEPS {
            let cand = left + rng.f64() * (right - left);
            let lp = eval(cand, &mut probe);
            if lp > log_y {
                theta[i] = cand;
                return lp;
            }
            if cand < x0 {
                left = cand;
            } else {
                right = cand;
            }
        }
        current
    }
}

impl HyperSampler for SliceSampler {
    #[allow(clippy::cast_precision_loss)]
    fn sample(
        &self,
        state: &SurrogateState,
        domain: &Domain,
        n_m: usize,
        previous: &[Hyperparameters],
        rng: &mut fastrand::Rng,
    ) -> Result<Vec<Hyperparameters>> {
        let targets = state.current_targets();
        let n = targets.len();
        let v = if n > 1 {
            let mean = targets.iter().sum::<f64>() / n as f64;
            let var = targets.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            if var > 1e-12 { var } else { 1.0 }
        } else {
            1.0
        };

        let d = domain.dim();
        let mut lower = Vec::with_capacity(d + 2);
        let mut upper = Vec::with_capacity(d + 2);
        for (lo, hi) in domain.lower().iter().zip(domain.upper()) {
            let r = hi - lo;
            lower.push((0.01 * r).ln());
            upper.push((2.0 * r).ln());
        }
        lower.push((0.01 * v).ln());
        upper.push((100.0 * v).ln());
        lower.push((1e-6 * v).ln());
        upper.push((0.1 * v).ln());

        let post = Posterior {
            x: state.points(),
            y: DVector::from_vec(targets),
            lower,
            upper,
        };

        let mut theta: Vec<f64> = match previous.last() {
            Some(hp) if hp.length_scales.len() == d => hp
                .length_scales
                .iter()
                .map(|l| l.ln())
                .chain([hp.signal_variance.ln(), hp.noise_variance.ln()])
                .zip(post.lower.iter().zip(&post.upper))
                .map(|(t, (lo, hi))| t.clamp(*lo, *hi))
                .collect(),
            _ => post
                .lower
                .iter()
                .zip(&post.upper)
                .map(|(lo, hi)| 0.5 * (lo + hi))
                .collect(),
        };
        let mut lp = post.log_density(&theta);
        if !lp.is_finite() {
            // Mid-box start failed; fall back to large noise, which is always definite.
            let last = theta.len() - 1;
            theta[last] = post.upper[last];
            lp = post.log_density(&theta);
        }

        let sweep = |theta: &mut Vec<f64>, lp: &mut f64, rng: &mut fastrand::Rng| {
            for i in 0..theta.len() {
                *lp = Self::step(&post, theta, *lp, i, rng);
            }
        };

        for _ in 0..self.burn_in {
            sweep(&mut theta, &mut lp, rng);
        }
        let mut samples = Vec::with_capacity(n_m);
        for _ in 0..n_m {
            for _ in 0..self.thin {
                sweep(&mut theta, &mut lp, rng);
            }
            samples.push(Posterior::unpack(&theta));
        }
        trace_debug!(n_m, log_density = lp, "hyperparameters resampled");
        Ok(samples)
    }
}
