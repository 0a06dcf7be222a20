//! Global maximization of a scalar function over the box domain.
//!
//! Used for acquisition maximization, for the posterior-mean maximization
//! that produces incumbents, and for maximizing sampled functions in the
//! entropy-search strategies.

use crate::domain::Domain;
use crate::error::{Error, Result};

/// Scalar objective passed to a [`GlobalOptimizer`].
pub type ScalarFn<'a> = dyn Fn(&[f64]) -> f64 + 'a;
/// Gradient of a [`ScalarFn`].
pub type GradientFn<'a> = dyn Fn(&[f64]) -> Vec<f64> + 'a;

/// Maximizes a function over a [`Domain`].
pub trait GlobalOptimizer {
    /// Returns `(argmax, max)`.
    ///
    /// `seeds` are extra starting points (e.g. previous incumbents) that
    /// must be considered alongside whatever the optimizer draws itself.
    /// When `grad` is `None` the optimizer differentiates numerically.
    ///
    /// # Errors
    ///
    /// [`Error::Internal`] when `f` is non-finite everywhere it was probed.
    fn maximize(
        &self,
        f: &ScalarFn<'_>,
        grad: Option<&GradientFn<'_>>,
        domain: &Domain,
        seeds: &[Vec<f64>],
        rng: &mut fastrand::Rng,
    ) -> Result<(Vec<f64>, f64)>;
}

/// Default number of uniform random probes.
const DEFAULT_N_RANDOM: usize = 500;
/// Default number of local refinements.
const DEFAULT_N_RESTARTS: usize = 5;
/// Default iteration cap per refinement.
const DEFAULT_MAX_ITERS: usize = 60;

/// Random multi-start search refined by projected gradient ascent.
///
/// 1. Evaluate `f` at every seed and at `n_random` uniform points.
/// 2. Take the best `n_restarts` of them.
/// 3. Climb from each with normalized gradient steps projected onto the
///    box, doubling the step after a success and halving after a failure.
/// 4. Return the best point found.
///
/// # Examples
///
/// ```
/// use bayesopt::Domain;
/// use bayesopt::optimize::{GlobalOptimizer, MultiStartOptimizer};
///
/// let domain = Domain::new(vec![-2.0], vec![2.0]).unwrap();
/// let mut rng = fastrand::Rng::with_seed(0);
/// let f = |x: &[f64]| -(x[0] - 0.7).powi(2);
/// let (x, v) = MultiStartOptimizer::default()
///     .maximize(&f, None, &domain, &[], &mut rng)
///     .unwrap();
/// assert!((x[0] - 0.7).abs() < 1e-3);
/// assert!(v <= 0.0);
/// ```
#[derive(Clone, Debug)]
pub struct MultiStartOptimizer {
    n_random: usize,
    n_restarts: usize,
    max_iters: usize,
}

impl Default for MultiStartOptimizer {
    fn default() -> Self {
        Self {
            n_random: DEFAULT_N_RANDOM,
            n_restarts: DEFAULT_N_RESTARTS,
            max_iters: DEFAULT_MAX_ITERS,
        }
    }
}

impl MultiStartOptimizer {
    /// Creates an optimizer with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of uniform random probes.
    ///
    /// Default: 500.
    #[must_use]
    pub fn n_random(mut self, n: usize) -> Self {
        self.n_random = n;
        self
    }

    /// Sets how many of the best probes are refined.
    ///
    /// Default: 5.
    #[must_use]
    pub fn n_restarts(mut self, n: usize) -> Self {
        self.n_restarts = n.max(1);
        self
    }

    /// Sets the iteration cap per refinement.
    ///
    /// Default: 60.
    #[must_use]
    pub fn max_iters(mut self, n: usize) -> Self {
        self.max_iters = n;
        self
    }

    fn climb(
        &self,
        f: &ScalarFn<'_>,
        grad: &GradientFn<'_>,
        domain: &Domain,
        start: Vec<f64>,
        f_start: f64,
    ) -> (Vec<f64>, f64) {
        let mut x = start;
        let mut fx = f_start;
        let mut step = 0.05 * domain.diameter();
        let min_step = 1e-9 * domain.diameter();

        for _ in 0..self.max_iters {
            let g = grad(&x);
            let norm = g.iter().map(|v| v * v).sum::<f64>().sqrt();
            if !norm.is_finite() || norm < 1e-12 {
                break;
            }
            let mut improved = false;
            while step > min_step {
                let cand: Vec<f64> = x
                    .iter()
                    .zip(&g)
                    .map(|(xi, gi)| xi + step * gi / norm)
                    .collect();
                let cand = domain.clamp(&cand);
                let fc = finite_or_neg_inf(f(&cand));
                if fc > fx {
                    x = cand;
                    fx = fc;
                    step *= 2.0;
                    improved = true;
                    break;
                }
                step *= 0.5;
            }
            if !improved {
                break;
            }
        }
        (x, fx)
    }
}

impl GlobalOptimizer for MultiStartOptimizer {
    fn maximize(
        &self,
        f: &ScalarFn<'_>,
        grad: Option<&GradientFn<'_>>,
        domain: &Domain,
        seeds: &[Vec<f64>],
        rng: &mut fastrand::Rng,
    ) -> Result<(Vec<f64>, f64)> {
        let mut probes: Vec<(Vec<f64>, f64)> = Vec::with_capacity(seeds.len() + self.n_random);
        for seed in seeds {
            let x = domain.clamp(seed);
            let v = finite_or_neg_inf(f(&x));
            probes.push((x, v));
        }
        for _ in 0..self.n_random {
            let x = domain.sample(rng);
            let v = finite_or_neg_inf(f(&x));
            probes.push((x, v));
        }
        // Always probe at least one point
        if probes.is_empty() {
            let x = domain.sample(rng);
            let v = finite_or_neg_inf(f(&x));
            probes.push((x, v));
        }

        probes.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(core::cmp::Ordering::Equal));
        probes.truncate(self.n_restarts);

        let numeric = |x: &[f64]| numeric_gradient(f, x, domain);
        let grad: &GradientFn<'_> = match grad {
            Some(g) => g,
            None => &numeric,
        };

        let mut best: Option<(Vec<f64>, f64)> = None;
        for (x, v) in probes {
            let (x, v) = if v.is_finite() {
                self.climb(f, grad, domain, x, v)
            } else {
                (x, v)
            };
            if best.as_ref().is_none_or(|(_, bv)| v > *bv) {
                best = Some((x, v));
            }
        }

        match best {
            Some((x, v)) if v.is_finite() => Ok((x, v)),
            _ => Err(Error::Internal("objective non-finite at every probe")),
        }
    }
}

#[inline]
fn finite_or_neg_inf(v: f64) -> f64 {
    if v.is_finite() { v } else { f64::NEG_INFINITY }
}

/// Central-difference gradient of `f` at `x`, one-sided at the box faces.
#[must_use]
pub fn numeric_gradient(f: &ScalarFn<'_>, x: &[f64], domain: &Domain) -> Vec<f64> {
    let mut grad = Vec::with_capacity(x.len());
    let mut probe = x.to_vec();
    for j in 0..x.len() {
        let (lo, hi) = (domain.lower()[j], domain.upper()[j]);
        let h = 1e-6 * (hi - lo);
        let up = (x[j] + h).min(hi);
        let down = (x[j] - h).max(lo);
        probe[j] = up;
        let f_up = f(&probe);
        probe[j] = down;
        let f_down = f(&probe);
        probe[j] = x[j];
        let span = up - down;
        grad.push(if span > 0.0 { (f_up - f_down) / span } else { 0.0 });
    }
    grad
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> Domain {
        Domain::new(vec![-1.0, -1.0], vec![1.0, 1.0]).unwrap()
    }

    #[test]
    fn finds_interior_maximum() {
        let f = |x: &[f64]| -((x[0] - 0.3).powi(2) + (x[1] + 0.4).powi(2));
        let mut rng = fastrand::Rng::with_seed(3);
        let (x, _) = MultiStartOptimizer::new()
            .maximize(&f, None, &domain(), &[], &mut rng)
            .unwrap();
        assert!((x[0] - 0.3).abs() < 1e-3, "x0 = {}", x[0]);
        assert!((x[1] + 0.4).abs() < 1e-3, "x1 = {}", x[1]);
    }

    #[test]
    fn respects_box_for_boundary_maximum() {
        let f = |x: &[f64]| x[0] + 2.0 * x[1];
        let g = |_: &[f64]| vec![1.0, 2.0];
        let mut rng = fastrand::Rng::with_seed(4);
        let (x, v) = MultiStartOptimizer::new()
            .n_random(20)
            .maximize(&f, Some(&g), &domain(), &[], &mut rng)
            .unwrap();
        assert!(domain().contains(&x));
        assert!((v - 3.0).abs() < 1e-6);
    }

    #[test]
    fn seeds_are_considered() {
        // Narrow spike that random probing would almost surely miss.
        let f = |x: &[f64]| {
            let d = (x[0] - 0.123).powi(2) + (x[1] - 0.456).powi(2);
            if d < 1e-10 { 1.0 } else { 0.0 }
        };
        let mut rng = fastrand::Rng::with_seed(5);
        let (x, v) = MultiStartOptimizer::new()
            .n_random(10)
            .maximize(&f, None, &domain(), &[vec![0.123, 0.456]], &mut rng)
            .unwrap();
        assert!((v - 1.0).abs() < f64::EPSILON);
        assert_eq!(x, vec![0.123, 0.456]);
    }

    #[test]
    fn all_nan_is_an_error() {
        let f = |_: &[f64]| f64::NAN;
        let mut rng = fastrand::Rng::with_seed(6);
        let res = MultiStartOptimizer::new()
            .n_random(5)
            .maximize(&f, None, &domain(), &[], &mut rng);
        assert!(matches!(res, Err(Error::Internal(_))));
    }

    #[test]
    fn numeric_gradient_of_quadratic() {
        let f = |x: &[f64]| x[0] * x[0] + 3.0 * x[1];
        let g = numeric_gradient(&f, &[0.5, 0.0], &domain());
        assert!((g[0] - 1.0).abs() < 1e-5);
        assert!((g[1] - 3.0).abs() < 1e-5);
        // One-sided at the face
        let g = numeric_gradient(&f, &[1.0, 1.0], &domain());
        assert!((g[0] - 2.0).abs() < 1e-4);
    }
}
