//! Gaussian-process surrogate state: observations, hyperparameter samples,
//! and the cached inverse Gram matrices that tie them together.
//!
//! The state is a "particle" model: every one of the `nM` hyperparameter
//! samples carries its own inverse Gram matrix, and posterior quantities are
//! either reported per sample or averaged across samples.
//!
//! # Cache discipline
//!
//! [`SurrogateState::append`] and [`SurrogateState::set_hyperparameters`]
//! both invalidate the caches. Anything that reads posterior quantities must
//! first check [`SurrogateState::ensure_fresh`]; the engine rebuilds the
//! caches right after every mutation so that check never fails in a
//! well-formed run.

pub mod kernel;

use nalgebra::{DMatrix, DVector};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use self::kernel::{GramBuilder, cross_cov};

/// One surrogate hyperparameter sample.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hyperparameters {
    /// Per-dimension lengthscales.
    pub length_scales: Vec<f64>,
    /// Kernel amplitude `σ_f²`.
    pub signal_variance: f64,
    /// Observation noise `σ_n²`.
    pub noise_variance: f64,
}

impl Hyperparameters {
    /// Creates a hyperparameter sample.
    #[must_use]
    pub fn new(length_scales: Vec<f64>, signal_variance: f64, noise_variance: f64) -> Self {
        Self {
            length_scales,
            signal_variance,
            noise_variance,
        }
    }
}

/// Per-sample cache entry.
#[derive(Clone, Debug)]
struct CacheEntry {
    inverse: DMatrix<f64>,
    /// `K⁻¹ y` for the modeled targets.
    alpha: DVector<f64>,
}

/// Observed data plus the `nM`-particle GP surrogate built on it.
#[derive(Clone, Debug)]
pub struct SurrogateState {
    dim: usize,
    normalize: bool,
    x: Vec<Vec<f64>>,
    y: Vec<f64>,
    hyper: Vec<Hyperparameters>,
    /// Bumped on every hyperparameter refresh.
    hyper_generation: u64,
    caches: Vec<CacheEntry>,
    /// Observation count and hyperparameter generation the caches were built for.
    cache_stamp: Option<(usize, u64)>,
    y_shift: f64,
    y_scale: f64,
    y_model: DVector<f64>,
}

impl SurrogateState {
    /// Creates an empty state for `dim`-dimensional inputs.
    #[must_use]
    pub fn new(dim: usize, normalize: bool) -> Self {
        Self {
            dim,
            normalize,
            x: Vec::new(),
            y: Vec::new(),
            hyper: Vec::new(),
            hyper_generation: 0,
            caches: Vec::new(),
            cache_stamp: None,
            y_shift: 0.0,
            y_scale: 1.0,
            y_model: DVector::zeros(0),
        }
    }

    /// Reserves room for `additional` observations.
    pub fn reserve(&mut self, additional: usize) {
        self.x.reserve(additional);
        self.y.reserve(additional);
    }

    /// Appends one observation and invalidates the caches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] for a point of the wrong length.
    pub fn append(&mut self, x: Vec<f64>, y: f64) -> Result<()> {
        if x.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                got: x.len(),
            });
        }
        self.x.push(x);
        self.y.push(y);
        Ok(())
    }

    /// Replaces the whole hyperparameter sample set and invalidates the caches.
    pub fn set_hyperparameters(&mut self, samples: Vec<Hyperparameters>) {
        self.hyper = samples;
        self.hyper_generation += 1;
    }

    /// Recomputes every cached inverse Gram matrix from scratch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] for a sample whose lengthscales
    /// do not match the input dimension and [`Error::GramShape`] for an
    /// inverse that is not `n×n`. Propagates [`Error::NotPositiveDefinite`]
    /// (with the failing sample index) and any other builder error.
    pub fn rebuild_caches(&mut self, builder: &dyn GramBuilder) -> Result<()> {
        for hp in &self.hyper {
            if hp.length_scales.len() != self.dim {
                return Err(Error::DimensionMismatch {
                    expected: self.dim,
                    got: hp.length_scales.len(),
                });
            }
        }
        let mut inverses = Vec::with_capacity(self.hyper.len());
        for (m, hp) in self.hyper.iter().enumerate() {
            let inv = builder
                .inverse_gram(&self.x, hp)
                .map_err(|e| with_sample(e, m))?;
            inverses.push(inv);
        }
        self.install(inverses)
    }

    /// Brings the caches up to date, extending them in place when exactly one
    /// observation was added under unchanged hyperparameters and `incremental`
    /// is set; otherwise performs a full rebuild.
    ///
    /// # Errors
    ///
    /// Same as [`rebuild_caches`](Self::rebuild_caches).
    pub fn refresh_caches(&mut self, builder: &dyn GramBuilder, incremental: bool) -> Result<()> {
        let extendable = matches!(
            self.cache_stamp,
            Some((n, generation)) if generation == self.hyper_generation && n + 1 == self.x.len()
        );
        if !(incremental && extendable) {
            return self.rebuild_caches(builder);
        }
        let mut inverses = Vec::with_capacity(self.hyper.len());
        for (m, (hp, entry)) in self.hyper.iter().zip(&self.caches).enumerate() {
            let inv = builder
                .extend_inverse(&entry.inverse, &self.x, hp)
                .map_err(|e| with_sample(e, m))?;
            inverses.push(inv);
        }
        self.install(inverses)
    }

    fn install(&mut self, inverses: Vec<DMatrix<f64>>) -> Result<()> {
        let n = self.x.len();
        for (sample, inverse) in inverses.iter().enumerate() {
            if inverse.shape() != (n, n) {
                return Err(Error::GramShape {
                    sample,
                    expected: n,
                    rows: inverse.nrows(),
                    cols: inverse.ncols(),
                });
            }
        }
        self.update_targets();
        self.caches = inverses
            .into_iter()
            .map(|inverse| {
                let alpha = &inverse * &self.y_model;
                CacheEntry { inverse, alpha }
            })
            .collect();
        self.cache_stamp = Some((n, self.hyper_generation));
        Ok(())
    }

    /// Recomputes the modeled targets (z-scored when normalizing).
    fn update_targets(&mut self) {
        let (shift, scale) = target_transform(&self.y, self.normalize);
        self.y_shift = shift;
        self.y_scale = scale;
        self.y_model =
            DVector::from_iterator(self.y.len(), self.y.iter().map(|v| (v - shift) / scale));
    }

    /// Modeled targets for the current observations, computed afresh
    /// (independent of cache freshness).
    #[must_use]
    pub fn current_targets(&self) -> Vec<f64> {
        let (shift, scale) = target_transform(&self.y, self.normalize);
        self.y.iter().map(|v| (v - shift) / scale).collect()
    }

    /// Returns `true` when the caches match the current data and hyperparameters.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        !self.hyper.is_empty()
            && self.cache_stamp == Some((self.x.len(), self.hyper_generation))
    }

    /// Fails with [`Error::StaleCache`] unless [`is_fresh`](Self::is_fresh).
    ///
    /// # Errors
    ///
    /// See above.
    pub fn ensure_fresh(&self) -> Result<()> {
        if self.is_fresh() {
            Ok(())
        } else {
            Err(Error::StaleCache {
                cached: self.cache_stamp.map_or(0, |(n, _)| n),
                current: self.x.len(),
            })
        }
    }

    /// Input dimensionality.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Returns `true` when nothing has been observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Observed inputs in evaluation order.
    #[must_use]
    pub fn points(&self) -> &[Vec<f64>] {
        &self.x
    }

    /// Observed objective values (un-normalized).
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.y
    }

    /// Targets the GP is fitted to (normalized if configured), as of the
    /// last cache build.
    #[must_use]
    pub fn modeled_values(&self) -> &DVector<f64> {
        &self.y_model
    }

    /// Largest modeled target, or `0.0` when empty.
    #[must_use]
    pub fn best_modeled(&self) -> f64 {
        if self.y_model.is_empty() {
            0.0
        } else {
            self.y_model.max()
        }
    }

    /// Index of the best observed value.
    #[must_use]
    pub fn best_index(&self) -> Option<usize> {
        self.y
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(core::cmp::Ordering::Equal))
            .map(|(i, _)| i)
    }

    /// Whether targets are z-scored.
    #[must_use]
    pub fn normalize(&self) -> bool {
        self.normalize
    }

    /// Active hyperparameter samples.
    #[must_use]
    pub fn hyperparameters(&self) -> &[Hyperparameters] {
        &self.hyper
    }

    /// Number of hyperparameter refreshes performed so far.
    #[must_use]
    pub fn hyper_generation(&self) -> u64 {
        self.hyper_generation
    }

    /// Cached inverse Gram matrix of sample `m`.
    #[must_use]
    pub fn inverse_gram(&self, m: usize) -> Option<&DMatrix<f64>> {
        self.caches.get(m).map(|c| &c.inverse)
    }

    /// `K⁻¹ y` of sample `m`.
    #[must_use]
    pub fn alpha(&self, m: usize) -> Option<&DVector<f64>> {
        self.caches.get(m).map(|c| &c.alpha)
    }

    /// Number of cached samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.caches.len()
    }

    /// Maps a modeled value back to objective units.
    #[must_use]
    pub fn to_objective_units(&self, v: f64) -> f64 {
        v * self.y_scale + self.y_shift
    }

    /// Cross-covariance `k(x, X)` under sample `m`.
    #[must_use]
    pub fn cross_covariance(&self, m: usize, x: &[f64]) -> DVector<f64> {
        cross_cov(x, &self.x, &self.hyper[m])
    }

    /// Posterior `(mean, variance)` under sample `m` given a precomputed
    /// cross-covariance from [`cross_covariance`](Self::cross_covariance).
    #[must_use]
    pub fn predict_from_cov(&self, m: usize, k: &DVector<f64>) -> (f64, f64) {
        debug_assert!(self.is_fresh(), "predict on stale caches");
        let cache = &self.caches[m];
        let mean = k.dot(&cache.alpha);
        let v = &cache.inverse * k;
        let var = (self.hyper[m].signal_variance - k.dot(&v)).max(0.0);
        (mean, var)
    }

    /// Posterior `(mean, variance)` of the latent function under sample `m`,
    /// in modeling units. Variance excludes observation noise.
    #[must_use]
    pub fn predict_sample(&self, m: usize, x: &[f64]) -> (f64, f64) {
        self.predict_from_cov(m, &self.cross_covariance(m, x))
    }

    /// Posterior mean averaged over all samples.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self, x: &[f64]) -> f64 {
        let total: f64 = (0..self.caches.len())
            .map(|m| cross_cov(x, &self.x, &self.hyper[m]).dot(&self.caches[m].alpha))
            .sum();
        total / self.caches.len().max(1) as f64
    }

    /// Gradient of [`mean`](Self::mean) with respect to `x`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_gradient(&self, x: &[f64]) -> Vec<f64> {
        let mut grad = vec![0.0; self.dim];
        for (hp, cache) in self.hyper.iter().zip(&self.caches) {
            let k = cross_cov(x, &self.x, hp);
            for (i, xi) in self.x.iter().enumerate() {
                let w = cache.alpha[i] * k[i];
                for (j, g) in grad.iter_mut().enumerate() {
                    let l = hp.length_scales[j];
                    *g -= w * (x[j] - xi[j]) / (l * l);
                }
            }
        }
        let n = self.caches.len().max(1) as f64;
        grad.iter_mut().for_each(|g| *g /= n);
        grad
    }
}

/// `(shift, scale)` mapping objective values to modeled targets.
#[allow(clippy::cast_precision_loss)]
fn target_transform(y: &[f64], normalize: bool) -> (f64, f64) {
    let n = y.len();
    if !normalize || n == 0 {
        return (0.0, 1.0);
    }
    let mean = y.iter().sum::<f64>() / n as f64;
    if n == 1 {
        return (mean, 1.0);
    }
    let var = y.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    (mean, if var > 0.0 { var.sqrt() } else { 1.0 })
}

/// Re-tags a not-positive-definite error with the sample index.
fn with_sample(err: Error, m: usize) -> Error {
    match err {
        Error::NotPositiveDefinite { .. } => Error::NotPositiveDefinite { sample: m },
        other => other,
    }
}
