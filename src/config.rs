//! Run configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::acquisition::AcquisitionMethod;
use crate::error::{Error, Result};

/// Tunable settings of a Bayesian optimization run.
///
/// Construct with [`BoConfig::builder`] or take [`BoConfig::default`].
///
/// # Defaults
///
/// | Setting | Default |
/// |---------|---------|
/// | `method` | `JES` |
/// | `n_m` | 10 |
/// | `n_k` | 10 |
/// | `epsilon` | 0.1 |
/// | `n_features` | 1000 |
/// | `seed` | 42 |
/// | `learn_interval` | 10 |
/// | `normalize` | `false` |
/// | `incremental_gram` | `false` |
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BoConfig {
    /// Acquisition strategy.
    pub method: AcquisitionMethod,
    /// Hyperparameter samples kept by the surrogate.
    pub n_m: usize,
    /// Max-value / maximizer samples per hyperparameter sample.
    pub n_k: usize,
    /// Probability of replacing the acquisition proposal with the
    /// posterior-mean maximizer.
    pub epsilon: f64,
    /// Random features per sampled function.
    pub n_features: usize,
    /// Seed of the run's random number generator.
    pub seed: u64,
    /// Hyperparameters are resampled after every iteration divisible by this.
    pub learn_interval: usize,
    /// Z-score the targets before fitting.
    pub normalize: bool,
    /// Extend cached inverses by a block update instead of rebuilding.
    pub incremental_gram: bool,
}

impl Default for BoConfig {
    fn default() -> Self {
        Self {
            method: AcquisitionMethod::default(),
            n_m: 10,
            n_k: 10,
            epsilon: 0.1,
            n_features: 1000,
            seed: 42,
            learn_interval: 10,
            normalize: false,
            incremental_gram: false,
        }
    }
}

impl BoConfig {
    /// Starts a builder from the defaults.
    #[must_use]
    pub fn builder() -> BoConfigBuilder {
        BoConfigBuilder::default()
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(Error::InvalidConfig(format!(
                "epsilon must be in [0, 1], got {}",
                self.epsilon
            )));
        }
        if self.n_m == 0 {
            return Err(Error::InvalidConfig("n_m must be at least 1".into()));
        }
        if self.n_k == 0 {
            return Err(Error::InvalidConfig("n_k must be at least 1".into()));
        }
        if self.n_features == 0 {
            return Err(Error::InvalidConfig("n_features must be at least 1".into()));
        }
        if self.learn_interval == 0 {
            return Err(Error::InvalidConfig("learn_interval must be at least 1".into()));
        }
        Ok(())
    }
}

/// Fluent builder for [`BoConfig`].
///
/// The method name is parsed as soon as it is set; an unknown name is
/// reported by [`build`](Self::build).
///
/// # Examples
///
/// ```
/// use bayesopt::BoConfig;
///
/// let config = BoConfig::builder()
///     .method("UCB")
///     .epsilon(0.0)
///     .seed(7)
///     .build()
///     .unwrap();
/// assert_eq!(config.method.name(), "UCB");
///
/// assert!(BoConfig::builder().method("ucb").build().is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct BoConfigBuilder {
    config: BoConfig,
    unknown_method: Option<String>,
}

impl BoConfigBuilder {
    /// Sets the acquisition method by name (`JES`, `MES-R`, `MES-G`, `PES`,
    /// `FITBO`, `EI`, `PI`, `UCB`, `ESI`).
    #[must_use]
    pub fn method(mut self, name: &str) -> Self {
        match name.parse() {
            Ok(method) => {
                self.config.method = method;
                self.unknown_method = None;
            }
            Err(_) => self.unknown_method = Some(name.to_owned()),
        }
        self
    }

    /// Sets the acquisition method.
    #[must_use]
    pub fn acquisition(mut self, method: AcquisitionMethod) -> Self {
        self.config.method = method;
        self.unknown_method = None;
        self
    }

    /// Sets the number of hyperparameter samples.
    #[must_use]
    pub fn n_m(mut self, n: usize) -> Self {
        self.config.n_m = n;
        self
    }

    /// Sets the number of max-value samples per hyperparameter sample.
    #[must_use]
    pub fn n_k(mut self, n: usize) -> Self {
        self.config.n_k = n;
        self
    }

    /// Sets the exploitation probability.
    #[must_use]
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    /// Sets the number of random features per sampled function.
    #[must_use]
    pub fn n_features(mut self, n: usize) -> Self {
        self.config.n_features = n;
        self
    }

    /// Sets the RNG seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Sets the hyperparameter refresh interval.
    #[must_use]
    pub fn learn_interval(mut self, n: usize) -> Self {
        self.config.learn_interval = n;
        self
    }

    /// Enables target normalization.
    #[must_use]
    pub fn normalize(mut self, normalize: bool) -> Self {
        self.config.normalize = normalize;
        self
    }

    /// Enables incremental inverse updates.
    #[must_use]
    pub fn incremental_gram(mut self, incremental: bool) -> Self {
        self.config.incremental_gram = incremental;
        self
    }

    /// Validates and returns the configuration.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownMethod`] for an unrecognized method name, otherwise
    /// whatever [`BoConfig::validate`] reports.
    pub fn build(self) -> Result<BoConfig> {
        if let Some(name) = self.unknown_method {
            return Err(Error::UnknownMethod(name));
        }
        self.config.validate()?;
        Ok(self.config)
    }
}
