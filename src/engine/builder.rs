use crate::acquisition::{AcquisitionMethod, Dispatcher};
use crate::config::BoConfig;
use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::hyper::{HyperSampler, SliceSampler};
use crate::objective::Objective;
use crate::optimize::{GlobalOptimizer, MultiStartOptimizer};
use crate::surrogate::SurrogateState;
use crate::surrogate::kernel::{CholeskyGram, GramBuilder};

use super::{BayesOpt, BoResult, InferenceFn, evaluate};

/// A builder for [`BayesOpt`] runs with a fluent API.
///
/// Created via [`BayesOpt::builder`]. Collects the configuration, the
/// numerical collaborators, and the initial design.
///
/// # Defaults
///
/// - Config: [`BoConfig::default`]
/// - Hyperparameter sampler: [`SliceSampler`]
/// - Gram builder: [`CholeskyGram`]
/// - Optimizer: [`MultiStartOptimizer`]
/// - Inference objective: the objective itself
/// - Initial design: one uniform random point
pub struct BayesOptBuilder<O> {
    objective: O,
    domain: Domain,
    config: BoConfig,
    unknown_method: Option<String>,
    sampler: Option<Box<dyn HyperSampler>>,
    gram: Option<Box<dyn GramBuilder>>,
    optimizer: Option<Box<dyn GlobalOptimizer>>,
    inference: Option<InferenceFn>,
    init_points: Vec<Vec<f64>>,
    init_values: Vec<f64>,
    resumed: Option<BoResult>,
}

impl<O: Objective> BayesOptBuilder<O> {
    pub(super) fn new(objective: O, domain: Domain) -> Self {
        Self {
            objective,
            domain,
            config: BoConfig::default(),
            unknown_method: None,
            sampler: None,
            gram: None,
            optimizer: None,
            inference: None,
            init_points: Vec::new(),
            init_values: Vec::new(),
            resumed: None,
        }
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: BoConfig) -> Self {
        self.config = config;
        self.unknown_method = None;
        self
    }

    /// Set the acquisition method by name. An unknown name is reported by
    /// [`build`](Self::build) before anything is evaluated.
    #[must_use]
    pub fn method(mut self, name: &str) -> Self {
        match name.parse::<AcquisitionMethod>() {
            Ok(method) => {
                self.config.method = method;
                self.unknown_method = None;
            }
            Err(_) => self.unknown_method = Some(name.to_owned()),
        }
        self
    }

    /// Set the hyperparameter sampler.
    #[must_use]
    pub fn hyper_sampler(mut self, sampler: impl HyperSampler + 'static) -> Self {
        self.sampler = Some(Box::new(sampler));
        self
    }

    /// Set the inverse Gram matrix builder.
    #[must_use]
    pub fn gram_builder(mut self, gram: impl GramBuilder + 'static) -> Self {
        self.gram = Some(Box::new(gram));
        self
    }

    /// Set the optimizer used for acquisition and posterior-mean maximization.
    #[must_use]
    pub fn optimizer(mut self, optimizer: impl GlobalOptimizer + 'static) -> Self {
        self.optimizer = Some(Box::new(optimizer));
        self
    }

    /// Set the objective evaluated at the incumbents when the run finishes.
    #[must_use]
    pub fn inference<I: Objective + 'static>(mut self, inference: I) -> Self {
        self.inference = Some(Box::new(move |x: &[f64]| evaluate(&inference, x)));
        self
    }

    /// Set the initial design. `points` and `values` must have equal length.
    ///
    /// Replaces any design set by [`resume_from`](Self::resume_from).
    #[must_use]
    pub fn initial_design(mut self, points: Vec<Vec<f64>>, values: Vec<f64>) -> Self {
        self.init_points = points;
        self.init_values = values;
        self.resumed = None;
        self
    }

    /// Continue a previous run.
    ///
    /// Restores the observations, the incumbent history with its timings,
    /// and the iteration counter, so the `beta_t` schedule and the
    /// `learn_interval` phase carry on where the run stopped. Hyperparameters
    /// are sampled afresh during [`build`](Self::build).
    #[must_use]
    pub fn resume_from(mut self, previous: &BoResult) -> Self {
        self.init_points = previous.points.clone();
        self.init_values = previous.values.clone();
        self.resumed = Some(previous.clone());
        self
    }

    /// Validate the settings, evaluate the default initial point if no
    /// design was given, and fit the first hyperparameter sample set.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownMethod`] for an unrecognized method name
    /// - [`Error::InvalidConfig`] for out-of-range settings
    /// - [`Error::InitialDesignMismatch`] or [`Error::DimensionMismatch`]
    ///   for a malformed initial design
    /// - [`Error::OutOfDomain`] for an initial point outside the box
    /// - [`Error::InvalidConfig`] for a resumed result whose histories
    ///   disagree in length
    /// - [`Error::NonFiniteValue`] for a non-finite initial value
    /// - objective, sampler, or Gram builder failures
    pub fn build(self) -> Result<BayesOpt<O>> {
        if let Some(name) = self.unknown_method {
            return Err(Error::UnknownMethod(name));
        }
        self.config.validate()?;
        if self.init_points.len() != self.init_values.len() {
            return Err(Error::InitialDesignMismatch {
                points: self.init_points.len(),
                values: self.init_values.len(),
            });
        }
        for (x, y) in self.init_points.iter().zip(&self.init_values) {
            self.domain.check_dim(x)?;
            if !self.domain.contains(x) {
                return Err(Error::OutOfDomain { x: x.clone() });
            }
            if !y.is_finite() {
                return Err(Error::NonFiniteValue { x: x.clone() });
            }
        }

        if let Some(previous) = &self.resumed {
            check_resumed(previous, &self.domain)?;
        }

        let mut rng = fastrand::Rng::with_seed(self.config.seed);
        let (points, values) = if self.init_points.is_empty() {
            let x = self.domain.sample(&mut rng);
            let y = evaluate(&self.objective, &x)?;
            if !y.is_finite() {
                return Err(Error::NonFiniteValue { x });
            }
            (vec![x], vec![y])
        } else {
            (self.init_points, self.init_values)
        };

        let mut state = SurrogateState::new(self.domain.dim(), self.config.normalize);
        for (x, y) in points.into_iter().zip(values) {
            state.append(x, y)?;
        }

        let mut bo = BayesOpt {
            objective: self.objective,
            inference: self.inference,
            dispatcher: Dispatcher::new(self.config.method),
            sampler: self.sampler.unwrap_or_else(|| Box::new(SliceSampler::new())),
            gram: self.gram.unwrap_or_else(|| Box::new(CholeskyGram)),
            optimizer: self
                .optimizer
                .unwrap_or_else(|| Box::new(MultiStartOptimizer::new())),
            domain: self.domain,
            config: self.config,
            state,
            rng,
            t: 0,
            guesses: Vec::new(),
            guess_values: Vec::new(),
            choose_time: Vec::new(),
            extra_time: Vec::new(),
        };
        bo.refresh_hyperparameters()?;
        bo.state.rebuild_caches(bo.gram.as_ref())?;
        match self.resumed {
            Some(previous) => {
                bo.t = previous.iterations();
                bo.guesses = previous.guesses;
                bo.guess_values = previous.guess_values;
                bo.choose_time = previous.choose_time;
                bo.extra_time = previous.extra_time;
            }
            None => bo.seed_guesses(),
        }

        trace_info!(
            dim = bo.domain.dim(),
            n_initial = bo.state.len(),
            method = bo.config.method.name(),
            "bayesian optimization initialized"
        );
        Ok(bo)
    }
}

/// A resumable result has one incumbent per observation and one timing
/// pair per iteration.
fn check_resumed(previous: &BoResult, domain: &Domain) -> Result<()> {
    let n = previous.points.len();
    if previous.guesses.len() != n
        || previous.guess_values.len() != n
        || previous.extra_time.len() != previous.choose_time.len()
        || previous.choose_time.len() > n
    {
        return Err(Error::InvalidConfig(format!(
            "resumed result is inconsistent: {n} points, {} guesses, {} guess values, \
             {} choose timings, {} extra timings",
            previous.guesses.len(),
            previous.guess_values.len(),
            previous.choose_time.len(),
            previous.extra_time.len(),
        )));
    }
    match previous.guesses.iter().find(|x| !domain.contains(x)) {
        Some(x) => Err(Error::OutOfDomain { x: x.clone() }),
        None => Ok(()),
    }
}
