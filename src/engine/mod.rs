//! The sequential optimization loop.
//!
//! [`BayesOpt`] owns the observations, the surrogate, the random number
//! generator, and the histories. Each [`step`](BayesOpt::step):
//!
//! 1. asks the acquisition dispatcher for a candidate,
//! 2. with probability `epsilon` replaces it by the posterior-mean maximizer,
//! 3. evaluates the objective and records the observation,
//! 4. resamples hyperparameters when `t % learn_interval == 0`,
//! 5. brings the kernel caches up to date,
//! 6. maximizes the posterior mean to obtain the new incumbent.
//!
//! Steps 1 to 5 are timed as the choose time and step 6 as the extra time.
//! [`finish`](BayesOpt::finish) evaluates the inference objective at every
//! incumbent and assembles the [`BoResult`].

mod builder;
mod result;

use core::ops::ControlFlow;
use core::time::Duration;
use std::time::Instant;

pub use self::builder::BayesOptBuilder;
#[cfg(feature = "serde")]
pub use self::result::ResultSnapshot;
pub use self::result::BoResult;
use crate::acquisition::{AcquisitionContext, AcquisitionMethod, Dispatcher};
use crate::config::BoConfig;
use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::hyper::HyperSampler;
use crate::objective::Objective;
use crate::optimize::GlobalOptimizer;
use crate::surrogate::SurrogateState;
use crate::surrogate::kernel::GramBuilder;

type InferenceFn = Box<dyn Fn(&[f64]) -> Result<f64>>;

/// What happened in one iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationRecord {
    /// Iteration number, starting at 1.
    pub t: usize,
    /// The evaluated point.
    pub x: Vec<f64>,
    /// The objective value at `x`.
    pub value: f64,
    /// Whether the posterior-mean maximizer replaced the acquisition proposal.
    pub exploited: bool,
    /// Acquisition value of the proposal (information-theoretic methods only).
    pub acquisition_value: Option<f64>,
    /// The new incumbent.
    pub incumbent: Vec<f64>,
    /// Posterior mean at the incumbent, in objective units.
    pub incumbent_value: f64,
    /// Time spent choosing and fitting.
    pub choose_time: Duration,
    /// Time spent computing the incumbent.
    pub extra_time: Duration,
}

/// A sequential Bayesian optimization run.
///
/// # Examples
///
/// ```
/// use bayesopt::prelude::*;
///
/// let domain = Domain::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
/// let objective = from_fn(|x: &[f64]| -(x[0] - 0.5).powi(2) - (x[1] - 0.5).powi(2));
/// let mut bo = BayesOpt::builder(objective, domain)
///     .method("UCB")
///     .optimizer(MultiStartOptimizer::new().n_random(50))
///     .hyper_sampler(SliceSampler::new().burn_in(5))
///     .initial_design(vec![vec![0.2, 0.8]], vec![-0.18])
///     .build()
///     .unwrap();
///
/// let record = bo.step().unwrap();
/// assert_eq!(record.t, 1);
/// let result = bo.run(2).unwrap();
/// assert_eq!(result.points.len(), 4);
/// assert_eq!(result.choose_time.len(), 3);
/// ```
pub struct BayesOpt<O> {
    objective: O,
    inference: Option<InferenceFn>,
    domain: Domain,
    config: BoConfig,
    dispatcher: Dispatcher,
    sampler: Box<dyn HyperSampler>,
    gram: Box<dyn GramBuilder>,
    optimizer: Box<dyn GlobalOptimizer>,
    state: SurrogateState,
    rng: fastrand::Rng,
    t: usize,
    guesses: Vec<Vec<f64>>,
    guess_values: Vec<f64>,
    choose_time: Vec<Duration>,
    extra_time: Vec<Duration>,
}

impl<O: Objective> BayesOpt<O> {
    /// Starts a builder for maximizing `objective` over `domain`.
    #[must_use]
    pub fn builder(objective: O, domain: Domain) -> BayesOptBuilder<O> {
        BayesOptBuilder::new(objective, domain)
    }

    /// Runs one iteration.
    ///
    /// # Errors
    ///
    /// Any collaborator, objective, or numerical failure. The run must not
    /// be continued after an error.
    pub fn step(&mut self) -> Result<IterationRecord> {
        let t = self.t + 1;
        let choose_start = Instant::now();

        let proposal = {
            let ctx = AcquisitionContext::new(
                &self.state,
                &self.domain,
                self.optimizer.as_ref(),
                &self.guesses,
                t,
                self.config.n_k,
                self.config.n_features,
            )?;
            self.dispatcher.propose(&ctx, &mut self.rng)?
        };

        let exploited = self.rng.f64() < self.config.epsilon;
        let x = if exploited {
            self.maximize_mean()?.0
        } else {
            proposal.x
        };

        let value = evaluate(&self.objective, &x)?;
        if !value.is_finite() {
            return Err(Error::NonFiniteValue { x });
        }
        self.state.append(x.clone(), value)?;

        if t % self.config.learn_interval == 0 {
            self.refresh_hyperparameters()?;
        }
        self.state
            .refresh_caches(self.gram.as_ref(), self.config.incremental_gram)?;
        let choose_time = choose_start.elapsed();

        let extra_start = Instant::now();
        let (incumbent, mean) = self.maximize_mean()?;
        let incumbent_value = self.state.to_objective_units(mean);
        let extra_time = extra_start.elapsed();

        self.t = t;
        self.guesses.push(incumbent.clone());
        self.guess_values.push(incumbent_value);
        self.choose_time.push(choose_time);
        self.extra_time.push(extra_time);

        trace_info!(t, exploited, value, incumbent_value, "iteration completed");

        Ok(IterationRecord {
            t,
            x,
            value,
            exploited,
            acquisition_value: proposal.value,
            incumbent,
            incumbent_value,
            choose_time,
            extra_time,
        })
    }

    /// Runs up to `iterations` steps and returns the finished result.
    ///
    /// Stops early when [`Objective::after_iteration`] breaks.
    ///
    /// # Errors
    ///
    /// The first error from [`step`](Self::step) or [`finish`](Self::finish).
    pub fn run(&mut self, iterations: usize) -> Result<BoResult> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "run",
            iterations,
            method = self.config.method.name()
        )
        .entered();

        self.state.reserve(iterations);
        self.guesses.reserve(iterations);
        self.guess_values.reserve(iterations);
        self.choose_time.reserve(iterations);
        self.extra_time.reserve(iterations);

        for _ in 0..iterations {
            let record = self.step()?;
            if let ControlFlow::Break(()) = self.objective.after_iteration(&record) {
                trace_debug!(t = record.t, "run stopped by objective");
                break;
            }
        }
        self.finish()
    }

    /// Evaluates the inference objective (the objective by default) at every
    /// incumbent and assembles the result.
    ///
    /// # Errors
    ///
    /// [`Error::Objective`] or [`Error::NonFiniteValue`] from the inference
    /// pass.
    pub fn finish(&self) -> Result<BoResult> {
        let mut inference_values = Vec::with_capacity(self.guesses.len());
        for x in &self.guesses {
            let v = match &self.inference {
                Some(f) => f(x)?,
                None => evaluate(&self.objective, x)?,
            };
            if !v.is_finite() {
                return Err(Error::NonFiniteValue { x: x.clone() });
            }
            inference_values.push(v);
        }
        trace_debug!(n = inference_values.len(), "inference pass completed");

        Ok(BoResult {
            guesses: self.guesses.clone(),
            guess_values: self.guess_values.clone(),
            points: self.state.points().to_vec(),
            values: self.state.values().to_vec(),
            choose_time: self.choose_time.clone(),
            extra_time: self.extra_time.clone(),
            inference_values,
        })
    }

    /// Completed iterations.
    #[must_use]
    pub fn iteration(&self) -> usize {
        self.t
    }

    /// The surrogate state.
    #[must_use]
    pub fn state(&self) -> &SurrogateState {
        &self.state
    }

    /// The search domain.
    #[must_use]
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &BoConfig {
        &self.config
    }

    /// The acquisition method in effect.
    #[must_use]
    pub fn method(&self) -> AcquisitionMethod {
        self.dispatcher.method()
    }

    /// The current incumbent and its posterior mean in objective units.
    #[must_use]
    pub fn incumbent(&self) -> Option<(&[f64], f64)> {
        let x = self.guesses.last()?;
        let v = self.guess_values.last()?;
        Some((x.as_slice(), *v))
    }

    /// Incumbent history, starting with the initial points.
    #[must_use]
    pub fn guesses(&self) -> &[Vec<f64>] {
        &self.guesses
    }

    fn refresh_hyperparameters(&mut self) -> Result<()> {
        let previous = self.state.hyperparameters().to_vec();
        let samples = self.sampler.sample(
            &self.state,
            &self.domain,
            self.config.n_m,
            &previous,
            &mut self.rng,
        )?;
        if samples.len() != self.config.n_m {
            return Err(Error::HyperSampleCount {
                expected: self.config.n_m,
                got: samples.len(),
            });
        }
        let dim = self.domain.dim();
        if let Some(hp) = samples.iter().find(|hp| hp.length_scales.len() != dim) {
            return Err(Error::DimensionMismatch {
                expected: dim,
                got: hp.length_scales.len(),
            });
        }
        self.state.set_hyperparameters(samples);
        trace_debug!(
            t = self.t,
            generation = self.state.hyper_generation(),
            "hyperparameters refreshed"
        );
        Ok(())
    }

    /// Posterior-mean maximizer seeded with the incumbent history, in
    /// modeling units.
    fn maximize_mean(&mut self) -> Result<(Vec<f64>, f64)> {
        self.state.ensure_fresh()?;
        let state = &self.state;
        let f = |x: &[f64]| state.mean(x);
        let g = |x: &[f64]| state.mean_gradient(x);
        self.optimizer
            .maximize(&f, Some(&g), &self.domain, &self.guesses, &mut self.rng)
    }

    /// The initial incumbents are the initial points themselves.
    fn seed_guesses(&mut self) {
        for x in self.state.points() {
            let v = self.state.to_objective_units(self.state.mean(x));
            self.guesses.push(x.clone());
            self.guess_values.push(v);
        }
    }
}

/// Evaluates an objective, mapping its error.
fn evaluate<O: Objective + ?Sized>(objective: &O, x: &[f64]) -> Result<f64> {
    objective
        .evaluate(x)
        .map_err(|e| Error::Objective(e.to_string()))
}

/// Maximizes `objective` over `[xmin, xmax]` for `iterations` steps.
///
/// `init_points`/`init_values` form the initial design; pass empty vectors
/// to start from one random point.
///
/// # Errors
///
/// Everything [`BayesOptBuilder::build`] and [`BayesOpt::run`] report.
pub fn maximize<O: Objective>(
    objective: O,
    xmin: Vec<f64>,
    xmax: Vec<f64>,
    iterations: usize,
    init_points: Vec<Vec<f64>>,
    init_values: Vec<f64>,
    config: BoConfig,
) -> Result<BoResult> {
    BayesOpt::builder(objective, Domain::new(xmin, xmax)?)
        .config(config)
        .initial_design(init_points, init_values)
        .build()?
        .run(iterations)
}
