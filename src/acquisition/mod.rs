//! Acquisition strategies and the dispatcher that selects one by name.
//!
//! Every strategy scores candidate points with the GP surrogate, averaging
//! its per-sample score over the `nM` hyperparameter samples, and proposes
//! the maximizer of that score found by the configured
//! [`GlobalOptimizer`].
//!
//! | Name | Strategy | Scores with |
//! |------|----------|-------------|
//! | `JES` | [`JointEntropySearch`] | sampled `(x*, y*)` pairs |
//! | `MES-R` | [`MaxValueEntropySearch`] | Gumbel-regression `y*` samples |
//! | `MES-G` | [`MaxValueEntropySearch`] | sampled-function `y*` samples |
//! | `PES` | [`PredictiveEntropySearch`] | sampled `x*` |
//! | `FITBO` | [`Fitbo`] | Gumbel `η` samples |
//! | `EI` | [`ExpectedImprovement`] | best observation |
//! | `PI` | [`ProbabilityOfImprovement`] | best observation |
//! | `UCB` | [`UpperConfidenceBound`] | confidence schedule `beta_t` |
//! | `ESI` | [`ExpectedSetImprovement`] | Gumbel `y*` samples |
//!
//! Names are matched exactly (case-sensitive). Parsing an unknown name
//! fails with [`Error::UnknownMethod`].

mod features;
mod fitbo;
mod improvement;
mod joint;
mod max_value;
mod pes;

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use self::features::FunctionSample;
pub use self::fitbo::Fitbo;
pub use self::improvement::{
    ExpectedImprovement, ExpectedSetImprovement, ProbabilityOfImprovement, UpperConfidenceBound,
};
pub use self::joint::JointEntropySearch;
pub use self::max_value::{MaxValueEntropySearch, MaxValueSource};
pub use self::pes::PredictiveEntropySearch;
use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::optimize::GlobalOptimizer;
use crate::surrogate::SurrogateState;

/// The recognized acquisition strategies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub enum AcquisitionMethod {
    /// Entropy search over the joint `(x*, y*)`.
    #[default]
    JointEntropySearch,
    /// Max-value entropy search with Gumbel-regression samples.
    MaxValueRegression,
    /// Max-value entropy search with generative (sampled-function) samples.
    MaxValueGenerative,
    /// Predictive entropy search.
    PredictiveEntropySearch,
    /// Fast information-theoretic Bayesian optimization.
    Fitbo,
    /// Expected improvement.
    ExpectedImprovement,
    /// Probability of improvement.
    ProbabilityOfImprovement,
    /// Upper confidence bound.
    UpperConfidenceBound,
    /// Expected improvement over a sampled set of max values.
    ExpectedSetImprovement,
}

impl AcquisitionMethod {
    /// Every method, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::JointEntropySearch,
        Self::MaxValueRegression,
        Self::MaxValueGenerative,
        Self::PredictiveEntropySearch,
        Self::Fitbo,
        Self::ExpectedImprovement,
        Self::ProbabilityOfImprovement,
        Self::UpperConfidenceBound,
        Self::ExpectedSetImprovement,
    ];

    /// The configuration name of this method.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::JointEntropySearch => "JES",
            Self::MaxValueRegression => "MES-R",
            Self::MaxValueGenerative => "MES-G",
            Self::PredictiveEntropySearch => "PES",
            Self::Fitbo => "FITBO",
            Self::ExpectedImprovement => "EI",
            Self::ProbabilityOfImprovement => "PI",
            Self::UpperConfidenceBound => "UCB",
            Self::ExpectedSetImprovement => "ESI",
        }
    }

    /// Whether the method is information-theoretic (reports an acquisition value).
    #[must_use]
    pub fn is_information_theoretic(self) -> bool {
        matches!(
            self,
            Self::JointEntropySearch
                | Self::MaxValueRegression
                | Self::MaxValueGenerative
                | Self::PredictiveEntropySearch
                | Self::Fitbo
        )
    }

    /// Instantiates the strategy.
    #[must_use]
    pub fn build(self) -> Box<dyn Acquisition> {
        match self {
            Self::JointEntropySearch => Box::new(JointEntropySearch),
            Self::MaxValueRegression => {
                Box::new(MaxValueEntropySearch::new(MaxValueSource::Gumbel))
            }
            Self::MaxValueGenerative => {
                Box::new(MaxValueEntropySearch::new(MaxValueSource::SampledFunctions))
            }
            Self::PredictiveEntropySearch => Box::new(PredictiveEntropySearch),
            Self::Fitbo => Box::new(Fitbo),
            Self::ExpectedImprovement => Box::new(ExpectedImprovement),
            Self::ProbabilityOfImprovement => Box::new(ProbabilityOfImprovement),
            Self::UpperConfidenceBound => Box::new(UpperConfidenceBound),
            Self::ExpectedSetImprovement => Box::new(ExpectedSetImprovement),
        }
    }
}

impl fmt::Display for AcquisitionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AcquisitionMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| Error::UnknownMethod(s.to_owned()))
    }
}

impl TryFrom<String> for AcquisitionMethod {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<AcquisitionMethod> for String {
    fn from(m: AcquisitionMethod) -> Self {
        m.name().to_owned()
    }
}

/// Everything a strategy may read when proposing a point.
///
/// The context is a read-only snapshot: strategies never mutate the
/// surrogate. Construct it with [`AcquisitionContext::new`], which refuses
/// stale caches.
pub struct AcquisitionContext<'a> {
    /// Observations, hyperparameter samples, and caches.
    pub state: &'a SurrogateState,
    /// Search box.
    pub domain: &'a Domain,
    /// Optimizer used to maximize scores and sampled functions.
    pub optimizer: &'a dyn GlobalOptimizer,
    /// Extra optimizer starting points (the incumbent history).
    pub seeds: &'a [Vec<f64>],
    /// Current iteration, starting at 1.
    pub t: usize,
    /// Max-value / maximizer samples per hyperparameter sample.
    pub n_k: usize,
    /// Random features per sampled function.
    pub n_features: usize,
    /// UCB exploration coefficient for this iteration.
    pub beta: f64,
}

impl<'a> AcquisitionContext<'a> {
    /// Builds a context after checking cache freshness.
    ///
    /// # Errors
    ///
    /// [`Error::StaleCache`] when the surrogate caches are out of date.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        state: &'a SurrogateState,
        domain: &'a Domain,
        optimizer: &'a dyn GlobalOptimizer,
        seeds: &'a [Vec<f64>],
        t: usize,
        n_k: usize,
        n_features: usize,
    ) -> Result<Self> {
        state.ensure_fresh()?;
        Ok(Self {
            state,
            domain,
            optimizer,
            seeds,
            t,
            n_k,
            n_features,
            beta: ucb_beta(t, domain.dim(), domain.diameter()),
        })
    }

    /// Noise variance of sample `m`.
    #[must_use]
    pub fn noise(&self, m: usize) -> f64 {
        self.state.hyperparameters()[m].noise_variance
    }

    /// Best observed point, used as an additional optimizer seed.
    #[must_use]
    pub fn best_point(&self) -> Option<&[f64]> {
        self.state
            .best_index()
            .map(|i| self.state.points()[i].as_slice())
    }

    /// Incumbent seeds plus the best observed point.
    #[must_use]
    pub fn all_seeds(&self) -> Vec<Vec<f64>> {
        let mut seeds = self.seeds.to_vec();
        if let Some(best) = self.best_point() {
            seeds.push(best.to_vec());
        }
        seeds
    }
}

/// A proposed next evaluation point.
#[derive(Clone, Debug, PartialEq)]
pub struct Proposal {
    /// The candidate point, inside the domain.
    pub x: Vec<f64>,
    /// Acquisition value at `x` (information-theoretic methods only).
    pub value: Option<f64>,
}

/// An acquisition strategy.
pub trait Acquisition {
    /// Proposes the next point to evaluate.
    ///
    /// # Errors
    ///
    /// Propagates optimizer failures.
    fn propose(&self, ctx: &AcquisitionContext<'_>, rng: &mut fastrand::Rng) -> Result<Proposal>;
}

/// Selects and invokes the configured strategy.
///
/// # Examples
///
/// ```
/// use bayesopt::acquisition::{AcquisitionMethod, Dispatcher};
///
/// let dispatcher = Dispatcher::from_name("UCB").unwrap();
/// assert_eq!(dispatcher.method(), AcquisitionMethod::UpperConfidenceBound);
/// assert!(Dispatcher::from_name("ucb").is_err());
/// ```
pub struct Dispatcher {
    method: AcquisitionMethod,
    strategy: Box<dyn Acquisition>,
}

impl Dispatcher {
    /// Builds the dispatcher for a method.
    #[must_use]
    pub fn new(method: AcquisitionMethod) -> Self {
        Self {
            method,
            strategy: method.build(),
        }
    }

    /// Parses the name and builds the dispatcher.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownMethod`] for an unrecognized name.
    pub fn from_name(name: &str) -> Result<Self> {
        Ok(Self::new(name.parse()?))
    }

    /// The configured method.
    #[must_use]
    pub fn method(&self) -> AcquisitionMethod {
        self.method
    }

    /// Proposes the next point. Information-theoretic proposals carry
    /// their acquisition value; the others report `None`.
    ///
    /// # Errors
    ///
    /// Propagates strategy errors.
    pub fn propose(
        &self,
        ctx: &AcquisitionContext<'_>,
        rng: &mut fastrand::Rng,
    ) -> Result<Proposal> {
        let mut proposal = self.strategy.propose(ctx, rng)?;
        if !self.method.is_information_theoretic() {
            proposal.value = None;
        }
        trace_debug!(
            method = self.method.name(),
            t = ctx.t,
            x = ?proposal.x,
            value = ?proposal.value,
            "acquisition proposal"
        );
        Ok(proposal)
    }
}

/// Failure probability in the UCB confidence schedule.
const UCB_DELTA: f64 = 0.01;

/// GP-UCB exploration coefficient for iteration `t`.
///
/// `beta_t = sqrt(2 ln(t² 2π² / (3δ)) + 2d ln(t² d r sqrt(ln(4d/δ))))` with
/// `δ = 0.01`, `d` the dimension and `r` the domain diameter. The radicand
/// is clamped at zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ucb_beta(t: usize, dim: usize, diameter: f64) -> f64 {
    let t = t.max(1) as f64;
    let d = dim as f64;
    let pi2 = core::f64::consts::PI * core::f64::consts::PI;
    let first = 2.0 * (t * t * 2.0 * pi2 / (3.0 * UCB_DELTA)).ln();
    let second = 2.0 * d * (t * t * d * diameter * (4.0 * d / UCB_DELTA).ln().sqrt()).ln();
    (first + second).max(0.0).sqrt()
}

/// Maximizes `score` over the domain with the context's optimizer.
pub(crate) fn maximize_score(
    ctx: &AcquisitionContext<'_>,
    rng: &mut fastrand::Rng,
    score: &dyn Fn(&[f64]) -> f64,
) -> Result<Proposal> {
    let seeds = ctx.all_seeds();
    let (x, value) = ctx.optimizer.maximize(score, None, ctx.domain, &seeds, rng)?;
    Ok(Proposal {
        x,
        value: Some(value),
    })
}

/// Averages `per_sample(m, mean, var)` over the hyperparameter samples.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn sample_average(
    state: &SurrogateState,
    x: &[f64],
    per_sample: impl Fn(usize, f64, f64) -> f64,
) -> f64 {
    let n_m = state.n_samples();
    let total: f64 = (0..n_m)
        .map(|m| {
            let (mean, var) = state.predict_sample(m, x);
            per_sample(m, mean, var)
        })
        .sum();
    total / n_m.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for method in AcquisitionMethod::ALL {
            assert_eq!(method.name().parse::<AcquisitionMethod>().unwrap(), method);
            assert_eq!(method.to_string(), method.name());
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        for bad in ["", "ei", "MES", "UCB ", "EntropySearch"] {
            assert!(matches!(
                bad.parse::<AcquisitionMethod>(),
                Err(Error::UnknownMethod(name)) if name == bad
            ));
        }
    }

    #[test]
    fn default_is_joint_entropy_search() {
        assert_eq!(AcquisitionMethod::default().name(), "JES");
    }

    #[test]
    fn ucb_beta_grows_with_t_and_dimension() {
        let b1 = ucb_beta(1, 2, 1.0);
        let b10 = ucb_beta(10, 2, 1.0);
        assert!(b1 > 0.0);
        assert!(b10 > b1);
        assert!(ucb_beta(5, 4, 1.0) > ucb_beta(5, 2, 1.0));
        // t = 1, d = 2, r = 1 by hand
        let expected = (2.0 * (2.0 * core::f64::consts::PI.powi(2) / 0.03).ln()
            + 4.0 * (2.0 * 800.0_f64.ln().sqrt()).ln())
        .sqrt();
        assert!((b1 - expected).abs() < 1e-12);
    }

    #[test]
    fn ucb_beta_never_nan() {
        assert!(ucb_beta(1, 1, 1e-12).is_finite());
        assert!(ucb_beta(0, 1, 1.0).is_finite());
    }
}
