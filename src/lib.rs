#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Sequential Bayesian optimization of expensive black-box functions over a
//! box domain, with a sampled-hyperparameter Gaussian-process surrogate and
//! a choice of nine acquisition strategies, including several
//! information-theoretic ones.
//!
//! # Getting Started
//!
//! ```
//! use bayesopt::prelude::*;
//!
//! let config = BoConfig::builder()
//!     .method("EI")
//!     .n_m(3)
//!     .seed(1)
//!     .build()
//!     .unwrap();
//! let result = maximize(
//!     from_fn(|x: &[f64]| -(x[0] - 0.25).powi(2)),
//!     vec![0.0],
//!     vec![1.0],
//!     3,
//!     vec![vec![0.9]],
//!     vec![-0.4225],
//!     config,
//! )
//! .unwrap();
//!
//! assert_eq!(result.points.len(), 4);
//! assert_eq!(result.guesses.len(), 4);
//! let (x, value) = result.final_guess().unwrap();
//! println!("x = {:.4}, f(x) = {:.4}", x[0], value);
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`BayesOpt`] | Drive the loop: propose, evaluate, refit, track the incumbent. |
//! | [`Domain`] | The box `[xmin, xmax]` being searched. |
//! | [`BoConfig`] | Method name, sample counts, `epsilon`, seed, refresh interval. |
//! | [`SurrogateState`](surrogate::SurrogateState) | Observations, hyperparameter samples, cached inverse Gram matrices. |
//! | [`BoResult`] | Incumbents, evaluations, timings, and inference values of a run. |
//!
//! # Acquisition Guide
//!
//! | Name | Strategy |
//! |------|----------|
//! | `JES` | Joint entropy search over `(x*, y*)` (default) |
//! | `MES-R` | Max-value entropy search, Gumbel samples |
//! | `MES-G` | Max-value entropy search, sampled-function maxima |
//! | `PES` | Predictive entropy search |
//! | `FITBO` | Fast information-theoretic Bayesian optimization |
//! | `EI` | Expected improvement |
//! | `PI` | Probability of improvement |
//! | `UCB` | Upper confidence bound |
//! | `ESI` | Expected improvement over sampled max values |
//!
//! # Collaborators
//!
//! The numerics are pluggable through four traits:
//! [`HyperSampler`](hyper::HyperSampler),
//! [`GramBuilder`](surrogate::kernel::GramBuilder),
//! [`GlobalOptimizer`](optimize::GlobalOptimizer), and
//! [`Acquisition`](acquisition::Acquisition).
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on public types, [`BoResult::save`]/[`BoResult::load`] | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) per iteration and refresh | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

pub mod acquisition;
mod config;
mod domain;
mod engine;
mod error;
pub mod hyper;
mod normal;
pub mod objective;
pub mod optimize;
mod rng_util;
pub mod surrogate;

pub use acquisition::AcquisitionMethod;
pub use config::{BoConfig, BoConfigBuilder};
pub use domain::Domain;
#[cfg(feature = "serde")]
pub use engine::ResultSnapshot;
pub use engine::{BayesOpt, BayesOptBuilder, BoResult, IterationRecord, maximize};
pub use error::{Error, Result};
pub use objective::Objective;

/// Convenient wildcard import for the most common types.
///
/// ```
/// use bayesopt::prelude::*;
/// ```
pub mod prelude {
    pub use crate::acquisition::{Acquisition, AcquisitionMethod};
    pub use crate::config::{BoConfig, BoConfigBuilder};
    pub use crate::domain::Domain;
    pub use crate::engine::{BayesOpt, BayesOptBuilder, BoResult, IterationRecord, maximize};
    pub use crate::error::{Error, Result};
    pub use crate::hyper::{FixedHyperparameters, HyperSampler, SliceSampler};
    pub use crate::objective::{Objective, from_fn};
    pub use crate::optimize::{GlobalOptimizer, MultiStartOptimizer};
    pub use crate::surrogate::kernel::{CholeskyGram, GramBuilder};
    pub use crate::surrogate::{Hyperparameters, SurrogateState};
}
