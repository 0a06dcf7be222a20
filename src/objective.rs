//! The [`Objective`] trait defines the black-box function being maximized.
//!
//! Closures returning `Result<f64, E>` implement it directly:
//!
//! ```
//! use bayesopt::prelude::*;
//!
//! let domain = Domain::new(vec![0.0], vec![1.0]).unwrap();
//! let config = BoConfig::builder()
//!     .method("EI")
//!     .n_m(2)
//!     .epsilon(0.0)
//!     .build()
//!     .unwrap();
//! let mut bo = BayesOpt::builder(
//!     |x: &[f64]| Ok::<_, String>(-(x[0] - 0.3).powi(2)),
//!     domain,
//! )
//! .config(config)
//! .optimizer(MultiStartOptimizer::new().n_random(50))
//! .hyper_sampler(FixedHyperparameters(Hyperparameters::new(vec![0.2], 1.0, 1e-4)))
//! .build()
//! .unwrap();
//! let result = bo.run(2).unwrap();
//! assert_eq!(result.points.len(), 3);
//! ```
//!
//! Infallible functions are wrapped with [`from_fn`]. Implement the trait on
//! a struct to stop a run early with
//! [`after_iteration`](Objective::after_iteration).

use core::convert::Infallible;
use core::ops::ControlFlow;

use crate::engine::IterationRecord;

/// A black-box objective to maximize.
pub trait Objective {
    /// The error type returned by [`evaluate`](Objective::evaluate).
    type Error: ToString + 'static;

    /// Evaluates the objective at `x`.
    ///
    /// # Errors
    ///
    /// Any error aborts the run; it is reported as
    /// [`Error::Objective`](crate::Error::Objective).
    fn evaluate(&self, x: &[f64]) -> Result<f64, Self::Error>;

    /// Called after each completed iteration.
    ///
    /// Return `ControlFlow::Break(())` to end [`BayesOpt::run`](crate::BayesOpt::run)
    /// before the requested number of iterations.
    ///
    /// Default: always continues.
    fn after_iteration(&self, _record: &IterationRecord) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

impl<F, E> Objective for F
where
    F: Fn(&[f64]) -> Result<f64, E>,
    E: ToString + 'static,
{
    type Error = E;

    fn evaluate(&self, x: &[f64]) -> Result<f64, E> {
        self(x)
    }
}

/// An [`Objective`] built from an infallible function. See [`from_fn`].
#[derive(Clone, Copy, Debug)]
pub struct FromFn<F>(F);

/// Wraps `f: Fn(&[f64]) -> f64` as an [`Objective`].
///
/// # Examples
///
/// ```
/// use bayesopt::objective::{Objective, from_fn};
///
/// let sphere = from_fn(|x: &[f64]| -x.iter().map(|v| v * v).sum::<f64>());
/// assert_eq!(sphere.evaluate(&[1.0, 2.0]).unwrap(), -5.0);
/// ```
#[must_use]
pub fn from_fn<F: Fn(&[f64]) -> f64>(f: F) -> FromFn<F> {
    FromFn(f)
}

impl<F: Fn(&[f64]) -> f64> Objective for FromFn<F> {
    type Error = Infallible;

    fn evaluate(&self, x: &[f64]) -> Result<f64, Infallible> {
        Ok((self.0)(x))
    }
}
