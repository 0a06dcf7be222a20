//! Box-constrained search domain.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rng_util;

/// An axis-aligned box `[xmin, xmax]` in `d` dimensions.
///
/// # Examples
///
/// ```
/// use bayesopt::Domain;
///
/// let domain = Domain::new(vec![0.0, -1.0], vec![1.0, 1.0]).unwrap();
/// assert_eq!(domain.dim(), 2);
/// assert!(domain.contains(&[0.5, 0.0]));
/// assert_eq!(domain.clamp(&[2.0, -3.0]), vec![1.0, -1.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Domain {
    xmin: Vec<f64>,
    xmax: Vec<f64>,
}

impl Domain {
    /// Creates a domain from lower and upper bound vectors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyDomain`] for zero dimensions,
    /// [`Error::DimensionMismatch`] if the vectors differ in length, and
    /// [`Error::InvalidBounds`] if any lower bound is not strictly below its
    /// upper bound (or either is non-finite).
    pub fn new(xmin: Vec<f64>, xmax: Vec<f64>) -> Result<Self> {
        if xmin.is_empty() {
            return Err(Error::EmptyDomain);
        }
        if xmin.len() != xmax.len() {
            return Err(Error::DimensionMismatch {
                expected: xmin.len(),
                got: xmax.len(),
            });
        }
        for (dim, (&low, &high)) in xmin.iter().zip(&xmax).enumerate() {
            if !low.is_finite() || !high.is_finite() || low >= high {
                return Err(Error::InvalidBounds { dim, low, high });
            }
        }
        Ok(Self { xmin, xmax })
    }

    /// Number of dimensions.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.xmin.len()
    }

    /// Lower bounds.
    #[must_use]
    pub fn lower(&self) -> &[f64] {
        &self.xmin
    }

    /// Upper bounds.
    #[must_use]
    pub fn upper(&self) -> &[f64] {
        &self.xmax
    }

    /// Largest side length of the box.
    #[must_use]
    pub fn diameter(&self) -> f64 {
        self.xmin
            .iter()
            .zip(&self.xmax)
            .map(|(lo, hi)| hi - lo)
            .fold(0.0, f64::max)
    }

    /// Returns `true` if `x` has the right length and lies inside the box.
    #[must_use]
    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.dim()
            && x
                .iter()
                .zip(self.xmin.iter().zip(&self.xmax))
                .all(|(v, (lo, hi))| (*lo..=*hi).contains(v))
    }

    /// Projects `x` onto the box.
    #[must_use]
    pub fn clamp(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.xmin.iter().zip(&self.xmax))
            .map(|(v, (lo, hi))| v.clamp(*lo, *hi))
            .collect()
    }

    /// Checks that `x` has this domain's dimensionality.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] otherwise.
    pub fn check_dim(&self, x: &[f64]) -> Result<()> {
        if x.len() == self.dim() {
            Ok(())
        } else {
            Err(Error::DimensionMismatch {
                expected: self.dim(),
                got: x.len(),
            })
        }
    }

    /// Draws a point uniformly from the box.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> Vec<f64> {
        self.xmin
            .iter()
            .zip(&self.xmax)
            .map(|(&lo, &hi)| rng_util::f64_range(rng, lo, hi))
            .collect()
    }
}
