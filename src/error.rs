#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the acquisition method name is not one of the recognized strategies.
    #[error("unknown acquisition method '{0}'")]
    UnknownMethod(String),

    /// Returned when a lower bound is not strictly below its upper bound.
    #[error("invalid bounds in dimension {dim}: low ({low}) must be less than high ({high})")]
    InvalidBounds {
        /// The offending dimension.
        dim: usize,
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when the domain has zero dimensions.
    #[error("domain must have at least one dimension")]
    EmptyDomain,

    /// Returned when a point or bound vector has the wrong length.
    #[error("dimension mismatch: expected {expected} but got {got}")]
    DimensionMismatch {
        /// The expected number of dimensions.
        expected: usize,
        /// The actual number of dimensions.
        got: usize,
    },

    /// Returned when the initial design has different numbers of points and values.
    #[error("initial design mismatch: {points} points but {values} values")]
    InitialDesignMismatch {
        /// Number of initial points.
        points: usize,
        /// Number of initial values.
        values: usize,
    },

    /// Returned when a configuration value is out of its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Returned when a Gram matrix cannot be factorized.
    #[error("Gram matrix is not positive definite (hyperparameter sample {sample})")]
    NotPositiveDefinite {
        /// Index of the hyperparameter sample whose Gram matrix failed.
        sample: usize,
    },

    /// Returned when a Gram builder produces an inverse of the wrong shape.
    #[error("inverse Gram matrix {sample} is {rows}x{cols}, expected {expected}x{expected}")]
    GramShape {
        /// Index of the hyperparameter sample.
        sample: usize,
        /// The number of observations.
        expected: usize,
        /// Rows of the returned matrix.
        rows: usize,
        /// Columns of the returned matrix.
        cols: usize,
    },

    /// Returned when a cached inverse Gram matrix is read after the data changed.
    #[error("stale kernel cache: built for {cached} observations, state has {current}")]
    StaleCache {
        /// Observation count the cache was built for.
        cached: usize,
        /// Current observation count.
        current: usize,
    },

    /// Returned when the hyperparameter sampler returns the wrong number of samples.
    #[error("hyperparameter sampler returned {got} samples, expected {expected}")]
    HyperSampleCount {
        /// The configured sample count.
        expected: usize,
        /// The number actually returned.
        got: usize,
    },

    /// Returned when the objective (or inference objective) fails.
    #[error("objective evaluation failed: {0}")]
    Objective(String),

    /// Returned when an objective yields a non-finite value.
    #[error("objective returned a non-finite value at {x:?}")]
    NonFiniteValue {
        /// The point that was evaluated.
        x: Vec<f64>,
    },

    /// Returned when an initial point lies outside the domain.
    #[error("initial point {x:?} lies outside the domain")]
    OutOfDomain {
        /// The offending point.
        x: Vec<f64>,
    },

    /// Returned when an internal invariant is violated.
    #[error("internal error: {0}")]
    Internal(&'static str),

    /// Returned when a snapshot file cannot be read or written.
    #[cfg(feature = "serde")]
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when a snapshot cannot be (de)serialized.
    #[cfg(feature = "serde")]
    #[error("snapshot format error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
