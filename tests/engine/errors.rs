use std::cell::Cell;
use std::ops::ControlFlow;

use bayesopt::prelude::*;
use nalgebra::DMatrix;

use crate::{bowl, fast, unit_square};

#[test]
fn unknown_method_fails_before_any_evaluation() {
    let calls = Cell::new(0);
    let objective = |x: &[f64]| {
        calls.set(calls.get() + 1);
        Ok::<_, String>(bowl(x))
    };
    let err = fast(objective, unit_square())
        .method("GP-UCB")
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, Error::UnknownMethod(ref name) if name == "GP-UCB"));
    assert_eq!(calls.get(), 0);
}

#[test]
fn method_names_are_case_sensitive() {
    for name in ["jes", "Ei", "mes-r", "fitbo"] {
        let result = fast(from_fn(bowl), unit_square()).method(name).build();
        assert!(matches!(result, Err(Error::UnknownMethod(_))), "{name}");
    }
}

#[test]
fn initial_design_shape_is_checked() {
    let err = fast(from_fn(bowl), unit_square())
        .initial_design(vec![vec![0.1, 0.2]], vec![])
        .build()
        .err()
        .unwrap();
    assert!(matches!(
        err,
        Error::InitialDesignMismatch {
            points: 1,
            values: 0
        }
    ));

    let err = fast(from_fn(bowl), unit_square())
        .initial_design(vec![vec![0.1]], vec![0.0])
        .build()
        .err()
        .unwrap();
    assert!(matches!(
        err,
        Error::DimensionMismatch {
            expected: 2,
            got: 1
        }
    ));
}

#[test]
fn invalid_bounds_are_rejected() {
    assert!(matches!(
        maximize(
            from_fn(bowl),
            vec![0.0, 1.0],
            vec![1.0, 0.5],
            1,
            vec![],
            vec![],
            BoConfig::default(),
        ),
        Err(Error::InvalidBounds { dim: 1, .. })
    ));
}

#[test]
fn singular_gram_matrix_is_fatal() {
    let err = fast(from_fn(bowl), unit_square())
        .hyper_sampler(FixedHyperparameters(Hyperparameters::new(
            vec![0.3, 0.3],
            -1.0,
            0.0,
        )))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, Error::NotPositiveDefinite { sample: 0 }));
}

struct ShortSampler;

impl HyperSampler for ShortSampler {
    fn sample(
        &self,
        state: &SurrogateState,
        _domain: &Domain,
        n_m: usize,
        _previous: &[Hyperparameters],
        _rng: &mut fastrand::Rng,
    ) -> Result<Vec<Hyperparameters>> {
        let hp = Hyperparameters::new(vec![0.3; state.dim()], 1.0, 1e-4);
        Ok(vec![hp; n_m - 1])
    }
}

#[test]
fn wrong_sample_count_is_fatal() {
    let err = fast(from_fn(bowl), unit_square())
        .hyper_sampler(ShortSampler)
        .build()
        .err()
        .unwrap();
    assert!(matches!(
        err,
        Error::HyperSampleCount {
            expected: 2,
            got: 1
        }
    ));
}

#[test]
fn lengthscales_must_match_the_domain() {
    let err = fast(from_fn(bowl), unit_square())
        .hyper_sampler(FixedHyperparameters(Hyperparameters::new(
            vec![0.3],
            1.0,
            1e-4,
        )))
        .build()
        .err()
        .unwrap();
    assert!(matches!(
        err,
        Error::DimensionMismatch {
            expected: 2,
            got: 1
        }
    ));
}

/// Returns an inverse one row and column too large.
struct OversizedGram;

impl GramBuilder for OversizedGram {
    fn inverse_gram(&self, x: &[Vec<f64>], _hp: &Hyperparameters) -> Result<DMatrix<f64>> {
        Ok(DMatrix::identity(x.len() + 1, x.len() + 1))
    }
}

#[test]
fn misshapen_inverse_gram_is_fatal() {
    let err = fast(from_fn(bowl), unit_square())
        .gram_builder(OversizedGram)
        .build()
        .err()
        .unwrap();
    assert!(matches!(
        err,
        Error::GramShape {
            sample: 0,
            expected: 1,
            rows: 2,
            cols: 2
        }
    ));
}

#[test]
fn initial_points_outside_the_domain_are_rejected() {
    let calls = Cell::new(0);
    let objective = |x: &[f64]| {
        calls.set(calls.get() + 1);
        Ok::<_, String>(bowl(x))
    };
    let err = fast(objective, unit_square())
        .initial_design(vec![vec![0.5, 0.5], vec![5.0, -3.0]], vec![0.0, 0.0])
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, Error::OutOfDomain { ref x } if x == &[5.0, -3.0]));
    assert_eq!(calls.get(), 0);
}

#[test]
fn objective_failure_aborts_the_run() {
    let calls = Cell::new(0);
    let objective = |x: &[f64]| {
        calls.set(calls.get() + 1);
        if calls.get() > 2 {
            Err("simulator crashed")
        } else {
            Ok(bowl(x))
        }
    };
    let mut bo = fast(objective, unit_square()).method("UCB").build().unwrap();
    bo.step().unwrap();
    let err = bo.step().unwrap_err();
    assert!(matches!(err, Error::Objective(ref msg) if msg == "simulator crashed"));
    assert_eq!(calls.get(), 3);
}

#[test]
fn non_finite_objective_value_is_rejected() {
    let mut bo = fast(
        |x: &[f64]| Ok::<_, String>(if x[0] > -1.0 { f64::NAN } else { 0.0 }),
        unit_square(),
    )
    .method("EI")
    .initial_design(vec![vec![0.5, 0.5]], vec![0.0])
    .build()
    .unwrap();
    assert!(matches!(bo.step(), Err(Error::NonFiniteValue { .. })));
}

struct StopAfter(usize);

impl Objective for StopAfter {
    type Error = String;

    fn evaluate(&self, x: &[f64]) -> std::result::Result<f64, String> {
        Ok(bowl(x))
    }

    fn after_iteration(&self, record: &IterationRecord) -> ControlFlow<()> {
        if record.t >= self.0 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

#[test]
fn objective_can_stop_the_run_early() {
    let result = fast(StopAfter(2), unit_square())
        .method("UCB")
        .build()
        .unwrap()
        .run(10)
        .unwrap();
    assert_eq!(result.iterations(), 2);
    assert_eq!(result.points.len(), 3);
}
