use std::cell::RefCell;
use std::rc::Rc;

use bayesopt::prelude::*;

use crate::{bowl, fast, unit_square};

/// Slice sampler that logs the observation count at every call.
struct Recording {
    inner: SliceSampler,
    calls: Rc<RefCell<Vec<usize>>>,
}

impl HyperSampler for Recording {
    fn sample(
        &self,
        state: &SurrogateState,
        domain: &Domain,
        n_m: usize,
        previous: &[Hyperparameters],
        rng: &mut fastrand::Rng,
    ) -> Result<Vec<Hyperparameters>> {
        self.calls.borrow_mut().push(state.len());
        self.inner.sample(state, domain, n_m, previous, rng)
    }
}

#[test]
fn resampled_exactly_on_learn_interval() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut bo = fast(from_fn(bowl), unit_square())
        .config(
            BoConfig::builder()
                .method("EI")
                .n_m(3)
                .learn_interval(3)
                .build()
                .unwrap(),
        )
        .hyper_sampler(Recording {
            inner: SliceSampler::new().burn_in(3).thin(1),
            calls: Rc::clone(&calls),
        })
        .initial_design(vec![vec![0.5, 0.5]], vec![bowl(&[0.5, 0.5])])
        .build()
        .unwrap();

    // Once before the first iteration
    assert_eq!(*calls.borrow(), vec![1]);
    let mut previous = bo.state().hyperparameters().to_vec();
    let mut generation = bo.state().hyper_generation();

    for t in 1..=7_usize {
        bo.step().unwrap();
        let current = bo.state().hyperparameters().to_vec();
        if t % 3 == 0 {
            assert_eq!(bo.state().hyper_generation(), generation + 1, "t = {t}");
            generation += 1;
        } else {
            assert_eq!(current, previous, "hyperparameters changed at t = {t}");
            assert_eq!(bo.state().hyper_generation(), generation);
        }
        assert_eq!(current.len(), 3);
        previous = current;
    }
    // Observation counts seen by the sampler: initial, then after t = 3 and t = 6
    assert_eq!(*calls.borrow(), vec![1, 4, 7]);
}

#[test]
fn incremental_updates_match_full_rebuilds() {
    let run = |incremental: bool| {
        BayesOpt::builder(from_fn(bowl), unit_square())
            .config(
                BoConfig::builder()
                    .method("EI")
                    .n_m(2)
                    .epsilon(0.0)
                    .incremental_gram(incremental)
                    .build()
                    .unwrap(),
            )
            .optimizer(MultiStartOptimizer::new().n_random(40).n_restarts(2))
            .hyper_sampler(FixedHyperparameters(Hyperparameters::new(
                vec![0.3, 0.3],
                0.1,
                1e-4,
            )))
            .initial_design(vec![vec![0.1, 0.9]], vec![bowl(&[0.1, 0.9])])
            .build()
            .unwrap()
            .run(4)
            .unwrap()
    };
    let (full, incremental) = (run(false), run(true));
    for (a, b) in full.points.iter().zip(&incremental.points) {
        for (u, v) in a.iter().zip(b) {
            assert!((u - v).abs() < 1e-4, "{a:?} vs {b:?}");
        }
    }
    for (a, b) in full.guess_values.iter().zip(&incremental.guess_values) {
        assert!((a - b).abs() < 1e-6);
    }
}
