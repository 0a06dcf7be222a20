use bayesopt::prelude::*;

use crate::{bowl, fast, unit_square};

fn with_epsilon(method: &str, epsilon: f64) -> BayesOpt<impl Objective> {
    fast(from_fn(bowl), unit_square())
        .config(
            BoConfig::builder()
                .method(method)
                .n_m(2)
                .n_k(2)
                .n_features(50)
                .epsilon(epsilon)
                .build()
                .unwrap(),
        )
        .initial_design(
            vec![vec![0.1, 0.1], vec![0.9, 0.9]],
            vec![bowl(&[0.1, 0.1]), bowl(&[0.9, 0.9])],
        )
        .build()
        .unwrap()
}

#[test]
fn epsilon_zero_never_exploits() {
    let mut bo = with_epsilon("UCB", 0.0);
    for _ in 0..5 {
        assert!(!bo.step().unwrap().exploited);
    }
}

#[test]
fn epsilon_one_always_evaluates_the_mean_maximizer() {
    for method in ["JES", "UCB", "PI"] {
        let mut bo = with_epsilon(method, 1.0);
        for _ in 0..3 {
            let before = bo.state().clone();
            let incumbent = bo.incumbent().unwrap().0.to_vec();
            let record = bo.step().unwrap();
            assert!(record.exploited, "{method}");
            // The evaluated point is at least as good under the old posterior
            // mean as the incumbent it was seeded with.
            assert!(
                before.mean(&record.x) >= before.mean(&incumbent) - 1e-9,
                "{method}: {:?} worse than incumbent {:?}",
                record.x,
                incumbent
            );
        }
    }
}
