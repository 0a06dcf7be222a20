use bayesopt::acquisition::ucb_beta;
use bayesopt::prelude::*;
use bayesopt::surrogate::kernel::gram;
use nalgebra::DMatrix;

use crate::{bowl, fast, unit_square};

#[test]
fn ucb_end_to_end_on_unit_square() {
    let config = BoConfig::builder()
        .method("UCB")
        .epsilon(0.0)
        .n_m(2)
        .learn_interval(2)
        .seed(5)
        .build()
        .unwrap();
    let start = vec![0.5, 0.5];
    let mut bo = BayesOpt::builder(from_fn(bowl), unit_square())
        .config(config)
        .optimizer(MultiStartOptimizer::new().n_random(40).n_restarts(2))
        .hyper_sampler(SliceSampler::new().burn_in(5).thin(1))
        .initial_design(vec![start.clone()], vec![bowl(&start)])
        .build()
        .unwrap();

    // UCB score of the single-observation model that picks the first point.
    let fitted = bo.state().clone();
    let beta = ucb_beta(1, 2, unit_square().diameter());
    let ucb = |x: &[f64]| {
        (0..fitted.n_samples())
            .map(|m| {
                let (mean, var) = fitted.predict_sample(m, x);
                mean + beta * var.sqrt()
            })
            .sum::<f64>()
            / fitted.n_samples() as f64
    };

    let first = bo.step().unwrap();
    assert_eq!(first.t, 1);
    assert!(!first.exploited);
    assert!(first.acquisition_value.is_none());
    assert!(
        ucb(&first.x) >= ucb(&start) - 1e-12,
        "first point {:?} scores below the initial point",
        first.x
    );

    let result = bo.run(4).unwrap();
    assert_eq!(result.points.len(), 6);
    assert_eq!(result.values.len(), 6);
    assert_eq!(result.guesses.len(), 6);
    assert_eq!(result.guess_values.len(), 6);
    assert_eq!(result.inference_values.len(), 6);
    assert_eq!(result.choose_time.len(), 5);
    assert_eq!(result.extra_time.len(), 5);
    assert_eq!(result.points[0], start);
    assert_eq!(result.points[1], first.x);
    for x in result.points.iter().chain(&result.guesses) {
        assert!(unit_square().contains(x), "{x:?} left the domain");
    }
}

#[test]
fn histories_grow_by_one_per_step() {
    let initial = vec![vec![0.1, 0.1], vec![0.8, 0.4], vec![0.5, 0.9]];
    let values = initial.iter().map(|x| bowl(x)).collect();
    let mut bo = fast(from_fn(bowl), unit_square())
        .method("EI")
        .initial_design(initial, values)
        .build()
        .unwrap();

    assert_eq!(bo.guesses().len(), 3);
    for t in 1..=4 {
        let record = bo.step().unwrap();
        assert_eq!(record.t, t);
        assert_eq!(bo.iteration(), t);
        assert_eq!(bo.state().len(), 3 + t);
        assert_eq!(bo.guesses().len(), 3 + t);
        assert!((record.value - bowl(&record.x)).abs() < 1e-12);
        assert_eq!(bo.incumbent().unwrap().0, record.incumbent.as_slice());
    }
}

#[test]
fn caches_invert_gram_throughout_the_run() {
    let mut bo = fast(from_fn(bowl), unit_square())
        .method("PI")
        .build()
        .unwrap();
    for _ in 0..4 {
        bo.step().unwrap();
        let state = bo.state();
        let n = state.len();
        for m in 0..state.n_samples() {
            let k = gram(state.points(), &state.hyperparameters()[m]);
            let prod = state.inverse_gram(m).unwrap() * k;
            let err = (prod - DMatrix::<f64>::identity(n, n)).amax();
            assert!(err < 1e-5, "sample {m}: |K⁻¹K - I| = {err}");
        }
    }
}

#[test]
fn default_initial_design_is_one_random_point() {
    let result = fast(from_fn(bowl), unit_square())
        .method("UCB")
        .build()
        .unwrap()
        .run(1)
        .unwrap();
    assert_eq!(result.points.len(), 2);
    assert_eq!(result.guesses[0], result.points[0]);
}

#[test]
fn same_seed_same_run() {
    let run = || {
        fast(from_fn(bowl), unit_square())
            .method("MES-R")
            .build()
            .unwrap()
            .run(3)
            .unwrap()
    };
    let (a, b) = (run(), run());
    assert_eq!(a.points, b.points);
    assert_eq!(a.guesses, b.guesses);
}

#[test]
fn inference_objective_scores_incumbents() {
    let result = fast(from_fn(bowl), unit_square())
        .method("EI")
        .inference(from_fn(|x: &[f64]| x[0] + x[1]))
        .build()
        .unwrap()
        .run(2)
        .unwrap();
    for (x, v) in result.guesses.iter().zip(&result.inference_values) {
        assert!((v - (x[0] + x[1])).abs() < 1e-12);
    }
}

#[test]
fn convenience_function_matches_builder_shape() {
    let config = BoConfig::builder()
        .method("UCB")
        .n_m(2)
        .seed(3)
        .build()
        .unwrap();
    let result = maximize(
        from_fn(bowl),
        vec![0.0, 0.0],
        vec![1.0, 1.0],
        2,
        vec![vec![0.5, 0.5]],
        vec![bowl(&[0.5, 0.5])],
        config,
    )
    .unwrap();
    assert_eq!(result.points.len(), 3);
    assert_eq!(result.iterations(), 2);
}

#[test]
fn every_method_completes_an_iteration() {
    for method in AcquisitionMethod::ALL {
        let mut bo = fast(from_fn(bowl), unit_square())
            .config(
                BoConfig::builder()
                    .acquisition(method)
                    .n_m(2)
                    .n_k(2)
                    .n_features(50)
                    .epsilon(0.0)
                    .build()
                    .unwrap(),
            )
            .initial_design(vec![vec![0.2, 0.2]], vec![bowl(&[0.2, 0.2])])
            .build()
            .unwrap();
        let record = bo.step().unwrap();
        assert!(unit_square().contains(&record.x), "{method}: {:?}", record.x);
        assert_eq!(
            record.acquisition_value.is_some(),
            method.is_information_theoretic(),
            "{method}"
        );
    }
}
