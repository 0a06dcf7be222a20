#![allow(clippy::cast_precision_loss)]

mod errors;
mod exploit;
mod history;
mod refresh;
mod resume;

use bayesopt::prelude::*;

/// Small settings so that every method finishes quickly.
pub fn fast<O: Objective>(objective: O, domain: Domain) -> BayesOptBuilder<O> {
    let config = BoConfig::builder()
        .n_m(2)
        .n_k(2)
        .n_features(100)
        .learn_interval(2)
        .seed(5)
        .build()
        .unwrap();
    BayesOpt::builder(objective, domain)
        .config(config)
        .optimizer(MultiStartOptimizer::new().n_random(40).n_restarts(2))
        .hyper_sampler(SliceSampler::new().burn_in(5).thin(1))
}

pub fn unit_square() -> Domain {
    Domain::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap()
}

pub fn bowl(x: &[f64]) -> f64 {
    -(x[0] - 0.3).powi(2) - (x[1] - 0.6).powi(2)
}
