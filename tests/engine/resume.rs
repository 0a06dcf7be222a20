use bayesopt::prelude::*;

use crate::{bowl, fast, unit_square};

#[test]
fn resumed_run_keeps_previous_observations() {
    let first = fast(from_fn(bowl), unit_square())
        .method("EI")
        .build()
        .unwrap()
        .run(3)
        .unwrap();

    let second = fast(from_fn(bowl), unit_square())
        .method("EI")
        .resume_from(&first)
        .build()
        .unwrap()
        .run(2)
        .unwrap();

    assert_eq!(second.points.len(), first.points.len() + 2);
    assert_eq!(&second.points[..first.points.len()], first.points.as_slice());
    assert_eq!(&second.values[..first.values.len()], first.values.as_slice());
    assert_eq!(&second.guesses[..first.guesses.len()], first.guesses.as_slice());
    assert_eq!(
        &second.guess_values[..first.guess_values.len()],
        first.guess_values.as_slice()
    );
    assert_eq!(&second.choose_time[..3], first.choose_time.as_slice());
    assert_eq!(second.iterations(), 5);
}

#[test]
fn resumed_run_continues_the_iteration_count() {
    let first = fast(from_fn(bowl), unit_square())
        .method("UCB")
        .build()
        .unwrap()
        .run(3)
        .unwrap();

    let mut bo = fast(from_fn(bowl), unit_square())
        .method("UCB")
        .resume_from(&first)
        .build()
        .unwrap();
    assert_eq!(bo.iteration(), 3);
    assert_eq!(bo.guesses(), first.guesses.as_slice());
    let last = first.guesses.len() - 1;
    assert_eq!(
        bo.incumbent(),
        Some((first.guesses[last].as_slice(), first.guess_values[last]))
    );
    assert_eq!(bo.step().unwrap().t, 4);
}

#[test]
fn inconsistent_result_cannot_be_resumed() {
    let mut first = fast(from_fn(bowl), unit_square())
        .method("EI")
        .build()
        .unwrap()
        .run(2)
        .unwrap();
    first.guesses.pop();

    let err = fast(from_fn(bowl), unit_square())
        .method("EI")
        .resume_from(&first)
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn initial_design_replaces_a_resumed_run() {
    let first = fast(from_fn(bowl), unit_square())
        .method("EI")
        .build()
        .unwrap()
        .run(2)
        .unwrap();

    let bo = fast(from_fn(bowl), unit_square())
        .method("EI")
        .resume_from(&first)
        .initial_design(vec![vec![0.2, 0.2]], vec![bowl(&[0.2, 0.2])])
        .build()
        .unwrap();
    assert_eq!(bo.iteration(), 0);
    assert_eq!(bo.state().len(), 1);
}

#[cfg(feature = "serde")]
#[test]
fn resume_from_saved_snapshot() {
    let dir = std::env::temp_dir().join("bayesopt_resume_test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("run.json");

    let first = fast(from_fn(bowl), unit_square())
        .method("UCB")
        .build()
        .unwrap()
        .run(2)
        .unwrap();
    first.save(&path).unwrap();

    let loaded = BoResult::load(&path).unwrap();
    assert_eq!(loaded, first);

    let mut bo = fast(from_fn(bowl), unit_square())
        .method("UCB")
        .resume_from(&loaded)
        .build()
        .unwrap();
    assert_eq!(bo.state().len(), 3);
    bo.step().unwrap();
    assert_eq!(bo.state().len(), 4);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[cfg(feature = "serde")]
#[test]
fn config_survives_json() {
    let config = BoConfig::builder()
        .method("MES-G")
        .epsilon(0.25)
        .normalize(true)
        .build()
        .unwrap();
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"MES-G\""));
    let back: BoConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
    assert!(serde_json::from_str::<BoConfig>(r#"{"method":"mes-g"}"#).is_err());
}
