use std::{num::NonZeroUsize, time::Duration};

use infection_risk::{
    classifier::Classifier,
    config::EvaluatorConfig,
    encoder::encode,
    inference::estimate,
    record::PatientRecord,
    sampler::{PatientSampler, SplitSizes, make_splits},
    schema::*,
    training::train,
};
use machine_learning::{optimization::Adam, training::Cancellation};
use rand::{SeedableRng, rngs::StdRng};

fn config(epochs: usize) -> EvaluatorConfig {
    EvaluatorConfig {
        seed: Some(2024),
        epochs,
        splits: SplitSizes {
            train: 2_000,
            valid: 500,
            test: 500,
        },
        ..Default::default()
    }
}

fn severe_case() -> PatientRecord {
    PatientRecord::new()
        .with(GENDER, 0.)
        .with(AGE, 70.)
        .with(CONTACT_HISTORY, 1.)
        .with(ACID_TEST, 1.)
        .with(X_RAY, 1.)
        .with(WBC, 2.)
        .with(RBC, 2.)
        .with(HGB, 100.)
}

#[test]
fn training_lowers_the_loss_and_flags_the_severe_case() {
    let config = EvaluatorConfig {
        seed: Some(1),
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(config.seed.unwrap());
    let sampler = PatientSampler::new().unwrap();
    let mut classifier = Classifier::new(config.hidden_size, &mut rng).unwrap();
    let mut splits = make_splits(&sampler, config.splits, &mut rng).unwrap();
    let mut adam =
        Adam::with_learning_rate(classifier.params().len(), config.learning_rate).unwrap();

    let report = train(
        &mut classifier,
        &mut adam,
        &mut splits,
        &config,
        &mut rng,
        &Cancellation::new(),
    )
    .unwrap();

    assert_eq!(report.epochs.len(), config.epochs);
    let first = report.epochs[0].mean_loss;
    let last = report.epochs[config.epochs - 1].mean_loss;
    assert!(last < first, "loss went from {first:?} to {last:?}");
    assert!(report.test_accuracy > 0.9, "got {}", report.test_accuracy);

    let probability = estimate(&classifier, &severe_case()).unwrap();
    assert!(probability > 0.99, "got {probability}");

    let feature = encode(&severe_case()).unwrap();
    assert!(classifier.predict(&feature, config.threshold).unwrap());
}

#[test]
fn same_seed_same_model() {
    let run = || {
        let config = EvaluatorConfig {
            splits: SplitSizes {
                train: 128,
                valid: 32,
                test: 32,
            },
            ..config(2)
        };
        let mut rng = StdRng::seed_from_u64(7);
        let sampler = PatientSampler::new().unwrap();
        let mut splits = make_splits(&sampler, config.splits, &mut rng).unwrap();
        let mut classifier = Classifier::new(config.hidden_size, &mut rng).unwrap();
        let mut adam =
            Adam::with_learning_rate(classifier.params().len(), config.learning_rate).unwrap();
        let cancel = Cancellation::new();

        train(&mut classifier, &mut adam, &mut splits, &config, &mut rng, &cancel).unwrap();
        classifier.params().to_vec()
    };

    assert_eq!(run(), run());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelling_from_another_task_still_tests() {
    let config = EvaluatorConfig {
        epochs: 10_000,
        ..config(1)
    };
    let cancel = Cancellation::new();

    let run = {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let mut rng = StdRng::seed_from_u64(3);
            let sampler = PatientSampler::new().unwrap();
            let mut splits = make_splits(&sampler, config.splits, &mut rng).unwrap();
            let hidden = NonZeroUsize::new(4).unwrap();
            let mut classifier = Classifier::new(hidden, &mut rng).unwrap();
            let mut adam = Adam::with_learning_rate(classifier.params().len(), 1e-3).unwrap();

            train(&mut classifier, &mut adam, &mut splits, &config, &mut rng, &cancel)
        })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    cancel.cancel();

    let report = run.await.unwrap().unwrap();
    assert!(report.cancelled);
    assert!(report.epochs.len() < 10_000);
    assert!((0. ..=1.).contains(&report.test_accuracy));
}
