use std::num::NonZeroUsize;

use infection_risk::{
    classifier::Classifier,
    config::EvaluatorConfig,
    encoder::encode,
    persistence::{ArtifactErr, load, save},
    record::PatientRecord,
    sampler::{PatientSampler, SplitSizes, make_splits},
    schema::*,
    training::train,
};
use machine_learning::{
    optimization::{Adam, Optimizer},
    training::Cancellation,
};
use rand::{SeedableRng, rngs::StdRng};

fn hidden(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

fn probe() -> PatientRecord {
    PatientRecord::new()
        .with(GENDER, 1.)
        .with(AGE, 48.)
        .with(CONTACT_HISTORY, 1.)
        .with(ACID_TEST, 0.)
        .with(X_RAY, 0.)
        .with(WBC, 14.2)
        .with(RBC, 19.9)
        .with(HGB, 141.3)
}

fn trained(h: usize) -> (Classifier, Adam) {
    let config = EvaluatorConfig {
        hidden_size: hidden(h),
        epochs: 1,
        splits: SplitSizes {
            train: 160,
            valid: 16,
            test: 16,
        },
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(99);
    let sampler = PatientSampler::new().unwrap();
    let mut splits = make_splits(&sampler, config.splits, &mut rng).unwrap();
    let mut classifier = Classifier::new(config.hidden_size, &mut rng).unwrap();
    let mut adam =
        Adam::with_learning_rate(classifier.params().len(), config.learning_rate).unwrap();

    let cancel = Cancellation::new();
    train(&mut classifier, &mut adam, &mut splits, &config, &mut rng, &cancel).unwrap();
    (classifier, adam)
}

#[test]
fn reloaded_model_answers_the_same() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.safetensors");
    let (classifier, adam) = trained(20);

    save(&path, &classifier, &adam).unwrap();
    let (loaded, _) = load(&path, hidden(20)).unwrap();

    let feature = encode(&probe()).unwrap();
    let before = classifier.forward(&feature).unwrap();
    let after = loaded.forward(&feature).unwrap();
    assert!((before - after).abs() <= 1e-6);
}

#[test]
fn resumed_training_matches_uninterrupted_training() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.safetensors");
    let (mut classifier, mut adam) = trained(6);

    save(&path, &classifier, &adam).unwrap();
    let (mut resumed, mut resumed_adam) = load(&path, hidden(6)).unwrap();
    assert_eq!(resumed_adam, adam);

    let grad: Vec<f32> = (0..classifier.params().len())
        .map(|i| (i as f32 * 0.37).sin())
        .collect();

    let (_, params) = classifier.parts_mut();
    adam.update_params(&grad, params).unwrap();
    let (_, params) = resumed.parts_mut();
    resumed_adam.update_params(&grad, params).unwrap();

    assert_eq!(classifier.params(), resumed.params());
}

#[test]
fn different_hidden_size_is_a_schema_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.safetensors");
    let (classifier, adam) = trained(20);
    save(&path, &classifier, &adam).unwrap();

    let err = load(&path, hidden(10)).unwrap_err();
    assert!(matches!(err, ArtifactErr::SchemaMismatch { .. }), "got {err}");
}

#[test]
fn missing_artifact_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load(dir.path().join("nope.safetensors"), hidden(20)).unwrap_err();
    assert!(matches!(err, ArtifactErr::Io(_)));
}

#[test]
fn saving_replaces_the_previous_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.safetensors");

    let (first, first_adam) = trained(3);
    save(&path, &first, &first_adam).unwrap();

    let mut rng = StdRng::seed_from_u64(5);
    let second = Classifier::new(hidden(3), &mut rng).unwrap();
    let second_adam = Adam::with_learning_rate(second.params().len(), 0.5).unwrap();
    save(&path, &second, &second_adam).unwrap();

    let (loaded, loaded_adam) = load(&path, hidden(3)).unwrap();
    assert_eq!(loaded.params(), second.params());
    assert_eq!(loaded_adam.learning_rate(), 0.5);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}
