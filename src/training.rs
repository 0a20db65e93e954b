use std::num::NonZeroUsize;

use log::{info, warn};
use machine_learning::{
    MlErr,
    arch::{activations::sigmoid, loss::BceWithLogits},
    dataset::Dataset,
    optimization::Adam,
    training::{Cancellation, ModelTrainer},
};
use rand::Rng;

use crate::{Result, classifier::Classifier, config::EvaluatorConfig, sampler::Splits};

/// Metrics of one completed epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    pub mean_loss: f32,
    pub valid_accuracy: f32,
}

/// The outcome of a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    /// The epochs that ran to completion, in order.
    pub epochs: Vec<EpochReport>,
    pub test_accuracy: f32,
    /// Whether the run was stopped before its last epoch.
    pub cancelled: bool,
}

/// Trains `classifier` on `splits.train` with Adam and binary cross entropy.
///
/// Every epoch shuffles the training split and takes one step per full batch, then measures the
/// accuracy on `splits.valid`. Raising `cancel` stops the loop at the next batch boundary; the
/// interrupted epoch isn't validated. The test accuracy is measured in every case.
///
/// # Arguments
/// * `classifier` - The classifier to fit, updated in place.
/// * `optimizer` - The optimizer, its state carries over between calls.
/// * `splits` - The datasets to train, validate and test with.
/// * `config` - Epochs, batch sizes and decision threshold.
/// * `rng` - Drives the shuffles.
/// * `cancel` - The cooperative stop flag.
pub fn train<R: Rng + ?Sized>(
    classifier: &mut Classifier,
    optimizer: &mut Adam,
    splits: &mut Splits,
    config: &EvaluatorConfig,
    rng: &mut R,
    cancel: &Cancellation,
) -> Result<TrainReport> {
    let mut trainer = ModelTrainer::new(BceWithLogits::new(), config.train_batch_size);
    let mut epochs = Vec::with_capacity(config.epochs);
    let mut cancelled = false;

    for epoch in 0..config.epochs {
        let stats = {
            let (net, params) = classifier.parts_mut();
            trainer.epoch(net, params, optimizer, &mut splits.train, rng, cancel)?
        };

        if stats.cancelled {
            warn!(epoch = epoch, batches = stats.batches; "training interrupted");
            cancelled = true;
            break;
        }

        let Some(mean_loss) = stats.mean_loss else {
            return Err(MlErr::EmptyDataset.into());
        };

        let valid_accuracy = evaluate(
            classifier,
            &splits.valid,
            config.eval_batch_size,
            config.threshold,
        )?;
        info!(epoch = epoch, mean_loss = mean_loss, valid_accuracy = valid_accuracy; "epoch done");

        epochs.push(EpochReport {
            epoch,
            mean_loss,
            valid_accuracy,
        });
    }

    let test_accuracy = evaluate(
        classifier,
        &splits.test,
        config.eval_batch_size,
        config.threshold,
    )?;
    info!(test_accuracy = test_accuracy; "training finished");

    Ok(TrainReport {
        epochs,
        test_accuracy,
        cancelled,
    })
}

/// Measures the fraction of samples whose thresholded prediction matches the target.
///
/// Samples are visited in order and the last batch is kept even if incomplete.
pub fn evaluate(
    classifier: &Classifier,
    dataset: &Dataset,
    batch_size: NonZeroUsize,
    threshold: f32,
) -> Result<f32> {
    if dataset.is_empty() {
        return Err(MlErr::EmptyDataset.into());
    }

    let mut correct = 0;

    for (x, y) in dataset.batches(batch_size, false) {
        let logits = classifier.logits(x)?;
        correct += logits
            .iter()
            .zip(y.column(0))
            .filter(|&(&z, &t)| (sigmoid(z) >= threshold) == (t == 1.))
            .count();
    }

    Ok(correct as f32 / dataset.len() as f32)
}
