use std::num::NonZeroUsize;

use log::debug;
use rand::Rng;

use super::Cancellation;
use crate::{
    Result,
    arch::{Model, loss::LossFn},
    dataset::Dataset,
    optimization::Optimizer,
};

/// The outcome of a single pass over a dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    /// The amount of optimizer steps taken.
    pub batches: usize,
    /// The mean of the batch losses, `None` if no batch ran.
    pub mean_loss: Option<f32>,
    /// Whether the epoch stopped early because of a cancellation request.
    pub cancelled: bool,
}

/// Runs minibatch training epochs over a model whose parameters live outside of it.
pub struct ModelTrainer<L: LossFn> {
    loss_fn: L,
    batch_size: NonZeroUsize,
    grad: Vec<f32>,
}

impl<L: LossFn> ModelTrainer<L> {
    /// Returns a new `ModelTrainer`.
    ///
    /// # Arguments
    /// * `loss_fn` - The loss function used to measure the difference between a model's output and the expected one.
    /// * `batch_size` - The amount of samples per optimizer step.
    pub fn new(loss_fn: L, batch_size: NonZeroUsize) -> Self {
        Self {
            loss_fn,
            batch_size,
            grad: Vec::new(),
        }
    }

    pub fn batch_size(&self) -> NonZeroUsize {
        self.batch_size
    }

    /// Performs one epoch: shuffles the dataset and takes one optimizer step per full batch.
    /// The trailing partial batch is skipped.
    ///
    /// `cancel` is polled before every batch; once raised the epoch returns right away with
    /// whatever progress was made, leaving `params` consistent.
    ///
    /// # Arguments
    /// * `model` - The model being trained.
    /// * `params` - The model's parameters, updated in place.
    /// * `optimizer` - The optimizer applying each gradient.
    /// * `dataset` - The training samples.
    /// * `rng` - The random number generator driving the shuffle.
    /// * `cancel` - The cooperative stop flag.
    pub fn epoch<M, O, R>(
        &mut self,
        model: &mut M,
        params: &mut [f32],
        optimizer: &mut O,
        dataset: &mut Dataset,
        rng: &mut R,
        cancel: &Cancellation,
    ) -> Result<EpochStats>
    where
        M: Model,
        O: Optimizer,
        R: Rng + ?Sized,
    {
        self.grad.resize(model.size(), 0.);
        dataset.shuffle(rng);

        let mut batches = 0;
        let mut total_loss = 0.;
        let mut cancelled = false;

        for (x, y) in dataset.batches(self.batch_size, true) {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let loss = model.backprop(params, &mut self.grad, &self.loss_fn, x, y)?;
            optimizer.update_params(&self.grad, params)?;

            total_loss += loss;
            batches += 1;
        }

        let mean_loss = (batches > 0).then(|| total_loss / batches as f32);
        debug!(batches = batches, cancelled = cancelled; "epoch finished");

        Ok(EpochStats {
            batches,
            mean_loss,
            cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        arch::{Sequential, activations::ActFn, layers::Layer, loss::BceWithLogits},
        optimization::Adam,
    };

    fn separable() -> Dataset {
        let mut x = Vec::new();
        let mut y = Vec::new();

        for i in 0..64 {
            let v = i as f32 / 32. - 1.;
            x.extend([v, -v]);
            y.push(if v > 0. { 1. } else { 0. });
        }

        Dataset::new(x, y, 2, 1).unwrap()
    }

    fn setup() -> (Sequential, Vec<f32>, Adam, StdRng) {
        let mut rng = StdRng::seed_from_u64(3);
        let mut model = Sequential::new([
            Layer::dense((2, 4), Some(ActFn::relu())),
            Layer::dense((4, 1), None),
        ]);
        let params = model.init_params(&mut rng).unwrap();
        let adam = Adam::with_learning_rate(params.len(), 0.05).unwrap();
        (model, params, adam, rng)
    }

    #[test]
    fn loss_goes_down() {
        let (mut model, mut params, mut adam, mut rng) = setup();
        let mut dataset = separable();
        let mut trainer = ModelTrainer::new(BceWithLogits, NonZeroUsize::new(8).unwrap());
        let cancel = Cancellation::new();

        let mut losses = Vec::new();
        for _ in 0..10 {
            let stats = trainer
                .epoch(&mut model, &mut params, &mut adam, &mut dataset, &mut rng, &cancel)
                .unwrap();
            assert_eq!(stats.batches, 8);
            losses.push(stats.mean_loss.unwrap());
        }

        assert!(losses[9] < losses[0]);
    }

    #[test]
    fn trailing_batch_is_skipped() {
        let (mut model, mut params, mut adam, mut rng) = setup();
        let mut dataset = separable();
        let mut trainer = ModelTrainer::new(BceWithLogits, NonZeroUsize::new(10).unwrap());

        let stats = trainer
            .epoch(
                &mut model,
                &mut params,
                &mut adam,
                &mut dataset,
                &mut rng,
                &Cancellation::new(),
            )
            .unwrap();

        assert_eq!(stats.batches, 6);
        assert!(!stats.cancelled);
    }

    #[test]
    fn cancelled_epoch_leaves_params_untouched() {
        let (mut model, mut params, mut adam, mut rng) = setup();
        let before = params.clone();
        let mut dataset = separable();
        let mut trainer = ModelTrainer::new(BceWithLogits, NonZeroUsize::new(8).unwrap());
        let cancel = Cancellation::new();
        cancel.cancel();

        let stats = trainer
            .epoch(&mut model, &mut params, &mut adam, &mut dataset, &mut rng, &cancel)
            .unwrap();

        assert_eq!(
            stats,
            EpochStats {
                batches: 0,
                mean_loss: None,
                cancelled: true
            }
        );
        assert_eq!(params, before);
    }
}
