use ndarray::{Array2, ArrayView2, Zip};

use super::LossFn;
use crate::arch::activations::sigmoid;

/// Binary cross entropy computed straight from logits, averaged over the batch.
///
/// Fuses the sigmoid and the log loss as `max(z, 0) - z * y + ln(1 + e^-|z|)`, which stays finite
/// for logits of any magnitude.
#[derive(Default, Clone, Copy, Debug)]
pub struct BceWithLogits;

impl BceWithLogits {
    /// Returns a new `BceWithLogits`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for BceWithLogits {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        if y_pred.is_empty() {
            return 0.;
        }

        let total = Zip::from(&y_pred)
            .and(&y)
            .fold(0., |acc, &z, &t| {
                acc + z.max(0.) - z * t + (-z.abs()).exp().ln_1p()
            });

        total / y_pred.len() as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let n = y_pred.len().max(1) as f32;
        Zip::from(&y_pred)
            .and(&y)
            .map_collect(|&z, &t| (sigmoid(z) - t) / n)
    }
}
