use std::num::NonZeroUsize;

use machine_learning::{
    MlErr, Result,
    arch::{
        Model, Sequential,
        activations::{ActFn, sigmoid},
        layers::Layer,
    },
};
use ndarray::{Array1, ArrayView2, Axis, aview2};
use rand::Rng;

use crate::{encoder::EncodedFeature, schema::ENCODED_WIDTH};

pub const DEFAULT_HIDDEN_SIZE: usize = 20;
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// A two layer perceptron mapping an encoded record to an infection logit:
/// `Dense(ENCODED_WIDTH -> hidden, ReLU) -> Dense(hidden -> 1)`.
///
/// The parameters are stored flat, layer after layer, each one as `[weights (in x out) | bias]`.
#[derive(Debug, Clone)]
pub struct Classifier {
    net: Sequential,
    params: Vec<f32>,
    hidden_size: NonZeroUsize,
}

impl Classifier {
    /// Creates a new `Classifier` with freshly initialized parameters.
    pub fn new<R: Rng + ?Sized>(hidden_size: NonZeroUsize, rng: &mut R) -> Result<Self> {
        let net = Self::architecture(hidden_size);
        let params = net.init_params(rng)?;

        Ok(Self {
            net,
            params,
            hidden_size,
        })
    }

    /// Builds a `Classifier` around existing parameters.
    ///
    /// # Returns
    /// A size mismatch error if `params` doesn't fit a network of `hidden_size` hidden units.
    pub fn from_params(hidden_size: NonZeroUsize, params: Vec<f32>) -> Result<Self> {
        let net = Self::architecture(hidden_size);

        if params.len() != net.size() {
            return Err(MlErr::SizeMismatch {
                what: "classifier parameters",
                got: params.len(),
                expected: net.size(),
            });
        }

        Ok(Self {
            net,
            params,
            hidden_size,
        })
    }

    fn architecture(hidden_size: NonZeroUsize) -> Sequential {
        let hidden = hidden_size.get();

        Sequential::new([
            Layer::dense((ENCODED_WIDTH, hidden), Some(ActFn::relu())),
            Layer::dense((hidden, 1), None),
        ])
    }

    /// The amount of parameters of a classifier with `hidden_size` hidden units.
    pub fn param_count(hidden_size: NonZeroUsize) -> usize {
        let hidden = hidden_size.get();
        (ENCODED_WIDTH + 1) * hidden + hidden + 1
    }

    pub fn hidden_size(&self) -> NonZeroUsize {
        self.hidden_size
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    /// Splits the classifier into its network and its parameters for training.
    pub fn parts_mut(&mut self) -> (&mut Sequential, &mut [f32]) {
        (&mut self.net, &mut self.params)
    }

    /// Computes the logits of a batch of encoded records, one per row.
    pub fn logits(&self, x: ArrayView2<f32>) -> Result<Array1<f32>> {
        let out = self.net.infer(&self.params, x)?;
        Ok(out.index_axis_move(Axis(1), 0))
    }

    /// Computes the logit of a single record.
    pub fn forward(&self, feature: &EncodedFeature) -> Result<f32> {
        let x = aview2(std::slice::from_ref(feature.as_array()));
        let logits = self.logits(x)?;
        Ok(logits[0])
    }

    /// The estimated probability of infection.
    pub fn probability(&self, feature: &EncodedFeature) -> Result<f32> {
        self.forward(feature).map(sigmoid)
    }

    pub fn predict(&self, feature: &EncodedFeature, threshold: f32) -> Result<bool> {
        Ok(self.probability(feature)? >= threshold)
    }
}
