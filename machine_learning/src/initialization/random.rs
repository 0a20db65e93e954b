use rand::Rng;
use rand_distr::{Distribution, Uniform};

use super::{ParamGen, RandErr};

/// A parameter generator that follows a certain probabilistic distribution.
pub struct RandParamGen<D: Distribution<f32>> {
    distribution: D,
    remaining: usize,
}

impl<D: Distribution<f32>> RandParamGen<D> {
    fn new(distribution: D, limit: usize) -> Self {
        Self {
            distribution,
            remaining: limit,
        }
    }
}

impl RandParamGen<Uniform<f32>> {
    /// Creates a new `RandParamGen` parameter generator with a uniform distribution.
    ///
    /// # Arguments
    /// * `limit` - The maximum amount of numbers to generate.
    /// * `low` - The inclusive lower limit.
    /// * `high` - The exclusive upper limit.
    ///
    /// # Returns
    /// An error if the range is invalid (low >= high or not finite).
    pub fn uniform(limit: usize, low: f32, high: f32) -> Result<Self, RandErr> {
        Ok(Self::new(Uniform::new(low, high)?, limit))
    }

    /// Creates a new `RandParamGen` parameter generator drawing from `U(-1/sqrt(fan_in), 1/sqrt(fan_in))`,
    /// the usual default for linear layers.
    ///
    /// # Arguments
    /// * `limit` - The maximum amount of numbers to generate.
    /// * `fan_in` - The number of input units in the weight tensor.
    ///
    /// # Returns
    /// An error if the calculated range is invalid (`fan_in` is zero).
    pub fn fan_in_uniform(limit: usize, fan_in: usize) -> Result<Self, RandErr> {
        let bound = 1. / (fan_in as f32).sqrt();
        Self::uniform(limit, -bound, bound)
    }
}

impl<D: Distribution<f32>> ParamGen for RandParamGen<D> {
    fn sample<R: Rng + ?Sized>(&mut self, rng: &mut R, mut n: usize) -> Option<Vec<f32>> {
        if self.remaining == 0 {
            return None;
        }

        n = n.min(self.remaining);
        self.remaining -= n;

        let sample = (0..n).map(|_| self.distribution.sample(rng)).collect();
        Some(sample)
    }
}
