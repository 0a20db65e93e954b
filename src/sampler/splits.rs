use log::debug;
use machine_learning::dataset::Dataset;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{PatientSampler, SamplerErr, sample_example};
use crate::schema::ENCODED_WIDTH;

/// The amount of samples drawn for each split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitSizes {
    pub train: usize,
    pub valid: usize,
    pub test: usize,
}

impl Default for SplitSizes {
    fn default() -> Self {
        Self {
            train: 10_000,
            valid: 1_000,
            test: 1_000,
        }
    }
}

/// Independently drawn training, validation and test sets.
#[derive(Debug, Clone)]
pub struct Splits {
    pub train: Dataset,
    pub valid: Dataset,
    pub test: Dataset,
}

/// Draws every split from `sampler`, in `train`, `valid`, `test` order.
///
/// Splits are independent draws, not partitions of a common pool.
pub fn make_splits<R: Rng + ?Sized>(
    sampler: &PatientSampler,
    sizes: SplitSizes,
    rng: &mut R,
) -> Result<Splits, SamplerErr> {
    let SplitSizes { train, valid, test } = sizes;

    Ok(Splits {
        train: draw(sampler, train, rng)?,
        valid: draw(sampler, valid, rng)?,
        test: draw(sampler, test, rng)?,
    })
}

fn draw<R: Rng + ?Sized>(
    sampler: &PatientSampler,
    n: usize,
    rng: &mut R,
) -> Result<Dataset, SamplerErr> {
    let mut x = Vec::with_capacity(n * ENCODED_WIDTH);
    let mut y = Vec::with_capacity(n);

    for _ in 0..n {
        let example = sample_example(sampler, rng)?;
        x.extend_from_slice(example.feature.as_slice());
        y.push(if example.label { 1. } else { 0. });
    }

    let positives = y.iter().filter(|&&t| t == 1.).count();
    debug!(samples = n, positives = positives; "drew split");

    Ok(Dataset::new(x, y, ENCODED_WIDTH, 1)?)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn splits_have_the_requested_sizes() {
        let sampler = PatientSampler::new().unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let sizes = SplitSizes {
            train: 64,
            valid: 16,
            test: 0,
        };

        let splits = make_splits(&sampler, sizes, &mut rng).unwrap();

        assert_eq!(splits.train.len(), 64);
        assert_eq!(splits.valid.len(), 16);
        assert!(splits.test.is_empty());
        assert_eq!(splits.train.x_size(), ENCODED_WIDTH);
        assert!(splits.train.y().iter().all(|&t| t == 0. || t == 1.));
    }

    #[test]
    fn default_sizes() {
        assert_eq!(
            SplitSizes::default(),
            SplitSizes {
                train: 10_000,
                valid: 1_000,
                test: 1_000
            }
        );
    }
}
