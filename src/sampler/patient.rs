use log::trace;
use rand::{
    Rng,
    distr::{Bernoulli, Distribution, weighted::WeightedIndex},
};
use rand_distr::{Gamma, Normal};

use super::{SamplerErr, risk::Vitals};
use crate::{
    encoder::{EncodedFeature, encode},
    record::PatientRecord,
};

/// Relative frequency of each 5-year age band, from 0-4 up to 95-99.
const AGE_BANDS: [f64; 20] = [
    45., 45., 42., 41., 48., 63., 58., 48., 56., 62., 56., 43., 40., 31., 19., 14., 10., 8., 3., 1.,
];
const AGE_BAND_WIDTH: usize = 5;

const BLOOD_COUNT_SHAPE: f64 = 9.;
const BLOOD_COUNT_RATE: f64 = 0.5;
const HGB_MEAN: f64 = 140.;
const HGB_VARIANCE: f64 = 20.;

/// A synthetic patient together with the outcome drawn for them.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledPatient {
    pub record: PatientRecord,
    /// The ground truth probability the label was drawn with.
    pub probability: f64,
    pub label: bool,
}

/// An encoded input and its binary target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledExample {
    pub feature: EncodedFeature,
    pub label: bool,
}

/// Draws independent synthetic patients, every field from its own fixed distribution.
#[derive(Debug, Clone)]
pub struct PatientSampler {
    coin: Bernoulli,
    age: WeightedIndex<f64>,
    blood_count: Gamma<f64>,
    hgb: Normal<f64>,
}

impl PatientSampler {
    /// Creates a new `PatientSampler`.
    ///
    /// Ages follow a piecewise constant histogram over `0..100`, `wbc` and `rbc` a
    /// Gamma(9, rate 0.5) and `hgb` a Normal with mean 140 and variance 20. The remaining fields
    /// are fair coins.
    pub fn new() -> Result<Self, SamplerErr> {
        let coin = Bernoulli::new(0.5).map_err(SamplerErr::distribution("coin"))?;

        let total: f64 = AGE_BANDS.iter().sum::<f64>() * AGE_BAND_WIDTH as f64;
        let age_weights = AGE_BANDS
            .iter()
            .flat_map(|w| [w / total; AGE_BAND_WIDTH]);
        let age = WeightedIndex::new(age_weights).map_err(SamplerErr::distribution("age"))?;

        let blood_count = Gamma::new(BLOOD_COUNT_SHAPE, 1. / BLOOD_COUNT_RATE)
            .map_err(SamplerErr::distribution("blood count"))?;
        let hgb = Normal::new(HGB_MEAN, HGB_VARIANCE.sqrt())
            .map_err(SamplerErr::distribution("hgb"))?;

        Ok(Self {
            coin,
            age,
            blood_count,
            hgb,
        })
    }

    fn flip<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.coin.sample(rng) { 1. } else { 0. }
    }
}

impl Distribution<SampledPatient> for PatientSampler {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SampledPatient {
        let vitals = Vitals {
            gender: self.flip(rng),
            age: self.age.sample(rng) as f64,
            contact_history: self.flip(rng),
            acid_test: self.flip(rng),
            x_ray: self.flip(rng),
            wbc: self.blood_count.sample(rng),
            rbc: self.blood_count.sample(rng),
            hgb: self.hgb.sample(rng),
        };

        let probability = vitals.probability();
        let record = vitals.to_record();
        let label = rng.random::<f64>() < probability;
        trace!(probability = probability, label = label; "sampled {record:?}");

        SampledPatient {
            record,
            probability,
            label,
        }
    }
}

/// Draws one patient and encodes it, dropping the raw record.
pub fn sample_example<R: Rng + ?Sized>(
    sampler: &PatientSampler,
    rng: &mut R,
) -> Result<LabeledExample, SamplerErr> {
    let SampledPatient { record, label, .. } = sampler.sample(rng);

    Ok(LabeledExample {
        feature: encode(&record)?,
        label,
    })
}
