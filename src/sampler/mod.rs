//! Synthetic patients and the datasets built from them.

mod error;
mod patient;
mod risk;
mod splits;

pub use error::SamplerErr;
pub use patient::{LabeledExample, PatientSampler, SampledPatient, sample_example};
pub use risk::{infection_probability, risk_score};
pub use splits::{SplitSizes, Splits, make_splits};
