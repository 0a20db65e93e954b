use std::{error::Error, fmt};

use machine_learning::MlErr;

use crate::encoder::EncodeErr;

/// Failures while building the synthetic population or its datasets.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplerErr {
    InvalidDistribution {
        name: &'static str,
        reason: String,
    },
    Encode(EncodeErr),
    Dataset(MlErr),
}

impl SamplerErr {
    pub(super) fn distribution<E: fmt::Display>(name: &'static str) -> impl FnOnce(E) -> Self {
        move |e| Self::InvalidDistribution {
            name,
            reason: e.to_string(),
        }
    }
}

impl fmt::Display for SamplerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplerErr::InvalidDistribution { name, reason } => {
                write!(f, "invalid {name} distribution: {reason}")
            }
            SamplerErr::Encode(e) => write!(f, "sampled record can't be encoded: {e}"),
            SamplerErr::Dataset(e) => write!(f, "dataset error: {e}"),
        }
    }
}

impl Error for SamplerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SamplerErr::Encode(e) => Some(e),
            SamplerErr::Dataset(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EncodeErr> for SamplerErr {
    fn from(value: EncodeErr) -> Self {
        Self::Encode(value)
    }
}

impl From<MlErr> for SamplerErr {
    fn from(value: MlErr) -> Self {
        Self::Dataset(value)
    }
}
