use std::{error::Error, fmt, io};

use machine_learning::MlErr;

use crate::{
    config::ConfigErr, encoder::EncodeErr, persistence::ArtifactErr, sampler::SamplerErr,
};

/// The crate's result type.
pub type Result<T> = std::result::Result<T, EvaluatorErr>;

/// Any failure of a training run, an estimate or an artifact operation.
#[derive(Debug)]
pub enum EvaluatorErr {
    Io(io::Error),
    Config(ConfigErr),
    Encode(EncodeErr),
    Sampler(SamplerErr),
    Model(MlErr),
    Artifact(ArtifactErr),
}

impl fmt::Display for EvaluatorErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluatorErr::Io(e) => write!(f, "io error: {e}"),
            EvaluatorErr::Config(e) => write!(f, "configuration error: {e}"),
            EvaluatorErr::Encode(e) => write!(f, "invalid record: {e}"),
            EvaluatorErr::Sampler(e) => write!(f, "sampler error: {e}"),
            EvaluatorErr::Model(e) => write!(f, "model error: {e}"),
            EvaluatorErr::Artifact(e) => write!(f, "artifact error: {e}"),
        }
    }
}

impl Error for EvaluatorErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EvaluatorErr::Io(e) => Some(e),
            EvaluatorErr::Config(e) => Some(e),
            EvaluatorErr::Encode(e) => Some(e),
            EvaluatorErr::Sampler(e) => Some(e),
            EvaluatorErr::Model(e) => Some(e),
            EvaluatorErr::Artifact(e) => Some(e),
        }
    }
}

impl From<io::Error> for EvaluatorErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ConfigErr> for EvaluatorErr {
    fn from(value: ConfigErr) -> Self {
        Self::Config(value)
    }
}

impl From<EncodeErr> for EvaluatorErr {
    fn from(value: EncodeErr) -> Self {
        Self::Encode(value)
    }
}

impl From<SamplerErr> for EvaluatorErr {
    fn from(value: SamplerErr) -> Self {
        Self::Sampler(value)
    }
}

impl From<MlErr> for EvaluatorErr {
    fn from(value: MlErr) -> Self {
        Self::Model(value)
    }
}

impl From<ArtifactErr> for EvaluatorErr {
    fn from(value: ArtifactErr) -> Self {
        Self::Artifact(value)
    }
}
