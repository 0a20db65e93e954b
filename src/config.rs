use std::{error::Error, fmt, fs, io, num::NonZeroUsize, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    classifier::{DEFAULT_HIDDEN_SIZE, DEFAULT_THRESHOLD},
    sampler::SplitSizes,
};

/// Settings shared by every entry point that builds, trains or loads a classifier.
///
/// Every field has a default, so a config file only needs to list what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluatorConfig {
    /// Seeds every random draw of a run, `None` draws the seed from the OS.
    pub seed: Option<u64>,
    pub hidden_size: NonZeroUsize,
    pub train_batch_size: NonZeroUsize,
    pub eval_batch_size: NonZeroUsize,
    pub learning_rate: f32,
    pub epochs: usize,
    /// The probability at and above which a patient is predicted as infected.
    pub threshold: f32,
    pub splits: SplitSizes,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            hidden_size: non_zero(DEFAULT_HIDDEN_SIZE),
            train_batch_size: non_zero(16),
            eval_batch_size: non_zero(128),
            learning_rate: 1e-3,
            epochs: 20,
            threshold: DEFAULT_THRESHOLD,
            splits: SplitSizes::default(),
        }
    }
}

const fn non_zero(n: usize) -> NonZeroUsize {
    match NonZeroUsize::new(n) {
        Some(n) => n,
        None => NonZeroUsize::MIN,
    }
}

impl EvaluatorConfig {
    /// Reads and validates a JSON config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigErr> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings can drive a full training run.
    pub fn validate(&self) -> Result<(), ConfigErr> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0. {
            return Err(ConfigErr::invalid(
                "learning_rate",
                format!("must be positive, got {}", self.learning_rate),
            ));
        }

        if !(self.threshold > 0. && self.threshold < 1.) {
            return Err(ConfigErr::invalid(
                "threshold",
                format!("must be in (0, 1), got {}", self.threshold),
            ));
        }

        if self.splits.train < self.train_batch_size.get() {
            return Err(ConfigErr::invalid(
                "splits.train",
                format!(
                    "{} samples can't fill a single batch of {}",
                    self.splits.train, self.train_batch_size
                ),
            ));
        }

        if self.splits.valid == 0 {
            return Err(ConfigErr::invalid("splits.valid", "must not be empty"));
        }

        if self.splits.test == 0 {
            return Err(ConfigErr::invalid("splits.test", "must not be empty"));
        }

        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigErr {
    Io(io::Error),
    Parse(serde_json::Error),
    Invalid { field: &'static str, reason: String },
}

impl ConfigErr {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigErr::Io(e) => write!(f, "can't read config: {e}"),
            ConfigErr::Parse(e) => write!(f, "malformed config: {e}"),
            ConfigErr::Invalid { field, reason } => write!(f, "invalid `{field}`: {reason}"),
        }
    }
}

impl Error for ConfigErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigErr::Io(e) => Some(e),
            ConfigErr::Parse(e) => Some(e),
            ConfigErr::Invalid { .. } => None,
        }
    }
}

impl From<io::Error> for ConfigErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}
