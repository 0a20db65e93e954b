pub mod classifier;
pub mod config;
pub mod encoder;
pub mod error;
pub mod inference;
pub mod persistence;
pub mod prompt;
pub mod record;
pub mod sampler;
pub mod schema;
pub mod training;

pub use error::{EvaluatorErr, Result};
