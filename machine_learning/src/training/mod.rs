mod cancel;
mod model_trainer;

pub use cancel::Cancellation;
pub use model_trainer::{EpochStats, ModelTrainer};
