mod adam;
mod optimizer;

pub use adam::{Adam, AdamState};
pub use optimizer::Optimizer;
