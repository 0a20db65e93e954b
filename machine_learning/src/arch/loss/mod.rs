mod bce_with_logits;
mod loss_fn;

pub use bce_with_logits::BceWithLogits;
pub use loss_fn::LossFn;
