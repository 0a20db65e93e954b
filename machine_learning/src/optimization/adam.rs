use super::Optimizer;
use crate::{MlErr, Result};

pub const DEFAULT_BETA1: f32 = 0.9;
pub const DEFAULT_BETA2: f32 = 0.999;
pub const DEFAULT_EPSILON: f32 = 1e-8;

#[derive(Debug, Clone, PartialEq)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    beta1_t: f32,
    beta2_t: f32,
    v: Box<[f32]>,
    s: Box<[f32]>,
    epsilon: f32,
}

/// Everything an `Adam` instance needs to resume optimizing exactly where it left off.
#[derive(Debug, Clone, PartialEq)]
pub struct AdamState {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    /// `beta1` raised to the amount of steps taken so far.
    pub beta1_t: f32,
    /// `beta2` raised to the amount of steps taken so far.
    pub beta2_t: f32,
    /// First moment estimates.
    pub v: Vec<f32>,
    /// Second moment estimates.
    pub s: Vec<f32>,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2`, `epsilon` - Hyperparameters to the optimization algorithm.
    ///
    /// # Returns
    /// A new `Adam` instance, or an error if any hyperparameter is out of its domain.
    pub fn new(
        len: usize,
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    ) -> Result<Self> {
        Self::from_state(AdamState {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            beta1_t: 1.,
            beta2_t: 1.,
            v: vec![0.; len],
            s: vec![0.; len],
        })
    }

    /// Creates a new `Adam` optimizer with the usual `beta1`, `beta2` and `epsilon`.
    pub fn with_learning_rate(len: usize, learning_rate: f32) -> Result<Self> {
        Self::new(
            len,
            learning_rate,
            DEFAULT_BETA1,
            DEFAULT_BETA2,
            DEFAULT_EPSILON,
        )
    }

    /// Rebuilds an optimizer from a previously exported state.
    ///
    /// # Returns
    /// An error if the moment buffers differ in length or a hyperparameter is invalid.
    pub fn from_state(state: AdamState) -> Result<Self> {
        let AdamState {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            beta1_t,
            beta2_t,
            v,
            s,
        } = state;

        check_hyperparameter("learning_rate", learning_rate, |x| x > 0.)?;
        check_hyperparameter("beta1", beta1, |x| (0. ..1.).contains(&x))?;
        check_hyperparameter("beta2", beta2, |x| (0. ..1.).contains(&x))?;
        check_hyperparameter("epsilon", epsilon, |x| x > 0.)?;
        check_hyperparameter("beta1_t", beta1_t, |x| (0. ..=1.).contains(&x))?;
        check_hyperparameter("beta2_t", beta2_t, |x| (0. ..=1.).contains(&x))?;

        if v.len() != s.len() {
            return Err(MlErr::SizeMismatch {
                what: "adam moments",
                got: s.len(),
                expected: v.len(),
            });
        }

        Ok(Self {
            learning_rate,
            beta1,
            beta2,
            beta1_t,
            beta2_t,
            v: v.into_boxed_slice(),
            s: s.into_boxed_slice(),
            epsilon,
        })
    }

    /// Exports a snapshot of the optimizer.
    pub fn state(&self) -> AdamState {
        AdamState {
            learning_rate: self.learning_rate,
            beta1: self.beta1,
            beta2: self.beta2,
            epsilon: self.epsilon,
            beta1_t: self.beta1_t,
            beta2_t: self.beta2_t,
            v: self.v.to_vec(),
            s: self.s.to_vec(),
        }
    }

    /// Returns the amount of parameters this instance holds state for.
    pub fn len(&self) -> usize {
        self.v.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v.is_empty()
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

fn check_hyperparameter<F>(name: &'static str, value: f32, valid: F) -> Result<()>
where
    F: FnOnce(f32) -> bool,
{
    if !value.is_finite() || !valid(value) {
        return Err(MlErr::InvalidHyperparameter { name, value });
    }

    Ok(())
}

impl Optimizer for Adam {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        if grad.len() != params.len() || params.len() != self.v.len() {
            return Err(MlErr::SizeMismatch {
                what: "optimizer step",
                got: grad.len().min(params.len()),
                expected: self.v.len(),
            });
        }

        let Self {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = *self;

        self.beta1_t *= b1;
        self.beta2_t *= b2;

        let bc1 = 1. - self.beta1_t;
        let bc2 = 1. - self.beta2_t;
        let step_size = lr * (bc2.sqrt() / bc1);

        params
            .iter_mut()
            .zip(grad)
            .zip(self.v.iter_mut())
            .zip(self.s.iter_mut())
            .for_each(|(((p, g), v), s)| {
                *v = b1 * *v + (1. - b1) * g;
                *s = b2 * *s + (1. - b2) * g.powi(2);
                *p -= step_size * *v / (s.sqrt() + eps);
            });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_moves_every_param_by_the_learning_rate() {
        let mut adam = Adam::with_learning_rate(3, 0.1).unwrap();
        let mut params = [1., 1., 1.];

        adam.update_params(&[0.5, -2., 0.], &mut params).unwrap();

        assert!((params[0] - 0.9).abs() < 1e-5);
        assert!((params[1] - 1.1).abs() < 1e-5);
        assert_eq!(params[2], 1.);
    }

    #[test]
    fn converges_on_a_quadratic() {
        let mut adam = Adam::with_learning_rate(1, 0.05).unwrap();
        let mut params = [5.];

        for _ in 0..2000 {
            let grad = [2. * (params[0] - 3.)];
            adam.update_params(&grad, &mut params).unwrap();
        }

        assert!((params[0] - 3.).abs() < 5e-2);
    }

    #[test]
    fn state_roundtrip_resumes_identically() {
        let mut adam = Adam::with_learning_rate(2, 0.01).unwrap();
        let mut params = [0.3, -0.2];
        adam.update_params(&[0.1, 0.4], &mut params).unwrap();

        let mut resumed = Adam::from_state(adam.state()).unwrap();
        let mut resumed_params = params;

        adam.update_params(&[-0.2, 0.3], &mut params).unwrap();
        resumed
            .update_params(&[-0.2, 0.3], &mut resumed_params)
            .unwrap();

        assert_eq!(params, resumed_params);
        assert_eq!(adam, resumed);
    }

    #[test]
    fn invalid_hyperparameters_are_rejected() {
        assert!(Adam::with_learning_rate(1, 0.).is_err());
        assert!(Adam::with_learning_rate(1, f32::NAN).is_err());
        assert!(Adam::new(1, 0.1, 1., 0.999, 1e-8).is_err());

        let mut state = Adam::with_learning_rate(2, 0.1).unwrap().state();
        state.s.pop();
        assert!(Adam::from_state(state).is_err());
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let mut adam = Adam::with_learning_rate(2, 0.1).unwrap();
        let mut params = [0.; 3];
        assert!(adam.update_params(&[0.; 3], &mut params).is_err());
    }
}
