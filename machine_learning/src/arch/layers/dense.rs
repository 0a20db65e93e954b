use ndarray::prelude::*;
use rand::Rng;

use crate::{
    MlErr, Result,
    arch::activations::ActFn,
    initialization::{ParamGen, RandParamGen},
};

/// A fully connected layer, `act_fn(x · W + b)`.
///
/// Its parameters are a slice laid out as `[W | b]`, with `W` stored row-major with shape
/// `(inputs, outputs)`.
#[derive(Clone, Debug)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    size: usize,

    // Forward metadata
    x: Array2<f32>,
    z: Array2<f32>,
    a: Array2<f32>,

    // Backward metadata
    d: Array2<f32>,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The amount of inputs and outputs of the layer.
    /// * `act_fn` - An optional activation function applied to the output.
    ///
    /// # Returns
    /// A new `Dense` instance.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        let zeros = Array2::zeros((0, 0));

        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            act_fn,
            x: zeros.clone(),
            z: zeros.clone(),
            a: zeros.clone(),
            d: zeros,
        }
    }

    /// Returns the size of this layer.
    ///
    /// # Returns
    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Draws a fresh set of parameters for this layer from `U(-1/sqrt(inputs), 1/sqrt(inputs))`.
    pub fn init_params<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<f32>> {
        let mut param_gen = RandParamGen::fan_in_uniform(self.size, self.dim.0)?;
        self.draw_params(&mut param_gen, rng)
    }

    fn draw_params<G, R>(&self, param_gen: &mut G, rng: &mut R) -> Result<Vec<f32>>
    where
        G: ParamGen,
        R: Rng + ?Sized,
    {
        let params = param_gen.sample(rng, self.size).unwrap_or_default();
        self.check_len("initial parameters", params.len())?;
        Ok(params)
    }

    /// Computes the output of the layer for a batch, keeping what `backward` needs.
    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<ArrayView2<'_, f32>> {
        let (w, b) = self.view_params(params)?;
        self.check_inputs(x.ncols())?;

        self.z = x.dot(&w) + &b;
        self.x = x.to_owned();

        let Some(act_fn) = self.act_fn else {
            return Ok(self.z.view());
        };

        self.a = self.z.mapv(|z| act_fn.f(z));
        Ok(self.a.view())
    }

    /// Computes the output of the layer for a batch without touching the forward metadata.
    pub fn infer(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let (w, b) = self.view_params(params)?;
        self.check_inputs(x.ncols())?;

        let mut z = x.dot(&w) + &b;

        if let Some(act_fn) = self.act_fn {
            z.mapv_inplace(|z| act_fn.f(z));
        }

        Ok(z)
    }

    /// Writes this layer's gradient into `grad` given the delta of its output, and returns the
    /// delta of its input.
    ///
    /// Must be called after `forward` over the same batch.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        mut d: ArrayViewMut2<f32>,
    ) -> Result<ArrayViewMut2<'_, f32>> {
        if d.dim() != self.z.dim() {
            return Err(MlErr::SizeMismatch {
                what: "layer delta",
                got: d.len(),
                expected: self.z.len(),
            });
        }

        if let Some(act_fn) = self.act_fn {
            d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        let (mut dw, mut db) = self.view_grad(grad)?;
        dw.assign(&self.x.t().dot(&d));
        db.assign(&d.sum_axis(Axis(0)));

        let (w, _) = self.view_params(params)?;
        self.d = d.dot(&w.t());

        Ok(self.d.view_mut())
    }

    fn check_inputs(&self, got: usize) -> Result<()> {
        if got != self.dim.0 {
            return Err(MlErr::SizeMismatch {
                what: "layer inputs",
                got,
                expected: self.dim.0,
            });
        }

        Ok(())
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    ///
    /// # Arguments
    /// * `grad` - A gradient slice.
    ///
    /// # Returns
    /// A tuple containing the delta weights and delta biases.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        self.check_len("layer gradient", grad.len())?;

        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw).map_err(|_| self.shape_err(w_size))?;
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw).map_err(|_| self.shape_err(w_size))?;
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    ///
    /// # Arguments
    /// * `params` - A slice of parameters.
    ///
    /// # Returns
    /// A tuple containing the weights and biases.
    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        self.check_len("layer parameters", params.len())?;

        let w_size = self.size - self.dim.1;
        let (w_raw, b_raw) = params.split_at(w_size);
        let weights = ArrayView2::from_shape(self.dim, w_raw).map_err(|_| self.shape_err(w_size))?;
        let biases = ArrayView1::from_shape(self.dim.1, b_raw).map_err(|_| self.shape_err(w_size))?;
        Ok((weights, biases))
    }

    fn check_len(&self, what: &'static str, got: usize) -> Result<()> {
        if got != self.size {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected: self.size,
            });
        }

        Ok(())
    }

    fn shape_err(&self, got: usize) -> MlErr {
        MlErr::SizeMismatch {
            what: "layer weights",
            got,
            expected: self.dim.0 * self.dim.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // W = [[1, -1], [2, 0.5]], b = [0.5, -4]
    const PARAMS: [f32; 6] = [1., -1., 2., 0.5, 0.5, -4.];

    #[test]
    fn forward_applies_weights_bias_and_activation() {
        let mut layer = Dense::new((2, 2), Some(ActFn::relu()));
        let x = array![[1., 1.], [2., -1.]];

        let out = layer.forward(&PARAMS, x.view()).unwrap().to_owned();
        // z = [[3.5, -4.5], [0.5, -6.5]]
        assert_eq!(out, array![[3.5f32, 0.], [0.5, 0.]]);
        assert_eq!(layer.infer(&PARAMS, x.view()).unwrap(), out);
    }

    #[test]
    fn backward_computes_weight_and_bias_gradients() {
        let mut layer = Dense::new((2, 2), None);
        let x = array![[1., 2.]];
        layer.forward(&PARAMS, x.view()).unwrap();

        let mut grad = [0.; 6];
        let mut d = array![[1., 3.]];
        let dx = layer
            .backward(&PARAMS, &mut grad, d.view_mut())
            .unwrap()
            .to_owned();

        assert_eq!(grad, [1., 3., 2., 6., 1., 3.]);
        // dx = d · Wᵀ = [1 - 3, 2 + 1.5]
        assert_eq!(dx, array![[-2f32, 3.5]]);
    }

    #[test]
    fn wrong_parameter_count_is_an_error() {
        let layer = Dense::new((2, 2), None);
        let x = array![[1., 1.]];

        assert!(matches!(
            layer.infer(&PARAMS[..5], x.view()),
            Err(MlErr::SizeMismatch { got: 5, expected: 6, .. })
        ));
    }

    #[test]
    fn init_params_stay_within_the_fan_in_bound() {
        let layer = Dense::new((4, 3), None);
        let params = layer.init_params(&mut rand::rng()).unwrap();

        assert_eq!(params.len(), layer.size());
        assert!(params.iter().all(|p| p.abs() <= 0.5));
    }

    #[test]
    fn short_generators_are_an_error() {
        let layer = Dense::new((2, 2), None);
        let mut rng = rand::rng();

        let mut short = RandParamGen::uniform(4, -1., 1.).unwrap();
        assert_eq!(
            layer.draw_params(&mut short, &mut rng),
            Err(MlErr::SizeMismatch {
                what: "initial parameters",
                got: 4,
                expected: 6
            })
        );
        assert!(matches!(
            layer.draw_params(&mut short, &mut rng),
            Err(MlErr::SizeMismatch { got: 0, .. })
        ));
    }
}
