/// The logistic function, evaluated without overflowing for large `|z|`.
pub fn sigmoid(z: f32) -> f32 {
    if z >= 0. {
        1. / (1. + (-z).exp())
    } else {
        let e = z.exp();
        e / (1. + e)
    }
}
