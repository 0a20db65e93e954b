use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayView2, Axis, s};
use rand::{Rng, seq::SliceRandom};

use crate::{MlErr, Result};

/// An in-memory supervised dataset, one sample per row.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: Array2<f32>,
    y: Array2<f32>,
}

impl Dataset {
    /// Creates a new `Dataset` from row-major buffers.
    ///
    /// # Arguments
    /// * `x` - The flattened inputs, `x_size` values per sample.
    /// * `y` - The flattened targets, `y_size` values per sample.
    /// * `x_size` - The width of each input row.
    /// * `y_size` - The width of each target row.
    ///
    /// # Returns
    /// A new `Dataset` or an error if the buffers don't describe the same amount of rows.
    pub fn new(x: Vec<f32>, y: Vec<f32>, x_size: usize, y_size: usize) -> Result<Self> {
        if x_size == 0 || y_size == 0 {
            return Err(MlErr::SizeMismatch {
                what: "dataset row width",
                got: 0,
                expected: 1,
            });
        }

        let len = x.len() / x_size;

        if x.len() != len * x_size {
            return Err(MlErr::SizeMismatch {
                what: "dataset inputs",
                got: x.len(),
                expected: (len + 1) * x_size,
            });
        }

        if y.len() != len * y_size {
            return Err(MlErr::SizeMismatch {
                what: "dataset targets",
                got: y.len(),
                expected: len * y_size,
            });
        }

        let shape_err = |what, got| MlErr::SizeMismatch {
            what,
            got,
            expected: len,
        };

        let x_len = x.len();
        let y_len = y.len();
        let x = Array2::from_shape_vec((len, x_size), x)
            .map_err(|_| shape_err("dataset inputs", x_len))?;
        let y = Array2::from_shape_vec((len, y_size), y)
            .map_err(|_| shape_err("dataset targets", y_len))?;

        Ok(Self { x, y })
    }

    /// Returns the amount of samples.
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn x_size(&self) -> usize {
        self.x.ncols()
    }

    pub fn y_size(&self) -> usize {
        self.y.ncols()
    }

    pub fn x(&self) -> ArrayView2<'_, f32> {
        self.x.view()
    }

    pub fn y(&self) -> ArrayView2<'_, f32> {
        self.y.view()
    }

    /// Permutes the samples, keeping every input aligned with its target.
    ///
    /// # Arguments
    /// * `rng` - The random number generator driving the permutation.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);

        self.x = self.x.select(Axis(0), &order);
        self.y = self.y.select(Axis(0), &order);
    }

    /// Splits the dataset in consecutive batches following the current sample order.
    ///
    /// # Arguments
    /// * `batch_size` - The amount of samples per batch.
    /// * `drop_last` - Whether to skip the final batch when it has less than `batch_size` samples.
    ///
    /// # Returns
    /// An iterator of `(x, y)` views.
    pub fn batches(
        &self,
        batch_size: NonZeroUsize,
        drop_last: bool,
    ) -> impl Iterator<Item = (ArrayView2<'_, f32>, ArrayView2<'_, f32>)> {
        let size = batch_size.get();
        let len = self.len();
        let nbatches = if drop_last {
            len / size
        } else {
            len.div_ceil(size)
        };

        (0..nbatches).map(move |i| {
            let start = i * size;
            let end = (start + size).min(len);
            (
                self.x.slice(s![start..end, ..]),
                self.y.slice(s![start..end, ..]),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn ten_rows() -> Dataset {
        let x = (0..20).map(|i| i as f32).collect();
        let y = (0..10).map(|i| i as f32 * 2.0).collect();
        Dataset::new(x, y, 2, 1).unwrap()
    }

    #[test]
    fn ragged_buffers_are_rejected() {
        assert!(Dataset::new(vec![0.0; 5], vec![0.0; 2], 2, 1).is_err());
        assert!(Dataset::new(vec![0.0; 4], vec![0.0; 3], 2, 1).is_err());
        assert!(Dataset::new(vec![0.0; 4], vec![0.0; 2], 0, 1).is_err());
    }

    #[test]
    fn batches_drop_the_incomplete_tail_only_when_asked() {
        let ds = ten_rows();
        let size = NonZeroUsize::new(4).unwrap();

        let dropped: Vec<_> = ds.batches(size, true).map(|(x, _)| x.nrows()).collect();
        assert_eq!(dropped, [4, 4]);

        let kept: Vec<_> = ds.batches(size, false).map(|(x, _)| x.nrows()).collect();
        assert_eq!(kept, [4, 4, 2]);
    }

    #[test]
    fn batches_follow_row_order() {
        let ds = ten_rows();
        let size = NonZeroUsize::new(3).unwrap();
        let (x, y) = ds.batches(size, false).nth(1).unwrap();

        assert_eq!(x.row(0).to_vec(), [6.0, 7.0]);
        assert_eq!(y.column(0).to_vec(), [6.0, 8.0, 10.0]);
    }

    #[test]
    fn shuffle_keeps_rows_aligned() {
        let mut ds = ten_rows();
        let mut rng = StdRng::seed_from_u64(7);
        ds.shuffle(&mut rng);

        assert_eq!(ds.len(), 10);
        for (x, y) in ds.x().rows().into_iter().zip(ds.y().rows()) {
            // the i-th row holds (2i, 2i + 1) as input and 2i as target
            assert_eq!(x[0], y[0]);
            assert_eq!(x[1], y[0] + 1.0);
        }

        let mut firsts: Vec<_> = ds.x().column(0).to_vec();
        firsts.sort_by(f32::total_cmp);
        assert_eq!(firsts, (0..10).map(|i| i as f32 * 2.0).collect::<Vec<_>>());
    }
}
