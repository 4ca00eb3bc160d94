use serde::{Deserialize, Serialize};

use crate::data::dataset::Dataset;
use crate::math::tensor::Tensor;

/// Normalization layer: per-column `(x − mean) / σ`.
///
/// The statistics are derived once from the training dataset and travel with
/// the model, so any example presented later for inference is scaled exactly
/// as the training data was. A zero σ is replaced by 1 — a useless division
/// instead of a branch in the hot path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocess {
    // width × 2: column 0 mean, column 1 σ
    stats: Tensor,
    response: Vec<f64>,
    delta: Vec<f64>,
}

impl Preprocess {
    pub fn from_dataset(data: &Dataset) -> Preprocess {
        let width = data.nin();
        let mut stats = Tensor::zeros(width, 2);

        for col in 0..width {
            let mut sd = data.std_dev(col);
            if sd == 0.0 {
                sd = 1.0;
            }
            *stats.at_mut(col, 0) = data.mean(col);
            *stats.at_mut(col, 1) = sd;
        }

        Preprocess {
            stats,
            response: vec![0.0; width],
            delta: vec![0.0; width],
        }
    }

    pub fn width(&self) -> usize {
        self.stats.rows
    }

    pub fn response(&self) -> &[f64] {
        &self.response
    }

    pub fn delta_mut(&mut self) -> &mut [f64] {
        &mut self.delta
    }

    pub fn forward(&mut self, x: &[f64]) {
        for (i, r) in self.response.iter_mut().enumerate() {
            *r = (x[i] - self.stats.at(i, 0)) / self.stats.at(i, 1);
        }
    }

    /// No parameters; the gradient passes through unchanged.
    pub fn propagate_delta(&self, out: &mut [f64]) {
        out.copy_from_slice(&self.delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::Tuple;

    fn toy_dataset() -> Dataset {
        let rows = vec![
            Tuple::new(vec![1.0, 5.0], vec![0.0]),
            Tuple::new(vec![3.0, 5.0], vec![1.0]),
        ];
        Dataset::from_rows(2, 1, rows).unwrap()
    }

    #[test]
    fn centers_and_scales() {
        let data = toy_dataset();
        let mut pp = Preprocess::from_dataset(&data);
        pp.forward(&[3.0, 5.0]);

        // Column 0: mean 2, σ = sqrt(2) (n−1 estimator).
        let expected = 1.0 / 2.0f64.sqrt();
        assert!((pp.response()[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn constant_column_divides_by_one() {
        let data = toy_dataset();
        let mut pp = Preprocess::from_dataset(&data);
        pp.forward(&[2.0, 7.0]);
        assert!((pp.response()[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn gradient_passes_through() {
        let data = toy_dataset();
        let mut pp = Preprocess::from_dataset(&data);
        pp.delta_mut().copy_from_slice(&[0.25, -0.5]);
        let mut out = [0.0, 0.0];
        pp.propagate_delta(&mut out);
        assert_eq!(out, [0.25, -0.5]);
    }
}
