use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layers::sigmoid;
use crate::math::tensor::Tensor;
use crate::optim::Optimizer;

const EPS: f64 = 1e-12;

/// Multi-label head: an independent sigmoid per output unit, each trained
/// against its own binary cross-entropy. The sigmoid derivative cancels the
/// loss denominator, so ∂L/∂z = p − y directly.
///
/// Whether a prediction counts as correct overall (e.g. every unit's rounded
/// output matching) is the caller's policy, not the engine's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiLabel {
    units: usize,
    nin: usize,
    weights: Tensor,
    grads: Tensor,
    response: Vec<f64>,
    delta: Vec<f64>,
    optimizer: Optimizer,
}

impl MultiLabel {
    pub fn new(units: usize, nin: usize, adam: bool, rng: &mut StdRng) -> MultiLabel {
        let weights = Tensor::glorot(units, nin + 1, rng);
        let grads = Tensor::zeros(units, nin + 1);

        MultiLabel {
            units,
            nin,
            optimizer: Optimizer::for_flag(adam, weights.n()),
            weights,
            grads,
            response: vec![0.0; units],
            delta: vec![0.0; units],
        }
    }

    pub fn width(&self) -> usize {
        self.units
    }

    pub fn parameter_count(&self) -> usize {
        self.weights.n()
    }

    pub fn response(&self) -> &[f64] {
        &self.response
    }

    pub fn delta_mut(&mut self) -> &mut [f64] {
        &mut self.delta
    }

    pub fn forward(&mut self, x: &[f64]) {
        self.weights.matvec_bias(x, &mut self.response);
        for p in self.response.iter_mut() {
            *p = sigmoid(*p);
        }
    }

    /// Per-unit binary cross-entropy, averaged over units; sets
    /// ∂L/∂z = p − y.
    pub fn loss(&mut self, answers: &[f64]) -> Result<f64> {
        if answers.len() != self.units {
            return Err(Error::Shape(format!(
                "multi-label head expects {} answers, got {}",
                self.units,
                answers.len()
            )));
        }

        let mut loss = 0.0;
        for (i, (&p, &y)) in self.response.iter().zip(answers.iter()).enumerate() {
            self.delta[i] = p - y;
            loss += if y != 0.0 {
                -(p.max(EPS)).ln()
            } else {
                -((1.0 - p).max(EPS)).ln()
            };
        }

        Ok(loss / self.units as f64)
    }

    /// All units' rounded predictions match the true bits.
    pub fn correct(&self, answers: &[f64]) -> Result<bool> {
        if answers.len() != self.units {
            return Err(Error::Shape(format!(
                "multi-label head expects {} answers, got {}",
                self.units,
                answers.len()
            )));
        }
        Ok(self
            .response
            .iter()
            .zip(answers.iter())
            .all(|(p, &y)| p.round() == y))
    }

    pub fn backward(&mut self, x: &[f64]) {
        for i in 0..self.units {
            let d = self.delta[i];
            *self.grads.at_mut(i, 0) += d;
            for (j, xi) in x.iter().enumerate() {
                *self.grads.at_mut(i, j + 1) += d * xi;
            }
        }
    }

    pub fn propagate_delta(&self, out: &mut [f64]) {
        self.weights.transpose_matvec(&self.delta, out);
    }

    pub fn update(&mut self) -> Result<()> {
        self.optimizer
            .update(&mut self.weights.data, &mut self.grads.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn head() -> MultiLabel {
        let mut rng = StdRng::seed_from_u64(6);
        MultiLabel::new(2, 3, true, &mut rng)
    }

    #[test]
    fn outputs_are_independent_probabilities() {
        let mut ml = head();
        ml.forward(&[0.5, -0.5, 1.0]);
        assert!(ml.response().iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn delta_is_p_minus_y() {
        let mut ml = head();
        ml.forward(&[0.5, -0.5, 1.0]);
        let p: Vec<f64> = ml.response().to_vec();

        let loss = ml.loss(&[1.0, 0.0]).unwrap();
        let expected = (-(p[0].ln()) - (1.0 - p[1]).ln()) / 2.0;
        assert!((loss - expected).abs() < 1e-12);
        assert!((ml.delta[0] - (p[0] - 1.0)).abs() < 1e-12);
        assert!((ml.delta[1] - p[1]).abs() < 1e-12);
    }

    #[test]
    fn rejects_wrong_answer_width() {
        let mut ml = head();
        ml.forward(&[0.0, 0.0, 0.0]);
        assert!(matches!(ml.loss(&[1.0]), Err(Error::Shape(_))));
    }
}
