use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::tensor::Tensor;
use crate::optim::Optimizer;

/// Regression head: a single linear output with identity activation.
///
/// Paired loss is squared error, `½(y − t)²`, so ∂L/∂z is just `y − t`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalarMse {
    nin: usize,
    weights: Tensor,
    grads: Tensor,
    response: Vec<f64>,
    delta: Vec<f64>,
    optimizer: Optimizer,
}

impl ScalarMse {
    pub fn new(nin: usize, adam: bool, rng: &mut StdRng) -> ScalarMse {
        let mut weights = Tensor::zeros(1, nin + 1);
        for w in weights.data.iter_mut() {
            *w = rng.gen::<f64>() - 0.5;
        }
        let grads = Tensor::zeros(1, nin + 1);

        ScalarMse {
            nin,
            optimizer: Optimizer::for_flag(adam, weights.n()),
            weights,
            grads,
            response: vec![0.0; 1],
            delta: vec![0.0; 1],
        }
    }

    pub fn width(&self) -> usize {
        1
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
    }

    pub fn loss(&mut self, answers: &[f64]) -> Result<f64> {
        if answers.len() != 1 {
            return Err(Error::Shape(format!(
                "MSE head expects a single answer, got {}",
                answers.len()
            )));
        }

        let e = self.response[0] - answers[0];
        self.delta[0] = e;
        Ok(0.5 * e * e)
    }

    pub fn backward(&mut self, x: &[f64]) {
        let d = self.delta[0];
        *self.grads.at_mut(0, 0) += d;
        for (j, xi) in x.iter().enumerate() {
            *self.grads.at_mut(0, j + 1) += d * xi;
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

    #[test]
    fn identity_output_and_half_squared_loss() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut head = ScalarMse::new(2, true, &mut rng);
        head.weights.data.copy_from_slice(&[1.0, 2.0, 3.0]);

        head.forward(&[1.0, 1.0]);
        assert!((head.response()[0] - 6.0).abs() < 1e-12);

        let loss = head.loss(&[4.0]).unwrap();
        assert!((loss - 2.0).abs() < 1e-12);
        assert!((head.delta[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_vector_answers() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut head = ScalarMse::new(2, true, &mut rng);
        head.forward(&[0.0, 0.0]);
        assert!(matches!(head.loss(&[1.0, 2.0]), Err(Error::Shape(_))));
    }
}
