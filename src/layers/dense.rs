use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layers::sigmoid;
use crate::math::tensor::Tensor;
use crate::optim::Optimizer;

/// Fully-connected layer with a sigmoid activation.
///
/// Weights are `[width × (nin + 1)]` with the bias in column 0. The backward
/// pass receives ∂L/∂a in `delta`, converts it to ∂L/∂z using the stored
/// response (σ′(z) = a·(1−a)), and accumulates per-weight gradients until the
/// per-step optimizer update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    width: usize,
    nin: usize,
    weights: Tensor,
    grads: Tensor,
    response: Vec<f64>,
    delta: Vec<f64>,
    optimizer: Optimizer,
}

impl Dense {
    pub fn new(width: usize, nin: usize, adam: bool, rng: &mut StdRng) -> Dense {
        let weights = Tensor::glorot(width, nin + 1, rng);
        let grads = Tensor::zeros(width, nin + 1);

        Dense {
            width,
            nin,
            optimizer: Optimizer::for_flag(adam, weights.n()),
            weights,
            grads,
            response: vec![0.0; width],
            delta: vec![0.0; width],
        }
    }

    pub fn width(&self) -> usize {
        self.width
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
        for r in self.response.iter_mut() {
            *r = sigmoid(*r);
        }
    }

    /// Converts ∂L/∂a to ∂L/∂z in place, then accumulates gradients against
    /// the layer input.
    pub fn backward(&mut self, x: &[f64]) {
        for i in 0..self.width {
            let a = self.response[i];
            self.delta[i] *= a * (1.0 - a);

            let d = self.delta[i];
            *self.grads.at_mut(i, 0) += d;
            for (j, xi) in x.iter().enumerate() {
                *self.grads.at_mut(i, j + 1) += d * xi;
            }
        }
    }

    /// Pushes ∂L/∂z down through the transposed weights into the previous
    /// layer's activation space.
    pub fn propagate_delta(&self, out: &mut [f64]) {
        self.weights.transpose_matvec(&self.delta, out);
    }

    pub fn update(&mut self) -> Result<()> {
        self.optimizer
            .update(&mut self.weights.data, &mut self.grads.data)
    }

    #[cfg(test)]
    pub(crate) fn weights_mut(&mut self) -> &mut Tensor {
        &mut self.weights
    }
}
