use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::math::tensor::Tensor;
use crate::optim::Optimizer;

/// One-dimensional convolution: `kernels` filters of `width` weights plus a
/// bias each, sliding with `stride` over the input sequence. Each kernel
/// produces one output channel of `out_len` positions; the same kernel
/// weights are shared across every position it visits.
///
/// The output is linear. Trailing inputs that do not fill a whole window are
/// never visited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvFilter {
    kernels: usize,
    width: usize,
    stride: usize,
    in_width: usize,
    out_len: usize,
    // kernels × (width + 1), bias in column 0
    weights: Tensor,
    grads: Tensor,
    response: Vec<f64>,
    delta: Vec<f64>,
    optimizer: Optimizer,
}

impl ConvFilter {
    pub fn new(
        kernels: usize,
        width: usize,
        stride: usize,
        in_width: usize,
        adam: bool,
        rng: &mut StdRng,
    ) -> ConvFilter {
        let out_len = (in_width - width) / stride + 1;
        let weights = Tensor::glorot(kernels, width + 1, rng);
        let grads = Tensor::zeros(kernels, width + 1);

        ConvFilter {
            kernels,
            width,
            stride,
            in_width,
            out_len,
            optimizer: Optimizer::for_flag(adam, weights.n()),
            weights,
            grads,
            response: vec![0.0; kernels * out_len],
            delta: vec![0.0; kernels * out_len],
        }
    }

    /// Output width across all kernels.
    pub fn out_width(&self) -> usize {
        self.kernels * self.out_len
    }

    pub fn out_len(&self) -> usize {
        self.out_len
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
        for k in 0..self.kernels {
            let bias = self.weights.at(k, 0);
            let kernel = self.weights.row_weights(k);

            for p in 0..self.out_len {
                let window = &x[p * self.stride..p * self.stride + self.width];
                let mut acc = bias;
                for (w, xi) in kernel.iter().zip(window.iter()) {
                    acc += w * xi;
                }
                self.response[k * self.out_len + p] = acc;
            }
        }
    }

    /// Accumulates every position's contribution into the kernel gradient;
    /// the optimizer then sees a single accumulated update per kernel.
    pub fn backward(&mut self, x: &[f64]) {
        for k in 0..self.kernels {
            for p in 0..self.out_len {
                let d = self.delta[k * self.out_len + p];
                *self.grads.at_mut(k, 0) += d;

                let window = &x[p * self.stride..p * self.stride + self.width];
                for (j, xi) in window.iter().enumerate() {
                    *self.grads.at_mut(k, j + 1) += d * xi;
                }
            }
        }
    }

    /// ∂L/∂x: every kernel scatters its weighted delta back over the window
    /// positions it read.
    pub fn propagate_delta(&self, out: &mut [f64]) {
        for o in out.iter_mut() {
            *o = 0.0;
        }

        for k in 0..self.kernels {
            let kernel = self.weights.row_weights(k);
            for p in 0..self.out_len {
                let d = self.delta[k * self.out_len + p];
                let base = p * self.stride;
                for (j, w) in kernel.iter().enumerate() {
                    out[base + j] += d * w;
                }
            }
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn fixed_filter() -> ConvFilter {
        let mut rng = StdRng::seed_from_u64(2);
        let mut conv = ConvFilter::new(1, 2, 2, 6, true, &mut rng);
        // bias 1, kernel [2, -1]
        conv.weights_mut().data.copy_from_slice(&[1.0, 2.0, -1.0]);
        conv
    }

    #[test]
    fn forward_strides_over_the_sequence() {
        let mut conv = fixed_filter();
        conv.forward(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        // Windows: [1,2], [3,4], [5,6] → 1 + 2x0 − x1.
        assert_eq!(conv.response(), &[1.0, 3.0, 5.0]);
    }

    #[test]
    fn tail_that_does_not_fill_a_window_is_skipped() {
        let mut rng = StdRng::seed_from_u64(3);
        let conv = ConvFilter::new(1, 3, 2, 8, true, &mut rng);
        // Positions 0, 2, 4 fit; 6 would need inputs 6..9.
        assert_eq!(conv.out_len(), 3);
    }

    #[test]
    fn backward_accumulates_across_positions() {
        let mut conv = fixed_filter();
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        conv.forward(&x);
        conv.delta_mut().copy_from_slice(&[1.0, 1.0, 1.0]);
        conv.backward(&x);

        // Bias gradient: one unit per position.
        assert!((conv.grads.at(0, 0) - 3.0).abs() < 1e-12);
        // First kernel weight saw inputs 1, 3, 5.
        assert!((conv.grads.at(0, 1) - 9.0).abs() < 1e-12);
        // Second kernel weight saw inputs 2, 4, 6.
        assert!((conv.grads.at(0, 2) - 12.0).abs() < 1e-12);
    }

    #[test]
    fn propagate_scatters_through_the_kernel() {
        let mut conv = fixed_filter();
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        conv.forward(&x);
        conv.delta_mut().copy_from_slice(&[1.0, 0.0, -1.0]);

        let mut out = [0.0; 6];
        conv.propagate_delta(&mut out);
        assert_eq!(out, [2.0, -1.0, 0.0, 0.0, -2.0, 1.0]);
    }
}
