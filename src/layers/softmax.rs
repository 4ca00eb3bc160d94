use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::tensor::Tensor;
use crate::optim::Optimizer;

/// Floor inside ln() so an exactly-zero probability cannot produce -inf.
const EPS: f64 = 1e-12;

/// Single-label classification head: linear logits over `classes` outputs,
/// normalized with the max-subtraction softmax. Paired loss is categorical
/// cross-entropy against a class index; the combined gradient w.r.t. the
/// logits is `p − onehot`, so no activation derivative is applied here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Softmax {
    classes: usize,
    nin: usize,
    weights: Tensor,
    grads: Tensor,
    // Probabilities after normalization.
    response: Vec<f64>,
    delta: Vec<f64>,
    optimizer: Optimizer,
}

impl Softmax {
    pub fn new(classes: usize, nin: usize, adam: bool, rng: &mut StdRng) -> Softmax {
        let weights = Tensor::glorot(classes, nin + 1, rng);
        let grads = Tensor::zeros(classes, nin + 1);

        Softmax {
            classes,
            nin,
            optimizer: Optimizer::for_flag(adam, weights.n()),
            weights,
            grads,
            response: vec![0.0; classes],
            delta: vec![0.0; classes],
        }
    }

    pub fn width(&self) -> usize {
        self.classes
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

        // Shift by the max logit before exponentiating.
        let mut max = f64::NEG_INFINITY;
        for &z in self.response.iter() {
            if z > max {
                max = z;
            }
        }

        let mut denom = 0.0;
        for p in self.response.iter_mut() {
            *p = (*p - max).exp();
            denom += *p;
        }
        for p in self.response.iter_mut() {
            *p /= denom;
        }
    }

    /// Index of the most probable class.
    pub fn classify(&self) -> usize {
        let mut best = 0;
        for (i, &p) in self.response.iter().enumerate() {
            if p > self.response[best] {
                best = i;
            }
        }
        best
    }

    /// Cross-entropy against the class index in `answers[0]`; sets
    /// ∂L/∂z = p − onehot.
    pub fn loss(&mut self, answers: &[f64]) -> Result<f64> {
        let class = self.answer_class(answers)?;

        for (i, d) in self.delta.iter_mut().enumerate() {
            *d = self.response[i];
            if i == class {
                *d -= 1.0;
            }
        }

        Ok(-(self.response[class].max(EPS)).ln())
    }

    pub fn correct(&self, answers: &[f64]) -> Result<bool> {
        Ok(self.classify() == self.answer_class(answers)?)
    }

    fn answer_class(&self, answers: &[f64]) -> Result<usize> {
        if answers.len() != 1 {
            return Err(Error::Shape(format!(
                "softmax head expects a single class index, got {} answers",
                answers.len()
            )));
        }
        let class = answers[0];
        if class < 0.0 || class >= self.classes as f64 {
            return Err(Error::Shape(format!(
                "class index {class} out of range for {} classes",
                self.classes
            )));
        }
        Ok(class as usize)
    }

    pub fn backward(&mut self, x: &[f64]) {
        for i in 0..self.classes {
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
