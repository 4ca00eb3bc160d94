pub mod conv;
pub mod dense;
pub mod maxpool;
pub mod mse;
pub mod multilabel;
pub mod preprocess;
pub mod softmax;

pub use conv::ConvFilter;
pub use dense::Dense;
pub use maxpool::ConvMaxPool;
pub use mse::ScalarMse;
pub use multilabel::MultiLabel;
pub use preprocess::Preprocess;
pub use softmax::Softmax;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// The closed set of layer variants. All variants are known at design time,
/// so a tagged enum carries the polymorphism: forward, backward, delta
/// propagation, optimizer update and parameter count dispatch by match, and
/// the whole stack serializes for checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Layer {
    Preprocess(Preprocess),
    Dense(Dense),
    ConvFilter(ConvFilter),
    ConvMaxPool(ConvMaxPool),
    Softmax(Softmax),
    Mse(ScalarMse),
    MultiLabel(MultiLabel),
}

impl Layer {
    /// Output width of this layer.
    pub fn width(&self) -> usize {
        match self {
            Layer::Preprocess(l) => l.width(),
            Layer::Dense(l) => l.width(),
            Layer::ConvFilter(l) => l.out_width(),
            Layer::ConvMaxPool(l) => l.out_width(),
            Layer::Softmax(l) => l.width(),
            Layer::Mse(l) => l.width(),
            Layer::MultiLabel(l) => l.width(),
        }
    }

    pub fn parameter_count(&self) -> usize {
        match self {
            Layer::Preprocess(_) | Layer::ConvMaxPool(_) => 0,
            Layer::Dense(l) => l.parameter_count(),
            Layer::ConvFilter(l) => l.parameter_count(),
            Layer::Softmax(l) => l.parameter_count(),
            Layer::Mse(l) => l.parameter_count(),
            Layer::MultiLabel(l) => l.parameter_count(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Layer::Preprocess(_) => "preprocess",
            Layer::Dense(_) => "dense",
            Layer::ConvFilter(_) => "conv",
            Layer::ConvMaxPool(_) => "maxpool",
            Layer::Softmax(_) => "softmax",
            Layer::Mse(_) => "mse",
            Layer::MultiLabel(_) => "multilabel",
        }
    }

    /// Heads terminate the stack and own the loss pairing.
    pub fn is_head(&self) -> bool {
        matches!(
            self,
            Layer::Softmax(_) | Layer::Mse(_) | Layer::MultiLabel(_)
        )
    }

    /// Answer width this head trains against, `None` for non-heads. The
    /// softmax head consumes a single class index; the multi-label head a
    /// full bit vector.
    pub fn expected_answer_width(&self) -> Option<usize> {
        match self {
            Layer::Softmax(_) | Layer::Mse(_) => Some(1),
            Layer::MultiLabel(l) => Some(l.width()),
            _ => None,
        }
    }

    pub fn response(&self) -> &[f64] {
        match self {
            Layer::Preprocess(l) => l.response(),
            Layer::Dense(l) => l.response(),
            Layer::ConvFilter(l) => l.response(),
            Layer::ConvMaxPool(l) => l.response(),
            Layer::Softmax(l) => l.response(),
            Layer::Mse(l) => l.response(),
            Layer::MultiLabel(l) => l.response(),
        }
    }

    pub fn delta_mut(&mut self) -> &mut [f64] {
        match self {
            Layer::Preprocess(l) => l.delta_mut(),
            Layer::Dense(l) => l.delta_mut(),
            Layer::ConvFilter(l) => l.delta_mut(),
            Layer::ConvMaxPool(l) => l.delta_mut(),
            Layer::Softmax(l) => l.delta_mut(),
            Layer::Mse(l) => l.delta_mut(),
            Layer::MultiLabel(l) => l.delta_mut(),
        }
    }

    pub fn forward(&mut self, x: &[f64]) {
        match self {
            Layer::Preprocess(l) => l.forward(x),
            Layer::Dense(l) => l.forward(x),
            Layer::ConvFilter(l) => l.forward(x),
            Layer::ConvMaxPool(l) => l.forward(x),
            Layer::Softmax(l) => l.forward(x),
            Layer::Mse(l) => l.forward(x),
            Layer::MultiLabel(l) => l.forward(x),
        }
    }

    /// Accumulates parameter gradients against the layer input. Non-
    /// parametric layers have nothing to do.
    pub fn backward(&mut self, x: &[f64]) {
        match self {
            Layer::Preprocess(_) | Layer::ConvMaxPool(_) => {}
            Layer::Dense(l) => l.backward(x),
            Layer::ConvFilter(l) => l.backward(x),
            Layer::Softmax(l) => l.backward(x),
            Layer::Mse(l) => l.backward(x),
            Layer::MultiLabel(l) => l.backward(x),
        }
    }

    /// Writes ∂L/∂input into `out` (fully overwritten).
    pub fn propagate_delta(&self, out: &mut [f64]) {
        match self {
            Layer::Preprocess(l) => l.propagate_delta(out),
            Layer::Dense(l) => l.propagate_delta(out),
            Layer::ConvFilter(l) => l.propagate_delta(out),
            Layer::ConvMaxPool(l) => l.propagate_delta(out),
            Layer::Softmax(l) => l.propagate_delta(out),
            Layer::Mse(l) => l.propagate_delta(out),
            Layer::MultiLabel(l) => l.propagate_delta(out),
        }
    }

    /// One optimizer pass over the accumulated gradients.
    pub fn update(&mut self) -> Result<()> {
        match self {
            Layer::Preprocess(_) | Layer::ConvMaxPool(_) => Ok(()),
            Layer::Dense(l) => l.update(),
            Layer::ConvFilter(l) => l.update(),
            Layer::Softmax(l) => l.update(),
            Layer::Mse(l) => l.update(),
            Layer::MultiLabel(l) => l.update(),
        }
    }

    /// Head loss for one example: accumulates nothing, but sets this layer's
    /// delta to ∂L/∂z for the backward pass.
    pub fn loss(&mut self, answers: &[f64]) -> Result<f64> {
        match self {
            Layer::Softmax(l) => l.loss(answers),
            Layer::Mse(l) => l.loss(answers),
            Layer::MultiLabel(l) => l.loss(answers),
            other => Err(Error::Config(format!(
                "{} layer has no loss; only head layers terminate a stack",
                other.name()
            ))),
        }
    }

    /// Classification correctness for the accuracy halt; `None` when the
    /// head has no discrete notion of correct (MSE) or the layer is not a
    /// head.
    pub fn correct(&self, answers: &[f64]) -> Option<Result<bool>> {
        match self {
            Layer::Softmax(l) => Some(l.correct(answers)),
            Layer::MultiLabel(l) => Some(l.correct(answers)),
            _ => None,
        }
    }
}

/// Runs one example through the stack; each layer reads the previous
/// layer's stored response.
pub(crate) fn forward_stack(layers: &mut [Layer], x: &[f64]) {
    for i in 0..layers.len() {
        let (before, rest) = layers.split_at_mut(i);
        let input = if i == 0 { x } else { before[i - 1].response() };
        rest[0].forward(input);
    }
}

/// Backward pass over the stack. The head's delta must already hold ∂L/∂z
/// (set by `Layer::loss`); each layer accumulates its gradients and pushes
/// the delta down to the layer below.
pub(crate) fn backward_stack(layers: &mut [Layer], x: &[f64]) {
    for i in (0..layers.len()).rev() {
        let (before, rest) = layers.split_at_mut(i);
        let cur = &mut rest[0];
        let input = if i == 0 { x } else { before[i - 1].response() };
        cur.backward(input);
        if i > 0 {
            cur.propagate_delta(before[i - 1].delta_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn stack_forward_chains_responses() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut layers = vec![
            Layer::Dense(Dense::new(3, 2, true, &mut rng)),
            Layer::Dense(Dense::new(2, 3, true, &mut rng)),
        ];
        forward_stack(&mut layers, &[0.5, -0.5]);
        assert_eq!(layers[1].response().len(), 2);
        assert!(layers[1].response().iter().all(|r| r.is_finite()));
    }

    #[test]
    fn loss_on_a_non_head_is_a_config_error() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut layer = Layer::Dense(Dense::new(2, 2, true, &mut rng));
        assert!(matches!(layer.loss(&[0.0]), Err(Error::Config(_))));
    }

    #[test]
    fn head_predicates() {
        let mut rng = StdRng::seed_from_u64(9);
        let dense = Layer::Dense(Dense::new(2, 2, true, &mut rng));
        let sm = Layer::Softmax(Softmax::new(3, 2, true, &mut rng));
        let ml = Layer::MultiLabel(MultiLabel::new(4, 2, true, &mut rng));

        assert!(!dense.is_head());
        assert!(sm.is_head());
        assert_eq!(sm.expected_answer_width(), Some(1));
        assert_eq!(ml.expected_answer_width(), Some(4));
    }
}
