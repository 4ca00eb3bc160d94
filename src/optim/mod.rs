pub mod adam;
pub mod rprop;

pub use adam::Adam;
pub use rprop::Rprop;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Per-layer update strategy. Every parameter-owning layer holds exactly one
/// of these, sized to its flat weight buffer; the state is never shared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Optimizer {
    Adam(Adam),
    Rprop(Rprop),
}

impl Optimizer {
    /// Selects the strategy from the per-layer `adam` flag: ADAM when true,
    /// RPROP+ otherwise.
    pub fn for_flag(adam: bool, n: usize) -> Optimizer {
        if adam {
            Optimizer::Adam(Adam::new(n))
        } else {
            Optimizer::Rprop(Rprop::new(n))
        }
    }

    /// Consumes the accumulated gradients, updating `weights` in place.
    /// Gradient slots are zeroed so the next step starts clean.
    pub fn update(&mut self, weights: &mut [f64], grads: &mut [f64]) -> Result<()> {
        match self {
            Optimizer::Adam(adam) => adam.update(weights, grads),
            Optimizer::Rprop(rprop) => rprop.update(weights, grads),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Optimizer::Adam(_) => "adam",
            Optimizer::Rprop(_) => "rprop",
        }
    }
}
