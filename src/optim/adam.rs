use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const ALPHA: f64 = 0.001;
const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-7;

/// ADAM: A Method for Stochastic Optimization, ICLR 2015.
///
/// Keeps exponentially decayed first and second moment estimates per
/// parameter. Bias correction uses running powers of the betas, advanced
/// once per update pass, so the power for pass t is β^t.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adam {
    m: Vec<f64>,
    v: Vec<f64>,
    beta1_pow: f64,
    beta2_pow: f64,
}

impl Adam {
    pub fn new(n: usize) -> Adam {
        Adam {
            m: vec![0.0; n],
            v: vec![0.0; n],
            beta1_pow: BETA1,
            beta2_pow: BETA2,
        }
    }

    /// Applies one update pass over every parameter and zeroes the consumed
    /// gradient slots.
    pub fn update(&mut self, weights: &mut [f64], grads: &mut [f64]) -> Result<()> {
        debug_assert_eq!(weights.len(), self.m.len());
        debug_assert_eq!(weights.len(), grads.len());

        for i in 0..weights.len() {
            let g = grads[i];
            if !g.is_finite() {
                return Err(Error::Numeric("non-finite gradient in ADAM".into()));
            }

            self.m[i] = BETA1 * self.m[i] + (1.0 - BETA1) * g;
            self.v[i] = BETA2 * self.v[i] + (1.0 - BETA2) * (g * g);

            let m_hat = self.m[i] / (1.0 - self.beta1_pow);
            let v_hat = self.v[i] / (1.0 - self.beta2_pow);

            weights[i] -= ALPHA * m_hat / (v_hat.sqrt() + EPSILON);

            if !weights[i].is_finite() {
                return Err(Error::Numeric("degenerate weight update in ADAM".into()));
            }

            grads[i] = 0.0;
        }

        self.beta1_pow *= BETA1;
        self.beta2_pow *= BETA2;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_is_close_to_alpha_for_unit_gradient() {
        // With g = 1: m̂ = 1, v̂ = 1, so the step is α / (1 + ε) ≈ α.
        let mut adam = Adam::new(1);
        let mut w = [0.0];
        let mut g = [1.0];
        adam.update(&mut w, &mut g).unwrap();
        assert!((w[0] + ALPHA).abs() < 1e-6);
        assert_eq!(g[0], 0.0);
    }

    #[test]
    fn converges_on_a_convex_quadratic() {
        // f(w) = (w - 3)^2, ∇f = 2 (w - 3).
        let mut adam = Adam::new(1);
        let mut w = [0.0];
        for _ in 0..8000 {
            let mut g = [2.0 * (w[0] - 3.0)];
            adam.update(&mut w, &mut g).unwrap();
        }
        assert!((w[0] - 3.0).abs() < 0.05, "w = {}", w[0]);
    }

    #[test]
    fn nan_gradient_is_surfaced() {
        let mut adam = Adam::new(1);
        let mut w = [0.0];
        let mut g = [f64::NAN];
        assert!(matches!(
            adam.update(&mut w, &mut g),
            Err(Error::Numeric(_))
        ));
    }
}
