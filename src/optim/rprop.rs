use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DELTA0: f64 = 1e-2;
const DELTA_MIN: f64 = 1e-8;
const DELTA_MAX: f64 = 50.0;

const ETA_PLUS: f64 = 1.2;
const ETA_MINUS: f64 = 0.5;

/// `signbit` semantics: -0.0 counts as negative, +0.0 as positive.
fn sign(x: f64) -> f64 {
    if x.is_sign_negative() {
        -1.0
    } else {
        1.0
    }
}

/// RPROP+ — resilient backpropagation with weight backtracking.
///
/// Only the gradient sign is used. Each parameter carries an adaptive step
/// size that grows while consecutive gradient signs agree and shrinks on a
/// sign flip; the flip also reverts the step that overshot and clears the
/// remembered gradient so the next pass re-establishes direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rprop {
    prev: Vec<f64>,
    step: Vec<f64>,
}

impl Rprop {
    pub fn new(n: usize) -> Rprop {
        Rprop {
            prev: vec![0.0; n],
            step: vec![DELTA0; n],
        }
    }

    /// Applies one update pass over every parameter and zeroes the consumed
    /// gradient slots.
    pub fn update(&mut self, weights: &mut [f64], grads: &mut [f64]) -> Result<()> {
        debug_assert_eq!(weights.len(), self.prev.len());
        debug_assert_eq!(weights.len(), grads.len());

        for i in 0..weights.len() {
            let g = grads[i];
            if !g.is_finite() {
                return Err(Error::Numeric("non-finite gradient in RPROP".into()));
            }

            if self.prev[i] == 0.0 || g == 0.0 {
                let delta = -sign(g) * self.step[i];
                if delta.is_nan() {
                    return Err(Error::Numeric("degenerate weight update in RPROP".into()));
                }

                weights[i] += delta;
                self.prev[i] = g;
            } else if sign(g) == sign(self.prev[i]) {
                let mut delta = self.step[i] * ETA_PLUS;
                if delta > DELTA_MAX {
                    delta = DELTA_MAX;
                }
                self.step[i] = delta;

                delta *= -sign(g);
                if delta.is_nan() {
                    return Err(Error::Numeric("degenerate weight update in RPROP".into()));
                }

                weights[i] += delta;
                self.prev[i] = g;
            } else {
                // Sign flip: revert the step that overshot, shrink, and
                // forget the gradient so the next pass starts fresh.
                let backtrack = self.step[i] * sign(self.prev[i]);

                let mut delta = self.step[i] * ETA_MINUS;
                if delta < DELTA_MIN {
                    delta = DELTA_MIN;
                }
                if delta.is_nan() {
                    return Err(Error::Numeric("degenerate weight update in RPROP".into()));
                }
                self.step[i] = delta;

                weights[i] += backtrack;
                self.prev[i] = 0.0;
            }

            grads[i] = 0.0;
        }

        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn step_size(&self, i: usize) -> f64 {
        self.step[i]
    }
}
