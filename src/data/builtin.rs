//! Built-in synthetic datasets for demos and regression fixtures.
//!
//! All generators are deterministic: spread comes from index-driven
//! sinusoidals rather than an RNG, so fixtures reproduce exactly.

use std::f64::consts::PI;

use crate::data::dataset::{Dataset, Tuple};

/// Three well-separated classes over four features, `n` rows, class index
/// answers. Centers are iris-shaped; the jitter amplitude keeps the classes
/// linearly separable.
pub fn three_class(n: usize) -> Dataset {
    let centers = [
        [5.0, 3.4, 1.5, 0.25],
        [5.9, 2.8, 4.3, 1.3],
        [6.6, 3.0, 5.6, 2.0],
    ];

    let mut data = Dataset::new(4, 1);
    for i in 0..n {
        let class = i % 3;
        let mut predictors = Vec::with_capacity(4);
        for (j, &c) in centers[class].iter().enumerate() {
            let jitter = 0.3 * ((i as f64) * 2.399 + (j as f64) * 1.7).sin();
            predictors.push(c + jitter);
        }
        data.push(Tuple::new(predictors, vec![class as f64]))
            .expect("generator emits fixed-width rows");
    }
    data
}

/// `n` samples of `y = sin(x · π/2)` for `x` evenly spaced in [0, 1].
pub fn sine(n: usize) -> Dataset {
    let mut data = Dataset::new(1, 1);
    for i in 0..n {
        let x = i as f64 / (n - 1).max(1) as f64;
        data.push(Tuple::new(vec![x], vec![(x * PI / 2.0).sin()]))
            .expect("generator emits fixed-width rows");
    }
    data
}

/// Multi-label fixture: 16 features in [0, 1], 14 independent bits, each
/// bit a threshold over a pair of features.
pub fn multi_label(n: usize) -> Dataset {
    let mut data = Dataset::new(16, 14);
    for i in 0..n {
        let features: Vec<f64> = (0..16)
            .map(|j| 0.5 + 0.5 * ((i as f64) * 0.73 + (j as f64) * 1.37).sin())
            .collect();

        let answers: Vec<f64> = (0..14)
            .map(|k| {
                if features[k] + features[k + 2] > 1.0 {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();

        data.push(Tuple::new(features, answers))
            .expect("generator emits fixed-width rows");
    }
    data
}
