use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One example: a fixed-length predictor vector plus a fixed-length answer
/// vector (a single class index for single-label classification).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuple {
    pub predictors: Vec<f64>,
    pub answers: Vec<f64>,
}

impl Tuple {
    pub fn new(predictors: Vec<f64>, answers: Vec<f64>) -> Tuple {
        Tuple {
            predictors,
            answers,
        }
    }
}

/// An ordered, shape-homogeneous collection of examples.
///
/// Built once by a loader, optionally consumed by `Model::add_preprocess` to
/// derive normalization statistics, then treated as read-only during
/// training. `answer`/`answer_vec` are plain lookups used by callers to
/// score predictions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    nin: usize,
    nout: usize,
    tuples: Vec<Tuple>,
    // Per accepted source column: vocabulary of categorical values seen, in
    // encounter order; empty for purely numeric columns.
    vocab: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new(nin: usize, nout: usize) -> Dataset {
        Dataset {
            nin,
            nout,
            tuples: Vec::new(),
            vocab: vec![Vec::new(); nin + nout],
        }
    }

    /// Builds a dataset from pre-shaped rows, rejecting any row whose
    /// predictor or answer width disagrees.
    pub fn from_rows(nin: usize, nout: usize, rows: Vec<Tuple>) -> Result<Dataset> {
        let mut data = Dataset::new(nin, nout);
        for row in rows {
            data.push(row)?;
        }
        Ok(data)
    }

    pub fn push(&mut self, row: Tuple) -> Result<()> {
        if row.predictors.len() != self.nin || row.answers.len() != self.nout {
            return Err(Error::Shape(format!(
                "row {}: expected {}+{} values, got {}+{}",
                self.tuples.len(),
                self.nin,
                self.nout,
                row.predictors.len(),
                row.answers.len()
            )));
        }
        self.tuples.push(row);
        Ok(())
    }

    pub(crate) fn set_vocab(&mut self, vocab: Vec<Vec<String>>) {
        self.vocab = vocab;
    }

    pub fn nin(&self) -> usize {
        self.nin
    }

    pub fn nout(&self) -> usize {
        self.nout
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn tuple(&self, index: usize) -> &Tuple {
        &self.tuples[index]
    }

    /// Ground truth scalar for an example (the first answer column).
    pub fn answer(&self, index: usize) -> f64 {
        self.tuples[index].answers[0]
    }

    /// Ground truth vector for an example.
    pub fn answer_vec(&self, index: usize) -> &[f64] {
        &self.tuples[index].answers
    }

    /// Categorical vocabulary recorded for an accepted column during load;
    /// empty for numeric columns.
    pub fn vocabulary(&self, col: usize) -> &[String] {
        &self.vocab[col]
    }

    pub fn mean(&self, col: usize) -> f64 {
        let mut sum = 0.0;
        for t in &self.tuples {
            sum += t.predictors[col];
        }
        sum / self.tuples.len() as f64
    }

    /// Sample variance (n − 1 denominator).
    pub fn variance(&self, col: usize) -> f64 {
        let n = self.tuples.len() as f64;
        let mut sum = 0.0;
        let mut sumsq = 0.0;

        for t in &self.tuples {
            let v = t.predictors[col];
            sum += v;
            sumsq += v * v;
        }

        let mean = sum / n;
        sumsq / (n - 1.0) - mean * mean * n / (n - 1.0)
    }

    pub fn std_dev(&self, col: usize) -> f64 {
        self.variance(col).max(0.0).sqrt()
    }

    pub fn min(&self, col: usize) -> f64 {
        let mut best = f64::MAX;
        for t in &self.tuples {
            if t.predictors[col] < best {
                best = t.predictors[col];
            }
        }
        best
    }

    pub fn max(&self, col: usize) -> f64 {
        let mut best = f64::MIN;
        for t in &self.tuples {
            if t.predictors[col] > best {
                best = t.predictors[col];
            }
        }
        best
    }
}
