pub mod builtin;
pub mod csv;
pub mod dataset;
pub mod mnist;

pub use dataset::{Dataset, Tuple};

use std::path::Path;

use crate::error::Result;

impl Dataset {
    /// Loads a CSV source with a per-column acceptance mask; the first `nin`
    /// accepted columns are predictors, the rest answers.
    pub fn from_csv(path: impl AsRef<Path>, nin: usize, nout: usize, accept: &[bool]) -> Result<Dataset> {
        csv::load_csv(path.as_ref(), nin, nout, accept)
    }

    /// Loads a CSV source whose last accepted column is the class label.
    pub fn from_csv_class(path: impl AsRef<Path>, accept: &[bool]) -> Result<Dataset> {
        csv::load_csv_class(path.as_ref(), accept)
    }

    /// Loads the MNIST training pair from a directory of IDX files.
    pub fn from_mnist(dir: impl AsRef<Path>) -> Result<Dataset> {
        mnist::load_mnist(dir.as_ref())
    }
}
