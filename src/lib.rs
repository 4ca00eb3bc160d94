pub mod data;
pub mod error;
pub mod layers;
pub mod math;
pub mod model;
pub mod optim;
pub mod train;

// Convenience re-exports
pub use data::dataset::{Dataset, Tuple};
pub use error::{Error, Result};
pub use math::tensor::Tensor;
pub use model::model::{BatchMode, Model, Phase};
pub use train::progress::ProgressRecord;
