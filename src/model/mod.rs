pub mod model;

pub use model::{BatchMode, Model, Phase};
