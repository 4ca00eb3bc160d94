use serde::{Deserialize, Serialize};

/// One keep-alive progress record: the step counter and the loss of that
/// step's batch.
///
/// Emitted every `keep_alive` steps through the model's progress channel if
/// one is installed, otherwise printed. Purely informational — a dropped
/// receiver or a full channel never affects training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub step: usize,
    pub loss: f64,
}
