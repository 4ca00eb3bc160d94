use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::data::dataset::Dataset;
use crate::error::{Error, Result};
use crate::layers::{
    self, ConvFilter, ConvMaxPool, Dense, Layer, MultiLabel, Preprocess, ScalarMse, Softmax,
};
use crate::train::controller;
use crate::train::progress::ProgressRecord;
use crate::train::sampler::ShuffleSampler;

/// Lifecycle of a model. Assembly ends irreversibly with the first training
/// step; both `Converged` and `MaxStepsReached` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Assembling,
    Training,
    Converged,
    MaxStepsReached,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Converged | Phase::MaxStepsReached)
    }
}

/// Batch selection per training step: the whole dataset in order, or a
/// no-replacement random subsample sized as a fraction of it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BatchMode {
    Full,
    Stochastic(f64),
}

/// An ordered stack of layers plus the training and inference state that
/// travels with it.
///
/// A model is assembled by appending layers (input widths are inferred from
/// the previous layer), configured, and then trained; the first training
/// step freezes the structure. Inference reuses the forward path without
/// touching gradients or optimizer state.
pub struct Model {
    pub(crate) nin: usize,
    pub(crate) nout: usize,
    pub(crate) layers: Vec<Layer>,
    pub(crate) phase: Phase,

    pub(crate) loss: f64,
    pub(crate) steps: usize,

    pub(crate) stop_loss: f64,
    pub(crate) max_steps: usize,
    pub(crate) accuracy_halt: bool,
    pub(crate) keep_alive: usize,
    pub(crate) batch: BatchMode,
    pub(crate) checkpoint: Option<(PathBuf, usize)>,
    pub(crate) progress_tx: Option<mpsc::Sender<ProgressRecord>>,

    pub(crate) rng: StdRng,
    pub(crate) sampler: Option<ShuffleSampler>,
}

#[derive(Serialize)]
struct CheckpointRef<'a> {
    nin: usize,
    nout: usize,
    steps: usize,
    layers: &'a [Layer],
}

#[derive(Deserialize)]
struct Checkpoint {
    nin: usize,
    nout: usize,
    steps: usize,
    layers: Vec<Layer>,
}

impl Model {
    /// Allocates an empty model. `hidden_hint` pre-sizes the layer stack,
    /// `nin`/`nout` fix the input and output widths for the model's
    /// lifetime, and `seed` fixes every random draw (weight init, batch
    /// sampling) for reproducibility.
    pub fn new(hidden_hint: usize, nin: usize, nout: usize, seed: u64) -> Model {
        Model {
            nin,
            nout,
            layers: Vec::with_capacity(hidden_hint + 1),
            phase: Phase::Assembling,
            loss: f64::NAN,
            steps: 0,
            stop_loss: 1e-5,
            max_steps: 5000,
            accuracy_halt: false,
            keep_alive: 0,
            batch: BatchMode::Full,
            checkpoint: None,
            progress_tx: None,
            rng: StdRng::seed_from_u64(seed),
            sampler: None,
        }
    }

    pub fn nin(&self) -> usize {
        self.nin
    }

    pub fn nout(&self) -> usize {
        self.nout
    }

    /// Loss of the most recent training step; NaN before any step has run.
    pub fn loss(&self) -> f64 {
        self.loss
    }

    /// Lifetime step counter, absolute across repeated `train` calls.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(Layer::parameter_count).sum()
    }

    // ── Assembly ───────────────────────────────────────────────────────────

    /// Width feeding the next appended layer.
    fn cur_width(&self) -> usize {
        self.layers.last().map_or(self.nin, Layer::width)
    }

    fn check_open(&self) -> Result<()> {
        if self.phase != Phase::Assembling {
            return Err(Error::Config(
                "model is frozen; layers must be added before training".into(),
            ));
        }
        if self.layers.last().is_some_and(Layer::is_head) {
            return Err(Error::Config(
                "head layer already present; nothing can follow it".into(),
            ));
        }
        Ok(())
    }

    /// Installs a normalization layer whose statistics come from the given
    /// (training) dataset, so inference examples are scaled identically.
    pub fn add_preprocess(&mut self, data: &Dataset) -> Result<()> {
        self.check_open()?;
        if data.nin() != self.cur_width() {
            return Err(Error::Shape(format!(
                "preprocess expects width {}, dataset has {}",
                self.cur_width(),
                data.nin()
            )));
        }
        self.layers.push(Layer::Preprocess(Preprocess::from_dataset(data)));
        Ok(())
    }

    pub fn add_dense(&mut self, n: usize, adam: bool) -> Result<()> {
        self.check_open()?;
        if n == 0 {
            return Err(Error::Config("dense layer needs at least one node".into()));
        }
        let nin = self.cur_width();
        self.layers
            .push(Layer::Dense(Dense::new(n, nin, adam, &mut self.rng)));
        Ok(())
    }

    pub fn add_conv_filter(&mut self, n: usize, width: usize, stride: usize, adam: bool) -> Result<()> {
        self.check_open()?;
        if n == 0 || width == 0 || stride == 0 {
            return Err(Error::Config(
                "conv filter needs kernels, width and stride of at least 1".into(),
            ));
        }
        let in_width = self.cur_width();
        if width > in_width {
            return Err(Error::Shape(format!(
                "conv window {} wider than its input {}",
                width, in_width
            )));
        }
        self.layers.push(Layer::ConvFilter(ConvFilter::new(
            n,
            width,
            stride,
            in_width,
            adam,
            &mut self.rng,
        )));
        Ok(())
    }

    pub fn add_conv_max_pool(&mut self, n: usize, width: usize, stride: usize) -> Result<()> {
        self.check_open()?;
        if n == 0 || width == 0 || stride == 0 {
            return Err(Error::Config(
                "max pool needs channels, width and stride of at least 1".into(),
            ));
        }
        let in_width = self.cur_width();
        if in_width % n != 0 {
            return Err(Error::Shape(format!(
                "input width {} does not divide into {} channels",
                in_width, n
            )));
        }
        if width > in_width / n {
            return Err(Error::Shape(format!(
                "pool window {} wider than its channel length {}",
                width,
                in_width / n
            )));
        }
        self.layers
            .push(Layer::ConvMaxPool(ConvMaxPool::new(n, width, stride, in_width)));
        Ok(())
    }

    /// Single-label classification head over the model's output width.
    pub fn add_softmax(&mut self, adam: bool) -> Result<()> {
        self.check_open()?;
        if self.nout < 2 {
            return Err(Error::Config(
                "softmax head needs at least two classes".into(),
            ));
        }
        let nin = self.cur_width();
        self.layers
            .push(Layer::Softmax(Softmax::new(self.nout, nin, adam, &mut self.rng)));
        Ok(())
    }

    /// Scalar regression head; the model's output width must be 1.
    pub fn add_mse(&mut self, adam: bool) -> Result<()> {
        self.check_open()?;
        if self.nout != 1 {
            return Err(Error::Config(format!(
                "MSE head answers a single value, model output width is {}",
                self.nout
            )));
        }
        let nin = self.cur_width();
        self.layers
            .push(Layer::Mse(ScalarMse::new(nin, adam, &mut self.rng)));
        Ok(())
    }

    /// Independent-sigmoid head over the model's output width.
    pub fn add_multi_label(&mut self, adam: bool) -> Result<()> {
        self.check_open()?;
        let nin = self.cur_width();
        self.layers.push(Layer::MultiLabel(MultiLabel::new(
            self.nout,
            nin,
            adam,
            &mut self.rng,
        )));
        Ok(())
    }

    // ── Configuration ──────────────────────────────────────────────────────

    /// Loss threshold at which training counts as converged.
    pub fn set_stop_loss(&mut self, halt: f64) {
        self.stop_loss = halt;
    }

    /// Lifetime step budget; `train`'s `steps` argument writes the same
    /// field.
    pub fn set_max_steps(&mut self, n: usize) {
        self.max_steps = n;
    }

    /// Halt as converged once a full step classifies every example
    /// correctly, even above the loss threshold.
    pub fn set_accuracy_halt(&mut self, on: bool) {
        self.accuracy_halt = on;
    }

    /// Emit a progress record every `n` steps; 0 disables.
    pub fn set_keep_alive(&mut self, n: usize) {
        self.keep_alive = n;
    }

    /// Install a channel for keep-alive records instead of stdout.
    pub fn set_progress_channel(&mut self, tx: mpsc::Sender<ProgressRecord>) {
        self.progress_tx = Some(tx);
    }

    /// Serialize the model to `path` every `every` steps; best effort.
    pub fn set_checkpoint(&mut self, path: impl Into<PathBuf>, every: usize) {
        self.checkpoint = Some((path.into(), every));
    }

    /// Switches from full-batch to stochastic training with a no-replacement
    /// subsample of `percentage` (in (0, 1]) of the dataset per step. The
    /// two modes are mutually exclusive and set once.
    pub fn set_sgd(&mut self, percentage: f64) -> Result<()> {
        if self.phase != Phase::Assembling {
            return Err(Error::Config(
                "training mode must be configured before training".into(),
            ));
        }
        if !matches!(self.batch, BatchMode::Full) {
            return Err(Error::Config("training mode already configured".into()));
        }
        if !(percentage > 0.0 && percentage <= 1.0) {
            return Err(Error::Config(format!(
                "SGD percentage must be in (0, 1], got {percentage}"
            )));
        }
        self.batch = BatchMode::Stochastic(percentage);
        Ok(())
    }

    // ── Training ───────────────────────────────────────────────────────────

    /// Trains until the stopping policy fires: loss at or below the
    /// stop-loss threshold, or `steps` total lifetime steps. The first call
    /// freezes assembly. Calls after a terminal phase are no-ops and return
    /// the phase unchanged.
    pub fn train(&mut self, data: &Dataset, steps: usize) -> Result<Phase> {
        controller::run(self, data, steps)
    }

    // ── Inference ──────────────────────────────────────────────────────────

    fn run_forward(&mut self, predictors: &[f64]) -> Result<()> {
        if predictors.len() != self.nin {
            return Err(Error::Shape(format!(
                "example has {} predictors, model input width is {}",
                predictors.len(),
                self.nin
            )));
        }
        if !self.layers.last().is_some_and(Layer::is_head) {
            return Err(Error::Config(
                "model has no head layer; assemble one before inference".into(),
            ));
        }
        layers::forward_stack(&mut self.layers, predictors);
        Ok(())
    }

    fn head(&self) -> &Layer {
        self.layers.last().expect("run_forward checked the stack")
    }

    /// Scalar inference: the regression value for an MSE head, the class
    /// index for a softmax head.
    pub fn infer(&mut self, predictors: &[f64]) -> Result<f64> {
        self.run_forward(predictors)?;
        match self.head() {
            Layer::Mse(l) => Ok(l.response()[0]),
            Layer::Softmax(l) => Ok(l.classify() as f64),
            _ => Err(Error::Config(
                "multi-label models answer through classify_vec".into(),
            )),
        }
    }

    /// Arg-max class index from a softmax head.
    pub fn classify(&mut self, predictors: &[f64]) -> Result<usize> {
        self.run_forward(predictors)?;
        match self.head() {
            Layer::Softmax(l) => Ok(l.classify()),
            other => Err(Error::Config(format!(
                "classify needs a softmax head, model ends in {}",
                other.name()
            ))),
        }
    }

    /// The head's full response vector: per-unit probabilities for a
    /// multi-label head, the probability simplex for a softmax head.
    pub fn classify_vec(&mut self, predictors: &[f64]) -> Result<Vec<f64>> {
        self.run_forward(predictors)?;
        Ok(self.head().response().to_vec())
    }

    // ── Persistence ────────────────────────────────────────────────────────

    /// Serializes the layer stack (weights and optimizer state included) to
    /// a JSON checkpoint.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        let checkpoint = CheckpointRef {
            nin: self.nin,
            nout: self.nout,
            steps: self.steps,
            layers: &self.layers,
        };
        serde_json::to_writer(writer, &checkpoint)
            .map_err(|e| Error::Format(format!("checkpoint encode: {e}")))
    }

    /// Restores a model from a checkpoint written by `save_json`. The
    /// structure comes back frozen (phase `Training`); configuration is
    /// reset to defaults.
    pub fn load_json(path: impl AsRef<Path>, seed: u64) -> Result<Model> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let checkpoint: Checkpoint = serde_json::from_reader(reader)
            .map_err(|e| Error::Format(format!("checkpoint decode: {e}")))?;

        let mut model = Model::new(0, checkpoint.nin, checkpoint.nout, seed);
        model.layers = checkpoint.layers;
        model.steps = checkpoint.steps;
        model.phase = Phase::Training;
        Ok(model)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "in({})", self.nin)?;
        for layer in &self.layers {
            write!(f, " -> {}({})", layer.name(), layer.width())?;
        }
        Ok(())
    }
}
