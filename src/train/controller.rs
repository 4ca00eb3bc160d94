//! The training loop: batch selection, forward/backward accumulation, one
//! optimizer pass per layer per step, stopping-policy checks and the
//! keep-alive / checkpoint side channels.

use crate::data::dataset::Dataset;
use crate::error::{Error, Result};
use crate::layers;
use crate::model::model::{BatchMode, Model, Phase};
use crate::train::progress::ProgressRecord;
use crate::train::sampler::ShuffleSampler;

/// Drives `model` to a terminal phase or an error. `steps` is the absolute
/// lifetime step budget. Calls in a terminal phase are no-ops.
pub(crate) fn run(model: &mut Model, data: &Dataset, steps: usize) -> Result<Phase> {
    if model.phase.is_terminal() {
        return Ok(model.phase);
    }
    if data.is_empty() {
        return Err(Error::Config("cannot train on an empty dataset".into()));
    }

    validate(model, data)?;

    // First step freezes assembly for good.
    model.phase = Phase::Training;
    model.max_steps = steps;

    if matches!(model.batch, BatchMode::Stochastic(_)) {
        let stale = model
            .sampler
            .as_ref()
            .map_or(true, |s| s.len() != data.len());
        if stale {
            model.sampler = Some(ShuffleSampler::new(data.len(), &mut model.rng));
        }
    }

    while model.phase == Phase::Training {
        if model.steps >= model.max_steps {
            model.phase = Phase::MaxStepsReached;
            break;
        }

        let stats = step(model, data)?;
        model.steps += 1;
        model.loss = stats.loss;

        emit_keep_alive(model);
        write_checkpoint(model);

        if model.loss <= model.stop_loss {
            model.phase = Phase::Converged;
        } else if model.accuracy_halt && stats.scored > 0 && stats.correct == stats.scored {
            model.phase = Phase::Converged;
        } else if model.steps >= model.max_steps {
            model.phase = Phase::MaxStepsReached;
        }
    }

    Ok(model.phase)
}

struct StepStats {
    loss: f64,
    correct: usize,
    scored: usize,
}

/// One training step over one batch: forward, head loss, backward, then a
/// single optimizer update per layer. The batch loss is checked for
/// numeric health before any optimizer state is touched.
fn step(model: &mut Model, data: &Dataset) -> Result<StepStats> {
    let batch = match model.batch {
        BatchMode::Full => data.len(),
        BatchMode::Stochastic(pct) => {
            (((pct * data.len() as f64).ceil()) as usize).clamp(1, data.len())
        }
    };
    let stochastic = matches!(model.batch, BatchMode::Stochastic(_));

    let mut total = 0.0;
    let mut correct = 0;
    let mut scored = 0;

    for b in 0..batch {
        let index = match (&mut model.sampler, stochastic) {
            (Some(sampler), true) => sampler.sample_auto(&mut model.rng),
            _ => b,
        };
        let tuple = data.tuple(index);

        layers::forward_stack(&mut model.layers, &tuple.predictors);

        let last = model.layers.len() - 1;
        let head = &mut model.layers[last];
        total += head.loss(&tuple.answers)?;
        if let Some(hit) = head.correct(&tuple.answers) {
            if hit? {
                correct += 1;
            }
            scored += 1;
        }

        layers::backward_stack(&mut model.layers, &tuple.predictors);
    }

    let loss = total / batch as f64;
    if !loss.is_finite() {
        return Err(Error::Numeric(format!(
            "non-finite loss at step {}",
            model.steps + 1
        )));
    }

    for layer in model.layers.iter_mut() {
        layer.update()?;
    }

    Ok(StepStats {
        loss,
        correct,
        scored,
    })
}

/// Stack and dataset shape checks, run before every training call.
fn validate(model: &Model, data: &Dataset) -> Result<()> {
    let head = match model.layers.last() {
        Some(layer) if layer.is_head() => layer,
        Some(layer) => {
            return Err(Error::Config(format!(
                "stack must end in a head layer, found {}",
                layer.name()
            )))
        }
        None => return Err(Error::Config("model has no layers".into())),
    };

    if data.nin() != model.nin {
        return Err(Error::Shape(format!(
            "dataset has {} predictors, model input width is {}",
            data.nin(),
            model.nin
        )));
    }

    let expected = head
        .expected_answer_width()
        .unwrap_or_else(|| head.width());
    if data.nout() != expected {
        return Err(Error::Shape(format!(
            "dataset has {} answer columns, {} head expects {}",
            data.nout(),
            head.name(),
            expected
        )));
    }

    Ok(())
}

/// Informational only: a dropped receiver or a full channel never affects
/// training.
fn emit_keep_alive(model: &Model) {
    if model.keep_alive == 0 || model.steps % model.keep_alive != 0 {
        return;
    }
    let record = ProgressRecord {
        step: model.steps,
        loss: model.loss,
    };
    match &model.progress_tx {
        Some(tx) => {
            let _ = tx.send(record);
        }
        None => println!("{}\t{:.6}", record.step, record.loss),
    }
}

/// Best effort; a failed write is reported and training continues.
fn write_checkpoint(model: &Model) {
    let due = model.checkpoint.as_ref().and_then(|(path, every)| {
        (*every > 0 && model.steps % every == 0).then(|| path.clone())
    });
    if let Some(path) = due {
        if let Err(err) = model.save_json(&path) {
            eprintln!("checkpoint at step {} failed: {}", model.steps, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::builtin;
    use crate::model::model::Model;
    use std::sync::mpsc;

    fn classifier(seed: u64) -> (Model, crate::data::dataset::Dataset) {
        let data = builtin::three_class(30);
        let mut model = Model::new(3, 4, 3, seed);
        model.add_preprocess(&data).unwrap();
        model.add_dense(8, true).unwrap();
        model.add_softmax(true).unwrap();
        (model, data)
    }

    #[test]
    fn terminates_within_the_step_budget() {
        let (mut model, data) = classifier(5);
        model.set_stop_loss(0.0); // unreachable
        let phase = model.train(&data, 40).unwrap();
        assert_eq!(phase, Phase::MaxStepsReached);
        assert_eq!(model.steps(), 40);
    }

    #[test]
    fn terminal_phase_makes_training_a_no_op() {
        let (mut model, data) = classifier(5);
        model.set_stop_loss(0.0);
        model.train(&data, 10).unwrap();
        let steps = model.steps();

        let phase = model.train(&data, 10_000).unwrap();
        assert_eq!(phase, Phase::MaxStepsReached);
        assert_eq!(model.steps(), steps);
    }

    #[test]
    fn converges_on_an_easy_loss_threshold() {
        let (mut model, data) = classifier(5);
        model.set_stop_loss(10.0); // any first step satisfies this
        let phase = model.train(&data, 100).unwrap();
        assert_eq!(phase, Phase::Converged);
        assert_eq!(model.steps(), 1);
    }

    #[test]
    fn training_without_a_head_is_rejected() {
        let data = builtin::three_class(30);
        let mut model = Model::new(2, 4, 3, 5);
        model.add_dense(8, true).unwrap();
        assert!(matches!(model.train(&data, 10), Err(Error::Config(_))));
    }

    #[test]
    fn dataset_width_mismatch_is_rejected() {
        let (mut model, _) = classifier(5);
        let wrong = builtin::multi_label(10);
        assert!(matches!(model.train(&wrong, 10), Err(Error::Shape(_))));
    }

    #[test]
    fn keep_alive_emits_at_the_configured_cadence() {
        let (mut model, data) = classifier(5);
        let (tx, rx) = mpsc::channel();
        model.set_progress_channel(tx);
        model.set_keep_alive(10);
        model.set_stop_loss(0.0);
        model.train(&data, 35).unwrap();

        let records: Vec<ProgressRecord> = rx.try_iter().collect();
        let steps: Vec<usize> = records.iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![10, 20, 30]);
        assert!(records.iter().all(|r| r.loss.is_finite()));
    }

    #[test]
    fn dropped_receiver_does_not_stop_training() {
        let (mut model, data) = classifier(5);
        let (tx, rx) = mpsc::channel();
        model.set_progress_channel(tx);
        model.set_keep_alive(5);
        model.set_stop_loss(0.0);
        drop(rx);

        let phase = model.train(&data, 20).unwrap();
        assert_eq!(phase, Phase::MaxStepsReached);
        assert_eq!(model.steps(), 20);
    }

    #[test]
    fn stochastic_mode_trains_on_a_subsample() {
        let data = builtin::three_class(60);
        let mut model = Model::new(3, 4, 3, 5);
        model.add_preprocess(&data).unwrap();
        model.add_dense(8, true).unwrap();
        model.add_softmax(true).unwrap();
        model.set_sgd(0.1).unwrap();
        model.set_stop_loss(0.0);

        let phase = model.train(&data, 25).unwrap();
        assert_eq!(phase, Phase::MaxStepsReached);
        assert!(model.loss().is_finite());
    }

    #[test]
    fn fixed_seed_reproduces_the_loss_trajectory() {
        let (mut a, data) = classifier(42);
        let (mut b, _) = classifier(42);
        a.set_stop_loss(0.0);
        b.set_stop_loss(0.0);
        a.train(&data, 30).unwrap();
        b.train(&data, 30).unwrap();
        assert_eq!(a.loss(), b.loss());
    }
}
