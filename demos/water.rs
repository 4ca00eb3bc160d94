//! Multi-label demo: 16 inputs, 14 independent bits, stochastic training.
//!
//! An example only counts as correct when every unit's rounded prediction
//! matches its true bit — that policy lives here, not in the engine.

use magnetite_nn::data::builtin;
use magnetite_nn::{Model, Result};

fn main() -> Result<()> {
    let data = builtin::multi_label(400);

    let mut model = Model::new(5, 16, 14, 137);
    model.add_preprocess(&data)?;
    model.add_dense(40, true)?;
    model.add_dense(40, true)?;
    model.add_multi_label(true)?;

    model.set_sgd(0.05)?;
    model.set_stop_loss(0.0025);
    model.set_keep_alive(1000);

    println!("{model}");
    model.train(&data, 20000)?;

    let mut wrong = 0;
    for i in 0..data.len() {
        let guess = model.classify_vec(&data.tuple(i).predictors)?;
        let truth = data.answer_vec(i);
        if guess.iter().zip(truth.iter()).any(|(p, &y)| p.round() != y) {
            wrong += 1;
        }
    }

    println!("incorrect\t{wrong}/{}", data.len());
    println!("loss\t\t{:.6}", model.loss());
    println!("steps\t\t{}", model.steps());
    Ok(())
}
