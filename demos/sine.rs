//! Scalar regression demo: fit y = sin(x·π/2) on [0, 1] with an MSE head.

use magnetite_nn::data::builtin;
use magnetite_nn::{Model, Result};

fn main() -> Result<()> {
    let data = builtin::sine(32);

    let mut model = Model::new(3, 1, 1, 9);
    model.add_dense(10, true)?;
    model.add_mse(true)?;

    model.set_stop_loss(1e-5);
    model.train(&data, 10000)?;

    println!("{model}");
    println!("loss\t{:.6}\tsteps\t{}", model.loss(), model.steps());

    for x in [0.0, 0.25, 0.5, 0.75, 1.0] {
        let y = model.infer(&[x])?;
        let truth = (x * std::f64::consts::PI / 2.0).sin();
        println!("x = {x:.2}\tmodel {y:.4}\ttruth {truth:.4}");
    }
    Ok(())
}
