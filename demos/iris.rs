//! Three-class classification demo: preprocess -> dense(20) -> dense(20)
//! -> softmax, trained to a 0.0005 stop-loss.

use magnetite_nn::data::builtin;
use magnetite_nn::{Model, Result};

fn main() -> Result<()> {
    let data = builtin::three_class(150);

    let mut model = Model::new(4, 4, 3, 71);
    model.add_preprocess(&data)?;
    model.add_dense(20, true)?;
    model.add_dense(20, true)?;
    model.add_softmax(true)?;

    model.set_stop_loss(0.0005);

    println!("{model}");
    let phase = model.train(&data, 7000)?;

    let mut wrong = 0;
    for i in 0..data.len() {
        let guess = model.classify(&data.tuple(i).predictors)?;
        if guess as f64 != data.answer(i) {
            wrong += 1;
        }
    }

    println!("phase\t\t{phase:?}");
    println!("incorrect\t{wrong}/{}", data.len());
    println!("loss\t\t{:.6}", model.loss());
    println!("steps\t\t{}", model.steps());
    Ok(())
}
