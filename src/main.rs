use simple_nn::{Dataset, FitConfig, Init, MlpBuilder};

fn main() -> simple_nn::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Classic XOR dataset, one full batch.
    let xs = vec![
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![1.0, 1.0],
    ];
    let ys = [0.0, 1.0, 1.0, 0.0];
    let train = Dataset::from_rows(&xs, &ys, 4)?;

    let mut mlp = MlpBuilder::new(2)?
        .hidden(4, 4)?
        .max_batch(4)?
        .init(Init::He)?
        .build_with_seed(0)?;

    let report = mlp.train_epochs_with(
        &train,
        FitConfig {
            epochs: 2_000,
            lr: 0.5,
        },
        |r| {
            if (r.epoch + 1) % 500 == 0 {
                println!("epoch {:>5}  loss {:.6}", r.epoch + 1, r.mean_loss);
            }
        },
    )?;

    let eval = mlp.evaluate(&train)?;
    println!(
        "final_loss_from_fit={} eval_loss={} accuracy={}",
        report.final_loss(),
        eval.loss,
        eval.accuracy
    );

    let batch = &train.batches()[0];
    let preds = mlp.predict(batch.features())?;
    for (x, p) in xs.iter().zip(preds.as_slice()) {
        println!("x={x:?} y={p:.4}");
    }

    Ok(())
}
