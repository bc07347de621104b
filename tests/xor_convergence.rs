use simple_nn::{Dataset, FitConfig, Init, MlpBuilder};

fn xor() -> Dataset {
    let xs = vec![
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![1.0, 1.0],
    ];
    Dataset::from_rows(&xs, &[0.0, 1.0, 1.0, 0.0], 4).unwrap()
}

#[test]
fn xor_converges_with_a_fixed_seed() {
    let data = xor();
    let mut mlp = MlpBuilder::new(2)
        .unwrap()
        .hidden(4, 4)
        .unwrap()
        .max_batch(4)
        .unwrap()
        .init(Init::He)
        .unwrap()
        .build_with_seed(0)
        .unwrap();

    let report = mlp
        .train_epochs(
            &data,
            FitConfig {
                epochs: 5_000,
                lr: 0.5,
            },
        )
        .unwrap();

    let final_loss = report.final_loss();
    assert!(final_loss < 0.3, "final loss {final_loss}");
    assert!(mlp.evaluate(&data).unwrap().loss < 0.3);
}

#[test]
fn loss_decreases_on_a_separable_problem() {
    // Label is 1 exactly when the first feature is positive.
    let xs: Vec<Vec<f32>> = (0..32)
        .map(|i| {
            let a = (i as f32 - 15.5) / 16.0;
            let b = ((i * 7) % 11) as f32 / 11.0 - 0.5;
            vec![a, b, 0.25]
        })
        .collect();
    let ys: Vec<f32> = xs.iter().map(|x| f32::from(x[0] > 0.0)).collect();
    let data = Dataset::from_rows(&xs, &ys, 8).unwrap();

    let mut mlp = MlpBuilder::new(3)
        .unwrap()
        .hidden(8, 4)
        .unwrap()
        .max_batch(8)
        .unwrap()
        .init(Init::Xavier)
        .unwrap()
        .build_with_seed(3)
        .unwrap();

    let before = mlp.evaluate(&data).unwrap().loss;
    mlp.train_epochs(&data, FitConfig { epochs: 300, lr: 0.2 })
        .unwrap();
    let after = mlp.evaluate(&data).unwrap();

    assert!(after.loss < before, "loss {before} -> {}", after.loss);
}
