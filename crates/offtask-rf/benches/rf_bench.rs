//! Criterion benchmarks for offtask-rf: Random Forest training and prediction.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use offtask_rf::RandomForestConfig;

/// Roughly the shape of one outer training fold after oversampling.
fn make_fold(n_samples: usize, n_features: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let class = i % 2;
        labels.push(class);
        let row: Vec<f64> = (0..n_features)
            .map(|f| {
                let base = if f < 4 { class as f64 } else { 0.0 };
                base + rng.r#gen::<f64>()
            })
            .collect();
        features.push(row);
    }
    let names: Vec<String> = (0..n_features).map(|f| format!("f{f}")).collect();
    (features, labels, names)
}

fn bench_rf_train(c: &mut Criterion) {
    let (features, labels, names) = make_fold(1000, 24, 42);
    let cfg = RandomForestConfig::new(100).unwrap().with_seed(42);

    c.bench_function("rf_train_1000x24_100trees", |b| {
        b.iter(|| cfg.fit(&features, &labels, &names).unwrap());
    });
}

fn bench_rf_predict_batch(c: &mut Criterion) {
    let (features, labels, names) = make_fold(1000, 24, 42);
    let forest = RandomForestConfig::new(100)
        .unwrap()
        .with_seed(42)
        .fit(&features, &labels, &names)
        .unwrap()
        .into_forest();

    c.bench_function("rf_predict_batch_1000x24_100trees", |b| {
        b.iter(|| forest.predict_batch(&features).unwrap());
    });
}

criterion_group!(benches, bench_rf_train, bench_rf_predict_batch);
criterion_main!(benches);
