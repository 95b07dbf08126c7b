use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::hint::black_box;

use offtask_svm::{Kernel, SvmConfig};

/// 800 samples, 24 standardized-looking features, 20% positives.
fn make_data() -> (Vec<Vec<f64>>, Vec<usize>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let n = 800;
    let mut features = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let class = usize::from(i % 5 == 0);
        labels.push(class);
        let row: Vec<f64> = (0..24)
            .map(|f| {
                let shift = if f < 4 { class as f64 * 0.8 } else { 0.0 };
                shift + rng.r#gen::<f64>() * 2.0 - 1.0
            })
            .collect();
        features.push(row);
    }
    (features, labels)
}

fn bench_fit(c: &mut Criterion) {
    let (features, labels) = make_data();
    let mut group = c.benchmark_group("svm");
    group.sample_size(10);
    group.bench_function("fit_rbf_800x24", |b| {
        b.iter(|| SvmConfig::new().fit(black_box(&features), black_box(&labels)).unwrap())
    });
    group.bench_function("fit_linear_800x24", |b| {
        b.iter(|| {
            SvmConfig::new()
                .with_kernel(Kernel::Linear)
                .fit(black_box(&features), black_box(&labels))
                .unwrap()
        })
    });
    group.finish();
}

fn bench_decision(c: &mut Criterion) {
    let (features, labels) = make_data();
    let model = SvmConfig::new().fit(&features, &labels).unwrap();
    c.bench_function("svm_decision_batch_800", |b| {
        b.iter(|| model.decision_function_batch(black_box(&features)).unwrap())
    });
}

criterion_group!(benches, bench_fit, bench_decision);
criterion_main!(benches);
