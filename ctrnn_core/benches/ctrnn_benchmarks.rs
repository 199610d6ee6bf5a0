//! Performance benchmarks for the recurrent step, training epochs and rollout
//!
//! Run with: cargo bench --bench ctrnn_benchmarks

use ctrnn_core::{
    ModelConfig, Predictor, Sequence, SequenceModel, SineSource, Trainer, TrainingConfig,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::array;

fn sine_sequence() -> Sequence {
    let source = SineSource::clean(100, 0.8).expect("valid source");
    Sequence::from_source(&source).expect("sequence")
}

/// Single model step for growing hidden widths
fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("model_step");

    for n_hidden in [5, 32, 128] {
        let mut model =
            SequenceModel::new(ModelConfig::new(1, n_hidden, 1, 2.0)).expect("valid model");
        model.step(&array![0.0]);
        let input = array![0.3];

        group.bench_with_input(BenchmarkId::from_parameter(n_hidden), &n_hidden, |b, _| {
            b.iter(|| black_box(model.step(black_box(&input))));
        });
    }

    group.finish();
}

/// One full-sequence epoch: forward pass, readout gradient, Adam update
fn bench_epoch(c: &mut Criterion) {
    let sequence = sine_sequence();
    let mut group = c.benchmark_group("training_epoch");

    for n_hidden in [5, 32] {
        let mut model =
            SequenceModel::new(ModelConfig::new(1, n_hidden, 1, 2.0)).expect("valid model");
        let mut trainer = Trainer::new(TrainingConfig::new(1, 0.01)).expect("valid config");

        group.bench_with_input(BenchmarkId::from_parameter(n_hidden), &n_hidden, |b, _| {
            b.iter(|| black_box(trainer.train_epoch(&mut model, &sequence).expect("epoch")));
        });
    }

    group.finish();
}

/// Closed-loop generation of 200 steps
fn bench_rollout(c: &mut Criterion) {
    let mut model = SequenceModel::new(ModelConfig::default()).expect("valid model");
    let seed = array![0.0];

    c.bench_function("rollout_200", |b| {
        b.iter(|| {
            model.reset();
            black_box(
                Predictor::new(&mut model)
                    .rollout(&seed, 200)
                    .expect("rollout"),
            )
        });
    });
}

criterion_group!(benches, bench_step, bench_epoch, bench_rollout);
criterion_main!(benches);
