//! Benchmark for the predict/update hot path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mf_config::FilterParams;
use mf_core::filter::{predict, update};
use mf_math::Mat2;

fn bench_predict_update_chain(c: &mut Criterion) {
    let params = FilterParams::default();

    c.bench_function("predict_update_chain_1000", |b| {
        b.iter(|| {
            let mut state = [100_000.0f64, 0.0];
            let mut covariance = Mat2::diagonal(
                params.initial_level_variance,
                params.initial_trend_variance,
            );
            for i in 0..1000u32 {
                let z = 100_000.0 + (i % 17) as f64 * 250.0;
                let pred = predict(state, &covariance, &params);
                let out = update(black_box(z), 1.0, &pred, &params);
                state = out.state;
                covariance = out.covariance;
            }
            black_box(state)
        })
    });
}

criterion_group!(benches, bench_predict_update_chain);
criterion_main!(benches);
