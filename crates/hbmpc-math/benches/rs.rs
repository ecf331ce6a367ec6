use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use hbmpc_math::eval_point::EvalPoint;
use hbmpc_math::field::Field;
use hbmpc_math::rs::RsCodec;
use rand::thread_rng;

pub fn rs_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("rs");
    group.sample_size(10);
    let field = Field::goldilocks();
    let mut rng = thread_rng();

    for (n, t) in [(4usize, 1usize), (16, 5), (64, 21)] {
        let points = EvalPoint::new(field, n, true).unwrap();
        let rs = RsCodec::new(n, t + 1, &points).unwrap();
        let message = field.random_vec(t + 1, &mut rng);
        let encoded = rs.encode_elements(&message).unwrap();

        group.bench_function(BenchmarkId::new("encode", n), |b| {
            b.iter(|| rs.encode_elements(&message))
        });

        let clean = encoded.iter().copied().map(Some).collect::<Vec<_>>();
        group.bench_function(BenchmarkId::new("decode_clean", n), |b| {
            b.iter(|| rs.decode(&clean))
        });

        // t errors, the worst case for reconstruction.
        let mut noisy = clean.clone();
        for (i, symbol) in noisy.iter_mut().take(t).enumerate() {
            *symbol = Some(encoded[i] + field.one());
        }
        group.bench_function(BenchmarkId::new("decode_t_errors", n), |b| {
            b.iter(|| rs.decode(&noisy))
        });
    }

    group.finish();
}

criterion_group!(rs, rs_benchmark);
criterion_main!(rs);
