use codealytics::{Registry, TimingAggregator};
use criterion::{BatchSize, Criterion};

pub fn timing(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("timing");
    group.throughput(criterion::Throughput::Elements(1));

    // Fresh registries per batch keep the sample list from growing without bound.
    group.bench_function("measure_and_record", |bencher| {
        bencher.iter_batched(
            || {
                let registry = Registry::new();
                registry
                    .add_value("timed", TimingAggregator::new(), false)
                    .expect("valid identifier");
                registry
            },
            |registry| registry.measure_and_record("timed", || {}).expect("registered"),
            BatchSize::SmallInput,
        );
    });

    let mut aggregator = TimingAggregator::new();
    for i in 0..10_000 {
        aggregator.add_result(i % 250);
    }
    group.bench_function("summary-10k", |bencher| {
        bencher.iter(|| aggregator.summary());
    });
}

criterion::criterion_group!(benches, timing);
