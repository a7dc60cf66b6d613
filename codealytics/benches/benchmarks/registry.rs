use std::{
    cmp::{max, min},
    time::Instant,
};

use codealytics::{AnalyticsError, Registry};
use criterion::Criterion;
use rand::Rng;

const METRIC_COUNT: usize = 64;

fn registry() -> Registry {
    let registry = Registry::new();
    for i in 0..METRIC_COUNT {
        registry
            .add_value(format!("metric_{i:02}"), 0_u64, false)
            .expect("generated identifiers are valid");
    }
    registry
        .add_provider("provided", || 42_u64, false)
        .expect("valid identifier");
    registry
}

fn increment(registry: &Registry, id: &str) {
    loop {
        match registry.update_with(id, |value: u64| value + 1, None) {
            Err(AnalyticsError::Conflict { .. }) => continue,
            result => {
                result.expect("registered u64 metric");
                return;
            }
        }
    }
}

pub fn reads(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("reads");
    group.throughput(criterion::Throughput::Elements(1));
    let registry = registry();

    group.bench_function("value", |bencher| {
        bencher.iter(|| registry.get::<u64>("metric_07").expect("registered"));
    });
    group.bench_function("provider", |bencher| {
        bencher.iter(|| registry.get::<u64>("provided").expect("registered"));
    });
    group.bench_function("exists", |bencher| {
        bencher.iter(|| registry.exists("metric_63").expect("valid identifier"));
    });
}

pub fn contended_updates(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("contended_updates");
    group.throughput(criterion::Throughput::Elements(1));
    let registry = registry();

    for threads in [1, 2, 4, 8, 16] {
        group.bench_function(format!("concurrency-{threads:02}"), |bencher| {
            bencher.iter_custom(|iterations| {
                let thread_count = max(1, min(threads, iterations));
                let iterations_per_thread = iterations / thread_count;

                let start = Instant::now();
                std::thread::scope(|scope| {
                    for _ in 0..thread_count {
                        scope.spawn(|| {
                            for _ in 0..iterations_per_thread {
                                increment(&registry, "metric_00");
                            }
                        });
                    }
                });
                start.elapsed()
            });
        });
    }
}

pub fn spread_updates(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("spread_updates");
    group.throughput(criterion::Throughput::Elements(1));
    let registry = registry();
    let ids: Vec<String> = (0..METRIC_COUNT).map(|i| format!("metric_{i:02}")).collect();

    for threads in [1, 2, 4, 8, 16] {
        group.bench_function(format!("concurrency-{threads:02}"), |bencher| {
            bencher.iter_custom(|iterations| {
                let thread_count = max(1, min(threads, iterations));
                let iterations_per_thread = iterations / thread_count;

                let start = Instant::now();
                std::thread::scope(|scope| {
                    for _ in 0..thread_count {
                        scope.spawn(|| {
                            let mut rng = rand::thread_rng();
                            for _ in 0..iterations_per_thread {
                                let id = &ids[rng.gen_range(0..ids.len())];
                                increment(&registry, id);
                            }
                        });
                    }
                });
                start.elapsed()
            });
        });
    }
}

criterion::criterion_group!(benches, reads, contended_updates, spread_updates);
