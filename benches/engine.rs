//! Engine throughput benchmarks (Criterion).
//!
//! Run: `cargo bench` or `cargo bench --bench engine`.
//! Compares bare matching against matching with the trace pipeline attached
//! (discarding output), which measures the cost of claim/publish on the hot
//! path plus the drain running alongside.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use lucid_matching_engine::order_gen::{Generator, GeneratorConfig};
use lucid_matching_engine::{trace, MatchingEngine, TraceConfig, TraceOutput};

const N: usize = 1000;

fn orders_config(seed: u64) -> GeneratorConfig {
    GeneratorConfig {
        seed,
        num_orders: N,
        ..Default::default()
    }
}

fn bench_submit_untraced(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");
    group.throughput(Throughput::Elements(N as u64));
    group.bench_function("submit_1000_untraced", |b| {
        b.iter_batched(
            || {
                (
                    MatchingEngine::new(),
                    Generator::new(orders_config(42)).all_orders(),
                )
            },
            |(mut engine, orders)| {
                for order in orders {
                    engine.submit(order).unwrap();
                }
                engine
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_submit_traced(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");
    group.throughput(Throughput::Elements(N as u64));
    group.bench_function("submit_1000_traced_null_sink", |b| {
        b.iter_batched(
            || {
                let config = TraceConfig {
                    output: TraceOutput::None,
                    ..TraceConfig::default()
                };
                let (tracer, drain) = trace::init(&config).expect("trace init");
                (
                    MatchingEngine::with_tracer(tracer),
                    drain,
                    Generator::new(orders_config(42)).all_orders(),
                )
            },
            |(mut engine, drain, orders)| {
                for order in orders {
                    engine.submit(order).unwrap();
                }
                drain.shutdown();
                engine
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_snapshot_interval(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");
    group.throughput(Throughput::Elements(N as u64));
    group.bench_function("submit_1000_traced_snapshot_every_100", |b| {
        b.iter_batched(
            || {
                let config = TraceConfig {
                    output: TraceOutput::None,
                    snapshot_interval: 100,
                    ..TraceConfig::default()
                };
                let (tracer, drain) = trace::init(&config).expect("trace init");
                (
                    MatchingEngine::with_tracer(tracer),
                    drain,
                    Generator::new(orders_config(7)).all_orders(),
                )
            },
            |(mut engine, drain, orders)| {
                for order in orders {
                    engine.submit(order).unwrap();
                }
                drain.shutdown();
                engine
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_submit_untraced,
    bench_submit_traced,
    bench_snapshot_interval
);
criterion_main!(benches);
