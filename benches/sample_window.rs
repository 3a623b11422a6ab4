//! Criterion benchmarks for the per-frame hot path.
//!
//! Every accepted frame costs one parse, two window appends and evictions,
//! one integrator update and one vector format. At 1 kHz that budget is 1 ms.
//!
//! Run with: cargo bench --bench sample_window

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use imu_stream::telemetry::{parse_record, window_capacity, AccelSample, SampleWindow, TelemetryPipeline};

const FRAME: &[u8] = b"0.123456,-0.987654,9.806650,12.500000,-3.250000,0.015625\n";

/// Append-then-evict at steady state for typical sample rates.
fn window_append_evict(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_window");

    for rate in [10u32, 50, 200, 1000] {
        let mut window = SampleWindow::new(window_capacity(rate));
        for i in 0..window.capacity() {
            window.append(AccelSample::new(i as f64, 0.0, 0.0, i as i64));
        }

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("append_evict", rate), &rate, |b, _| {
            let mut t = 0i64;
            b.iter(|| {
                t += 1;
                window.append(black_box(AccelSample::new(1.0, 2.0, 3.0, t)));
                let oldest = window.oldest().map(|s| s.t_ns).unwrap_or_default();
                window.evict_if_over_capacity();
                black_box(oldest)
            });
        });
    }

    group.finish();
}

fn record_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");
    group.throughput(Throughput::Bytes(FRAME.len() as u64));
    group.bench_function("parse_record", |b| {
        b.iter(|| parse_record(black_box(FRAME), black_box(1_000)))
    });
    group.finish();
}

/// Full ingest cycle: parse, window, integrate, format.
fn pipeline_ingest(c: &mut Criterion) {
    let mut pipeline = TelemetryPipeline::new(50);
    c.bench_function("pipeline_ingest", |b| {
        b.iter(|| pipeline.ingest(black_box(FRAME)).unwrap())
    });
}

criterion_group!(benches, window_append_evict, record_parse, pipeline_ingest);
criterion_main!(benches);
