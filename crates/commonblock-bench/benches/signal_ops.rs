//! Criterion micro-benchmarks for the state signal and raw lock handles.

use std::hint::black_box;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};

use commonblock_bench::sized_table;
use commonblock_table::SignalConfig;

fn bench_signal(c: &mut Criterion) {
    let table = sized_table(1, 1);
    let signal = table.signal();

    c.bench_function("signal_read", |b| {
        b.iter(|| black_box(signal.read()));
    });
    c.bench_function("signal_notify", |b| {
        let mut v = 0u64;
        b.iter(|| {
            v = v.wrapping_add(1);
            signal.notify(black_box(v));
        });
    });
    signal.notify(1);
    c.bench_function("signal_wait_satisfied", |b| {
        b.iter(|| black_box(signal.wait_timeout(1, Duration::from_millis(10)).unwrap()));
    });
    c.bench_function("signal_wait_mask_satisfied", |b| {
        b.iter(|| black_box(signal.wait_mask_timeout(1, Duration::from_millis(10)).unwrap()));
    });
}

#[allow(unsafe_code)]
fn bench_foreign(c: &mut Criterion) {
    let table = sized_table(4, 1_000);
    // SAFETY: `table` outlives every use of the block below.
    let block =
        unsafe { commonblock_table::ForeignBlock::from_raw(table.export_layout().as_ptr()) }
            .unwrap();
    let field = block.accessor::<f64>("f002").unwrap();
    let signal = block.signal(SignalConfig::default()).unwrap();

    c.bench_function("foreign_lookup_accessor", |b| {
        b.iter(|| black_box(block.accessor::<f64>(black_box("f003")).unwrap().len()));
    });
    c.bench_function("foreign_read_1k", |b| {
        b.iter(|| black_box(field.read(..).unwrap()));
    });
    c.bench_function("foreign_signal_read", |b| {
        b.iter(|| black_box(signal.read()));
    });
}

criterion_group!(benches, bench_signal, bench_foreign);
criterion_main!(benches);
