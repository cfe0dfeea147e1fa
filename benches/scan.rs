// SPDX-License-Identifier: AGPL-3.0-or-later
//! Benchmark for process table sampling.
//!
//! Measures the cost of one full scan: enumerating /proc, reading stat and
//! statm per process, and producing the sorted snapshot.

use criterion::{criterion_group, criterion_main, Criterion};
use taskmon::process::ProcessSampler;

fn bench_scan(c: &mut Criterion) {
    let mut sampler = ProcessSampler::new().expect("/proc available");
    // Warm the CPU-time cache so the bench measures steady-state scans
    let _ = sampler.scan();

    c.bench_function("process_scan", |b| {
        b.iter(|| {
            let _ = sampler.scan();
        });
    });
}

criterion_group!(benches, bench_scan);
criterion_main!(benches);
