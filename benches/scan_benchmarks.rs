// benches/scan_benchmarks.rs — CPU reference vs GPU scanner.
//
//   cargo bench --bench scan_benchmarks
//
// Every GPU iteration pays the full scan: texture upload, one draw, the
// blocking readback and the decode. That is what a drawing app waits for
// after each stroke, so it is the number worth tracking. The GPU groups are
// skipped with a message when no adapter is available.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::time::Duration;

use skyline_scan::bitmap::Bitmap;
use skyline_scan::extrema::{Orientation, ScanMode};
use skyline_scan::gpu::{GpuBoundaryScanner, GpuDevice, ScanConfig};
use skyline_scan::reference;
use skyline_scan::stroke::{Pen, StrokeCapture};

// ============================================================
// Shared helpers
// ============================================================

const SIZES: [(usize, usize); 3] = [(100, 100), (640, 480), (1920, 1080)];

/// A zig-zag stroke across the whole canvas.
fn make_sketch(w: usize, h: usize) -> Bitmap {
    let mut bmp = Bitmap::new(w, h);
    let points: Vec<(f32, f32)> = (0..=8)
        .map(|i| {
            let x = i as f32 * (w - 1) as f32 / 8.0;
            let y = if i % 2 == 0 { h as f32 * 0.2 } else { h as f32 * 0.8 };
            (x, y)
        })
        .collect();
    StrokeCapture::new(Pen { width: 4, ..Pen::default() }).draw_polyline(&mut bmp, &points);
    bmp
}

fn gpu_or_skip(bench: &str) -> Option<GpuDevice> {
    match GpuDevice::new() {
        Ok(gpu) => Some(gpu),
        Err(e) => {
            eprintln!("{e}, skipping {bench}.");
            None
        }
    }
}

// ============================================================
// Per-column scan
// ============================================================

fn bench_per_column(c: &mut Criterion) {
    let gpu = gpu_or_skip("GPU per-column benchmark");

    let mut group = c.benchmark_group("scan_per_column");
    group.warm_up_time(Duration::from_secs(2));

    for (w, h) in SIZES {
        let bmp = make_sketch(w, h);
        let label = format!("{w}x{h}");

        group.bench_with_input(BenchmarkId::new("cpu", &label), &bmp, |b, bmp| {
            b.iter(|| reference::scan(black_box(bmp), ScanMode::PerColumn, Orientation::TopDown))
        });

        if let Some(gpu) = &gpu {
            let mut scanner = GpuBoundaryScanner::new(gpu, w as u32, h as u32, ScanConfig::default())
                .expect("scanner init");
            group.bench_with_input(BenchmarkId::new("gpu", &label), &bmp, |b, bmp| {
                b.iter(|| scanner.scan(gpu, black_box(bmp), ScanMode::PerColumn).expect("scan"))
            });
        }
    }
    group.finish();
}

// ============================================================
// Global scan
// ============================================================

fn bench_global(c: &mut Criterion) {
    let gpu = gpu_or_skip("GPU global benchmark");

    let mut group = c.benchmark_group("scan_global");
    group.warm_up_time(Duration::from_secs(2));

    for (w, h) in SIZES {
        let bmp = make_sketch(w, h);
        let label = format!("{w}x{h}");

        group.bench_with_input(BenchmarkId::new("cpu", &label), &bmp, |b, bmp| {
            b.iter(|| reference::scan(black_box(bmp), ScanMode::Global, Orientation::TopDown))
        });

        if let Some(gpu) = &gpu {
            let mut scanner = GpuBoundaryScanner::new(gpu, w as u32, h as u32, ScanConfig::default())
                .expect("scanner init");
            group.bench_with_input(BenchmarkId::new("gpu", &label), &bmp, |b, bmp| {
                b.iter(|| scanner.scan(gpu, black_box(bmp), ScanMode::Global).expect("scan"))
            });
        }
    }
    group.finish();
}

// ============================================================
// Scanner setup
// ============================================================

/// Pipeline compilation and texture allocation, paid once per canvas size.
fn bench_scanner_init(c: &mut Criterion) {
    let Some(gpu) = gpu_or_skip("scanner init benchmark") else { return };

    let mut group = c.benchmark_group("scanner_init");
    group.sample_size(20);
    group.bench_function("new_640x480", |b| {
        b.iter(|| GpuBoundaryScanner::new(&gpu, 640, 480, ScanConfig::default()).expect("scanner init"))
    });
    group.finish();
}

// ============================================================
// Register
// ============================================================

criterion_group!(benches, bench_per_column, bench_global, bench_scanner_init);
criterion_main!(benches);
