//! Benchmarks for network construction, catchment summaries and basins

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use streamnet_core::raster::d8;
use streamnet_core::{GeoTransform, Raster};
use streamnet_segments::prelude::*;

/// Bowl-shaped drainage: every pixel flows toward the bottom-center outlet,
/// with a stream mask of pixels draining more than `size` cells
fn create_drainage(size: usize) -> (Raster<u8>, Raster<u8>, Raster<f64>) {
    let mut flow: Raster<u8> = Raster::new(size, size);
    flow.set_transform(GeoTransform::new(0.0, size as f64 * 10.0, 10.0, -10.0));
    let center = size / 2;
    for row in 0..size {
        for col in 0..size {
            // Alternate straight and diagonal steps to grow a dendritic pattern
            let wiggle = (row * 7 + col * 13) % 3 == 0;
            let code = match col.cmp(&center) {
                std::cmp::Ordering::Less if wiggle => 8,
                std::cmp::Ordering::Less => 1,
                std::cmp::Ordering::Greater if wiggle => 6,
                std::cmp::Ordering::Greater => 5,
                std::cmp::Ordering::Equal => 7,
            };
            flow.set(row, col, code).unwrap();
        }
    }

    let (rows, cols) = flow.shape();
    let mut acc = vec![1_u32; rows * cols];
    for row in 0..rows {
        // Both halves drain toward the center column within a row
        let order = (0..center).chain((center + 1..cols).rev()).chain(std::iter::once(center));
        for col in order {
            let code = flow.get(row, col).unwrap();
            if let Some((r, c)) = d8::downstream(row, col, code, rows, cols) {
                acc[r * cols + c] += acc[row * cols + col];
            }
        }
    }

    let mut mask: Raster<u8> = Raster::new(size, size);
    let mut values: Raster<f64> = Raster::new(size, size);
    for row in 0..rows {
        for col in 0..cols {
            mask.set(row, col, (acc[row * cols + col] > size as u32) as u8).unwrap();
            values.set(row, col, ((row * 31 + col * 17) % 100) as f64).unwrap();
        }
    }
    (flow, mask, values)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("segments/build");
    for size in [256, 512, 1024] {
        let (flow, mask, _) = create_drainage(size);
        let params = NetworkParams { max_length: Some(500.0) };
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| Segments::new(black_box(&flow), black_box(&mask), &params).unwrap())
        });
    }
    group.finish();
}

fn bench_catchment_mean(c: &mut Criterion) {
    let mut group = c.benchmark_group("segments/catchment_mean");
    for size in [256, 512, 1024] {
        let (flow, mask, values) = create_drainage(size);
        let network = Segments::new(&flow, &mask, &NetworkParams::default()).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                network
                    .catchment_summary(Statistic::Mean, black_box(&values), &SummaryOptions::default())
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_basins(c: &mut Criterion) {
    let mut group = c.benchmark_group("segments/basins");
    let (flow, mask, _) = create_drainage(1024);
    let network = Segments::new(&flow, &mask, &NetworkParams::default()).unwrap();
    for (label, params) in [
        ("sequential", BasinParams::default()),
        ("parallel", BasinParams { parallel: true, workers: None }),
    ] {
        group.bench_function(label, |b| {
            b.iter(|| {
                let mut network = network.copy();
                network.locate_basins(black_box(&params)).unwrap().len()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_catchment_mean, bench_basins);
criterion_main!(benches);
