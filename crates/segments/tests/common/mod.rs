//! Shared grid fixtures for the integration tests
#![allow(dead_code)]

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use streamnet_core::raster::d8;
use streamnet_core::{GeoTransform, Raster};

/// Pixel size of every fixture grid, in meters
pub const CELL: f64 = 10.0;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn transform(rows: usize) -> GeoTransform {
    GeoTransform::new(500_000.0, 4_000_000.0 + rows as f64 * CELL, CELL, -CELL)
}

/// Flow direction grid with the fixture transform
pub fn flow_grid(codes: Vec<u8>, rows: usize, cols: usize) -> Raster<u8> {
    let mut flow = Raster::from_vec(codes, rows, cols).unwrap();
    flow.set_transform(transform(rows));
    flow
}

pub fn mask_grid(flags: &[bool], rows: usize, cols: usize) -> Raster<u8> {
    Raster::from_vec(flags.iter().map(|&f| f as u8).collect(), rows, cols).unwrap()
}

/// 5x5 grid whose side columns drain sideways into a straight channel down
/// the center column, which leaves the grid at the bottom
pub fn funnel() -> Raster<u8> {
    let mut codes = Vec::with_capacity(25);
    for _row in 0..5 {
        codes.extend_from_slice(&[1, 1, 7, 5, 5]);
    }
    flow_grid(codes, 5, 5)
}

/// Mask of the funnel's center channel
pub fn funnel_channel() -> Raster<u8> {
    let mut mask: Raster<u8> = Raster::new(5, 5);
    for row in 0..5 {
        mask.set(row, 2, 1).unwrap();
    }
    mask
}

/// Two headwaters joining at (2, 1), then flowing south off the grid
pub fn confluence() -> (Raster<u8>, Raster<u8>) {
    #[rustfmt::skip]
    let codes = vec![
        7, 0, 7,
        8, 0, 6,
        0, 7, 0,
        0, 7, 0,
        0, 7, 0,
    ];
    let flow = flow_grid(codes.clone(), 5, 3);
    let flags: Vec<bool> = codes.iter().map(|&c| c != 0).collect();
    (flow, mask_grid(&flags, 5, 3))
}

/// Acyclic random flow grid: every pixel flows E, SW, S or SE, so rows
/// never decrease and columns only increase within a row.
pub fn random_flow(rows: usize, cols: usize, seed: u64) -> Raster<u8> {
    const CODES: [u8; 4] = [1, 6, 7, 8];
    let mut rng = SmallRng::seed_from_u64(seed);
    let codes = (0..rows * cols).map(|_| CODES[rng.gen_range(0..CODES.len())]).collect();
    flow_grid(codes, rows, cols)
}

/// Upstream pixel count (the pixel itself included) for an acyclic grid
/// whose flow never points up or left
pub fn accumulation(flow: &Raster<u8>) -> Vec<u32> {
    let (rows, cols) = flow.shape();
    let mut acc = vec![1_u32; rows * cols];
    for row in 0..rows {
        for col in 0..cols {
            let code = flow.get(row, col).unwrap();
            if let Some((r, c)) = d8::downstream(row, col, code, rows, cols) {
                acc[r * cols + c] += acc[row * cols + col];
            }
        }
    }
    acc
}

/// Random dendritic network: a random flow grid with a stream mask of every
/// pixel draining at least `threshold` pixels
pub fn dendritic(rows: usize, cols: usize, threshold: u32, seed: u64) -> (Raster<u8>, Raster<u8>) {
    let flow = random_flow(rows, cols, seed);
    let flags: Vec<bool> = accumulation(&flow).iter().map(|&a| a >= threshold).collect();
    let mask = mask_grid(&flags, rows, cols);
    (flow, mask)
}

/// Random value raster without spatial metadata
pub fn values(rows: usize, cols: usize, seed: u64) -> Raster<f64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let data = (0..rows * cols).map(|_| rng.gen_range(0.0..100.0)).collect();
    Raster::from_vec(data, rows, cols).unwrap()
}
