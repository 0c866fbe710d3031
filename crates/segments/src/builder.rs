//! Stream segment network construction
//!
//! Traces a candidate mask against a D8 flow direction grid:
//!
//! 1. Candidates are mask pixels with a defined flow direction. A candidate
//!    links downstream only to another candidate.
//! 2. Headwaters (no upstream candidate) and confluences (two or more) each
//!    start a segment.
//! 3. Each segment walks downstream until it reaches a confluence, which is
//!    kept as its final vertex and starts its child, or an outlet.
//! 4. Segments longer than the maximum length are split at pixel vertices
//!    into near-equal pieces.

use crate::network::{Segment, SegmentId, Segments};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use streamnet_core::raster::d8;
use streamnet_core::{Algorithm, Error, GeoTransform, Raster, Result};
use tracing::{debug, info};

const NONE: usize = usize::MAX;

/// Parameters for network construction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkParams {
    /// Maximum segment length, in the units of the flow grid transform
    /// (meters). Longer segments are split. `None` disables splitting.
    #[serde(default)]
    pub max_length: Option<f64>,
}

/// Stream network construction from a flow grid and a candidate mask
#[derive(Debug, Clone, Default)]
pub struct NetworkBuilder;

impl Algorithm for NetworkBuilder {
    type Input = (Raster<u8>, Raster<u8>);
    type Output = Segments;
    type Params = NetworkParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Stream Network"
    }

    fn description(&self) -> &'static str {
        "Trace stream segments from D8 flow directions and a candidate mask"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (flow, mask) = input;
        build_network(&flow, &mask, &params)
    }
}

/// Build a stream segment network.
///
/// # Arguments
/// * `flow` - D8 flow direction raster (TauDEM codes 1-8, other values = no flow).
///   Must carry an affine transform.
/// * `mask` - Candidate stream pixels (nonzero = candidate), same grid as `flow`
/// * `params` - Construction parameters
///
/// # Returns
/// A [`Segments`] network. An empty mask yields an empty network.
pub fn build_network(flow: &Raster<u8>, mask: &Raster<u8>, params: &NetworkParams) -> Result<Segments> {
    let transform = *flow.transform().ok_or_else(|| {
        Error::Configuration("flow direction raster has no affine transform".to_string())
    })?;
    flow.check_alignment(mask)?;
    if let Some(max) = params.max_length {
        if !(max.is_finite() && max > 0.0) {
            return Err(Error::InvalidParameter {
                name: "max_length",
                value: max.to_string(),
                reason: "must be a positive, finite length".to_string(),
            });
        }
    }

    let (rows, cols) = flow.shape();
    let n = rows * cols;

    // Candidate pixels and their downstream candidate
    let mut candidate = vec![false; n];
    for row in 0..rows {
        for col in 0..cols {
            let m = unsafe { mask.get_unchecked(row, col) };
            let code = unsafe { flow.get_unchecked(row, col) };
            candidate[row * cols + col] = m != 0 && d8::is_valid(code);
        }
    }

    let mut next = vec![NONE; n];
    let mut upstream = vec![0_u8; n];
    for idx in (0..n).filter(|&i| candidate[i]) {
        let (row, col) = (idx / cols, idx % cols);
        let code = unsafe { flow.get_unchecked(row, col) };
        if let Some((nr, nc)) = d8::downstream(row, col, code, rows, cols) {
            let nidx = nr * cols + nc;
            if candidate[nidx] {
                next[idx] = nidx;
                upstream[nidx] += 1;
            }
        }
    }

    // Headwaters and confluences start segments, in row-major order
    let starts: Vec<usize> = (0..n)
        .filter(|&i| candidate[i] && upstream[i] != 1)
        .collect();
    let mut start_slot = vec![NONE; n];
    for (slot, &idx) in starts.iter().enumerate() {
        start_slot[idx] = slot;
    }

    let traced: Vec<(Vec<usize>, usize)> = starts
        .iter()
        .enumerate()
        .map(|(slot, &start)| trace(start, slot, &next, &upstream, &start_slot))
        .collect();
    debug!(candidates = candidate.iter().filter(|&&c| c).count(), traced = traced.len(), "traced stream segments");

    let segments = assemble(traced, cols, &transform, params.max_length);
    info!(segments = segments.len(), "built stream network");

    Ok(Segments::from_parts(Arc::new(flow.clone()), transform, segments))
}

/// Walk downstream from a start pixel. Returns the pixels and the slot of
/// the child segment (`NONE` for an outlet).
fn trace(start: usize, slot: usize, next: &[usize], upstream: &[u8], start_slot: &[usize]) -> (Vec<usize>, usize) {
    let mut pixels = vec![start];
    let mut cur = start;
    loop {
        let nxt = next[cur];
        if nxt == NONE {
            return (pixels, NONE);
        }
        if upstream[nxt] >= 2 {
            pixels.push(nxt);
            // A confluence on a flow cycle can lead back to itself
            let child = if start_slot[nxt] == slot { NONE } else { start_slot[nxt] };
            return (pixels, child);
        }
        if pixels.len() > next.len() {
            return (pixels, NONE);
        }
        pixels.push(nxt);
        cur = nxt;
    }
}

/// Split traced segments, assign IDs and link parents to children.
fn assemble(traced: Vec<(Vec<usize>, usize)>, cols: usize, transform: &GeoTransform, max_length: Option<f64>) -> Vec<Segment> {
    // Pieces are numbered in traced order, upstream to downstream within a trace
    let mut pieces: Vec<Vec<(usize, usize)>> = Vec::new();
    let mut first_piece = Vec::with_capacity(traced.len());
    let mut piece_counts = Vec::with_capacity(traced.len());

    for (pixels, _) in &traced {
        let coords: Vec<(usize, usize)> = pixels.iter().map(|&i| (i / cols, i % cols)).collect();
        let parts = match max_length {
            Some(max) => split(&coords, transform, max),
            None => vec![coords],
        };
        first_piece.push(pieces.len());
        piece_counts.push(parts.len());
        pieces.extend(parts);
    }

    let mut children = vec![0 as SegmentId; pieces.len()];
    for (slot, (_, child)) in traced.iter().enumerate() {
        let first = first_piece[slot];
        let last = first + piece_counts[slot] - 1;
        for piece in first..last {
            children[piece] = (piece + 2) as SegmentId;
        }
        if *child != NONE {
            children[last] = (first_piece[*child] + 1) as SegmentId;
        }
    }

    let mut parents: Vec<Vec<SegmentId>> = vec![Vec::new(); pieces.len()];
    for (piece, &child) in children.iter().enumerate() {
        if child != 0 {
            parents[child as usize - 1].push((piece + 1) as SegmentId);
        }
    }

    pieces
        .into_iter()
        .zip(children)
        .zip(parents)
        .enumerate()
        .map(|(piece, ((pixels, child), parents))| {
            let length = path_length(&pixels, transform);
            Segment {
                id: (piece + 1) as SegmentId,
                pixels,
                parents,
                child,
                length,
            }
        })
        .collect()
}

/// Geometric length of a pixel path, center to center
pub(crate) fn path_length(pixels: &[(usize, usize)], transform: &GeoTransform) -> f64 {
    pixels
        .windows(2)
        .map(|w| {
            let dr = w[1].0 as isize - w[0].0 as isize;
            let dc = w[1].1 as isize - w[0].1 as isize;
            transform.step_length(dr, dc)
        })
        .sum()
}

/// Split a pixel path into the fewest near-equal pieces no longer than
/// `max_length`. Adjacent pieces share the pixel at the split.
///
/// A single pixel step longer than `max_length` cannot be split further,
/// so pieces are capped at one per step.
fn split(pixels: &[(usize, usize)], transform: &GeoTransform, max_length: f64) -> Vec<Vec<(usize, usize)>> {
    let mut distance = Vec::with_capacity(pixels.len());
    let mut total = 0.0;
    distance.push(0.0);
    for w in pixels.windows(2) {
        let dr = w[1].0 as isize - w[0].0 as isize;
        let dc = w[1].1 as isize - w[0].1 as isize;
        total += transform.step_length(dr, dc);
        distance.push(total);
    }

    let steps = pixels.len().saturating_sub(1);
    if total <= max_length || steps < 2 {
        return vec![pixels.to_vec()];
    }

    let mut count = ((total / max_length).ceil() as usize).clamp(2, steps);
    loop {
        let cuts = cut_points(&distance, count);
        let longest = cuts
            .windows(2)
            .map(|w| distance[w[1]] - distance[w[0]])
            .fold(0.0, f64::max);
        if longest <= max_length || count == steps {
            return cuts.windows(2).map(|w| pixels[w[0]..=w[1]].to_vec()).collect();
        }
        count += 1;
    }
}

/// Vertex indices (first and last included) splitting a path into `count`
/// pieces, each split at the vertex nearest an equal division of the length.
fn cut_points(distance: &[f64], count: usize) -> Vec<usize> {
    let last = distance.len() - 1;
    let total = distance[last];
    let mut cuts = vec![0];
    for k in 1..count {
        let target = total * k as f64 / count as f64;
        let prev = cuts[k - 1];
        // Leave at least one step for every remaining piece
        let lo = prev + 1;
        let hi = last - (count - k);
        let above = distance.partition_point(|&d| d < target).clamp(lo, hi);
        let below = above.saturating_sub(1).max(lo);
        let vertex = if (target - distance[below]).abs() <= (distance[above] - target).abs() {
            below
        } else {
            above
        };
        cuts.push(vertex);
    }
    cuts.push(last);
    cuts
}
