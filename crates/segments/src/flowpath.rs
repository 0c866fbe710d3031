//! Flow path kernels over a D8 grid
//!
//! Two traversals are shared by catchment summaries and basin location:
//! - [`propagate`]: follow every pixel's flow path downstream with path
//!   compression, labelling it from the seeds met along the way. O(N).
//! - [`upstream`]: breadth-first search against the flow from one pixel,
//!   collecting everything that drains to it.
//!
//! Pixels are addressed by flat row-major index.

use std::collections::VecDeque;
use streamnet_core::raster::d8;
use streamnet_core::Raster;

/// Which seed on a flow path labels the pixels above it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hit {
    /// The first seed met going downstream (the pixel itself included)
    Nearest,
    /// The last seed met going downstream
    Farthest,
}

/// Flat index of the pixel that `idx` drains into
#[inline]
pub(crate) fn downstream(flow: &Raster<u8>, idx: usize) -> Option<usize> {
    let cols = flow.cols();
    let (row, col) = (idx / cols, idx % cols);
    let code = unsafe { flow.get_unchecked(row, col) };
    d8::downstream(row, col, code, flow.rows(), cols).map(|(r, c)| r * cols + c)
}

/// Label every pixel with a seed found on its downstream flow path.
///
/// `seeds` holds one value per pixel, 0 meaning "not a seed". Pixels whose
/// path meets no seed (or runs into a flow cycle) get 0.
pub(crate) fn propagate(flow: &Raster<u8>, seeds: &[u32], hit: Hit) -> Vec<u32> {
    const UNVISITED: u8 = 0;
    const ON_PATH: u8 = 1;
    const DONE: u8 = 2;

    let n = flow.len();
    debug_assert_eq!(seeds.len(), n);
    let mut labels = vec![0_u32; n];
    let mut state = vec![UNVISITED; n];
    let mut path = Vec::new();

    for start in 0..n {
        if state[start] == DONE {
            continue;
        }

        // Walk down until a finished pixel, the grid edge, or a cycle
        path.clear();
        let mut below = 0_u32;
        let mut cur = start;
        loop {
            match state[cur] {
                DONE => {
                    below = labels[cur];
                    break;
                }
                ON_PATH => break,
                _ => {}
            }
            state[cur] = ON_PATH;
            path.push(cur);
            match downstream(flow, cur) {
                Some(next) => cur = next,
                None => break,
            }
        }

        // Unwind from the downstream end
        for &idx in path.iter().rev() {
            below = match hit {
                Hit::Nearest if seeds[idx] != 0 => seeds[idx],
                Hit::Farthest if below == 0 => seeds[idx],
                _ => below,
            };
            labels[idx] = below;
            state[idx] = DONE;
        }
    }

    labels
}

/// All pixels that drain to `outlet`, the outlet included, in BFS order.
pub(crate) fn upstream(flow: &Raster<u8>, outlet: usize) -> Vec<usize> {
    let (rows, cols) = flow.shape();
    let mut pixels = vec![outlet];
    let mut queue = VecDeque::from([outlet]);

    while let Some(idx) = queue.pop_front() {
        let (row, col) = (idx / cols, idx % cols);

        for &(dr, dc) in &d8::OFFSETS[1..] {
            let nr = row as isize + dr;
            let nc = col as isize + dc;
            if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                continue;
            }
            let neighbor = nr as usize * cols + nc as usize;
            // Only the outlet can be reached twice, via a cycle through it
            if neighbor == outlet {
                continue;
            }
            if downstream(flow, neighbor) == Some(idx) {
                pixels.push(neighbor);
                queue.push_back(neighbor);
            }
        }
    }

    pixels
}
