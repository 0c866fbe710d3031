//! Terminal outlet basins
//!
//! Labels every grid pixel with the ID of the terminal segment whose outlet it
//! ultimately drains through. When one terminal outlet drains into another
//! terminal's basin (a nested network), pixels go to the most downstream one.
//!
//! Two strategies produce identical rasters:
//! - Sequential: a single path-compressed pass over the grid, O(N).
//! - Parallel: terminal outlets are split into contiguous chunks, one per
//!   worker. Each worker collects the upstream pixels of its outlets from the
//!   shared flow grid. The results are merged largest catchment first (then
//!   lowest ID), each pixel going to the first basin that claims it.
//!
//! The raster is cached on the network until the next `remove` or `keep`.

use crate::flowpath::{self, Hit};
use crate::network::{SegmentId, Segments};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use streamnet_core::{Error, Raster, Result};
use streamnet_parallel::{default_workers, ParallelStrategy, ProcessingMode};
use tracing::{debug, info};

/// Parameters for basin location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasinParams {
    /// Use a worker pool
    #[serde(default)]
    pub parallel: bool,
    /// Number of workers (default: available CPUs minus one, at least one)
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Segments {
    /// Locate terminal outlet basins and cache the result.
    ///
    /// Any existing cache is discarded first. If a parallel worker fails the
    /// call returns [`Error::WorkerFailure`] and no cache is stored.
    pub fn locate_basins(&mut self, params: &BasinParams) -> Result<&Raster<u32>> {
        self.basins = None;

        let labels = if params.parallel {
            let workers = match params.workers {
                Some(0) => {
                    return Err(Error::InvalidParameter {
                        name: "workers",
                        value: "0".to_string(),
                        reason: "at least one worker is required".to_string(),
                    })
                }
                Some(n) => n,
                None => default_workers(),
            };
            self.basins_parallel(workers)?
        } else {
            self.basins_sequential()?
        };

        let mut raster = self.flow.with_same_meta::<u32>();
        raster.set_nodata(Some(0));
        for (cell, label) in raster.data_mut().iter_mut().zip(labels) {
            *cell = label;
        }
        info!(terminals = self.terminal_ids().len(), parallel = params.parallel, "located terminal basins");
        Ok(self.basins.insert(raster))
    }

    /// Cached basin raster, located sequentially if there is no cache
    pub fn basin_raster(&mut self) -> Result<&Raster<u32>> {
        if self.basins.is_none() {
            debug!("basin cache empty, recomputing");
            self.locate_basins(&BasinParams::default())?;
        }
        self.basins
            .as_ref()
            .ok_or_else(|| Error::Other("basin cache was not populated".to_string()))
    }

    /// Whether a basin raster is cached
    pub fn has_basins(&self) -> bool {
        self.basins.is_some()
    }

    /// Whether each segment belongs to a nested local network: one whose
    /// terminal outlet drains into another terminal segment's basin.
    pub fn is_nested(&mut self) -> Result<Vec<bool>> {
        let cols = self.flow.cols();
        let outlets = self.outlet_pixels();
        let terminus = self.terminus_positions();
        let flow = Arc::clone(&self.flow);
        let ids = self.ids();
        let basins = self.basin_raster()?;

        let nested: Vec<bool> = outlets
            .iter()
            .zip(&ids)
            .map(|(&(r, c), &id)| {
                flowpath::downstream(&flow, r * cols + c)
                    .map(|below| {
                        let basin = basins.data()[(below / cols, below % cols)];
                        basin != 0 && basin != id
                    })
                    .unwrap_or(false)
            })
            .collect();

        Ok(terminus.into_iter().map(|t| nested[t]).collect())
    }

    /// Terminal IDs with their outlet pixels, in ID order
    fn terminal_outlets(&self) -> Vec<(SegmentId, (usize, usize))> {
        self.outlet_pixels()
            .into_iter()
            .zip(&self.segments)
            .filter(|(_, s)| s.child == 0)
            .map(|(outlet, s)| (s.id, outlet))
            .collect()
    }

    fn basins_sequential(&self) -> Result<Vec<u32>> {
        let (rows, cols) = self.flow.shape();
        let mut seeds = vec![0_u32; rows * cols];
        for (id, (r, c)) in self.terminal_outlets() {
            check_pixel(r, c, rows, cols)?;
            seeds[r * cols + c] = id;
        }
        Ok(flowpath::propagate(&self.flow, &seeds, Hit::Farthest))
    }

    fn basins_parallel(&self, workers: usize) -> Result<Vec<u32>> {
        let (rows, cols) = self.flow.shape();
        let terminals = self.terminal_outlets();
        let chunk = terminals.len().div_ceil(workers).max(1);
        let chunks: Vec<Vec<(SegmentId, (usize, usize))>> = terminals.chunks(chunk).map(|c| c.to_vec()).collect();
        debug!(terminals = terminals.len(), workers, chunks = chunks.len(), "dispatching basin workers");

        let flow = Arc::clone(&self.flow);
        let partials = ProcessingMode::ParallelWith(workers).try_par_map(chunks, |chunk| {
            chunk
                .into_iter()
                .map(|(id, (r, c))| {
                    check_pixel(r, c, rows, cols)?;
                    Ok((id, flowpath::upstream(&flow, r * cols + c)))
                })
                .collect::<Result<Vec<(SegmentId, Vec<usize>)>>>()
        })?;

        // Most downstream first: a basin contains every basin nested in it
        let mut basins: Vec<(SegmentId, Vec<usize>)> = partials.into_iter().flatten().collect();
        basins.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.0.cmp(&b.0)));

        let mut labels = vec![0_u32; rows * cols];
        for (id, pixels) in basins {
            for idx in pixels {
                if labels[idx] == 0 {
                    labels[idx] = id;
                }
            }
        }
        Ok(labels)
    }
}

fn check_pixel(row: usize, col: usize, rows: usize, cols: usize) -> Result<()> {
    if row >= rows || col >= cols {
        return Err(Error::IndexOutOfBounds { row, col, rows, cols });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Segment;
    use streamnet_core::GeoTransform;

    /// Two parallel columns flowing south, the left one ending on the grid
    /// edge, the right one draining into the left column's outlet row
    fn two_columns() -> (Raster<u8>, Raster<u8>) {
        let mut flow: Raster<u8> = Raster::from_vec(
            vec![
                7, 0, 7, //
                7, 0, 7, //
                7, 0, 6, //
                7, 5, 0,
            ],
            4,
            3,
        )
        .unwrap();
        flow.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        let mut mask: Raster<u8> = Raster::new(4, 3);
        for r in 0..4 {
            mask.set(r, 0, 1).unwrap();
        }
        for r in 0..2 {
            mask.set(r, 2, 1).unwrap();
        }
        (flow, mask)
    }

    #[test]
    fn test_nested_network() {
        // Right column stops at row 1; (2, 2) is not in the mask, so its outlet
        // drains through the left column's basin
        let (flow, mask) = two_columns();
        let mut network = Segments::new(&flow, &mask, &Default::default()).unwrap();
        assert_eq!(network.ids(), vec![1, 2]);
        assert_eq!(network.terminal_ids(), vec![1, 2]);

        let basins = network.locate_basins(&BasinParams::default()).unwrap().clone();
        assert_eq!(basins.get(0, 2).unwrap(), 1);
        assert_eq!(basins.get(0, 0).unwrap(), 1);
        assert_eq!(basins.get(0, 1).unwrap(), 0);
        assert_eq!(network.is_nested().unwrap(), vec![false, true]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (flow, mask) = two_columns();
        let mut network = Segments::new(&flow, &mask, &Default::default()).unwrap();
        let sequential = network.locate_basins(&BasinParams::default()).unwrap().clone();
        for workers in [1, 2, 4] {
            let params = BasinParams { parallel: true, workers: Some(workers) };
            let parallel = network.locate_basins(&params).unwrap();
            assert_eq!(parallel.data(), sequential.data(), "workers = {}", workers);
        }
    }

    #[test]
    fn test_zero_workers_rejected() {
        let (flow, mask) = two_columns();
        let mut network = Segments::new(&flow, &mask, &Default::default()).unwrap();
        let params = BasinParams { parallel: true, workers: Some(0) };
        assert!(matches!(
            network.locate_basins(&params),
            Err(Error::InvalidParameter { name: "workers", .. })
        ));
        assert!(!network.has_basins());
    }

    #[test]
    fn test_worker_failure_leaves_no_cache() {
        let (flow, _) = two_columns();
        let transform = *flow.transform().unwrap();
        let broken = Segment {
            id: 1,
            pixels: vec![(0, 0), (40, 0)],
            parents: Vec::new(),
            child: 0,
            length: 40.0,
        };
        let mut network = Segments::from_parts(Arc::new(flow), transform, vec![broken]);
        let params = BasinParams { parallel: true, workers: Some(2) };
        let err = network.locate_basins(&params).unwrap_err();
        assert!(matches!(err, Error::WorkerFailure(_)));
        assert!(!network.has_basins());
    }

    #[test]
    fn test_params_from_json() {
        let params: BasinParams = serde_json::from_str(r#"{"parallel": true, "workers": 3}"#).unwrap();
        assert_eq!(params, BasinParams { parallel: true, workers: Some(3) });
        assert_eq!(serde_json::from_str::<BasinParams>("{}").unwrap(), BasinParams::default());
    }
}
