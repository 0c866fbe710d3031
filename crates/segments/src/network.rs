//! The stream segment network
//!
//! [`Segments`] owns an arena of segment records ordered by ID. Each record
//! holds its pixels (upstream to downstream), the IDs of its parents and the ID
//! of its child (0 for terminal segments).
//!
//! A segment that flows into another keeps the junction pixel as its final
//! vertex, so the junction is held by several segments. Whenever a single
//! owner is needed (stream raster, outlets, catchments) the pixel goes to the
//! most downstream holder: fewest child hops to the terminus, then lowest ID.

use crate::builder::{build_network, NetworkParams};
use crate::selector::Selector;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use streamnet_core::{Error, GeoTransform, LengthUnits, Raster, Result, CRS};
use tracing::debug;

/// Segment identifier. IDs start at 1 and are never reused; 0 means "none".
pub type SegmentId = u32;

/// One stream segment
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Segment {
    pub(crate) id: SegmentId,
    /// (row, col) pixels from upstream to downstream
    pub(crate) pixels: Vec<(usize, usize)>,
    /// Sorted parent IDs
    pub(crate) parents: Vec<SegmentId>,
    pub(crate) child: SegmentId,
    /// Length in transform units
    pub(crate) length: f64,
}

/// A stream segment network over a D8 flow grid.
///
/// The flow grid is an immutable snapshot shared between copies; everything
/// else is owned. Use [`copy`](Segments::copy) before filtering when the
/// unfiltered network is still needed.
#[derive(Debug, Clone)]
pub struct Segments {
    pub(crate) flow: Arc<Raster<u8>>,
    pub(crate) transform: GeoTransform,
    pub(crate) segments: Vec<Segment>,
    positions: HashMap<SegmentId, usize>,
    next_id: SegmentId,
    /// Pixel owners, built on first use and dropped on every filter
    owners: OnceLock<HashMap<usize, SegmentId>>,
    pub(crate) basins: Option<Raster<u32>>,
}

impl Segments {
    /// Build a network from a flow grid and a candidate mask.
    ///
    /// See [`build_network`] for the tracing rules.
    pub fn new(flow: &Raster<u8>, mask: &Raster<u8>, params: &NetworkParams) -> Result<Self> {
        build_network(flow, mask, params)
    }

    pub(crate) fn from_parts(flow: Arc<Raster<u8>>, transform: GeoTransform, segments: Vec<Segment>) -> Self {
        let next_id = segments.iter().map(|s| s.id).max().map_or(1, |id| id + 1);
        let mut network = Self {
            flow,
            transform,
            segments,
            positions: HashMap::new(),
            next_id,
            owners: OnceLock::new(),
            basins: None,
        };
        network.reindex();
        network
    }

    fn reindex(&mut self) {
        self.positions = self
            .segments
            .iter()
            .enumerate()
            .map(|(pos, s)| (s.id, pos))
            .collect();
    }

    /// Fully independent copy of the network
    pub fn copy(&self) -> Segments {
        self.clone()
    }

    // Identity

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment IDs in network order (ascending)
    pub fn ids(&self) -> Vec<SegmentId> {
        self.segments.iter().map(|s| s.id).collect()
    }

    /// The next ID that would be assigned. IDs below it may have been removed.
    pub fn id_space(&self) -> SegmentId {
        self.next_id
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Position of a segment in network order
    pub(crate) fn position(&self, id: SegmentId) -> Result<usize> {
        self.positions
            .get(&id)
            .copied()
            .ok_or_else(|| Error::InvalidSelector(format!("segment ID {} is not in the network", id)))
    }

    fn segment(&self, id: SegmentId) -> Result<&Segment> {
        Ok(&self.segments[self.position(id)?])
    }

    // Grid

    /// The D8 flow direction grid the network was built from
    pub fn flow(&self) -> &Raster<u8> {
        &self.flow
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.flow.crs()
    }

    /// Grid shape as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.flow.shape()
    }

    // Connectivity

    /// Parent segment IDs, ascending
    pub fn parents(&self, id: SegmentId) -> Result<&[SegmentId]> {
        Ok(&self.segment(id)?.parents)
    }

    /// Child segment ID, or 0 for a terminal segment
    pub fn child(&self, id: SegmentId) -> Result<SegmentId> {
        Ok(self.segment(id)?.child)
    }

    pub fn is_terminal(&self, id: SegmentId) -> Result<bool> {
        Ok(self.segment(id)?.child == 0)
    }

    /// One flag per segment: whether it is terminal
    pub fn terminal_mask(&self) -> Vec<bool> {
        self.segments.iter().map(|s| s.child == 0).collect()
    }

    /// IDs of the terminal segments
    pub fn terminal_ids(&self) -> Vec<SegmentId> {
        self.segments.iter().filter(|s| s.child == 0).map(|s| s.id).collect()
    }

    /// The terminal segment of the local network containing `id`
    pub fn terminus(&self, id: SegmentId) -> Result<SegmentId> {
        let mut pos = self.position(id)?;
        for _ in 0..self.len() {
            match self.child_position(pos) {
                Some(child) => pos = child,
                None => break,
            }
        }
        Ok(self.segments[pos].id)
    }

    /// Terminal segment ID for every segment
    pub fn termini(&self) -> Vec<SegmentId> {
        self.terminus_positions()
            .into_iter()
            .map(|pos| self.segments[pos].id)
            .collect()
    }

    /// All segments upstream of `id`, ascending
    pub fn ancestors(&self, id: SegmentId) -> Result<Vec<SegmentId>> {
        let mut stack = self.segment(id)?.parents.clone();
        let mut found = Vec::new();
        while let Some(parent) = stack.pop() {
            found.push(parent);
            stack.extend_from_slice(&self.segment(parent)?.parents);
        }
        found.sort_unstable();
        Ok(found)
    }

    /// Segments downstream of `id`, nearest first
    pub fn descendents(&self, id: SegmentId) -> Result<Vec<SegmentId>> {
        let mut pos = self.position(id)?;
        let mut found = Vec::new();
        while let Some(child) = self.child_position(pos) {
            if found.len() >= self.len() {
                break;
            }
            found.push(self.segments[child].id);
            pos = child;
        }
        Ok(found)
    }

    /// Every segment in the local network of `id` (its terminus and all
    /// segments upstream of it), ascending
    pub fn family(&self, id: SegmentId) -> Result<Vec<SegmentId>> {
        let terminus = self.terminus(id)?;
        let mut family = self.ancestors(terminus)?;
        family.push(terminus);
        family.sort_unstable();
        Ok(family)
    }

    pub(crate) fn child_position(&self, pos: usize) -> Option<usize> {
        match self.segments[pos].child {
            0 => None,
            child => self.positions.get(&child).copied(),
        }
    }

    /// Position of the terminus of every segment
    pub(crate) fn terminus_positions(&self) -> Vec<usize> {
        const UNKNOWN: usize = usize::MAX;
        let n = self.len();
        let mut terminus = vec![UNKNOWN; n];
        let mut chain = Vec::new();
        for start in 0..n {
            chain.clear();
            let mut pos = start;
            let end = loop {
                if terminus[pos] != UNKNOWN {
                    break terminus[pos];
                }
                chain.push(pos);
                match self.child_position(pos) {
                    Some(child) if chain.len() <= n => pos = child,
                    _ => break pos,
                }
            };
            for &p in &chain {
                terminus[p] = end;
            }
        }
        terminus
    }

    /// Number of child links from each segment to its terminus
    pub(crate) fn hops(&self) -> Vec<u32> {
        const UNKNOWN: u32 = u32::MAX;
        let n = self.len();
        let mut hops = vec![UNKNOWN; n];
        let mut chain = Vec::new();
        for start in 0..n {
            chain.clear();
            let mut pos = start;
            let mut below = loop {
                if hops[pos] != UNKNOWN {
                    break hops[pos] + 1;
                }
                chain.push(pos);
                match self.child_position(pos) {
                    Some(child) if chain.len() <= n => pos = child,
                    _ => break 0,
                }
            };
            for &p in chain.iter().rev() {
                hops[p] = below;
                below += 1;
            }
        }
        hops
    }

    /// Upstream-first ordering of segment positions (parents before children)
    pub(crate) fn postorder(&self) -> Vec<usize> {
        let n = self.len();
        let mut pending: Vec<usize> = self
            .segments
            .iter()
            .map(|s| s.parents.iter().filter(|p| self.contains(**p)).count())
            .collect();
        let mut order: Vec<usize> = (0..n).filter(|&p| pending[p] == 0).collect();
        let mut head = 0;
        while head < order.len() {
            let pos = order[head];
            head += 1;
            if let Some(child) = self.child_position(pos) {
                pending[child] -= 1;
                if pending[child] == 0 {
                    order.push(child);
                }
            }
        }
        order
    }

    // Geometry

    /// Pixels of a segment, upstream to downstream
    pub fn indices(&self, id: SegmentId) -> Result<&[(usize, usize)]> {
        Ok(&self.segment(id)?.pixels)
    }

    /// Length of a segment in transform units (meters)
    pub fn length(&self, id: SegmentId) -> Result<f64> {
        Ok(self.segment(id)?.length)
    }

    /// Length of every segment in the requested units
    pub fn lengths(&self, units: LengthUnits) -> Vec<f64> {
        self.segments.iter().map(|s| units.from_meters(s.length)).collect()
    }

    /// Owner of every pixel held by a segment, keyed by flat index
    pub(crate) fn owners(&self) -> &HashMap<usize, SegmentId> {
        self.owners.get_or_init(|| self.resolve_owners())
    }

    fn resolve_owners(&self) -> HashMap<usize, SegmentId> {
        let cols = self.flow.cols();
        let hops = self.hops();
        let mut best: HashMap<usize, (u32, SegmentId)> = HashMap::new();
        for (pos, segment) in self.segments.iter().enumerate() {
            let key = (hops[pos], segment.id);
            for &(row, col) in &segment.pixels {
                best.entry(row * cols + col)
                    .and_modify(|current| {
                        if key < *current {
                            *current = key;
                        }
                    })
                    .or_insert(key);
            }
        }
        best.into_iter().map(|(idx, (_, id))| (idx, id)).collect()
    }

    /// Index into `pixels` of the outlet of the segment at `pos`
    fn outlet_offset(&self, pos: usize, owners: &HashMap<usize, SegmentId>) -> usize {
        let cols = self.flow.cols();
        let segment = &self.segments[pos];
        segment
            .pixels
            .iter()
            .rposition(|&(r, c)| owners.get(&(r * cols + c)) == Some(&segment.id))
            .unwrap_or(segment.pixels.len() - 1)
    }

    /// Outlet pixel of every segment, in network order
    pub(crate) fn outlet_pixels(&self) -> Vec<(usize, usize)> {
        let owners = self.owners();
        (0..self.len())
            .map(|pos| self.segments[pos].pixels[self.outlet_offset(pos, owners)])
            .collect()
    }

    /// Outlet pixel of a segment: the last pixel it owns
    pub fn outlet(&self, id: SegmentId) -> Result<(usize, usize)> {
        let pos = self.position(id)?;
        Ok(self.segments[pos].pixels[self.outlet_offset(pos, self.owners())])
    }

    /// Outlet pixels of all segments, or of terminal segments only
    pub fn outlets(&self, terminal_only: bool) -> Vec<(usize, usize)> {
        self.outlet_pixels()
            .into_iter()
            .zip(&self.segments)
            .filter(|(_, s)| !terminal_only || s.child == 0)
            .map(|(outlet, _)| outlet)
            .collect()
    }

    /// Stream raster: 0 background, otherwise the owning segment ID
    pub fn raster(&self) -> Raster<u32> {
        let cols = self.flow.cols();
        let mut output = self.flow.with_same_meta::<u32>();
        output.set_nodata(Some(0));
        let data = output.data_mut();
        for (&idx, &id) in self.owners() {
            data[(idx / cols, idx % cols)] = id;
        }
        output
    }

    /// Whether each segment has any (or all) of its pixels in a mask
    pub fn in_mask(&self, mask: &Raster<u8>, any: bool) -> Result<Vec<bool>> {
        self.flow.check_alignment(mask)?;
        Ok(self
            .segments
            .iter()
            .map(|s| {
                let mut inside = s.pixels.iter().map(|&(r, c)| mask.data()[(r, c)] != 0);
                if any {
                    inside.any(|x| x)
                } else {
                    inside.all(|x| x)
                }
            })
            .collect())
    }

    // Filtering

    /// Remove the selected segments
    pub fn remove(&mut self, selector: &Selector) -> Result<()> {
        let selected = selector.resolve(self)?;
        let keep: Vec<bool> = selected.iter().map(|&s| !s).collect();
        self.retain(&keep);
        Ok(())
    }

    /// Keep only the selected segments
    pub fn keep(&mut self, selector: &Selector) -> Result<()> {
        let keep = selector.resolve(self)?;
        self.retain(&keep);
        Ok(())
    }

    fn retain(&mut self, keep: &[bool]) {
        let removed: Vec<SegmentId> = self
            .segments
            .iter()
            .zip(keep)
            .filter(|(_, &k)| !k)
            .map(|(s, _)| s.id)
            .collect();

        let mut flags = keep.iter();
        self.segments.retain(|_| flags.next().copied().unwrap_or(false));
        self.reindex();

        for segment in &mut self.segments {
            if segment.child != 0 && !self.positions.contains_key(&segment.child) {
                segment.child = 0;
            }
            let positions = &self.positions;
            segment.parents.retain(|p| positions.contains_key(p));
        }

        self.owners = OnceLock::new();
        self.basins = None;
        debug!(removed = removed.len(), remaining = self.len(), "filtered stream network");
    }

    /// Adjust a selection so that filtering with it preserves flow continuity.
    ///
    /// With `treat_as_remove = false` the selection is a keep-set and the
    /// returned mask is the keep-set plus every segment lying on the tree
    /// path between two kept segments. With `treat_as_remove = true` the
    /// selection is a remove-set and the returned remove mask excludes those
    /// connecting segments. The network is not modified.
    pub fn continuous(&self, selector: &Selector, treat_as_remove: bool) -> Result<Vec<bool>> {
        let selected = selector.resolve(self)?;
        let mut keep: Vec<bool> = if treat_as_remove {
            selected.iter().map(|&s| !s).collect()
        } else {
            selected
        };

        // Kept segments in each upstream subtree
        let mut upstream = vec![0_usize; self.len()];
        for pos in self.postorder() {
            upstream[pos] += keep[pos] as usize;
            if let Some(child) = self.child_position(pos) {
                upstream[child] += upstream[pos];
            }
        }

        // A removed segment disconnects its tree when kept segments lie on
        // two or more of its sides (each parent branch, and downstream)
        let terminus = self.terminus_positions();
        let mut adjusted = keep.clone();
        for (pos, segment) in self.segments.iter().enumerate() {
            if keep[pos] {
                continue;
            }
            let mut sides = segment
                .parents
                .iter()
                .filter_map(|&p| self.positions.get(&p))
                .filter(|&&p| upstream[p] > 0)
                .count();
            if upstream[terminus[pos]] > upstream[pos] {
                sides += 1;
            }
            if sides >= 2 {
                adjusted[pos] = true;
            }
        }
        keep = adjusted;

        Ok(if treat_as_remove {
            keep.iter().map(|&k| !k).collect()
        } else {
            keep
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamnet_core::raster::d8;

    /// Y-shaped network on a 5x3 grid:
    ///
    /// ```text
    /// col 0 and col 2 flow diagonally into (2, 1), which flows south
    /// (0,0)       (0,2)
    ///   (1,0)   (1,2)     <- both drain toward (2,1)
    ///       (2,1)
    ///       (3,1)
    ///       (4,1)  -> off grid
    /// ```
    fn y_network() -> Segments {
        let mut flow: Raster<u8> = Raster::new(5, 3);
        flow.set_transform(GeoTransform::new(0.0, 5.0, 1.0, -1.0));
        let mut mask: Raster<u8> = Raster::new(5, 3);
        for &(r, c, code) in &[
            (0, 0, 7_u8),
            (1, 0, 8),
            (0, 2, 7),
            (1, 2, 6),
            (2, 1, 7),
            (3, 1, 7),
            (4, 1, 7),
        ] {
            flow.set(r, c, code).unwrap();
            mask.set(r, c, 1).unwrap();
        }
        Segments::new(&flow, &mask, &NetworkParams::default()).unwrap()
    }

    #[test]
    fn test_y_network_topology() {
        let network = y_network();
        assert_eq!(network.ids(), vec![1, 2, 3]);
        assert_eq!(network.indices(1).unwrap(), &[(0, 0), (1, 0), (2, 1)]);
        assert_eq!(network.indices(2).unwrap(), &[(0, 2), (1, 2), (2, 1)]);
        assert_eq!(network.indices(3).unwrap(), &[(2, 1), (3, 1), (4, 1)]);
        assert_eq!(network.child(1).unwrap(), 3);
        assert_eq!(network.child(2).unwrap(), 3);
        assert_eq!(network.parents(3).unwrap(), &[1, 2]);
        assert_eq!(network.terminal_ids(), vec![3]);
        assert_eq!(network.termini(), vec![3, 3, 3]);
        assert_eq!(network.ancestors(3).unwrap(), vec![1, 2]);
        assert_eq!(network.descendents(1).unwrap(), vec![3]);
        assert_eq!(network.family(2).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_confluence_owned_downstream() {
        let network = y_network();
        let raster = network.raster();
        assert_eq!(raster.get(2, 1).unwrap(), 3);
        assert_eq!(raster.get(1, 0).unwrap(), 1);
        assert_eq!(raster.get(0, 2).unwrap(), 2);
        assert_eq!(raster.get(0, 1).unwrap(), 0);
        assert_eq!(network.outlet(1).unwrap(), (1, 0));
        assert_eq!(network.outlet(3).unwrap(), (4, 1));
        assert_eq!(network.outlets(true), vec![(4, 1)]);
    }

    #[test]
    fn test_remove_child_rewires_and_shares_junction() {
        let mut network = y_network();
        network.remove(&Selector::Ids(vec![3])).unwrap();
        assert_eq!(network.ids(), vec![1, 2]);
        assert!(network.is_terminal(1).unwrap());
        assert!(network.is_terminal(2).unwrap());
        assert_eq!(network.id_space(), 4);

        // Junction now held by two terminal segments: lowest ID wins
        assert_eq!(network.raster().get(2, 1).unwrap(), 1);
        assert_eq!(network.outlet(1).unwrap(), (2, 1));
        assert_eq!(network.outlet(2).unwrap(), (1, 2));
    }

    #[test]
    fn test_outlets_follow_filtering() {
        let mut network = y_network();
        assert_eq!(network.outlet(1).unwrap(), (1, 0));
        assert_eq!(network.outlet(2).unwrap(), (1, 2));

        // Owners resolved before the removal must not leak into queries after it
        let copy = network.copy();
        network.remove(&Selector::Ids(vec![3])).unwrap();
        assert_eq!(network.outlet(1).unwrap(), (2, 1));
        assert_eq!(network.outlet(2).unwrap(), (1, 2));
        assert_eq!(network.outlets(false), vec![(2, 1), (1, 2)]);
        assert_eq!(copy.outlet(1).unwrap(), (1, 0));
        assert_eq!(copy.raster().get(2, 1).unwrap(), 3);
    }

    #[test]
    fn test_remove_parent_updates_child() {
        let mut network = y_network();
        network.remove(&Selector::Mask(vec![true, false, false])).unwrap();
        assert_eq!(network.parents(3).unwrap(), &[2]);
        assert!(network.parents(1).is_err());
    }

    #[test]
    fn test_invalid_selectors_leave_network_untouched() {
        let mut network = y_network();
        let before = network.ids();
        assert!(matches!(
            network.remove(&Selector::Mask(vec![true])),
            Err(Error::InvalidSelector(_))
        ));
        assert!(matches!(
            network.keep(&Selector::Ids(vec![1, 99])),
            Err(Error::InvalidSelector(_))
        ));
        assert_eq!(network.ids(), before);
    }

    #[test]
    fn test_filter_to_empty() {
        let mut network = y_network();
        network.keep(&Selector::Mask(vec![false; 3])).unwrap();
        assert!(network.is_empty());
        assert!(network.ids().is_empty());
        assert!(network.termini().is_empty());
        assert!(network.outlets(false).is_empty());
        assert_eq!(network.raster().data().iter().filter(|&&v| v != 0).count(), 0);
        assert_eq!(network.id_space(), 4);
    }

    #[test]
    fn test_continuous_keeps_connecting_segment() {
        let network = y_network();
        // Keeping 1 and 3 without 2 is already continuous
        assert_eq!(
            network.continuous(&Selector::Ids(vec![1, 3]), false).unwrap(),
            vec![true, false, true]
        );
        // Keeping both headwaters needs the junction segment
        assert_eq!(
            network.continuous(&Selector::Ids(vec![1, 2]), false).unwrap(),
            vec![true, true, true]
        );
        // As a remove-set: removing 3 alone would split 1 from 2
        assert_eq!(
            network.continuous(&Selector::Ids(vec![3]), true).unwrap(),
            vec![false, false, false]
        );
        // Removing a headwater is always fine
        assert_eq!(
            network.continuous(&Selector::Ids(vec![1]), true).unwrap(),
            vec![true, false, false]
        );
    }

    #[test]
    fn test_copy_is_independent() {
        let source = y_network();
        let mut copy = source.copy();
        copy.remove(&Selector::Ids(vec![1])).unwrap();
        assert_eq!(source.ids(), vec![1, 2, 3]);
        assert_eq!(source.parents(3).unwrap(), &[1, 2]);
        assert_eq!(copy.ids(), vec![2, 3]);
    }

    #[test]
    fn test_pixel_chains_are_connected() {
        let network = y_network();
        for id in network.ids() {
            for w in network.indices(id).unwrap().windows(2) {
                assert!(d8::is_adjacent(w[0], w[1]));
            }
        }
    }

    #[test]
    fn test_in_mask() {
        let network = y_network();
        let mut mask: Raster<u8> = Raster::new(5, 3);
        mask.set(0, 0, 1).unwrap();
        assert_eq!(network.in_mask(&mask, true).unwrap(), vec![true, false, false]);
        assert_eq!(network.in_mask(&mask, false).unwrap(), vec![false, false, false]);
    }
}
