//! Segment selectors
//!
//! Filtering operations accept either a boolean mask aligned with the current
//! segment order or an explicit list of segment IDs. Both are resolved into a
//! single boolean mask before any algorithm runs.

use crate::network::{SegmentId, Segments};
use streamnet_core::{Error, Result};

/// A selection of segments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// One flag per segment, in the order of [`Segments::ids`]
    Mask(Vec<bool>),
    /// Explicit segment IDs
    Ids(Vec<SegmentId>),
}

impl Selector {
    /// Resolve into one flag per segment.
    ///
    /// Fails if a mask has the wrong length or an ID is not in the network.
    pub fn resolve(&self, segments: &Segments) -> Result<Vec<bool>> {
        match self {
            Selector::Mask(mask) => {
                if mask.len() != segments.len() {
                    return Err(Error::InvalidSelector(format!(
                        "boolean selector has {} elements but the network has {} segments",
                        mask.len(),
                        segments.len()
                    )));
                }
                Ok(mask.clone())
            }
            Selector::Ids(ids) => {
                let mut selected = vec![false; segments.len()];
                for &id in ids {
                    let pos = segments.position(id)?;
                    selected[pos] = true;
                }
                Ok(selected)
            }
        }
    }
}

impl From<Vec<bool>> for Selector {
    fn from(mask: Vec<bool>) -> Self {
        Selector::Mask(mask)
    }
}

impl From<&[bool]> for Selector {
    fn from(mask: &[bool]) -> Self {
        Selector::Mask(mask.to_vec())
    }
}

impl From<Vec<SegmentId>> for Selector {
    fn from(ids: Vec<SegmentId>) -> Self {
        Selector::Ids(ids)
    }
}

impl From<&[SegmentId]> for Selector {
    fn from(ids: &[SegmentId]) -> Self {
        Selector::Ids(ids.to_vec())
    }
}
