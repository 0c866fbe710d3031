//! # streamnet segments
//!
//! Stream segment networks built from a D8 flow direction grid and a mask of
//! candidate stream pixels.
//!
//! - **builder**: trace the mask into segments, optionally split long ones
//! - **network**: the [`Segments`] aggregate, its topology queries and
//!   continuity-preserving filtering
//! - **catchment**: statistics over segment pixels or upslope catchments
//! - **basins**: terminal outlet basins, sequential or on a worker pool
//! - **export**: geometries and properties for vector writers
//!
//! ```no_run
//! use streamnet_segments::prelude::*;
//!
//! # fn main() -> Result<()> {
//! # let flow: Raster<u8> = Raster::new(10, 10);
//! # let mask: Raster<u8> = Raster::new(10, 10);
//! # let slope: Raster<f64> = Raster::new(10, 10);
//! let mut network = Segments::new(&flow, &mask, &NetworkParams { max_length: Some(500.0) })?;
//! let mean_slope = network.catchment_summary(Statistic::Mean, &slope, &SummaryOptions::default())?;
//! let steep: Vec<bool> = mean_slope.iter().map(|&s| s > 0.3).collect();
//! let keep = network.continuous(&Selector::Mask(steep), false)?;
//! network.keep(&Selector::Mask(keep))?;
//! # Ok(())
//! # }
//! ```

pub mod basins;
pub mod builder;
pub mod catchment;
pub mod export;
mod flowpath;
pub mod network;
pub mod selector;

pub use basins::BasinParams;
pub use builder::{build_network, NetworkBuilder, NetworkParams};
pub use catchment::{reduce, Statistic, SummaryOptions};
pub use export::FeatureKind;
pub use network::{SegmentId, Segments};
pub use selector::Selector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::basins::BasinParams;
    pub use crate::builder::{NetworkBuilder, NetworkParams};
    pub use crate::catchment::{Statistic, SummaryOptions};
    pub use crate::export::FeatureKind;
    pub use crate::network::{SegmentId, Segments};
    pub use crate::selector::Selector;
    pub use streamnet_core::prelude::*;
}
