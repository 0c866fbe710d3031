//! # streamnet core
//!
//! Core types shared by the streamnet crates.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced 2D grid backed by `ndarray`
//! - `GeoTransform`: affine transform (pixel size + origin)
//! - `CRS`: coordinate reference system identity
//! - D8 direction tables (TauDEM convention)
//! - Area and length unit conversion tables
//! - Vector hand-off types consumed by external feature writers

pub mod crs;
pub mod error;
pub mod raster;
pub mod units;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{d8, GeoTransform, Raster, RasterElement};
pub use units::{AreaUnits, LengthUnits};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::units::{AreaUnits, LengthUnits};
    pub use crate::Algorithm;
}

/// Core trait for the top-level streamnet operations.
///
/// An algorithm transforms an input into an output under a set of parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
