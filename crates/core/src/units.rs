//! Length and area units
//!
//! Raster transforms are assumed to be in meters. Values are converted from
//! meters (or square meters) into the requested unit with a fixed table.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const METERS_PER_KILOMETER: f64 = 1000.0;
const METERS_PER_FOOT: f64 = 0.3048;
const METERS_PER_MILE: f64 = 1609.344;

/// Units for lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnits {
    /// Meters
    #[default]
    Meters,
    /// Kilometers
    Kilometers,
    /// International feet
    Feet,
    /// Statute miles
    Miles,
}

impl LengthUnits {
    /// Meters in one of this unit
    pub fn meters(self) -> f64 {
        match self {
            LengthUnits::Meters => 1.0,
            LengthUnits::Kilometers => METERS_PER_KILOMETER,
            LengthUnits::Feet => METERS_PER_FOOT,
            LengthUnits::Miles => METERS_PER_MILE,
        }
    }

    /// Convert a length in meters into this unit
    pub fn from_meters(self, meters: f64) -> f64 {
        meters / self.meters()
    }
}

impl FromStr for LengthUnits {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "meters" => Ok(LengthUnits::Meters),
            "km" | "kilometers" => Ok(LengthUnits::Kilometers),
            "ft" | "feet" => Ok(LengthUnits::Feet),
            "mi" | "miles" => Ok(LengthUnits::Miles),
            other => Err(Error::InvalidParameter {
                name: "units",
                value: other.to_string(),
                reason: "expected one of m, km, ft, mi".to_string(),
            }),
        }
    }
}

/// Units for areas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaUnits {
    /// Square meters
    Meters,
    /// Square kilometers
    #[default]
    Kilometers,
    /// Square feet
    Feet,
    /// Square miles
    Miles,
}

impl AreaUnits {
    /// Square meters in one of this unit
    pub fn square_meters(self) -> f64 {
        let side = match self {
            AreaUnits::Meters => 1.0,
            AreaUnits::Kilometers => METERS_PER_KILOMETER,
            AreaUnits::Feet => METERS_PER_FOOT,
            AreaUnits::Miles => METERS_PER_MILE,
        };
        side * side
    }

    /// Convert an area in square meters into this unit
    pub fn from_square_meters(self, area: f64) -> f64 {
        area / self.square_meters()
    }
}

impl FromStr for AreaUnits {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m2" | "m²" | "meters" => Ok(AreaUnits::Meters),
            "km2" | "km²" | "kilometers" => Ok(AreaUnits::Kilometers),
            "ft2" | "ft²" | "feet" => Ok(AreaUnits::Feet),
            "mi2" | "mi²" | "miles" => Ok(AreaUnits::Miles),
            other => Err(Error::InvalidParameter {
                name: "units",
                value: other.to_string(),
                reason: "expected one of m2, km2, ft2, mi2".to_string(),
            }),
        }
    }
}
