//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Flow grids and masks are `u8`, stream and basin rasters `u32`, and value
/// rasters used for summaries may be any of the implemented numeric types.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Value as `f64`, with no-data (and NaN) mapped to NaN.
    fn value_or_nan(self, nodata: Option<Self>) -> f64 {
        if self.is_nodata(nodata) {
            return f64::NAN;
        }
        self.to_f64().unwrap_or(f64::NAN)
    }
}

macro_rules! impl_raster_element_int {
    ($t:ty) => {
        impl RasterElement for $t {
            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                match nodata {
                    Some(nd) => *self == nd,
                    None => false,
                }
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty) => {
        impl RasterElement for $t {
            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) if nd.is_nan() => false,
                    Some(nd) => (self - nd).abs() < <$t>::EPSILON * 100.0,
                    None => false,
                }
            }
        }
    };
}

impl_raster_element_int!(i8);
impl_raster_element_int!(i16);
impl_raster_element_int!(i32);
impl_raster_element_int!(i64);
impl_raster_element_int!(u8);
impl_raster_element_int!(u16);
impl_raster_element_int!(u32);
impl_raster_element_int!(u64);
impl_raster_element_float!(f32);
impl_raster_element_float!(f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_or_nan() {
        assert_eq!(5_u8.value_or_nan(None), 5.0);
        assert!(255_u8.value_or_nan(Some(255)).is_nan());
        assert!((-9999.0_f64).value_or_nan(Some(-9999.0)).is_nan());
        assert!(f32::NAN.value_or_nan(None).is_nan());
        assert_eq!(1.5_f32.value_or_nan(Some(f32::NAN)), 1.5);
    }
}
