//! Vector export hand-off
//!
//! Builds `geo-types` geometries for segments or outlets, with per-feature
//! properties, for an external vector writer.

use crate::network::Segments;
use geo_types::{Coord, Geometry, LineString, Point};
use streamnet_core::vector::{AttributeValue, Feature, FeatureCollection, PropertyTable};
use streamnet_core::{Error, Result};

/// What each exported feature represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    /// One LineString per segment, through pixel centers upstream to downstream
    Segments,
    /// One Point per segment outlet
    Outlets,
    /// One Point per terminal segment outlet
    TerminalOutlets,
}

impl Segments {
    /// Export the network as features.
    ///
    /// Every feature carries an `id` property followed by the columns of
    /// `properties`, which must hold one value per exported feature. `id` is
    /// reserved for the segment ID and cannot be used as a column name.
    pub fn features(&self, kind: FeatureKind, properties: &PropertyTable) -> Result<FeatureCollection> {
        if properties.names().any(|name| name == "id") {
            return Err(Error::InvalidParameter {
                name: "properties",
                value: "id".to_string(),
                reason: "the id property is reserved for segment IDs".to_string(),
            });
        }
        let transform = self.transform;
        let center = |(row, col): (usize, usize)| {
            let (x, y) = transform.pixel_to_geo(col, row);
            Coord { x, y }
        };

        let geometries: Vec<(u32, Geometry<f64>)> = match kind {
            FeatureKind::Segments => self
                .segments
                .iter()
                .map(|s| {
                    let mut coords: Vec<Coord<f64>> = s.pixels.iter().map(|&p| center(p)).collect();
                    // A LineString needs two points
                    if coords.len() == 1 {
                        coords.push(coords[0]);
                    }
                    (s.id, Geometry::LineString(LineString::new(coords)))
                })
                .collect(),
            FeatureKind::Outlets | FeatureKind::TerminalOutlets => {
                let terminal_only = kind == FeatureKind::TerminalOutlets;
                self.outlet_pixels()
                    .into_iter()
                    .zip(&self.segments)
                    .filter(|(_, s)| !terminal_only || s.child == 0)
                    .map(|(outlet, s)| (s.id, Geometry::Point(Point::from(center(outlet)))))
                    .collect()
            }
        };

        properties.validate(geometries.len())?;

        let mut collection = FeatureCollection::new();
        for (index, (id, geometry)) in geometries.into_iter().enumerate() {
            let mut feature = Feature::new(geometry);
            feature.id = Some(id.to_string());
            feature.set_property("id", AttributeValue::Int(i64::from(id)));
            for (name, value) in properties.row(index) {
                feature.set_property(name, value);
            }
            collection.push(feature);
        }
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::NetworkParams;
    use approx::assert_relative_eq;
    use streamnet_core::vector::PropertyColumn;
    use streamnet_core::{GeoTransform, Raster};

    fn column_network() -> Segments {
        let mut flow: Raster<u8> = Raster::filled(3, 1, 7);
        flow.set_transform(GeoTransform::new(100.0, 30.0, 10.0, -10.0));
        let mask: Raster<u8> = Raster::filled(3, 1, 1);
        Segments::new(&flow, &mask, &NetworkParams::default()).unwrap()
    }

    #[test]
    fn test_segment_linestrings() {
        let network = column_network();
        let features = network.features(FeatureKind::Segments, &PropertyTable::new()).unwrap();
        assert_eq!(features.len(), 1);
        let feature = &features.features[0];
        assert_eq!(feature.get_property("id"), Some(&AttributeValue::Int(1)));
        match &feature.geometry {
            Some(Geometry::LineString(line)) => {
                assert_eq!(line.0.len(), 3);
                assert_relative_eq!(line.0[0].x, 105.0);
                assert_relative_eq!(line.0[0].y, 25.0);
                assert_relative_eq!(line.0[2].y, 5.0);
            }
            other => panic!("expected a LineString, got {:?}", other),
        }
    }

    #[test]
    fn test_outlet_points_with_properties() {
        let network = column_network();
        let table = PropertyTable::new().with("area_km2", PropertyColumn::Float(vec![0.5]));
        let features = network.features(FeatureKind::TerminalOutlets, &table).unwrap();
        let feature = &features.features[0];
        assert_eq!(feature.get_property("area_km2"), Some(&AttributeValue::Float(0.5)));
        match &feature.geometry {
            Some(Geometry::Point(p)) => {
                assert_relative_eq!(p.x(), 105.0);
                assert_relative_eq!(p.y(), 5.0);
            }
            other => panic!("expected a Point, got {:?}", other),
        }
    }

    #[test]
    fn test_property_length_checked() {
        let network = column_network();
        let table = PropertyTable::new().with("flag", PropertyColumn::Bool(vec![true, false]));
        let err = network.features(FeatureKind::Outlets, &table).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "properties", .. }));
    }

    #[test]
    fn test_id_column_is_reserved() {
        let network = column_network();
        let table = PropertyTable::new().with("id", PropertyColumn::Int(vec![99]));
        let err = network.features(FeatureKind::Segments, &table).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "properties", ref value, .. } if value == "id"));
    }
}
