//! Vector hand-off types
//!
//! streamnet does not write vector files. It builds geometries and a property
//! table and hands both to an external writer as a [`FeatureCollection`].

use crate::error::{Error, Result};
use geo_types::Geometry;
use serde::{Deserialize, Serialize};

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// One named column of a property table
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyColumn {
    Float(Vec<f64>),
    Int(Vec<i64>),
    Bool(Vec<bool>),
    String(Vec<String>),
}

impl PropertyColumn {
    pub fn len(&self) -> usize {
        match self {
            PropertyColumn::Float(v) => v.len(),
            PropertyColumn::Int(v) => v.len(),
            PropertyColumn::Bool(v) => v.len(),
            PropertyColumn::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn value(&self, index: usize) -> AttributeValue {
        match self {
            PropertyColumn::Float(v) => v.get(index).map_or(AttributeValue::Null, |&x| AttributeValue::Float(x)),
            PropertyColumn::Int(v) => v.get(index).map_or(AttributeValue::Null, |&x| AttributeValue::Int(x)),
            PropertyColumn::Bool(v) => v.get(index).map_or(AttributeValue::Null, |&x| AttributeValue::Bool(x)),
            PropertyColumn::String(v) => v
                .get(index)
                .map_or(AttributeValue::Null, |x| AttributeValue::String(x.clone())),
        }
    }
}

/// Ordered table of named columns, one value per exported feature
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyTable {
    columns: Vec<(String, PropertyColumn)>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a named column
    pub fn insert(&mut self, name: impl Into<String>, column: PropertyColumn) {
        let name = name.into();
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = column,
            None => self.columns.push((name, column)),
        }
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<String>, column: PropertyColumn) -> Self {
        self.insert(name, column);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Check that every column holds exactly `features` values
    pub fn validate(&self, features: usize) -> Result<()> {
        for (name, column) in &self.columns {
            if column.len() != features {
                return Err(Error::InvalidParameter {
                    name: "properties",
                    value: name.clone(),
                    reason: format!("column has {} values but there are {} features", column.len(), features),
                });
            }
        }
        Ok(())
    }

    /// The properties of one feature, in column order
    pub fn row(&self, index: usize) -> Vec<(String, AttributeValue)> {
        self.columns
            .iter()
            .map(|(name, column)| (name.clone(), column.value(index)))
            .collect()
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Option<Geometry<f64>>,
    /// Properties in table column order
    pub properties: Vec<(String, AttributeValue)>,
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: Vec::new(),
            id: None,
        }
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        let key = key.into();
        match self.properties.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.properties.push((key, value)),
        }
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Collection of features
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self { features: Vec::new() }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}
