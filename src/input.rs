//! Builds a [`GeometryStore`] from GeoJSON.

use geojson::feature::Id;
use geojson::{Feature, GeoJson};
use serde_json::Value as JsonValue;
use std::str::FromStr;

use crate::error::{EngineError, Result};
use crate::shape::Shape;
use crate::store::GeometryStore;

/// Property holding a feature's key. Falls back to the feature id, then to its position.
pub const KEY_PROPERTY: &str = "full_id";

pub fn store_from_geojson_str(input: &str) -> Result<GeometryStore> {
    let geojson = GeoJson::from_str(input)
        .map_err(|e| EngineError::InvalidInput(format!("Failed to parse GeoJSON: {}", e)))?;
    store_from_geojson(geojson)
}

/// Loads every feature in order. Features without a usable lineal geometry are kept with no
/// shape, so they stay addressable but never receive crossing points.
pub fn store_from_geojson(geojson: GeoJson) -> Result<GeometryStore> {
    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: None,
            foreign_members: None,
        }],
    };

    let mut store = GeometryStore::with_capacity(features.len());
    for (position, feature) in features.into_iter().enumerate() {
        let key = feature_key(&feature, position);
        let shape = feature.geometry.and_then(|geometry| {
            let converted = geo_types::Geometry::<f64>::try_from(geometry)
                .map_err(|e| EngineError::InvalidGeometry(e.to_string()))
                .and_then(Shape::try_from);
            match converted {
                Ok(shape) => Some(shape),
                Err(e) => {
                    log::warn!("Feature {}: {}", key, e);
                    None
                }
            }
        });
        store.insert(key, shape)?;
    }
    Ok(store)
}

fn feature_key(feature: &Feature, position: usize) -> String {
    match feature.property(KEY_PROPERTY) {
        Some(JsonValue::String(s)) => return s.clone(),
        Some(JsonValue::Null) | None => {}
        Some(other) => return other.to_string(),
    }
    match &feature.id {
        Some(Id::String(s)) => s.clone(),
        Some(Id::Number(n)) => n.to_string(),
        None => position.to_string(),
    }
}
