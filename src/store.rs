use geo_types::{Coord, LineString};
use std::collections::HashMap;

use crate::error::{EngineError, Result};
use crate::noding::IntersectionResult;
use crate::shape::Shape;

/// One input line plus the crossing points discovered for it.
#[derive(Clone, Debug)]
pub struct GeometryRecord {
    key: String,
    shape: Option<Shape>,
    crossing_points: Vec<Coord<f64>>,
}

impl GeometryRecord {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn shape(&self) -> Option<&Shape> {
        self.shape.as_ref()
    }

    /// Points in order of arrival. Both sides of a crossing get their own copy.
    pub fn crossing_points(&self) -> &[Coord<f64>] {
        &self.crossing_points
    }
}

/// Keyed collection of input geometries.
///
/// Iteration order is insertion order and doubles as the canonical index-to-key mapping.
/// Crossing points only ever grow.
#[derive(Clone, Debug, Default)]
pub struct GeometryStore {
    records: Vec<GeometryRecord>,
    by_key: HashMap<String, usize>,
}

impl GeometryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            by_key: HashMap::with_capacity(capacity),
        }
    }

    /// Builds a store from `(key, shape)` pairs, failing on the first repeated key.
    pub fn try_from_iter<K, I>(items: I) -> Result<Self>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Option<Shape>)>,
    {
        let items = items.into_iter();
        let mut store = Self::with_capacity(items.size_hint().0);
        for (key, shape) in items {
            store.insert(key, shape)?;
        }
        Ok(store)
    }

    /// Adds a geometry. A `None` shape is kept as a record but never indexed.
    pub fn insert(&mut self, key: impl Into<String>, shape: Option<Shape>) -> Result<()> {
        let key = key.into();
        if self.by_key.contains_key(&key) {
            return Err(EngineError::DuplicateKey(key));
        }
        self.by_key.insert(key.clone(), self.records.len());
        self.records.push(GeometryRecord {
            key,
            shape,
            crossing_points: Vec::new(),
        });
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&GeometryRecord> {
        self.by_key.get(key).map(|&idx| &self.records[idx])
    }

    pub fn all_keys(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeometryRecord> {
        self.records.iter()
    }

    /// Record at a position in load order.
    pub fn record(&self, idx: usize) -> Option<&GeometryRecord> {
        self.records.get(idx)
    }

    pub fn append_points(&mut self, key: &str, points: &[Coord<f64>]) -> Result<()> {
        let idx = *self
            .by_key
            .get(key)
            .ok_or_else(|| EngineError::UnknownKey(key.to_string()))?;
        self.records[idx].crossing_points.extend_from_slice(points);
        Ok(())
    }

    /// Records a pair result on both of its geometries.
    ///
    /// Results address records by load-order position. Merging commutes with any other merge.
    pub fn merge_result(&mut self, result: &IntersectionResult) -> Result<()> {
        if result.a >= self.records.len() || result.b >= self.records.len() {
            return Err(EngineError::UnknownKey(format!(
                "record #{} or #{} out of range",
                result.a, result.b
            )));
        }
        self.records[result.a].crossing_points.extend_from_slice(&result.points);
        self.records[result.b].crossing_points.extend_from_slice(&result.points);
        Ok(())
    }

    /// Positions and shapes of every record that can be indexed, in load order.
    ///
    /// Records with no shape, an empty shape or non-finite coordinates are left out and
    /// returned as the second element.
    pub fn indexable(&self) -> (Vec<(usize, &Shape)>, Vec<&str>) {
        let mut valid = Vec::with_capacity(self.records.len());
        let mut skipped = Vec::new();
        for (idx, record) in self.records.iter().enumerate() {
            let checked = match &record.shape {
                Some(shape) => shape.validate().map(|_| shape),
                None => Err(EngineError::InvalidGeometry("shape is null".to_string())),
            };
            match checked {
                Ok(shape) => valid.push((idx, shape)),
                Err(e) => {
                    log::debug!("Skipping {}: {}", record.key, e);
                    skipped.push(record.key.as_str());
                }
            }
        }
        (valid, skipped)
    }

    /// Every record flattened to single-part lines, for the graph-building stage.
    pub fn single_parts(&self) -> Vec<(&str, LineString<f64>)> {
        self.records
            .iter()
            .filter_map(|r| r.shape.as_ref().map(|s| (r.key.as_str(), s)))
            .flat_map(|(key, shape)| shape.flatten().into_iter().map(move |ls| (key, ls)))
            .collect()
    }

    pub fn into_records(self) -> Vec<GeometryRecord> {
        self.records
    }
}
