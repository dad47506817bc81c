use geo::bounding_rect::BoundingRect;
use geo::Line;
use geo_types::{Coord, Geometry, LineString, MultiLineString};
use rstar::{Envelope, AABB};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// A lineal input shape.
///
/// Closed set of the polyline forms the engine accepts. Anything else (points, polygons)
/// is rejected when converting from a [`Geometry`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Single(LineString<f64>),
    MultiPart(MultiLineString<f64>),
    Collection(Vec<Shape>),
}

impl Shape {
    /// True when no part carries a single coordinate.
    pub fn is_empty(&self) -> bool {
        match self {
            Shape::Single(ls) => ls.0.is_empty(),
            Shape::MultiPart(mls) => mls.0.iter().all(|ls| ls.0.is_empty()),
            Shape::Collection(parts) => parts.iter().all(Shape::is_empty),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.flatten()
            .iter()
            .flat_map(|ls| ls.0.iter())
            .all(|c| c.x.is_finite() && c.y.is_finite())
    }

    /// Flattens nested parts into single-part lines, depth first.
    pub fn flatten(&self) -> Vec<LineString<f64>> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<LineString<f64>>) {
        match self {
            Shape::Single(ls) => out.push(ls.clone()),
            Shape::MultiPart(mls) => out.extend(mls.0.iter().cloned()),
            Shape::Collection(parts) => {
                for part in parts {
                    part.flatten_into(out);
                }
            }
        }
    }

    /// All non-degenerate segments of every part.
    pub fn segments(&self) -> Vec<Line<f64>> {
        self.flatten()
            .iter()
            .flat_map(|ls| ls.lines())
            .filter(|l| l.start != l.end)
            .collect()
    }

    /// The vertex of every part that has coordinates but no non-degenerate segment.
    pub fn isolated_vertices(&self) -> Vec<Coord<f64>> {
        self.flatten()
            .iter()
            .filter(|ls| ls.lines().all(|l| l.start == l.end))
            .filter_map(|ls| ls.0.first().copied())
            .collect()
    }

    /// Bounding box over all parts, or `None` for an empty shape.
    pub fn envelope(&self) -> Option<AABB<[f64; 2]>> {
        self.flatten()
            .iter()
            .filter_map(|ls| ls.bounding_rect())
            .map(|r| AABB::from_corners([r.min().x, r.min().y], [r.max().x, r.max().y]))
            .reduce(|acc, b| acc.merged(&b))
    }

    /// Checks that the shape can take part in indexing.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(EngineError::InvalidGeometry("shape is empty".to_string()));
        }
        if !self.is_finite() {
            return Err(EngineError::InvalidGeometry(
                "shape has non-finite coordinates".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<LineString<f64>> for Shape {
    fn from(ls: LineString<f64>) -> Self {
        Shape::Single(ls)
    }
}

impl From<MultiLineString<f64>> for Shape {
    fn from(mls: MultiLineString<f64>) -> Self {
        Shape::MultiPart(mls)
    }
}

impl From<Line<f64>> for Shape {
    fn from(line: Line<f64>) -> Self {
        Shape::Single(LineString::new(vec![line.start, line.end]))
    }
}

impl TryFrom<Geometry<f64>> for Shape {
    type Error = EngineError;

    fn try_from(geom: Geometry<f64>) -> Result<Self> {
        match geom {
            Geometry::Line(line) => Ok(line.into()),
            Geometry::LineString(ls) => Ok(Shape::Single(ls)),
            Geometry::MultiLineString(mls) => Ok(Shape::MultiPart(mls)),
            // Non-lineal members of a collection carry no line work; drop them.
            Geometry::GeometryCollection(gc) => Ok(Shape::Collection(
                gc.0.into_iter().filter_map(|g| Shape::try_from(g).ok()).collect(),
            )),
            other => Err(EngineError::InvalidGeometry(format!(
                "{} is not lineal",
                geometry_kind(&other)
            ))),
        }
    }
}

fn geometry_kind(geom: &Geometry<f64>) -> &'static str {
    match geom {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
