use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Coord, Intersects, Line};
use rstar::{RTree, RTreeObject, AABB};
use smallvec::SmallVec;

use crate::error::Result;
use crate::shape::Shape;
use crate::wire;

/// Discrete intersection points of one pair, exact-deduplicated.
pub type CrossingPoints = SmallVec<[Coord<f64>; 4]>;

/// Crossing points found for a pair of records.
///
/// Only produced when the pair meets at one or more discrete points.
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectionResult {
    pub a: usize,
    pub b: usize,
    pub points: CrossingPoints,
}

// Segment wrapper to be indexable by rstar
#[derive(Clone, Copy, Debug)]
struct IndexedLine {
    line: Line<f64>,
}

impl RTreeObject for IndexedLine {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let p1 = self.line.start;
        let p2 = self.line.end;
        AABB::from_corners(
            [p1.x.min(p2.x), p1.y.min(p2.y)],
            [p1.x.max(p2.x), p1.y.max(p2.y)],
        )
    }
}

// Below this many segment pairs a nested loop beats building a tree
const BRUTE_FORCE_LIMIT: usize = 64;

/// Points where `a` and `b` meet.
///
/// Empty when the shapes are disjoint, and also when they share any stretch of line: such
/// pairs are not discrete intersections and are dropped whole.
pub fn evaluate(a: &Shape, b: &Shape) -> CrossingPoints {
    let segs_a = a.segments();
    let segs_b = b.segments();
    let dots_a = a.isolated_vertices();
    let dots_b = b.isolated_vertices();

    let mut points = CrossingPoints::new();
    collect_vertex_hits(&dots_a, &segs_b, &dots_b, &mut points);
    collect_vertex_hits(&dots_b, &segs_a, &[], &mut points);

    let overlapped = if segs_a.is_empty() || segs_b.is_empty() {
        false
    } else if segs_a.len() * segs_b.len() <= BRUTE_FORCE_LIMIT {
        segs_a
            .iter()
            .any(|&sa| segs_b.iter().any(|&sb| collect_intersection(sa, sb, &mut points)))
    } else {
        // Index the longer side, walk the shorter
        let (walk, indexed) = if segs_a.len() <= segs_b.len() {
            (segs_a, segs_b)
        } else {
            (segs_b, segs_a)
        };
        let tree = RTree::bulk_load(indexed.into_iter().map(|line| IndexedLine { line }).collect());
        walk.iter().any(|&sw| {
            let probe = IndexedLine { line: sw }.envelope();
            tree.locate_in_envelope_intersecting(&probe)
                .any(|cand| collect_intersection(sw, cand.line, &mut points))
        })
    };

    if overlapped {
        return CrossingPoints::new();
    }

    sort_and_dedup(&mut points);
    points
}

fn sort_and_dedup(points: &mut CrossingPoints) {
    // -0.0 + 0.0 is 0.0, so coordinates that compare equal also sort next to each other
    for p in points.iter_mut() {
        p.x += 0.0;
        p.y += 0.0;
    }
    points.sort_unstable_by(|p, q| p.x.total_cmp(&q.x).then(p.y.total_cmp(&q.y)));
    points.dedup_by(|p, q| p == q);
}

// Pushes each isolated vertex that lies on one of `segs` or on one of `other_dots`.
fn collect_vertex_hits(
    dots: &[Coord<f64>],
    segs: &[Line<f64>],
    other_dots: &[Coord<f64>],
    acc: &mut CrossingPoints,
) {
    for &dot in dots {
        if other_dots.contains(&dot) || segs.iter().any(|s| s.intersects(&dot)) {
            acc.push(dot);
        }
    }
}

// Pushes the meeting point of two segments, returning true if they overlap along a line.
fn collect_intersection(s1: Line<f64>, s2: Line<f64>, acc: &mut CrossingPoints) -> bool {
    match line_intersection(s1, s2) {
        None => false,
        Some(LineIntersection::SinglePoint { intersection, .. }) => {
            acc.push(intersection);
            false
        }
        Some(LineIntersection::Collinear { intersection }) => {
            if intersection.start == intersection.end {
                acc.push(intersection.start);
                false
            } else {
                true
            }
        }
    }
}

/// Decodes both shapes from their wire form and evaluates them.
pub fn evaluate_wire(a: &[u8], b: &[u8]) -> Result<CrossingPoints> {
    let a = wire::decode(a)?;
    let b = wire::decode(b)?;
    Ok(evaluate(&a, &b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo_types::{LineString, MultiLineString};

    fn line(coords: Vec<(f64, f64)>) -> Shape {
        Shape::Single(LineString::from(coords))
    }

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    #[test]
    fn test_perpendicular_crossing() {
        let pts = evaluate(
            &line(vec![(0.0, 0.0), (10.0, 0.0)]),
            &line(vec![(5.0, -5.0), (5.0, 5.0)]),
        );
        assert_eq!(pts.as_slice(), &[c(5.0, 0.0)]);
    }

    #[test]
    fn test_parallel_lines_do_not_meet() {
        let pts = evaluate(
            &line(vec![(0.0, 0.0), (10.0, 0.0)]),
            &line(vec![(0.0, 1.0), (10.0, 1.0)]),
        );
        assert!(pts.is_empty());
    }

    #[test]
    fn test_collinear_overlap_is_discarded() {
        let pts = evaluate(
            &line(vec![(0.0, 0.0), (10.0, 0.0)]),
            &line(vec![(5.0, 0.0), (15.0, 0.0)]),
        );
        assert!(pts.is_empty());
    }

    #[test]
    fn test_overlap_discards_other_crossings_too() {
        // Shares (0,0)-(2,0) and also crosses at (5,0)
        let a = line(vec![(0.0, 0.0), (10.0, 0.0)]);
        let b = line(vec![(-2.0, 0.0), (2.0, 0.0), (5.0, 3.0), (5.0, -3.0)]);
        assert!(evaluate(&a, &b).is_empty());
    }

    #[test]
    fn test_end_to_end_collinear_touch_is_a_point() {
        let pts = evaluate(
            &line(vec![(0.0, 0.0), (10.0, 0.0)]),
            &line(vec![(10.0, 0.0), (20.0, 0.0)]),
        );
        assert_eq!(pts.as_slice(), &[c(10.0, 0.0)]);
    }

    #[test]
    fn test_t_junction() {
        let pts = evaluate(
            &line(vec![(0.0, 0.0), (10.0, 0.0)]),
            &line(vec![(4.0, 0.0), (4.0, 8.0)]),
        );
        assert_eq!(pts.as_slice(), &[c(4.0, 0.0)]);
    }

    #[test]
    fn test_multiple_crossings_of_a_zigzag() {
        let zigzag = line(vec![(0.0, -1.0), (2.0, 1.0), (4.0, -1.0), (6.0, 1.0)]);
        let axis = line(vec![(-1.0, 0.0), (7.0, 0.0)]);
        let pts = evaluate(&zigzag, &axis);
        assert_eq!(pts.as_slice(), &[c(1.0, 0.0), c(3.0, 0.0), c(5.0, 0.0)]);
    }

    #[test]
    fn test_crossing_at_shared_vertex_reported_once() {
        // The vertex (5,0) of `a` lies on `b`; both adjacent segments of `a` report it
        let a = line(vec![(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]);
        let b = line(vec![(5.0, -5.0), (5.0, 5.0)]);
        let pts = evaluate(&a, &b);
        assert_eq!(pts.as_slice(), &[c(5.0, 0.0)]);
    }

    #[test]
    fn test_diagonal_crossing_value() {
        let pts = evaluate(
            &line(vec![(0.0, 0.0), (3.0, 1.0)]),
            &line(vec![(0.0, 1.0), (3.0, 0.0)]),
        );
        assert_eq!(pts.len(), 1);
        assert_relative_eq!(pts[0].x, 1.5, epsilon = 1e-12);
        assert_relative_eq!(pts[0].y, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_multipart_against_long_polyline_uses_tree() {
        // 20 vertical parts against a 20-segment horizontal polyline: 400 segment pairs
        let parts: Vec<LineString<f64>> = (0..20)
            .map(|i| {
                let x = i as f64 + 0.5;
                LineString::from(vec![(x, -1.0), (x, 1.0)])
            })
            .collect();
        let verticals = Shape::MultiPart(MultiLineString::new(parts));
        let horizontal = line((0..=20).map(|i| (i as f64, 0.0)).collect());

        let pts = evaluate(&verticals, &horizontal);
        assert_eq!(pts.len(), 20);
        assert_eq!(pts[0], c(0.5, 0.0));
        assert_eq!(pts[19], c(19.5, 0.0));
        assert_eq!(evaluate(&horizontal, &verticals), pts);
    }

    #[test]
    fn test_single_vertex_shape_on_a_line() {
        let dot = line(vec![(1.0, 1.0)]);
        let pts = evaluate(&dot, &line(vec![(0.0, 0.0), (2.0, 2.0)]));
        assert_eq!(pts.as_slice(), &[c(1.0, 1.0)]);
        assert!(evaluate(&dot, &line(vec![(0.0, 0.0), (2.0, 0.0)])).is_empty());
    }

    #[test]
    fn test_zero_length_line_touching_a_line() {
        let stub = line(vec![(5.0, 0.0), (5.0, 0.0)]);
        let road = line(vec![(0.0, 0.0), (10.0, 0.0)]);
        assert_eq!(evaluate(&stub, &road).as_slice(), &[c(5.0, 0.0)]);
        assert_eq!(evaluate(&road, &stub).as_slice(), &[c(5.0, 0.0)]);

        let off_road = line(vec![(5.0, 1.0), (5.0, 1.0)]);
        assert!(evaluate(&off_road, &road).is_empty());
    }

    #[test]
    fn test_zero_length_lines_at_same_spot() {
        let a = line(vec![(2.0, 3.0), (2.0, 3.0)]);
        let b = line(vec![(2.0, 3.0)]);
        assert_eq!(evaluate(&a, &b).as_slice(), &[c(2.0, 3.0)]);
        assert!(evaluate(&a, &line(vec![(2.0, 4.0), (2.0, 4.0)])).is_empty());
    }

    #[test]
    fn test_degenerate_part_beside_a_real_part() {
        let shape = Shape::MultiPart(MultiLineString::new(vec![
            LineString::from(vec![(0.0, 5.0), (10.0, 5.0)]),
            LineString::from(vec![(3.0, 0.0), (3.0, 0.0)]),
        ]));
        let road = line(vec![(0.0, 0.0), (10.0, 0.0)]);
        assert_eq!(evaluate(&shape, &road).as_slice(), &[c(3.0, 0.0)]);
    }

    #[test]
    fn test_signed_zeros_dedup_together() {
        let mut pts: CrossingPoints = smallvec::smallvec![c(-0.0, 1.0), c(-0.0, 5.0), c(0.0, 1.0)];
        sort_and_dedup(&mut pts);
        assert_eq!(pts.as_slice(), &[c(0.0, 1.0), c(0.0, 5.0)]);
        assert!(pts.iter().all(|p| p.x.is_sign_positive()));
    }

    #[test]
    fn test_evaluate_wire_rejects_garbage() {
        let good = wire::encode(&line(vec![(0.0, 0.0), (1.0, 1.0)])).unwrap();
        assert!(evaluate_wire(&good, &[0xff, 0x01]).is_err());
        assert!(evaluate_wire(&good, &good).is_ok());
    }
}
