use geo_crossing_points::input::store_from_geojson_str;
use geo_crossing_points::{
    annotate_crossings, AnnotatorConfig, ChannelProgress, CrossingAnnotator, GeometryStore, ProgressEvent, Shape,
};
use geo_types::{LineString, MultiLineString};
use std::sync::mpsc;

fn line(coords: Vec<(f64, f64)>) -> Option<Shape> {
    Some(Shape::Single(LineString::from(coords)))
}

fn points_of(store: &GeometryStore, key: &str) -> Vec<(f64, f64)> {
    let mut pts: Vec<(f64, f64)> = store
        .get(key)
        .unwrap()
        .crossing_points()
        .iter()
        .map(|c| (c.x, c.y))
        .collect();
    pts.sort_by(|a, b| a.partial_cmp(b).unwrap());
    pts
}

#[test]
fn test_street_network_from_geojson() {
    // A main road, two side streets crossing it, one dead end touching it, one parallel road
    let input = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"full_id": "main"},
         "geometry": {"type": "LineString", "coordinates": [[0, 0], [50, 0], [100, 0]]}},
        {"type": "Feature", "properties": {"full_id": "side-1"},
         "geometry": {"type": "LineString", "coordinates": [[20, -20], [20, 20]]}},
        {"type": "Feature", "properties": {"full_id": "side-2"},
         "geometry": {"type": "LineString", "coordinates": [[80, -20], [80, 20]]}},
        {"type": "Feature", "properties": {"full_id": "dead-end"},
         "geometry": {"type": "LineString", "coordinates": [[50, 0], [50, 30]]}},
        {"type": "Feature", "properties": {"full_id": "service"},
         "geometry": {"type": "LineString", "coordinates": [[0, 40], [100, 40]]}},
        {"type": "Feature", "properties": {"full_id": "missing"}, "geometry": null}
    ]}"#;
    let mut store = store_from_geojson_str(input).unwrap();
    let report = annotate_crossings(&mut store).unwrap();

    assert_eq!(report.indexed, 5);
    assert_eq!(report.skipped, vec!["missing"]);
    assert_eq!(report.crossing_pairs, 3);
    assert_eq!(points_of(&store, "main"), vec![(20.0, 0.0), (50.0, 0.0), (80.0, 0.0)]);
    assert_eq!(points_of(&store, "side-1"), vec![(20.0, 0.0)]);
    assert_eq!(points_of(&store, "dead-end"), vec![(50.0, 0.0)]);
    assert!(points_of(&store, "service").is_empty());
    assert!(points_of(&store, "missing").is_empty());
}

#[test]
fn test_multipart_geometry_collects_points_from_every_part() {
    let mut store = GeometryStore::try_from_iter(vec![
        (
            "pair-of-bridges",
            Some(Shape::MultiPart(MultiLineString::new(vec![
                LineString::from(vec![(1.0, -1.0), (1.0, 1.0)]),
                LineString::from(vec![(3.0, -1.0), (3.0, 1.0)]),
            ]))),
        ),
        ("river", line(vec![(0.0, 0.0), (4.0, 0.0)])),
    ])
    .unwrap();
    annotate_crossings(&mut store).unwrap();

    assert_eq!(points_of(&store, "river"), vec![(1.0, 0.0), (3.0, 0.0)]);
    assert_eq!(points_of(&store, "pair-of-bridges"), vec![(1.0, 0.0), (3.0, 0.0)]);
}

#[test]
fn test_progress_over_a_channel() {
    let mut store = GeometryStore::new();
    for i in 0..30 {
        let t = i as f64;
        store.insert(format!("h{}", i), line(vec![(-1.0, t), (30.0, t)])).unwrap();
        store.insert(format!("v{}", i), line(vec![(t + 0.5, -1.0), (t + 0.5, 30.0)])).unwrap();
    }

    let (tx, rx) = mpsc::channel();
    let annotator = CrossingAnnotator::with_config(AnnotatorConfig::default().with_chunk_size(64));
    let report = annotator.run(&mut store, &mut ChannelProgress(tx)).unwrap();
    assert_eq!(report.crossing_pairs, 900);

    let events: Vec<ProgressEvent> = rx.try_iter().collect();
    assert!(events.windows(2).all(|w| w[0].percent <= w[1].percent));
    assert_eq!(events.last().unwrap().percent, 92);
    assert_eq!(events.last().unwrap().phase, "Merged");
}

#[test]
fn test_annotated_store_hands_off_single_parts() {
    let mut store = GeometryStore::try_from_iter(vec![
        ("a", line(vec![(0.0, 0.0), (10.0, 0.0)])),
        (
            "b",
            Some(Shape::Collection(vec![
                Shape::Single(LineString::from(vec![(5.0, -5.0), (5.0, 5.0)])),
                Shape::Single(LineString::from(vec![(20.0, 0.0), (30.0, 0.0)])),
            ])),
        ),
    ])
    .unwrap();
    annotate_crossings(&mut store).unwrap();

    let parts = store.single_parts();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts.iter().filter(|(k, _)| *k == "b").count(), 2);

    let records = store.into_records();
    assert_eq!(records[1].crossing_points().len(), 1);
}
