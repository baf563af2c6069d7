//! Central place resolver tests
//!
//! Center selection, attachment, forest invariants, cluster partition,
//! collaborator contract violations and cancellation.

mod fixtures;

use std::collections::HashSet;

use parking_lot::Mutex;

use fixtures::{TestPoint, all_towns, init_tracing, town_points};
use gravity_planner::central_place::{
    CentralPlaceOptions, CentralPlaces, extract_clusters, resolve_forest, run,
};
use gravity_planner::error::{PlannerError, Stage};
use gravity_planner::haversine::{Haversine, Planar};
use gravity_planner::index::LinearScanIndex;
use gravity_planner::progress::{CancellationToken, NoProgress, RunOutcome};
use gravity_planner::traits::{Coordinate, GeoPoint, NearestNeighbor};

fn options(multiplier: f64, critical_size: f64) -> CentralPlaceOptions {
    CentralPlaceOptions {
        multiplier,
        critical_size,
        ..Default::default()
    }
}

fn completed<T>(outcome: Result<RunOutcome<T>, PlannerError>) -> T {
    match outcome {
        Ok(RunOutcome::Completed(value)) => value,
        Ok(RunOutcome::Cancelled) => panic!("run was cancelled"),
        Err(err) => panic!("run failed: {}", err),
    }
}

fn id(s: &str) -> String {
    s.to_string()
}

fn run_planar(points: &[TestPoint], options: &CentralPlaceOptions) -> CentralPlaces<String> {
    completed(run(
        points,
        &LinearScanIndex::new(Planar),
        options,
        &NoProgress,
        &CancellationToken::new(),
    ))
}

/// Every point lands in exactly one cluster.
fn assert_partition(points: &[TestPoint], places: &CentralPlaces<String>) {
    let mut seen = HashSet::new();
    for cluster in &places.clusters {
        assert_eq!(cluster.members.first(), Some(&cluster.center));
        assert_eq!(cluster.edges.len(), cluster.members.len() - 1);
        for member in &cluster.members {
            assert!(seen.insert(member.clone()), "{} appears in two clusters", member);
        }
    }
    let expected: HashSet<String> = points.iter().map(|p| p.id().clone()).collect();
    assert_eq!(seen, expected);
}

/// Following parents from any point reaches a root within `len` steps.
fn assert_acyclic(points: &[TestPoint], places: &CentralPlaces<String>) {
    for point in points {
        let depth = places.forest.depth_of(point.id()).expect("point in forest");
        assert!(depth < points.len());
    }
}

// ============================================================================
// Worked example
// ============================================================================

fn abc() -> Vec<TestPoint> {
    vec![
        TestPoint::new("A").at(0.0, 0.0).population(50.0),
        TestPoint::new("B").at(0.0, 10.0).population(10.0),
        TestPoint::new("C").at(0.0, 14.0).population(5.0),
    ]
}

#[test]
fn large_point_is_a_center_and_smaller_points_attach() {
    init_tracing();
    let points = abc();
    let places = run_planar(&points, &options(2.0, 30.0));
    let forest = &places.forest;

    assert!(forest.is_center(&id("A")));
    assert_eq!(forest.parent_of(&id("B")), Some(&id("A")));
    // C's threshold is 10; only A is strictly larger.
    assert_eq!(forest.parent_of(&id("C")), Some(&id("A")));
    assert_eq!(forest.centers().collect::<Vec<_>>(), vec!["A"]);

    assert_eq!(places.clusters.len(), 1);
    assert_eq!(places.clusters[0].center, "A");
    assert_partition(&points, &places);
}

#[test]
fn attaches_to_nearest_qualifying_point_not_largest() {
    let points = vec![
        TestPoint::new("A").at(0.0, 0.0).population(50.0),
        TestPoint::new("B").at(0.0, 10.0).population(12.0),
        TestPoint::new("C").at(0.0, 14.0).population(5.0),
    ];
    let places = run_planar(&points, &options(2.0, 30.0));

    assert_eq!(places.forest.parent_of(&id("C")), Some(&id("B")));
    assert_eq!(places.forest.center_of(&id("C")), Some(&id("A")));
    assert_eq!(places.forest.depth_of(&id("C")), Some(2));

    let cluster = &places.clusters[0];
    assert_eq!(cluster.members, vec!["A", "B", "C"]);
    let edge = cluster.edges.iter().find(|e| e.child == "C").expect("edge from C");
    assert_eq!(edge.parent, "B");
    assert_eq!(edge.geometry.points(), &[(0.0, 14.0), (0.0, 10.0)]);
}

#[test]
fn point_without_larger_neighbor_is_its_own_center() {
    let points = vec![
        TestPoint::new("A").at(0.0, 0.0).population(20.0),
        TestPoint::new("B").at(0.0, 5.0).population(15.0),
    ];
    // Nobody exceeds the critical size, and 15 * 2 > 20 so B has no qualifying neighbor.
    let places = run_planar(&points, &options(2.0, 1_000.0));

    assert!(places.forest.is_center(&id("A")));
    assert!(places.forest.is_center(&id("B")));
    assert_eq!(places.clusters.len(), 2);
    assert!(places.clusters.iter().all(|c| c.edges.is_empty()));
}

#[test]
fn critical_size_threshold_is_strict() {
    let points = vec![
        TestPoint::new("big").at(0.0, 0.0).population(100.0),
        TestPoint::new("edge").at(0.0, 1.0).population(30.0),
    ];
    let places = run_planar(&points, &options(2.0, 30.0));
    assert_eq!(places.forest.parent_of(&id("edge")), Some(&id("big")));
}

#[test]
fn equidistant_candidates_resolve_to_smallest_id() {
    let points = vec![
        TestPoint::new("small").at(0.0, 0.0).population(1.0),
        TestPoint::new("zulu").at(0.0, 5.0).population(100.0),
        TestPoint::new("alpha").at(0.0, -5.0).population(100.0),
    ];
    let places = run_planar(&points, &options(2.0, 1_000.0));
    assert_eq!(places.forest.parent_of(&id("small")), Some(&id("alpha")));
}

// ============================================================================
// Realistic data
// ============================================================================

#[test]
fn irish_towns_form_city_clusters() {
    let points = town_points(&all_towns());
    let places = completed(run(
        &points,
        &LinearScanIndex::new(Haversine),
        &options(2.0, 100_000.0),
        &NoProgress,
        &CancellationToken::new(),
    ));

    let centers: HashSet<&String> = places.forest.centers().collect();
    assert_eq!(centers, HashSet::from([&id("Dublin"), &id("Cork")]));
    assert_partition(&points, &places);
    assert_acyclic(&points, &places);

    assert_eq!(places.forest.center_of(&id("Bray")), Some(&id("Dublin")));
    assert_eq!(places.forest.center_of(&id("Tralee")), Some(&id("Cork")));
}

#[test]
fn every_parent_is_strictly_larger() {
    let points = town_points(&all_towns());
    let options = options(1.0, 500_000.0);
    let places = run_planar(&points, &options);

    for assignment in places.forest.assignments() {
        if assignment.parent == assignment.id {
            continue;
        }
        let size = |name: &String| {
            points
                .iter()
                .find(|p| p.id() == name)
                .and_then(|p| p.attribute("population"))
                .expect("population")
        };
        assert!(size(&assignment.parent) > size(&assignment.id));
    }
    assert_acyclic(&points, &places);
}

#[test]
fn results_are_deterministic() {
    let points = town_points(&all_towns());
    let first = run_planar(&points, &options(2.0, 50_000.0));
    let second = run_planar(&points, &options(2.0, 50_000.0));

    assert_eq!(first.forest.assignments(), second.forest.assignments());
    assert_eq!(first.clusters, second.clusters);
}

#[test]
fn forest_and_clusters_can_run_separately() {
    let points = abc();
    let forest = completed(resolve_forest(
        &points,
        &LinearScanIndex::new(Planar),
        &options(2.0, 30.0),
        &NoProgress,
        &CancellationToken::new(),
    ));
    let clusters = completed(extract_clusters(&forest, &NoProgress, &CancellationToken::new()));

    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].members.len(), 3);
}

#[test]
fn empty_input_yields_empty_forest() {
    let places = run_planar(&[], &CentralPlaceOptions::default());
    assert!(places.forest.is_empty());
    assert!(places.clusters.is_empty());
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn missing_attribute_aborts_resolution() {
    let mut points = abc();
    points.push(TestPoint::new("D").at(0.0, 20.0).with("households", 3.0));

    let result = run(
        &points,
        &LinearScanIndex::new(Planar),
        &options(2.0, 30.0),
        &NoProgress,
        &CancellationToken::new(),
    );

    match result {
        Err(PlannerError::InvalidAttribute { point, attribute, stage, .. }) => {
            assert_eq!(point, "\"D\"");
            assert_eq!(attribute, "population");
            assert_eq!(stage, Stage::PointResolution);
        }
        other => panic!("expected InvalidAttribute, got {:?}", other.map(|o| o.is_cancelled())),
    }
}

#[test]
fn missing_coordinate_aborts_resolution() {
    let mut points = abc();
    points.push(TestPoint::new("D").without_coordinate().population(1.0));

    let result = run(
        &points,
        &LinearScanIndex::new(Planar),
        &options(2.0, 30.0),
        &NoProgress,
        &CancellationToken::new(),
    );
    assert!(matches!(result, Err(PlannerError::InvalidCoordinate { .. })));
}

/// An index that answers with a fixed id regardless of the candidates.
struct FixedAnswer(&'static str);

impl NearestNeighbor<TestPoint> for FixedAnswer {
    fn nearest(&self, _candidates: &[&TestPoint], _origin: Coordinate) -> Option<String> {
        Some(self.0.to_string())
    }
}

#[test]
fn unknown_neighbor_id_is_an_inconsistent_index() {
    let result = run(&abc(), &FixedAnswer("ghost"), &options(2.0, 30.0), &NoProgress, &CancellationToken::new());
    assert!(matches!(
        result,
        Err(PlannerError::InconsistentIndex { ref returned, .. }) if returned == "\"ghost\""
    ));
}

#[test]
fn non_qualifying_neighbor_is_an_inconsistent_index() {
    // C (5) is never a qualifying neighbor for B (10).
    let result = run(&abc(), &FixedAnswer("C"), &options(2.0, 30.0), &NoProgress, &CancellationToken::new());
    assert!(matches!(result, Err(PlannerError::InconsistentIndex { .. })));
}

/// An index that never finds anything.
struct NoAnswer;

impl NearestNeighbor<TestPoint> for NoAnswer {
    fn nearest(&self, _candidates: &[&TestPoint], _origin: Coordinate) -> Option<String> {
        None
    }
}

#[test]
fn empty_neighbor_answer_falls_back_to_center() {
    let places = completed(run(&abc(), &NoAnswer, &options(2.0, 30.0), &NoProgress, &CancellationToken::new()));
    assert_eq!(places.forest.centers().count(), 3);
}

#[test]
fn invalid_multiplier_is_rejected() {
    let result = run(&abc(), &LinearScanIndex::new(Planar), &options(0.9, 30.0), &NoProgress, &CancellationToken::new());
    assert!(matches!(result, Err(PlannerError::InvalidParameter { name: "multiplier", .. })));
}

// ============================================================================
// Progress and cancellation
// ============================================================================

#[test]
fn progress_is_monotonic_and_ends_at_100() {
    let points = town_points(&all_towns());
    let reports = Mutex::new(Vec::new());
    let sink = |p: f64| reports.lock().push(p);

    completed(run(
        &points,
        &LinearScanIndex::new(Haversine),
        &options(2.0, 100_000.0),
        &sink,
        &CancellationToken::new(),
    ));

    let reports = reports.into_inner();
    assert!(reports.windows(2).all(|w| w[0] < w[1]), "not monotonic: {:?}", reports);
    assert_eq!(reports.last(), Some(&100.0));
}

#[test]
fn cancelled_before_start_returns_cancelled() {
    let token = CancellationToken::new();
    token.cancel();

    let outcome = run(&abc(), &LinearScanIndex::new(Planar), &options(2.0, 30.0), &NoProgress, &token)
        .expect("cancellation is not an error");
    assert!(outcome.is_cancelled());

    let forest = resolve_forest(&abc(), &LinearScanIndex::new(Planar), &options(2.0, 30.0), &NoProgress, &token)
        .expect("cancellation is not an error");
    assert!(forest.is_cancelled());
}

#[test]
fn cancelling_during_resolution_discards_the_forest() {
    let token = CancellationToken::new();
    let observer = token.clone();
    let sink = move |_: f64| observer.cancel();

    let points = town_points(&all_towns());
    let outcome = run(&points, &LinearScanIndex::new(Haversine), &options(2.0, 100_000.0), &sink, &token)
        .expect("cancellation is not an error");
    assert!(outcome.is_cancelled());
}

#[test]
fn cluster_extraction_honours_cancellation() {
    let forest = completed(resolve_forest(
        &abc(),
        &LinearScanIndex::new(Planar),
        &options(2.0, 30.0),
        &NoProgress,
        &CancellationToken::new(),
    ));
    let token = CancellationToken::new();
    token.cancel();
    let outcome = extract_clusters(&forest, &NoProgress, &token).expect("cancellation is not an error");
    assert!(outcome.is_cancelled());
}
