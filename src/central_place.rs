//! Central place model.
//!
//! Every point either becomes a center or attaches to the nearest point that
//! is sufficiently larger than itself. The resulting parent pointers form a
//! forest; each tree is one cluster.
//!
//! Decisions use only the raw attribute values, never another point's
//! resolved state, so points are resolved in parallel and the forest is
//! assembled afterwards in one step.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PlannerError, Stage};
use crate::polyline::Polyline;
use crate::progress::{CancellationToken, Halt, ProgressSink, ProgressTracker, RunOutcome, settle};
use crate::resolve::{AttributeDomain, resolve_attribute, resolve_coordinate};
use crate::traits::{Coordinate, GeoPoint, Id, NearestNeighbor};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CentralPlaceOptions {
    /// Size attribute, e.g. population.
    pub attribute: String,
    /// A neighbor qualifies when its size exceeds the point's size times this.
    pub multiplier: f64,
    /// Points larger than this are always centers.
    pub critical_size: f64,
}

impl Default for CentralPlaceOptions {
    fn default() -> Self {
        Self {
            attribute: "population".to_string(),
            multiplier: 2.0,
            critical_size: 10_000.0,
        }
    }
}

impl CentralPlaceOptions {
    pub fn validate(&self) -> Result<(), PlannerError> {
        // A multiplier below 1 would let a point qualify as its own parent
        // candidate and allows two-point cycles.
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(PlannerError::InvalidParameter {
                name: "multiplier",
                reason: format!("must be finite and at least 1, got {}", self.multiplier),
            });
        }
        if self.critical_size.is_nan() {
            return Err(PlannerError::InvalidParameter {
                name: "critical_size",
                reason: "must be a number".to_string(),
            });
        }
        Ok(())
    }
}

/// One point's resolved parent pointer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment<I> {
    pub id: I,
    /// Equal to `id` for a center.
    pub parent: I,
    pub coordinate: Coordinate,
}

/// Parent-pointer forest over the input points, in input order.
///
/// Roots point to themselves. Parent chains strictly increase in size, so
/// there are no other cycles.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentForest<I: Id> {
    assignments: Vec<Assignment<I>>,
    #[serde(skip)]
    parents: Vec<usize>,
    #[serde(skip)]
    index: HashMap<I, usize>,
}

impl<I: Id> AssignmentForest<I> {
    fn from_parents(ids: Vec<I>, coordinates: Vec<Coordinate>, parents: Vec<usize>) -> Self {
        let index = ids.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();
        let assignments = ids
            .iter()
            .zip(&coordinates)
            .zip(&parents)
            .map(|((id, &coordinate), &parent)| Assignment {
                id: id.clone(),
                parent: ids[parent].clone(),
                coordinate,
            })
            .collect();

        Self {
            assignments,
            parents,
            index,
        }
    }

    pub fn empty() -> Self {
        Self::from_parents(Vec::new(), Vec::new(), Vec::new())
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn assignments(&self) -> &[Assignment<I>] {
        &self.assignments
    }

    pub fn parent_of(&self, id: &I) -> Option<&I> {
        self.index.get(id).map(|&i| &self.assignments[i].parent)
    }

    pub fn is_center(&self, id: &I) -> bool {
        self.index.get(id).is_some_and(|&i| self.parents[i] == i)
    }

    /// Roots of the forest, in input order.
    pub fn centers(&self) -> impl Iterator<Item = &I> + '_ {
        self.parents
            .iter()
            .enumerate()
            .filter(|&(i, &parent)| parent == i)
            .map(move |(i, _)| &self.assignments[i].id)
    }

    /// The center a point ultimately attaches to.
    pub fn center_of(&self, id: &I) -> Option<&I> {
        let root = self.root_index(*self.index.get(id)?)?;
        Some(&self.assignments[root].id)
    }

    /// Number of parent links between a point and its center.
    pub fn depth_of(&self, id: &I) -> Option<usize> {
        let mut node = *self.index.get(id)?;
        for depth in 0..=self.parents.len() {
            let parent = self.parents[node];
            if parent == node {
                return Some(depth);
            }
            node = parent;
        }
        None
    }

    fn root_index(&self, mut node: usize) -> Option<usize> {
        for _ in 0..=self.parents.len() {
            let parent = self.parents[node];
            if parent == node {
                return Some(node);
            }
            node = parent;
        }
        None
    }

    /// Parent to children adjacency, built once per extraction.
    fn children(&self) -> Vec<Vec<usize>> {
        let mut children = vec![Vec::new(); self.parents.len()];
        for (child, &parent) in self.parents.iter().enumerate() {
            if parent != child {
                children[parent].push(child);
            }
        }
        children
    }
}

/// Connecting line from a member to its parent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge<I> {
    pub child: I,
    pub parent: I,
    pub geometry: Polyline,
}

/// A center and every point attached to it, directly or transitively.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster<I> {
    pub center: I,
    /// Traversal order, starting with the center.
    pub members: Vec<I>,
    /// One edge per non-center member.
    pub edges: Vec<Edge<I>>,
}

/// Full output of a central place run.
#[derive(Debug, Clone, Serialize)]
pub struct CentralPlaces<I: Id> {
    pub forest: AssignmentForest<I>,
    pub clusters: Vec<Cluster<I>>,
}

/// Resolve parents and extract clusters in one run.
///
/// Progress covers both stages: one unit per resolved point, then one unit
/// per point placed in a cluster.
pub fn run<P, N>(
    points: &[P],
    index: &N,
    options: &CentralPlaceOptions,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<RunOutcome<CentralPlaces<P::Id>>, PlannerError>
where
    P: GeoPoint,
    N: NearestNeighbor<P>,
{
    options.validate()?;
    info!(
        points = points.len(),
        multiplier = options.multiplier,
        critical_size = options.critical_size,
        "starting central place run"
    );

    let tracker = ProgressTracker::new(progress, 2 * points.len());
    let outcome = settle(resolve_stage(points, index, options, &tracker, cancel).and_then(|forest| {
        let clusters = cluster_stage(&forest, &tracker, cancel)?;
        Ok(CentralPlaces { forest, clusters })
    }))?;

    match &outcome {
        RunOutcome::Completed(places) => {
            tracker.finish();
            info!(clusters = places.clusters.len(), "central place run finished");
        }
        RunOutcome::Cancelled => warn!("central place run cancelled"),
    }
    Ok(outcome)
}

/// Resolve every point's parent pointer.
pub fn resolve_forest<P, N>(
    points: &[P],
    index: &N,
    options: &CentralPlaceOptions,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<RunOutcome<AssignmentForest<P::Id>>, PlannerError>
where
    P: GeoPoint,
    N: NearestNeighbor<P>,
{
    options.validate()?;
    let tracker = ProgressTracker::new(progress, points.len());
    let outcome = settle(resolve_stage(points, index, options, &tracker, cancel))?;
    if !outcome.is_cancelled() {
        tracker.finish();
    }
    Ok(outcome)
}

/// Split a resolved forest into one cluster per center.
pub fn extract_clusters<I: Id>(
    forest: &AssignmentForest<I>,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<RunOutcome<Vec<Cluster<I>>>, PlannerError> {
    let tracker = ProgressTracker::new(progress, forest.len());
    let outcome = settle(cluster_stage(forest, &tracker, cancel))?;
    if !outcome.is_cancelled() {
        tracker.finish();
    }
    Ok(outcome)
}

fn resolve_stage<P, N>(
    points: &[P],
    index: &N,
    options: &CentralPlaceOptions,
    tracker: &ProgressTracker<'_>,
    cancel: &CancellationToken,
) -> Result<AssignmentForest<P::Id>, Halt>
where
    P: GeoPoint,
    N: NearestNeighbor<P>,
{
    cancel.checkpoint()?;
    if points.is_empty() {
        return Ok(AssignmentForest::empty());
    }

    let resolved: Vec<(Coordinate, f64)> = points
        .par_iter()
        .map(|point| -> Result<_, Halt> {
            cancel.checkpoint()?;
            let coordinate = resolve_coordinate(point, Stage::PointResolution)?;
            let size = resolve_attribute(point, &options.attribute, AttributeDomain::NonNegative, Stage::PointResolution)?;
            Ok((coordinate, size))
        })
        .collect::<Result<_, Halt>>()?;

    let working_set: HashMap<&P::Id, usize> = points.iter().enumerate().map(|(i, p)| (p.id(), i)).collect();

    // Largest first, so the qualifying candidates for any threshold are a prefix.
    let mut by_size: Vec<usize> = (0..points.len()).collect();
    by_size.sort_by(|&a, &b| resolved[b].1.total_cmp(&resolved[a].1).then(a.cmp(&b)));
    let ranked: Vec<&P> = by_size.iter().map(|&i| &points[i]).collect();

    cancel.checkpoint()?;
    let parents: Vec<usize> = (0..points.len())
        .into_par_iter()
        .map(|i| -> Result<_, Halt> {
            cancel.checkpoint()?;
            let (coordinate, size) = resolved[i];
            let parent = if size > options.critical_size {
                i
            } else {
                let threshold = size * options.multiplier;
                let qualifying = by_size.partition_point(|&j| resolved[j].1 > threshold);
                match index.nearest(&ranked[..qualifying], coordinate) {
                    None => i,
                    Some(returned) => match working_set.get(&returned) {
                        Some(&j) if resolved[j].1 > threshold => j,
                        _ => {
                            return Err(PlannerError::InconsistentIndex {
                                point: format!("{:?}", points[i].id()),
                                returned: format!("{:?}", returned),
                            }
                            .into());
                        }
                    },
                }
            };
            tracker.advance(1);
            Ok(parent)
        })
        .collect::<Result<_, Halt>>()?;

    let centers = parents.iter().enumerate().filter(|&(i, &p)| p == i).count();
    debug!(points = points.len(), centers, "parent pointers resolved");

    cancel.checkpoint()?;
    let ids = points.iter().map(|p| p.id().clone()).collect();
    let coordinates = resolved.into_iter().map(|(coordinate, _)| coordinate).collect();
    Ok(AssignmentForest::from_parents(ids, coordinates, parents))
}

fn cluster_stage<I: Id>(
    forest: &AssignmentForest<I>,
    tracker: &ProgressTracker<'_>,
    cancel: &CancellationToken,
) -> Result<Vec<Cluster<I>>, Halt> {
    cancel.checkpoint()?;
    let children = forest.children();
    let roots: Vec<usize> = (0..forest.len()).filter(|&i| forest.parents[i] == i).collect();

    let clusters: Vec<Cluster<I>> = roots
        .par_iter()
        .map(|&root| -> Result<_, Halt> {
            cancel.checkpoint()?;
            let cluster = collect_cluster(forest, &children, root);
            tracker.advance(cluster.members.len());
            Ok(cluster)
        })
        .collect::<Result<_, Halt>>()?;

    debug_assert_eq!(clusters.iter().map(|c| c.members.len()).sum::<usize>(), forest.len());
    cancel.checkpoint()?;
    Ok(clusters)
}

/// Depth-first walk from a root with an explicit stack.
fn collect_cluster<I: Id>(forest: &AssignmentForest<I>, children: &[Vec<usize>], root: usize) -> Cluster<I> {
    let assignments = &forest.assignments;
    let mut members = Vec::new();
    let mut edges = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        let assignment = &assignments[node];
        members.push(assignment.id.clone());
        if node != root {
            let parent = &assignments[forest.parents[node]];
            edges.push(Edge {
                child: assignment.id.clone(),
                parent: parent.id.clone(),
                geometry: Polyline::segment(assignment.coordinate, parent.coordinate),
            });
        }
        // Reversed so children come off the stack in input order.
        stack.extend(children[node].iter().rev());
    }

    Cluster {
        center: assignments[root].id.clone(),
        members,
        edges,
    }
}
