//! Demand allocation engine.
//!
//! Runs the Huff model over every (demand, supply) pair in three stages:
//! supply resolution, distance precomputation, and the probability pass.
//! Each stage finishes before the next starts. Workers return plain values
//! and only this module's calling thread assembles the matrix.

use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{PlannerError, Stage};
use crate::interaction::HuffModel;
use crate::matrix::{AllocationMatrix, AllocationRow};
use crate::progress::{CancellationToken, Halt, ProgressSink, ProgressTracker, RunOutcome, settle};
use crate::resolve::{AttributeDomain, resolve_attribute, resolve_coordinate};
use crate::traits::{Coordinate, DistanceMetric, GeoPoint};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AllocationOptions {
    /// Demand attribute distributed over the supply points.
    pub demand_attribute: String,
    /// Supply attractiveness attribute.
    pub supply_attribute: String,
    /// Attractiveness exponent.
    pub alpha: f64,
    /// Distance-decay exponent.
    pub beta: f64,
    /// Supply points farther than this are ignored for a demand point.
    pub max_distance_meters: f64,
}

impl Default for AllocationOptions {
    fn default() -> Self {
        Self {
            demand_attribute: "population".to_string(),
            supply_attribute: "attractiveness".to_string(),
            alpha: 1.0,
            beta: 2.0,
            max_distance_meters: f64::INFINITY,
        }
    }
}

impl AllocationOptions {
    pub fn validate(&self) -> Result<(), PlannerError> {
        check_exponent("alpha", self.alpha)?;
        check_exponent("beta", self.beta)?;
        if self.max_distance_meters.is_nan() || self.max_distance_meters < 0.0 {
            return Err(PlannerError::InvalidParameter {
                name: "max_distance_meters",
                reason: format!("must be a non-negative distance, got {}", self.max_distance_meters),
            });
        }
        Ok(())
    }
}

fn check_exponent(name: &'static str, value: f64) -> Result<(), PlannerError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PlannerError::InvalidParameter {
            name,
            reason: format!("must be finite and non-negative, got {}", value),
        })
    }
}

/// A demand point after coordinates and attributes have been read.
struct DemandRow {
    coordinate: Coordinate,
    demand: f64,
    /// Distance to each supply point, `None` when beyond the cutoff.
    distances: Vec<Option<f64>>,
}

/// Allocate every demand point over the supply points.
///
/// Returns `RunOutcome::Cancelled` if `cancel` is set before the matrix is
/// complete. Any invalid coordinate or attribute fails the whole run.
pub fn allocate<D, S, M>(
    demand_points: &[D],
    supply_points: &[S],
    metric: &M,
    options: &AllocationOptions,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<RunOutcome<AllocationMatrix<D::Id, S::Id>>, PlannerError>
where
    D: GeoPoint,
    S: GeoPoint,
    M: DistanceMetric,
{
    options.validate()?;

    info!(
        demand = demand_points.len(),
        supply = supply_points.len(),
        alpha = options.alpha,
        beta = options.beta,
        max_distance_meters = options.max_distance_meters,
        "starting allocation"
    );

    let tracker = ProgressTracker::new(progress, supply_points.len() + 2 * demand_points.len());
    let outcome = settle(run_stages(demand_points, supply_points, metric, options, &tracker, cancel))?;

    match &outcome {
        RunOutcome::Completed(matrix) => {
            tracker.finish();
            info!(rows = matrix.len(), "allocation finished");
        }
        RunOutcome::Cancelled => warn!("allocation cancelled"),
    }
    Ok(outcome)
}

fn run_stages<D, S, M>(
    demand_points: &[D],
    supply_points: &[S],
    metric: &M,
    options: &AllocationOptions,
    tracker: &ProgressTracker<'_>,
    cancel: &CancellationToken,
) -> Result<AllocationMatrix<D::Id, S::Id>, Halt>
where
    D: GeoPoint,
    S: GeoPoint,
    M: DistanceMetric,
{
    cancel.checkpoint()?;
    if demand_points.is_empty() || supply_points.is_empty() {
        debug!("empty input, returning empty matrix");
        return Ok(AllocationMatrix::empty());
    }

    let supply: Vec<(Coordinate, f64)> = supply_points
        .par_iter()
        .map(|point| -> Result<_, Halt> {
            cancel.checkpoint()?;
            let coordinate = resolve_coordinate(point, Stage::SupplyResolution)?;
            let attractiveness = resolve_attribute(
                point,
                &options.supply_attribute,
                AttributeDomain::NonNegative,
                Stage::SupplyResolution,
            )?;
            tracker.advance(1);
            Ok((coordinate, attractiveness))
        })
        .collect::<Result<_, Halt>>()?;
    debug!(supply = supply.len(), "supply points resolved");

    cancel.checkpoint()?;
    let rows: Vec<DemandRow> = demand_points
        .par_iter()
        .map(|point| -> Result<_, Halt> {
            cancel.checkpoint()?;
            let coordinate = resolve_coordinate(point, Stage::DemandResolution)?;
            let demand = resolve_attribute(
                point,
                &options.demand_attribute,
                AttributeDomain::Finite,
                Stage::DemandResolution,
            )?;
            let distances = supply
                .iter()
                .map(|&(supply_coordinate, _)| {
                    let distance = metric.distance_meters(coordinate, supply_coordinate);
                    (distance <= options.max_distance_meters).then_some(distance)
                })
                .collect();
            tracker.advance(1);
            Ok(DemandRow {
                coordinate,
                demand,
                distances,
            })
        })
        .collect::<Result<_, Halt>>()?;
    debug!(rows = rows.len(), "distances precomputed");

    cancel.checkpoint()?;
    let model = HuffModel::new(options.alpha, options.beta);
    let probabilities: Vec<Vec<f64>> = rows
        .par_iter()
        .map(|row| -> Result<_, Halt> {
            cancel.checkpoint()?;
            let candidates: Vec<(f64, Option<f64>)> = supply
                .iter()
                .zip(&row.distances)
                .map(|(&(_, attractiveness), &distance)| (attractiveness, distance))
                .collect();
            let probs = model.probabilities(&candidates);
            tracker.advance(1);
            Ok(probs)
        })
        .collect::<Result<_, Halt>>()?;

    cancel.checkpoint()?;
    Ok(assemble(demand_points, supply_points, supply, rows, probabilities))
}

/// Single aggregation step: build rows and accumulate supply weights at full precision.
fn assemble<D, S>(
    demand_points: &[D],
    supply_points: &[S],
    supply: Vec<(Coordinate, f64)>,
    rows: Vec<DemandRow>,
    probabilities: Vec<Vec<f64>>,
) -> AllocationMatrix<D::Id, S::Id>
where
    D: GeoPoint,
    S: GeoPoint,
{
    let mut weights = vec![0.0; supply.len()];
    let mut matrix_rows = Vec::with_capacity(rows.len());

    for ((point, row), probs) in demand_points.iter().zip(rows).zip(probabilities) {
        for (weight, p) in weights.iter_mut().zip(&probs) {
            *weight += p * row.demand;
        }
        let in_range = row.distances.iter().map(Option::is_some).collect();
        matrix_rows.push(AllocationRow::new(point.id().clone(), row.coordinate, probs, in_range));
    }

    let supply_ids = supply_points.iter().map(|point| point.id().clone()).collect();
    let supply_coordinates = supply.into_iter().map(|(coordinate, _)| coordinate).collect();
    AllocationMatrix::new(supply_ids, supply_coordinates, matrix_rows, weights)
}
