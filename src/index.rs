//! Brute-force nearest neighbor search.
//!
//! Scans every candidate; good enough for layers of a few thousand points and
//! used as the reference behavior for spatial index adapters.

use crate::traits::{Coordinate, DistanceMetric, GeoPoint, NearestNeighbor};

/// Linear scan over the candidates under a distance metric.
///
/// Equidistant candidates resolve to the smallest id so results do not
/// depend on candidate order.
#[derive(Debug, Clone, Default)]
pub struct LinearScanIndex<M> {
    metric: M,
}

impl<M: DistanceMetric> LinearScanIndex<M> {
    pub fn new(metric: M) -> Self {
        Self { metric }
    }
}

impl<P, M> NearestNeighbor<P> for LinearScanIndex<M>
where
    P: GeoPoint,
    P::Id: Ord,
    M: DistanceMetric,
{
    fn nearest(&self, candidates: &[&P], origin: Coordinate) -> Option<P::Id> {
        candidates
            .iter()
            .filter_map(|candidate| {
                let coordinate = candidate.coordinate()?;
                Some((self.metric.distance_meters(origin, coordinate), candidate.id()))
            })
            .filter(|(distance, _)| !distance.is_nan())
            .min_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)))
            .map(|(_, id)| id.clone())
    }
}
