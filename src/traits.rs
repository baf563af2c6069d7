//! Core domain traits for the allocation planner.
//!
//! These are intentionally minimal and schema-agnostic. The GIS layer that
//! owns the points should implement them for its own feature types.

use std::fmt::Debug;
use std::hash::Hash;

/// A coordinate pair: (lat, lng) in degrees, or (y, x) in meters for planar data.
pub type Coordinate = (f64, f64);

/// Unique identifier for planner entities.
pub trait Id: Clone + Eq + Hash + Debug + Send + Sync {}

impl<T> Id for T where T: Clone + Eq + Hash + Debug + Send + Sync {}

/// A point supplied by the GIS layer.
///
/// The same type may act as a demand point, a supply point, or a settlement
/// in the central place model, depending on which collection it is passed in.
pub trait GeoPoint: Sync {
    type Id: Id;

    fn id(&self) -> &Self::Id;

    /// Location of the point, or `None` if the geometry cannot be reduced to
    /// a single coordinate pair.
    fn coordinate(&self) -> Option<Coordinate>;

    /// Numeric attribute by field name.
    ///
    /// Returns `None` when the field is missing or its value is not numeric.
    fn attribute(&self, name: &str) -> Option<f64>;
}

/// Distance between two coordinates in meters.
pub trait DistanceMetric: Send + Sync {
    fn distance_meters(&self, from: Coordinate, to: Coordinate) -> f64;
}

/// Finds the nearest of a candidate set to an origin.
///
/// Implemented by a spatial index outside the core. The returned id must
/// belong to one of `candidates`.
pub trait NearestNeighbor<P: GeoPoint>: Sync {
    fn nearest(&self, candidates: &[&P], origin: Coordinate) -> Option<P::Id>;
}
