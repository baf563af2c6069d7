//! Distance metrics.
//!
//! `Haversine` is the great-circle distance used for geographic layers.
//! `Planar` is plain Euclidean distance for layers already projected to meters.

use crate::traits::{Coordinate, DistanceMetric};

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance over (lat, lng) coordinates in degrees.
#[derive(Debug, Clone, Copy, Default)]
pub struct Haversine;

impl Haversine {
    /// Calculate haversine distance between two points in kilometers.
    fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
        let (lat1, lng1) = from;
        let (lat2, lng2) = to;

        let lat1_rad = lat1.to_radians();
        let lat2_rad = lat2.to_radians();
        let delta_lat = (lat2 - lat1).to_radians();
        let delta_lng = (lng2 - lng1).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        // Rounding can push `a` a hair above 1 for antipodal points.
        let c = 2.0 * a.sqrt().min(1.0).asin();

        EARTH_RADIUS_KM * c
    }
}

impl DistanceMetric for Haversine {
    fn distance_meters(&self, from: Coordinate, to: Coordinate) -> f64 {
        Self::haversine_km(from, to) * 1000.0
    }
}

/// Euclidean distance over projected coordinates already expressed in meters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Planar;

impl DistanceMetric for Planar {
    fn distance_meters(&self, from: Coordinate, to: Coordinate) -> f64 {
        (from.0 - to.0).hypot(from.1 - to.1)
    }
}
