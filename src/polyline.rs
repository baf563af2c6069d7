//! Line geometry for connecting edges and demand-to-supply links.
//!
//! The core only produces decoded coordinate sequences; turning them into
//! layer features happens in the rendering collaborator.

use serde::{Deserialize, Serialize};

use crate::traits::{Coordinate, DistanceMetric};

/// A polyline as a sequence of coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<Coordinate>,
}

impl Polyline {
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self { points }
    }

    /// A two-point segment from `from` to `to`.
    pub fn segment(from: Coordinate, to: Coordinate) -> Self {
        Self { points: vec![from, to] }
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn start(&self) -> Option<Coordinate> {
        self.points.first().copied()
    }

    pub fn end(&self) -> Option<Coordinate> {
        self.points.last().copied()
    }

    /// Total length in meters under the given metric.
    pub fn length_meters<M: DistanceMetric>(&self, metric: &M) -> f64 {
        self.points
            .windows(2)
            .map(|pair| metric.distance_meters(pair[0], pair[1]))
            .sum()
    }

    pub fn into_points(self) -> Vec<Coordinate> {
        self.points
    }
}
