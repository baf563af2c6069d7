//! Test fixtures for gravity-planner.
//!
//! Provides:
//! - Real Irish town locations with approximate census populations
//! - A builder-style test point implementing `GeoPoint`
//! - Optional log capture through `tracing-subscriber`

#![allow(dead_code)]

pub mod irish_towns;

pub use irish_towns::*;

use std::collections::HashMap;

use gravity_planner::traits::{Coordinate, GeoPoint};
use tracing_subscriber::EnvFilter;

/// Builder for test points with sensible defaults.
#[derive(Clone, Debug)]
pub struct TestPoint {
    id: String,
    coordinate: Option<Coordinate>,
    attributes: HashMap<String, f64>,
}

impl TestPoint {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            coordinate: Some((0.0, 0.0)),
            attributes: HashMap::new(),
        }
    }

    pub fn at(mut self, lat: f64, lng: f64) -> Self {
        self.coordinate = Some((lat, lng));
        self
    }

    pub fn without_coordinate(mut self) -> Self {
        self.coordinate = None;
        self
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.attributes.insert(name.to_string(), value);
        self
    }

    pub fn population(self, value: f64) -> Self {
        self.with("population", value)
    }

    pub fn attractiveness(self, value: f64) -> Self {
        self.with("attractiveness", value)
    }
}

impl GeoPoint for TestPoint {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn coordinate(&self) -> Option<Coordinate> {
        self.coordinate
    }

    fn attribute(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).copied()
    }
}

/// Town fixtures as test points carrying a `population` attribute.
pub fn town_points(towns: &[Town]) -> Vec<TestPoint> {
    towns
        .iter()
        .map(|town| TestPoint::new(town.name).at(town.lat, town.lng).population(town.population))
        .collect()
}

/// Send planner logs to the test harness. Set `RUST_LOG=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
