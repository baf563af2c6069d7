//! gravity-planner core
//!
//! Spatial interaction (Huff model) demand allocation and central place
//! clustering over point sets supplied by a GIS layer.

pub mod traits;
pub mod error;
pub mod progress;
pub mod resolve;
pub mod haversine;
pub mod polyline;
pub mod interaction;
pub mod matrix;
pub mod allocation;
pub mod index;
pub mod central_place;
