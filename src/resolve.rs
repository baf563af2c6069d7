//! Reading coordinates and attributes off collaborator points.

use crate::error::{PlannerError, Stage};
use crate::traits::{Coordinate, GeoPoint};

/// Resolve a point's coordinate, failing if it is missing or not finite.
pub fn resolve_coordinate<P: GeoPoint>(point: &P, stage: Stage) -> Result<Coordinate, PlannerError> {
    match point.coordinate() {
        Some((a, b)) if a.is_finite() && b.is_finite() => Ok((a, b)),
        _ => Err(PlannerError::InvalidCoordinate {
            point: format!("{:?}", point.id()),
            stage,
        }),
    }
}

/// Which attribute values a stage accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttributeDomain {
    Finite,
    NonNegative,
}

/// Resolve a named numeric attribute.
pub(crate) fn resolve_attribute<P: GeoPoint>(
    point: &P,
    name: &str,
    domain: AttributeDomain,
    stage: Stage,
) -> Result<f64, PlannerError> {
    let invalid = |reason| PlannerError::InvalidAttribute {
        point: format!("{:?}", point.id()),
        attribute: name.to_string(),
        stage,
        reason,
    };

    let value = point.attribute(name).ok_or_else(|| invalid("is missing or not numeric"))?;
    if !value.is_finite() {
        return Err(invalid("is not finite"));
    }
    if domain == AttributeDomain::NonNegative && value < 0.0 {
        return Err(invalid("is negative"));
    }
    Ok(value)
}
