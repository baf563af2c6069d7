//! Huff interaction model.
//!
//! The interaction volume between a demand point and a supply point is
//! `attractiveness^alpha / distance^beta`; a demand point's probabilities are
//! the volumes normalized over every supply point within the cutoff.

/// Smallest distance used in the denominator. Coincident points would
/// otherwise divide by zero.
pub const MIN_DISTANCE_METERS: f64 = f64::MIN_POSITIVE;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HuffModel {
    /// Attractiveness exponent.
    pub alpha: f64,
    /// Distance-decay exponent.
    pub beta: f64,
}

impl HuffModel {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    /// Interaction volume for one supply point.
    ///
    /// A supply point with no attractiveness contributes nothing, even when it
    /// sits on top of the demand point.
    pub fn numerator(&self, attractiveness: f64, distance_meters: f64) -> f64 {
        let weight = attractiveness.powf(self.alpha);
        if weight == 0.0 || weight.is_nan() {
            return 0.0;
        }
        let distance = distance_meters.max(MIN_DISTANCE_METERS);
        weight / distance.powf(self.beta)
    }

    /// Probabilities for one demand point.
    ///
    /// `candidates` pairs each supply point's attractiveness with its distance,
    /// or `None` when the supply point lies beyond the cutoff. The output has
    /// one entry per candidate; excluded candidates get 0. When no candidate
    /// contributes, every entry is 0.
    pub fn probabilities(&self, candidates: &[(f64, Option<f64>)]) -> Vec<f64> {
        let volumes: Vec<f64> = candidates
            .iter()
            .map(|&(attractiveness, distance)| match distance {
                Some(distance) => self.numerator(attractiveness, distance),
                None => 0.0,
            })
            .collect();

        normalize(volumes)
    }
}

/// Divide every volume by the row total.
///
/// Infinite volumes (a supply point on top of the demand point) take the
/// whole row between them, which is the limit of the formula as distance
/// goes to zero. Finite volumes whose total overflows are scaled by the
/// largest one first.
fn normalize(mut volumes: Vec<f64>) -> Vec<f64> {
    for v in volumes.iter_mut().filter(|v| v.is_nan()) {
        *v = 0.0;
    }

    let infinite = volumes.iter().filter(|v| v.is_infinite()).count();
    if infinite > 0 {
        let share = 1.0 / infinite as f64;
        for v in volumes.iter_mut() {
            *v = if v.is_infinite() { share } else { 0.0 };
        }
        return volumes;
    }

    let mut total: f64 = volumes.iter().sum();
    if total.is_infinite() {
        // Scaled volumes lie in [0, 1], so the new total is at most the row length.
        let largest = volumes.iter().copied().fold(0.0, f64::max);
        for v in volumes.iter_mut() {
            *v /= largest;
        }
        total = volumes.iter().sum();
    }
    if total <= 0.0 {
        volumes.iter_mut().for_each(|v| *v = 0.0);
        return volumes;
    }

    for v in volumes.iter_mut() {
        *v /= total;
    }
    volumes
}

/// Round a probability to 4 decimal digits for storage and export.
pub fn round_probability(probability: f64) -> f64 {
    (probability * 10_000.0).round() / 10_000.0
}
