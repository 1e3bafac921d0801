//! Geography: distance, proximity predicates, straight-line movement, hotspots
//! (spec.md §4.2). Pure functions over plain lat/lon points — no routable-network
//! indexing (see DESIGN.md for why the donor's H3 grid is dropped here).

use serde::{Deserialize, Serialize};

use crate::rng::SimRng;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Haversine distance in km, Earth radius 6371 km (spec.md §4.2).
pub fn haversine_km(a: Location, b: Location) -> f64 {
    let (lat1, lon1) = (a.lat.to_radians(), a.lon.to_radians());
    let (lat2, lon2) = (b.lat.to_radians(), b.lon.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().clamp(-1.0, 1.0).asin();
    EARTH_RADIUS_KM * c
}

/// Round a coordinate to `precision` decimal places (spec.md §6 `locationPrecision`):
/// output records carry rounded coordinates, the entity store keeps full precision.
pub fn round_coordinate(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

pub fn is_at_location(a: Location, b: Location) -> bool {
    haversine_km(a, b) < 0.1
}

pub fn is_urban_area(p: Location, city_center: Location, urban_radius_km: f64) -> bool {
    haversine_km(p, city_center) <= urban_radius_km
}

/// True if `a` and `b` are within `near_location_threshold`, adjusted for peak/off-peak
/// traffic and urban density, then slackened by `slack_factor` (spec.md §4.2, §9 — the
/// ×2 multiplier on an already-adjusted threshold is a deliberately preserved quirk,
/// exposed as a config knob rather than "fixed").
#[allow(clippy::too_many_arguments)]
pub fn is_near_location(
    a: Location,
    b: Location,
    near_location_threshold_km: f64,
    is_peak_hour: bool,
    both_urban: bool,
    slack_factor: f64,
) -> bool {
    let adj_factor = if is_peak_hour {
        1.0
    } else {
        1.5
    } * if both_urban { 0.8 } else { 1.0 };
    let threshold = near_location_threshold_km * adj_factor * slack_factor;
    haversine_km(a, b) <= threshold
}

/// Move `move_speed_km` from `from` toward `to` along the straight line between them.
/// Returns `to` exactly if the remaining distance is within `move_speed_km`.
pub fn move_towards(from: Location, to: Location, move_speed_km: f64) -> Location {
    let remaining = haversine_km(from, to);
    if remaining <= move_speed_km || remaining == 0.0 {
        return to;
    }
    let fraction = move_speed_km / remaining;
    Location::new(
        from.lat + (to.lat - from.lat) * fraction,
        from.lon + (to.lon - from.lon) * fraction,
    )
}

#[derive(Debug, Clone, Copy)]
pub struct Hotspot {
    pub location: Location,
    pub weight: f64,
}

/// Fixed weighted reference points used to bias idle-partner drift (spec.md §4.2,
/// GLOSSARY). Derived from the city centre by offsetting in the four ordinal directions
/// plus the centre itself, with decreasing weight by distance ring.
#[derive(Debug, Clone)]
pub struct Hotspots {
    points: Vec<Hotspot>,
}

impl Hotspots {
    pub fn around_city_center(city_center: Location, spread_km: f64) -> Self {
        let deg_per_km = 1.0 / 111.0; // ~111km per degree of latitude, good enough for city scale
        let offsets = [
            (0.0, 0.0, 1.0),
            (1.0, 0.0, 0.7),
            (-1.0, 0.0, 0.7),
            (0.0, 1.0, 0.6),
            (0.0, -1.0, 0.6),
            (0.7, 0.7, 0.5),
            (-0.7, -0.7, 0.5),
        ];
        let points = offsets
            .iter()
            .map(|(dlat, dlon, weight)| Hotspot {
                location: Location::new(
                    city_center.lat + dlat * spread_km * deg_per_km,
                    city_center.lon + dlon * spread_km * deg_per_km,
                ),
                weight: *weight,
            })
            .collect();
        Self { points }
    }

    /// Nearest hotspot by `distance / weight`, with a small jitter applied to the
    /// returned point (spec.md §4.2: "±~0.001° jitter").
    pub fn find_nearest_hotspot(&self, from: Location, rng: &mut SimRng) -> Location {
        let best = self
            .points
            .iter()
            .min_by(|a, b| {
                let score_a = haversine_km(from, a.location) / a.weight;
                let score_b = haversine_km(from, b.location) / b.weight;
                score_a
                    .partial_cmp(&score_b)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|h| h.location)
            .unwrap_or(from);
        Location::new(
            best.lat + rng.uniform(-0.001, 0.001),
            best.lon + rng.uniform(-0.001, 0.001),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        let p = Location::new(40.7128, -74.0060);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn antipodal_distance_is_half_circumference() {
        let p = Location::new(10.0, 20.0);
        let antipode = Location::new(-10.0, 20.0 - 180.0);
        let expected = std::f64::consts::PI * EARTH_RADIUS_KM;
        assert!((haversine_km(p, antipode) - expected).abs() < 1.0);
    }

    #[test]
    fn move_towards_within_speed_lands_exactly() {
        let a = Location::new(0.0, 0.0);
        let b = Location::new(0.001, 0.001);
        let dist = haversine_km(a, b);
        let result = move_towards(a, b, dist + 1.0);
        assert_eq!(result, b);
    }

    #[test]
    fn move_towards_beyond_speed_advances_partway() {
        let a = Location::new(0.0, 0.0);
        let b = Location::new(1.0, 0.0);
        let full = haversine_km(a, b);
        let result = move_towards(a, b, full / 2.0);
        let remaining = haversine_km(result, b);
        assert!((remaining - full / 2.0).abs() < 0.01);
    }

    #[test]
    fn near_location_slack_widens_predicate() {
        let a = Location::new(0.0, 0.0);
        let b = Location::new(0.05, 0.0); // ~5.5km
        assert!(!is_near_location(a, b, 1.0, true, false, 1.0));
        assert!(is_near_location(a, b, 1.0, true, false, 6.0));
    }
}
