//! Partner Assignment & Routing (spec.md §4.9): finding and reserving an available
//! delivery partner, driving their location toward pickup then delivery, and the
//! speed model that governs how fast they move.

use chrono::{DateTime, Timelike, Utc};

use crate::clock::SimTime;
use crate::config::SimulationConfig;
use crate::demand::{is_peak_hour, is_weekend};
use crate::geography::{haversine_km, is_near_location, is_urban_area, move_towards, Location};
use crate::model::{DeliveryPartner, DeliveryPartnerId, PartnerStatus};
use crate::rng::SimRng;
use crate::store::EntityStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryCluster {
    UrbanCore,
    UrbanResidential,
    Suburban,
}

/// Cluster membership by distance from the city centre (spec.md §4.9).
pub fn cluster_for(location: Location, config: &SimulationConfig) -> DeliveryCluster {
    let distance = haversine_km(location, config.city_center());
    if distance <= config.urban_radius_km * 0.3 {
        DeliveryCluster::UrbanCore
    } else if distance <= config.urban_radius_km {
        DeliveryCluster::UrbanResidential
    } else {
        DeliveryCluster::Suburban
    }
}

fn cluster_bounds(cluster: DeliveryCluster) -> (f64, f64) {
    match cluster {
        DeliveryCluster::UrbanCore => (0.1, 0.4),
        DeliveryCluster::UrbanResidential => (0.15, 0.6),
        DeliveryCluster::Suburban => (0.2, 0.8),
    }
}

fn time_of_day_speed_multiplier(hour: u32) -> f64 {
    if (7..9).contains(&hour) || (16..18).contains(&hour) {
        0.7
    } else if (22..24).contains(&hour) || (0..4).contains(&hour) {
        1.3
    } else {
        1.0
    }
}

/// Adjusted movement speed, km per simulated minute: base speed × cluster, ×
/// time-of-day, × weather, × experience, clamped to the cluster's `[min, max]`
/// (spec.md §4.9).
pub fn adjusted_speed(
    partner: &DeliveryPartner,
    now_dt: DateTime<Utc>,
    bad_weather: bool,
    config: &SimulationConfig,
) -> f64 {
    let cluster = cluster_for(partner.location, config);
    let (min, max) = cluster_bounds(cluster);

    let mut speed = config.partner_move_speed_km * time_of_day_speed_multiplier(now_dt.hour());
    if is_weekend(now_dt) && now_dt.hour() >= 10 && now_dt.hour() < 18 {
        speed *= 0.85;
    }
    if bad_weather {
        speed *= 0.8;
    }
    speed *= 1.0 + 0.2 * partner.experience;

    speed.clamp(min, max)
}

/// `T(a→b) = distance(a,b) / speed`, in minutes.
pub fn estimate_arrival_minutes(from: Location, to: Location, speed_km_per_min: f64) -> f64 {
    if speed_km_per_min <= 0.0 {
        return f64::INFINITY;
    }
    haversine_km(from, to) / speed_km_per_min
}

/// Available partners near `restaurant_location` (spec.md §4.9 "Assign" step 1).
pub fn find_available_partners(
    store: &EntityStore,
    restaurant_location: Location,
    now_dt: DateTime<Utc>,
    config: &SimulationConfig,
) -> Vec<DeliveryPartnerId> {
    let peak = is_peak_hour(now_dt.hour());
    let both_urban = is_urban_area(restaurant_location, config.city_center(), config.urban_radius_km);
    store
        .partners()
        .filter(|p| p.status == PartnerStatus::Available)
        .filter(|p| {
            is_near_location(
                p.location,
                restaurant_location,
                config.near_location_threshold_km,
                peak,
                both_urban && is_urban_area(p.location, config.city_center(), config.urban_radius_km),
                config.near_location_slack_factor,
            )
        })
        .map(|p| p.id)
        .collect()
}

pub struct Assignment {
    pub partner_id: DeliveryPartnerId,
    pub estimated_delivery_time: SimTime,
}

/// Pick uniformly among nearby available partners, reserve them, and compute the
/// order's estimated delivery time: `T(partner→restaurant) + T(restaurant→user) + 5min
/// buffer, jittered ±10%` (spec.md §4.9).
pub fn assign_partner(
    store: &mut EntityStore,
    restaurant_location: Location,
    delivery_location: Location,
    now: SimTime,
    now_dt: DateTime<Utc>,
    config: &SimulationConfig,
    rng: &mut SimRng,
) -> Option<Assignment> {
    let candidates = find_available_partners(store, restaurant_location, now_dt, config);
    let partner_id = *rng.pick_uniform(&candidates)?;

    let partner = store.partner(partner_id)?.clone();
    let speed = adjusted_speed(&partner, now_dt, false, config);
    let to_restaurant = estimate_arrival_minutes(partner.location, restaurant_location, speed);
    let to_customer = estimate_arrival_minutes(restaurant_location, delivery_location, speed);
    let jitter = rng.jitter(0.1);
    let eta_minutes = (to_restaurant + to_customer + 5.0) * jitter;

    if let Some(p) = store.partner_mut(partner_id) {
        p.status = PartnerStatus::EnRouteToPickup;
        p.last_update_time = now;
    }

    Some(Assignment {
        partner_id,
        estimated_delivery_time: now + eta_minutes.round() as SimTime,
    })
}

pub enum MoveOutcome {
    StillEnRoute,
    ArrivedAtRestaurant,
    ArrivedAtCustomer,
    Idle,
}

/// One `MoveDeliveryPartner` tick (spec.md §4.9 "Movement"): advance the partner
/// toward its current destination and report what, if anything, changed.
#[allow(clippy::too_many_arguments)]
pub fn move_partner(
    partner: &mut DeliveryPartner,
    restaurant_location: Option<Location>,
    delivery_location: Option<Location>,
    idle_drift_target: Option<Location>,
    now: SimTime,
    now_dt: DateTime<Utc>,
    config: &SimulationConfig,
) -> MoveOutcome {
    let delta_minutes = (now - partner.last_update_time).max(1) as f64;
    let speed_per_tick = adjusted_speed(partner, now_dt, false, config) * delta_minutes;

    let destination = match partner.status {
        PartnerStatus::EnRouteToPickup => restaurant_location,
        PartnerStatus::EnRouteToDelivery | PartnerStatus::Delivering => delivery_location,
        PartnerStatus::Available => idle_drift_target,
        _ => None,
    };

    let Some(destination) = destination else {
        partner.last_update_time = now;
        return MoveOutcome::Idle;
    };

    let before = partner.location;
    let new_location = move_towards(before, destination, speed_per_tick);
    let travelled = haversine_km(before, new_location);
    partner.speed = travelled / delta_minutes;
    partner.location = new_location;
    partner.last_update_time = now;

    let arrived = new_location == destination;
    if !arrived {
        return MoveOutcome::StillEnRoute;
    }

    match partner.status {
        PartnerStatus::EnRouteToPickup => {
            partner.status = PartnerStatus::WaitingForPickup;
            MoveOutcome::ArrivedAtRestaurant
        }
        PartnerStatus::EnRouteToDelivery | PartnerStatus::Delivering => {
            partner.status = PartnerStatus::Available;
            partner.current_order_id = None;
            MoveOutcome::ArrivedAtCustomer
        }
        _ => MoveOutcome::Idle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_partner(location: Location, status: PartnerStatus) -> DeliveryPartner {
        DeliveryPartner {
            id: DeliveryPartnerId::new(),
            location,
            status,
            current_order_id: None,
            speed: 0.0,
            avg_speed: 0.3,
            experience: 0.5,
            rating: 4.5,
            total_ratings: 5,
            last_update_time: 0,
        }
    }

    #[test]
    fn speed_is_clamped_to_cluster_bounds() {
        let config = SimulationConfig::default();
        let partner = test_partner(config.city_center(), PartnerStatus::Available);
        let now: DateTime<Utc> = "2024-01-01T03:00:00Z".parse().unwrap(); // late night boost
        let speed = adjusted_speed(&partner, now, false, &config);
        let (min, max) = cluster_bounds(cluster_for(partner.location, &config));
        assert!(speed >= min && speed <= max);
    }

    #[test]
    fn bad_weather_reduces_speed() {
        let config = SimulationConfig::default();
        let partner = test_partner(config.city_center(), PartnerStatus::Available);
        let now: DateTime<Utc> = "2024-01-01T12:00:00Z".parse().unwrap();
        let clear = adjusted_speed(&partner, now, false, &config);
        let rainy = adjusted_speed(&partner, now, true, &config);
        assert!(rainy <= clear);
    }

    #[test]
    fn move_partner_arrives_and_flips_status() {
        let config = SimulationConfig::default();
        let dest = Location::new(
            config.city_center().lat + 0.0001,
            config.city_center().lon,
        );
        let mut partner = test_partner(config.city_center(), PartnerStatus::EnRouteToPickup);
        let now_dt: DateTime<Utc> = "2024-01-01T12:00:00Z".parse().unwrap();
        let outcome = move_partner(&mut partner, Some(dest), None, None, 5, now_dt, &config);
        assert!(matches!(outcome, MoveOutcome::ArrivedAtRestaurant));
        assert_eq!(partner.status, PartnerStatus::WaitingForPickup);
    }
}
