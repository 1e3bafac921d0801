//! Restaurant Selection (spec.md §4.6): candidate collection with radius expansion,
//! scoring, and a roulette-wheel pick with top-ranked fallback.

use chrono::{DateTime, Timelike, Utc};

use crate::clock::SimTime;
use crate::config::SimulationConfig;
use crate::geography::haversine_km;
use crate::model::{Restaurant, RestaurantId, User};
use crate::rng::SimRng;
use crate::store::EntityStore;

const MINUTES_PER_DAY: SimTime = 24 * 60;

fn is_breakfast_time(hour: u32) -> bool {
    (6..10).contains(&hour)
}

fn orders_in_last_24h(store: &EntityStore, restaurant_id: RestaurantId, now: SimTime) -> u32 {
    store
        .orders()
        .filter(|o| {
            o.restaurant_id == restaurant_id && now - o.order_placed_at <= MINUTES_PER_DAY
        })
        .count() as u32
}

/// `score = rating + 1.0 per matching cuisine + 5/(1+distance) + 2 if
/// breakfastTime∧cuisine="Breakfast" + 0.1 × orders placed at this restaurant in the
/// last 24h` (spec.md §4.6).
pub fn score_restaurant(
    restaurant: &Restaurant,
    user: &User,
    now: SimTime,
    now_dt: DateTime<Utc>,
    store: &EntityStore,
) -> f64 {
    let distance = haversine_km(user.location, restaurant.location);
    let cuisine_matches = restaurant
        .cuisines
        .iter()
        .filter(|c| user.preferences.iter().any(|p| p == *c))
        .count() as f64;

    let mut score = restaurant.rating + cuisine_matches + 5.0 / (1.0 + distance);
    if is_breakfast_time(now_dt.hour()) && restaurant.cuisines.iter().any(|c| c == "Breakfast") {
        score += 2.0;
    }
    score += 0.1 * orders_in_last_24h(store, restaurant.id, now) as f64;
    score
}

/// Restaurants within `radius_km` of `user.location`.
fn candidates_within(store: &EntityStore, user: &User, radius_km: f64) -> Vec<RestaurantId> {
    store
        .restaurants()
        .filter(|r| haversine_km(user.location, r.location) <= radius_km)
        .map(|r| r.id)
        .collect()
}

/// Collect candidate restaurants for `user`: 5km, then 10km, then uniform-random over
/// the whole market (spec.md §4.6 step 1).
pub fn collect_candidates(store: &EntityStore, user: &User, rng: &mut SimRng) -> Vec<RestaurantId> {
    let within_5km = candidates_within(store, user, 5.0);
    eprintln!("DEBUG within_5km={:?} user_loc={:?}", within_5km, user.location);
    if !within_5km.is_empty() {
        return within_5km;
    }
    let within_10km = candidates_within(store, user, 10.0);
    if !within_10km.is_empty() {
        return within_10km;
    }
    let all: Vec<RestaurantId> = store.restaurant_ids();
    match rng.pick_uniform(&all) {
        Some(id) => vec![*id],
        None => Vec::new(),
    }
}

/// Full selection pipeline: collect, score, roulette-wheel pick (spec.md §4.6).
pub fn select_restaurant(
    store: &EntityStore,
    user: &User,
    now: SimTime,
    now_dt: DateTime<Utc>,
    rng: &mut SimRng,
    _config: &SimulationConfig,
) -> Option<RestaurantId> {
    let candidates = collect_candidates(store, user, rng);
    let scored: Vec<(RestaurantId, f64)> = candidates
        .into_iter()
        .filter_map(|id| store.restaurant(id))
        .filter(|r| r.is_open)
        .map(|r| (r.id, score_restaurant(r, user, now, now_dt, store)))
        .collect();
    eprintln!("DEBUG candidates_count pre-filter, scored_len={} restaurant_ids={:?}", scored.len(), store.restaurant_ids());

    rng.weighted_pick(&scored, |(_, score)| *score).map(|(id, _)| *id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geography::Location;
    use crate::model::{PriceTier, ReputationMetrics, UserId, UserSegment};
    use std::collections::HashMap;

    fn test_user() -> User {
        User {
            id: UserId::new(),
            join_date: 0,
            location: Location::new(0.0, 0.0),
            preferences: vec!["Italian".to_string()],
            dietary_restrictions: vec![],
            order_frequency: 1.0,
            segment: UserSegment::Regular,
            behaviour_profile: "t".into(),
            lifetime_orders: 0,
            lifetime_spend: 0.0,
            last_order_time: None,
            purchase_patterns: HashMap::new(),
        }
    }

    fn test_restaurant(lat: f64, lon: f64, cuisines: Vec<&str>) -> Restaurant {
        Restaurant {
            id: RestaurantId::new(),
            location: Location::new(lat, lon),
            cuisines: cuisines.into_iter().map(String::from).collect(),
            rating: 4.0,
            total_ratings: 10,
            capacity_min: 5,
            capacity_max: 50,
            avg_prep_time: 20.0,
            min_prep_time: 5.0,
            pickup_efficiency: 1.0,
            menu_item_ids: vec![],
            current_orders: vec![],
            price_tier: PriceTier::Standard,
            reputation_metrics: ReputationMetrics::default(),
            reputation_history: vec![],
            is_open: true,
        }
    }

    #[test]
    fn candidates_expand_radius_on_empty() {
        let mut store = EntityStore::new();
        let user = test_user();
        // Restaurant is 50km away: nothing within 5 or 10km, falls back to uniform.
        store.insert_restaurant(test_restaurant(0.45, 0.0, vec!["Italian"]));
        let mut rng = SimRng::from_seed(1);
        let candidates = collect_candidates(&store, &user, &mut rng);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn matching_cuisine_scores_higher() {
        let user = test_user();
        let store = EntityStore::new();
        let matching = test_restaurant(0.01, 0.0, vec!["Italian"]);
        let non_matching = test_restaurant(0.01, 0.0, vec!["Thai"]);
        let now_dt: DateTime<Utc> = "2024-01-01T12:00:00Z".parse().unwrap();
        let s1 = score_restaurant(&matching, &user, 0, now_dt, &store);
        let s2 = score_restaurant(&non_matching, &user, 0, now_dt, &store);
        assert!(s1 > s2);
    }

    #[test]
    fn selection_falls_back_to_sole_open_restaurant() {
        let mut store = EntityStore::new();
        let user = test_user();
        let r = test_restaurant(0.001, 0.001, vec!["Italian"]);
        let rid = r.id;
        store.insert_restaurant(r);
        let mut rng = SimRng::from_seed(3);
        let now_dt: DateTime<Utc> = "2024-01-01T12:00:00Z".parse().unwrap();
        let picked = select_restaurant(&store, &user, 0, now_dt, &mut rng, &SimulationConfig::default());
        assert_eq!(picked, Some(rid));
    }
}
