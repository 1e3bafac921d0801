//! End-to-end scenarios (spec.md §8). Scenario 1 (empty population) lives with
//! `Simulation` itself in `simulation.rs`; scenario 4 (menu-slot skip) lives with
//! `compose_order` in `composer.rs`, both as inline `#[cfg(test)]` modules alongside
//! the code they exercise. This file covers the scenarios that need a full run.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use foodsim_core::config::SimulationConfig;
use foodsim_core::geography::Location;
use foodsim_core::model::{
    DeliveryPartner, DeliveryPartnerId, MenuItem, MenuItemId, MenuItemType, PartnerStatus,
    PriceTier, Restaurant, RestaurantId, Review, ReviewId, User, UserId, UserSegment,
};
use foodsim_core::reputation;
use foodsim_core::simulation::Simulation;
use foodsim_core::sink::{EventSink, RecordingSink, SinkError};
use foodsim_core::store::EntityStore;

fn base_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.seed = 42;
    config.user_growth_rate = 0.0;
    config.partner_growth_rate = 0.0;
    config.restaurant_growth_rate = 0.0;
    config
}

fn single_user(order_frequency: f64, location: Location) -> User {
    User {
        id: UserId::new(),
        join_date: 0,
        location,
        preferences: vec![],
        dietary_restrictions: vec![],
        order_frequency,
        segment: UserSegment::Frequent,
        behaviour_profile: "habitual".to_string(),
        lifetime_orders: 0,
        lifetime_spend: 0.0,
        last_order_time: None,
        purchase_patterns: HashMap::new(),
    }
}

fn single_restaurant(location: Location) -> (Restaurant, Vec<MenuItem>) {
    let restaurant_id = RestaurantId::new();
    let main = MenuItem {
        id: MenuItemId::new(),
        restaurant_id,
        name: "Burger".to_string(),
        price: 10.0,
        prep_time: 12.0,
        category: "main".to_string(),
        item_type: MenuItemType::MainCourse,
        popularity: 0.8,
        prep_complexity: 0.4,
        ingredients: vec!["beef".to_string()],
        is_discount_eligible: true,
    };
    let drink = MenuItem {
        id: MenuItemId::new(),
        restaurant_id,
        name: "Soda".to_string(),
        price: 2.0,
        prep_time: 1.0,
        category: "drink".to_string(),
        item_type: MenuItemType::Drink,
        popularity: 0.9,
        prep_complexity: 0.1,
        ingredients: vec!["water".to_string()],
        is_discount_eligible: false,
    };
    let item_ids = vec![main.id, drink.id];
    let restaurant = Restaurant {
        id: restaurant_id,
        location,
        cuisines: vec!["American".to_string()],
        rating: 4.2,
        total_ratings: 100,
        capacity_min: 5,
        capacity_max: 50,
        avg_prep_time: 10.0,
        min_prep_time: 5.0,
        pickup_efficiency: 1.0,
        menu_item_ids: item_ids,
        current_orders: vec![],
        price_tier: PriceTier::Standard,
        reputation_metrics: Default::default(),
        reputation_history: vec![],
        is_open: true,
    };
    (restaurant, vec![main, drink])
}

fn single_partner(location: Location) -> DeliveryPartner {
    DeliveryPartner {
        id: DeliveryPartnerId::new(),
        location,
        status: PartnerStatus::Available,
        current_order_id: None,
        speed: 0.5,
        avg_speed: 0.5,
        experience: 0.5,
        rating: 4.5,
        total_ratings: 10,
        last_update_time: 0,
    }
}

/// Scenario 2 (spec.md §8): one frequent user, one restaurant with capacity,
/// one partner within 1 km, seed 42 → at least one complete order lifecycle.
#[test]
fn scenario_2_full_order_lifecycle_completes() {
    let mut config = base_config();
    config.end_date = config.start_date + chrono::Duration::hours(2);
    let center = config.city_center();

    let mut store = EntityStore::new();
    store.insert_user(single_user(24.0, center));
    let (restaurant, items) = single_restaurant(center);
    for item in items {
        store.insert_menu_item(item);
    }
    store.insert_restaurant(restaurant);
    store.insert_partner(single_partner(center));

    let sink = Arc::new(RecordingSink::new());
    let mut sim = Simulation::new(config, store, sink.clone());
    sim.schedule_initial_events();
    sim.run(&AtomicBool::new(false)).unwrap();

    for topic in [
        "order_placed_events",
        "order_preparation_events",
        "order_ready_events",
        "order_pickup_events",
        "order_in_transit_events",
        "order_delivery_events",
    ] {
        assert!(
            !sink.topic(topic).is_empty(),
            "expected at least one `{topic}` record"
        );
    }
}

/// Scenario 3 (spec.md §8): same as scenario 2 but with no delivery partner at all —
/// assignment keeps retrying until the 3-hour stale-order cancellation fires.
#[test]
fn scenario_3_no_partner_retries_then_cancels() {
    let mut config = base_config();
    // Long enough for the hourly `UpdateRestaurantStatus` maintenance tick past the
    // 3-hour staleness mark to actually be dispatched (spec.md §4.13).
    config.end_date = config.start_date + chrono::Duration::hours(5);
    let center = config.city_center();

    let mut store = EntityStore::new();
    store.insert_user(single_user(24.0, center));
    let (restaurant, items) = single_restaurant(center);
    for item in items {
        store.insert_menu_item(item);
    }
    store.insert_restaurant(restaurant);
    // Deliberately no partner.

    let sink = Arc::new(RecordingSink::new());
    let mut sim = Simulation::new(config, store, sink.clone());
    sim.schedule_initial_events();
    sim.run(&AtomicBool::new(false)).unwrap();

    assert!(!sink.topic("order_placed_events").is_empty());
    let assignments = sink.topic("delivery_partner_assignment_events");
    assert!(!assignments.is_empty());
    assert!(
        assignments
            .iter()
            .all(|record| record["assigned"] == false),
        "no partner exists, so every assignment attempt must record `assigned: false`"
    );
    assert!(
        !sink.topic("order_cancellation_events").is_empty(),
        "a stale order with no partner must eventually be force-cancelled"
    );
    assert!(sink.topic("order_delivery_events").is_empty());
}

/// Scenario 5 (spec.md §8): 100 low-rating reviews for one restaurant within 6 hours
/// → review-bombing detection flags at least 5 of them.
#[test]
fn scenario_5_review_bombing_is_flagged() {
    let mut store = EntityStore::new();
    let (restaurant, items) = single_restaurant(Location::new(0.0, 0.0));
    let restaurant_id = restaurant.id;
    for item in items {
        store.insert_menu_item(item);
    }
    store.insert_restaurant(restaurant);

    for i in 0..100 {
        let review = Review {
            id: ReviewId::new(),
            order_id: foodsim_core::model::OrderId::new(),
            customer_id: UserId::new(),
            restaurant_id,
            delivery_partner_id: None,
            food_rating: 1.5,
            delivery_rating: 1.5,
            overall_rating: 1.5,
            comment: "terrible".to_string(),
            created_at: i * 3, // spread 100 reviews across 300 minutes (5 hours)
            is_ignored: false,
        };
        store.insert_review(review);
    }

    let refs: Vec<&Review> = store.reviews_for_restaurant(restaurant_id);
    let flagged = reputation::detect_suspicious_reviews(&store, &refs);
    assert!(
        flagged.len() >= 5,
        "expected at least 5 reviews flagged by review-bombing detection, got {}",
        flagged.len()
    );
}

struct FlushTrackingSink {
    inner: RecordingSink,
    flushed: std::sync::atomic::AtomicBool,
}

impl EventSink for FlushTrackingSink {
    fn write(&self, topic: &str, payload: &serde_json::Value) -> Result<(), SinkError> {
        self.inner.write(topic, payload)
    }
    fn flush(&self) -> Result<(), SinkError> {
        self.flushed.store(true, std::sync::atomic::Ordering::SeqCst);
        self.inner.flush()
    }
}

/// Scenario 6 (spec.md §8): `continuous = true`, external cancel signal → the loop
/// returns within a bounded drain window and the sink is flushed.
#[test]
fn scenario_6_continuous_mode_stops_on_cancel_and_flushes() {
    let mut config = base_config();
    config.continuous = true;
    let center = config.city_center();

    let mut store = EntityStore::new();
    store.insert_user(single_user(24.0, center));
    let (restaurant, items) = single_restaurant(center);
    for item in items {
        store.insert_menu_item(item);
    }
    store.insert_restaurant(restaurant);
    store.insert_partner(single_partner(center));

    let sink = Arc::new(FlushTrackingSink {
        inner: RecordingSink::new(),
        flushed: std::sync::atomic::AtomicBool::new(false),
    });
    let mut sim = Simulation::new(config, store, sink.clone());
    sim.schedule_initial_events();

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_for_timer = cancel.clone();
    let timer = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(50));
        cancel_for_timer.store(true, std::sync::atomic::Ordering::SeqCst);
    });

    let result = sim.run(&cancel);
    timer.join().unwrap();

    assert!(matches!(result, Err(foodsim_core::error::SimError::Cancelled)));
    assert!(sink.flushed.load(std::sync::atomic::Ordering::SeqCst));
}
