//! The Simulation Loop (spec.md §4.13, C13): owns the clock and the entity store,
//! seeds initial and periodic events, and dispatches every popped event to its
//! handler via an exhaustive `match` — no dynamic type reflection (spec.md §9).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::clock::{EventKind, EventSubject, SimClock, SimTime};
use crate::config::SimulationConfig;
use crate::demand;
use crate::events::{OutputEvent, PartnerLocationPayload, RestaurantStatusPayload, UserBehaviourPayload};
use crate::geography::{self, Hotspots, Location};
use crate::market;
use crate::model::{
    DeliveryPartner, DeliveryPartnerId, MenuItem, PartnerStatus, Restaurant, RestaurantId, User,
    UserId, UserSegment,
};
use crate::orders;
use crate::partners::{self, MoveOutcome};
use crate::reputation;
use crate::rng::SimRng;
use crate::sink::EventSink;
use crate::store::EntityStore;

const HOUR_MINUTES: i64 = 60;
const DAY_MINUTES: i64 = 24 * 60;
const REPUTATION_MIN_REVIEWS: usize = 3;

/// Owns the clock, the entity store, and the shared RNG for a single run. The loop
/// itself (`Simulation::run`) is the only caller of the handler modules.
pub struct Simulation {
    clock: SimClock,
    store: EntityStore,
    rng: SimRng,
    config: SimulationConfig,
    sink: Arc<dyn EventSink>,
    hotspots: Hotspots,
    bad_weather: bool,
}

impl Simulation {
    pub fn new(config: SimulationConfig, store: EntityStore, sink: Arc<dyn EventSink>) -> Self {
        let clock = SimClock::new(config.start_date);
        let hotspots = Hotspots::around_city_center(config.city_center(), config.hotspot_radius_km);
        let rng = SimRng::from_seed(config.seed);
        Self {
            clock,
            store,
            rng,
            config,
            sink,
            hotspots,
            bad_weather: false,
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Enqueue each user's first order and the recurring system ticks (spec.md §4.13).
    pub fn schedule_initial_events(&mut self) {
        let now = self.clock.now();
        let now_dt = self.clock.now_datetime();
        for user_id in self.store.user_ids() {
            if let Some(user) = self.store.user(user_id) {
                let next = demand::generate_next_order_time(user, now, now_dt, &mut self.rng);
                self.clock
                    .enqueue(next, EventKind::PlaceOrder, EventSubject::User(user_id));
            }
        }
        self.clock
            .enqueue(now + HOUR_MINUTES, EventKind::UpdateTraffic, EventSubject::None);
        self.clock
            .enqueue(now + 1, EventKind::MoveDeliveryPartner, EventSubject::None);
        self.clock
            .enqueue(now + 5, EventKind::UpdatePartnerLocation, EventSubject::None);
        self.clock
            .enqueue(now + DAY_MINUTES, EventKind::UpdateUserBehaviour, EventSubject::None);
        self.clock
            .enqueue(now + HOUR_MINUTES, EventKind::UpdateRestaurantStatus, EventSubject::None);
        self.clock
            .enqueue(now + HOUR_MINUTES, EventKind::AddNewUser, EventSubject::None);
        self.clock
            .enqueue(now + HOUR_MINUTES, EventKind::AddNewRestaurant, EventSubject::None);
        self.clock
            .enqueue(now + HOUR_MINUTES, EventKind::AddNewPartner, EventSubject::None);

        for restaurant_id in self.store.restaurant_ids() {
            self.clock
                .enqueue(now + HOUR_MINUTES, EventKind::RestaurantOpenClose, EventSubject::Restaurant(restaurant_id));
        }
        for partner_id in self.store.partner_ids() {
            let shift_end = now + self.rng.uniform_i(4 * HOUR_MINUTES, 8 * HOUR_MINUTES);
            self.clock
                .enqueue(shift_end, EventKind::DeliveryPartnerGoOffline, EventSubject::Partner(partner_id));
        }
    }

    /// Run until the queue drains, `endDate` passes (non-continuous), or `cancel` is
    /// set (continuous mode) (spec.md §4.13, §5 "Cancellation").
    pub fn run(&mut self, cancel: &AtomicBool) -> Result<(), crate::error::SimError> {
        loop {
            if cancel.load(Ordering::Relaxed) {
                info!("simulation cancelled, draining");
                self.sink.flush().ok();
                return Err(crate::error::SimError::Cancelled);
            }
            let Some(next) = self.clock.peek() else {
                break;
            };
            if !self.config.continuous && self.clock.to_datetime(next.time) >= self.config.end_date {
                break;
            }
            let event = self.clock.dequeue().expect("just peeked a non-empty queue");
            self.dispatch(event.kind, event.subject);
        }
        self.sink.flush().ok();
        Ok(())
    }

    fn dispatch(&mut self, kind: EventKind, subject: EventSubject) {
        let result = match (kind, subject) {
            (EventKind::PlaceOrder, EventSubject::User(user_id)) => self.on_place_order(user_id),
            (EventKind::PrepareOrder, EventSubject::Order(order_id)) => {
                orders::handle_prepare_order(order_id, &mut self.store, &mut self.clock, self.sink.as_ref())
            }
            (EventKind::OrderReady, EventSubject::Order(order_id)) => {
                orders::handle_order_ready(order_id, &mut self.store, &mut self.clock, self.sink.as_ref())
            }
            (EventKind::AssignDeliveryPartner, EventSubject::Order(order_id)) => orders::handle_assign_delivery_partner(
                order_id,
                &mut self.store,
                &mut self.clock,
                self.sink.as_ref(),
                &self.config,
                &mut self.rng,
            ),
            (EventKind::CheckDeliveryStatus, EventSubject::Order(order_id)) => {
                orders::handle_check_delivery_status(order_id, &mut self.store, &mut self.clock, self.sink.as_ref())
            }
            (EventKind::PickUpOrder, EventSubject::Order(order_id)) => {
                orders::handle_pick_up_order(order_id, &mut self.store, &mut self.clock, self.sink.as_ref())
            }
            (EventKind::OrderInTransit, EventSubject::Order(order_id)) => {
                orders::handle_order_in_transit(order_id, &mut self.store, &mut self.clock, self.sink.as_ref())
            }
            (EventKind::DeliverOrder, EventSubject::Order(order_id)) => orders::handle_deliver_order(
                order_id,
                &mut self.store,
                &mut self.clock,
                self.sink.as_ref(),
                &self.config,
            ),
            (EventKind::CancelOrder, EventSubject::Order(order_id)) => {
                orders::handle_cancel_order(order_id, &mut self.store, &mut self.clock, self.sink.as_ref())
            }
            (EventKind::GenerateReview, EventSubject::Order(order_id)) => self.on_generate_review(order_id),
            (EventKind::UserRateOrder, EventSubject::Order(order_id)) => self.on_user_rate_order(order_id),
            (EventKind::MoveDeliveryPartner, _) => {
                self.on_move_delivery_partners();
                Ok(())
            }
            (EventKind::UpdatePartnerLocation, _) => {
                self.on_update_partner_location();
                Ok(())
            }
            (EventKind::UpdateRestaurantStatus, _) => {
                self.on_update_restaurant_status();
                Ok(())
            }
            (EventKind::UpdateTraffic, _) => {
                self.on_update_traffic();
                Ok(())
            }
            (EventKind::UpdateUserBehaviour, _) => {
                self.on_update_user_behaviour();
                Ok(())
            }
            (EventKind::AddNewUser, _) => {
                self.on_add_new_user();
                Ok(())
            }
            (EventKind::AddNewRestaurant, _) => {
                self.on_add_new_restaurant();
                Ok(())
            }
            (EventKind::AddNewPartner, _) => {
                self.on_add_new_partner();
                Ok(())
            }
            (EventKind::RestaurantOpenClose, EventSubject::Restaurant(id)) => {
                self.on_restaurant_open_close(id);
                Ok(())
            }
            (EventKind::DeliveryPartnerGoOffline, EventSubject::Partner(id)) => {
                self.on_partner_go_offline(id);
                Ok(())
            }
            (EventKind::DeliveryPartnerGoOnline, EventSubject::Partner(id)) => {
                self.on_partner_go_online(id);
                Ok(())
            }
            _ => {
                warn!(?kind, "event dispatched with an unexpected subject, dropping");
                Ok(())
            }
        };

        // Failure semantics (spec.md §7): handlers never propagate; the loop logs and
        // continues except for Cancelled, which run() surfaces explicitly.
        if let Err(err) = result {
            warn!(?kind, error = %err, "handler failed, dropping event");
        }
    }

    fn on_place_order(&mut self, user_id: UserId) -> Result<(), crate::error::SimError> {
        let outcome = orders::handle_place_order(
            user_id,
            &mut self.store,
            &mut self.clock,
            self.sink.as_ref(),
            &self.config,
            &mut self.rng,
        );
        // Whether or not this attempt succeeded, the user's next order time is still
        // scheduled off their (possibly unchanged) order_frequency.
        if let Some(user) = self.store.user(user_id) {
            let now = self.clock.now();
            let now_dt = self.clock.now_datetime();
            let next = demand::generate_next_order_time(user, now, now_dt, &mut self.rng);
            self.clock.enqueue(next, EventKind::PlaceOrder, EventSubject::User(user_id));
        }
        outcome
    }

    fn on_generate_review(&mut self, order_id: crate::model::OrderId) -> Result<(), crate::error::SimError> {
        let order = self
            .store
            .order(order_id)
            .ok_or(crate::error::SimError::EntityNotFound { kind: "Order", id: order_id.to_string() })?
            .clone();
        if order.review_generated {
            return Ok(());
        }
        let user = self
            .store
            .user(order.customer_id)
            .ok_or(crate::error::SimError::EntityNotFound { kind: "User", id: order.customer_id.to_string() })?;

        let delay_minutes = order
            .actual_delivery_time
            .zip(order.estimated_delivery_time)
            .map(|(actual, estimated)| (actual - estimated) as f64)
            .unwrap_or(0.0);
        let probability = reputation::review_probability(
            order.total_amount,
            self.config.min_order_for_discount * 2.0,
            delay_minutes,
            user.order_frequency,
        );
        if self.rng.bool_with_prob(probability) {
            self.clock
                .enqueue(self.clock.now(), EventKind::UserRateOrder, EventSubject::Order(order_id));
        }
        Ok(())
    }

    fn on_user_rate_order(&mut self, order_id: crate::model::OrderId) -> Result<(), crate::error::SimError> {
        let now = self.clock.now();
        let now_dt = self.clock.now_datetime();
        let order = self
            .store
            .order(order_id)
            .ok_or(crate::error::SimError::EntityNotFound { kind: "Order", id: order_id.to_string() })?
            .clone();

        let delay_minutes = order
            .actual_delivery_time
            .zip(order.estimated_delivery_time)
            .map(|(actual, estimated)| (actual - estimated) as f64)
            .unwrap_or(0.0);
        let liked = delay_minutes <= 15.0;
        let food_rating = reputation::sample_food_rating(liked, &mut self.rng);
        let delivery_rating = reputation::sample_delivery_rating(
            delay_minutes,
            self.config.min_rating,
            self.config.max_rating,
            &mut self.rng,
        );
        let overall = reputation::overall_rating(
            food_rating,
            delivery_rating,
            self.config.min_rating,
            self.config.max_rating,
        );

        let review = crate::model::Review {
            id: crate::model::ReviewId::new(),
            order_id,
            customer_id: order.customer_id,
            restaurant_id: order.restaurant_id,
            delivery_partner_id: order.delivery_partner_id,
            food_rating,
            delivery_rating,
            overall_rating: overall,
            comment: String::new(),
            created_at: now,
            is_ignored: false,
        };
        let review_id = review.id;
        self.store.insert_review(review);
        if let Some(order_mut) = self.store.order_mut(order_id) {
            order_mut.review_generated = true;
        }

        if let Some(restaurant) = self.store.restaurant_mut(order.restaurant_id) {
            restaurant.rating = reputation::update_ema_rating(
                restaurant.rating,
                overall,
                self.config.restaurant_rating_alpha,
                self.config.min_rating,
                self.config.max_rating,
            );
            restaurant.total_ratings += 1;
        }
        if let Some(partner_id) = order.delivery_partner_id {
            if let Some(partner) = self.store.partner_mut(partner_id) {
                partner.rating = reputation::update_ema_rating(
                    partner.rating,
                    delivery_rating,
                    self.config.partner_rating_alpha,
                    self.config.min_rating,
                    self.config.max_rating,
                );
                partner.total_ratings += 1;
            }
        }

        self.refresh_suspicious_reviews(order.restaurant_id);
        self.emit(OutputEvent::Review(crate::events::ReviewEventPayload {
            timestamp: now_dt,
            review_id,
            order_id,
            restaurant_id: order.restaurant_id,
            delivery_partner_id: order.delivery_partner_id,
            food_rating,
            delivery_rating,
            overall_rating: overall,
            is_ignored: self.store.review(review_id).map(|r| r.is_ignored).unwrap_or(false),
        }));
        Ok(())
    }

    fn refresh_suspicious_reviews(&mut self, restaurant_id: RestaurantId) {
        let reviews = self.store.reviews_for_restaurant(restaurant_id);
        let flagged = reputation::detect_suspicious_reviews(&self.store, &reviews);
        for id in flagged {
            if let Some(review) = self.store.review_mut(id) {
                review.is_ignored = true;
            }
        }
    }

    fn on_move_delivery_partners(&mut self) {
        let now = self.clock.now();
        let now_dt = self.clock.now_datetime();
        let partner_ids = self.store.partner_ids();
        for partner_id in partner_ids {
            let Some(partner) = self.store.partner(partner_id) else { continue };
            let order_id = partner.current_order_id;
            let location = partner.location;

            let Some(order_id) = order_id else {
                // Idle: drift toward the nearest hotspot (spec.md §4.9 "hotspot drift").
                let idle_target = self.hotspots.find_nearest_hotspot(location, &mut self.rng);
                if let Some(partner) = self.store.partner_mut(partner_id) {
                    partners::move_partner(partner, None, None, Some(idle_target), now, now_dt, &self.config);
                }
                continue;
            };
            let Some(order) = self.store.order(order_id) else { continue };
            let restaurant_loc = self.store.restaurant(order.restaurant_id).map(|r| r.location);
            let delivery_loc = Some(order.delivery_address);

            let Some(partner) = self.store.partner_mut(partner_id) else { continue };
            let outcome = partners::move_partner(partner, restaurant_loc, delivery_loc, None, now, now_dt, &self.config);
            if matches!(outcome, MoveOutcome::ArrivedAtCustomer) {
                self.clock.enqueue(now, EventKind::DeliverOrder, EventSubject::Order(order_id));
            }
        }
        self.clock
            .enqueue_in(1, EventKind::MoveDeliveryPartner, EventSubject::None);
    }

    fn on_update_partner_location(&mut self) {
        let now_dt = self.clock.now_datetime();
        let precision = self.config.location_precision;
        for partner in self.store.partners() {
            self.emit(OutputEvent::PartnerLocation(PartnerLocationPayload {
                timestamp: now_dt,
                delivery_partner_id: partner.id,
                lat: geography::round_coordinate(partner.location.lat, precision),
                lon: geography::round_coordinate(partner.location.lon, precision),
                status: format!("{:?}", partner.status),
                speed: partner.speed,
            }));
        }
        self.clock
            .enqueue_in(5, EventKind::UpdatePartnerLocation, EventSubject::None);
    }

    fn on_update_restaurant_status(&mut self) {
        let now = self.clock.now();
        let now_dt = self.clock.now_datetime();

        orders::cancel_stale_orders(&mut self.store, &mut self.clock, self.sink.as_ref());

        let restaurant_ids = self.store.restaurant_ids();
        for restaurant_id in restaurant_ids {
            let Some(restaurant) = self.store.restaurant(restaurant_id) else { continue };
            let recent_orders: Vec<_> = self.store.orders().filter(|o| o.restaurant_id == restaurant_id).collect();
            let reviews = self.store.reviews_for_restaurant(restaurant_id);
            let metrics = reputation::compute_reputation_metrics(
                &reviews,
                &recent_orders,
                now,
                price_tier_multiplier(restaurant.price_tier),
                REPUTATION_MIN_REVIEWS,
            );
            if let Some(metrics) = metrics {
                if let Some(restaurant) = self.store.restaurant_mut(restaurant_id) {
                    restaurant.reputation_metrics = metrics.clone();
                    restaurant.reputation_history.push(metrics);
                    reputation::retain_reputation_history(&mut restaurant.reputation_history, now);
                }
            }

            if let Some(restaurant) = self.store.restaurant_mut(restaurant_id) {
                restaurant.pickup_efficiency = reputation::adjust_pickup_efficiency(
                    restaurant.pickup_efficiency,
                    restaurant.current_load(),
                    self.config.restaurant_load_factor,
                    self.config.efficiency_adjust_rate,
                );
            }

            if let Some(restaurant) = self.store.restaurant(restaurant_id) {
                let base_popularity = market::base_popularity(restaurant, &self.store, now);
                let popularity_trend = market::popularity_trend(restaurant, &self.store, now);
                let competitive_score = market::aggregate_competitive_score(restaurant, &self.store, now);
                self.emit(OutputEvent::RestaurantStatus(RestaurantStatusPayload {
                    timestamp: now_dt,
                    restaurant_id,
                    is_open: restaurant.is_open,
                    rating: restaurant.rating,
                    current_load: restaurant.current_load(),
                    base_popularity,
                    popularity_trend,
                    competitive_score,
                }));
            }
        }

        self.clock
            .enqueue_in(HOUR_MINUTES, EventKind::UpdateRestaurantStatus, EventSubject::None);
    }

    fn on_update_traffic(&mut self) {
        self.bad_weather = self.rng.bool_with_prob(self.config.traffic_variability);
        self.clock.enqueue_in(HOUR_MINUTES, EventKind::UpdateTraffic, EventSubject::None);
    }

    fn on_update_user_behaviour(&mut self) {
        let now_dt = self.clock.now_datetime();
        let user_ids = self.store.user_ids();
        for user_id in user_ids {
            let order_times: Vec<SimTime> = self
                .store
                .orders_for_user(user_id)
                .iter()
                .filter_map(|id| self.store.order(*id))
                .map(|o| o.order_placed_at)
                .collect();
            let Some(user) = self.store.user(user_id) else { continue };
            let new_frequency =
                demand::adjust_order_frequency(user.order_frequency, &order_times, self.config.user_behaviour_window);
            let (lifetime_orders, lifetime_spend) = {
                let orders: Vec<_> = self
                    .store
                    .orders_for_user(user_id)
                    .iter()
                    .filter_map(|id| self.store.order(*id))
                    .collect();
                (orders.len() as u32, orders.iter().map(|o| o.total_amount).sum::<f64>())
            };
            if let Some(user) = self.store.user_mut(user_id) {
                user.order_frequency = new_frequency;
                user.lifetime_orders = lifetime_orders;
                user.lifetime_spend = lifetime_spend;
            }
            self.emit(OutputEvent::UserBehaviour(UserBehaviourPayload {
                timestamp: now_dt,
                user_id,
                order_frequency: new_frequency,
                lifetime_orders,
                lifetime_spend,
            }));
        }
        self.clock.enqueue_in(DAY_MINUTES, EventKind::UpdateUserBehaviour, EventSubject::None);
    }

    fn on_add_new_user(&mut self) {
        if self.rng.bool_with_prob(self.config.user_growth_rate) {
            let user = random_user(&self.config, &mut self.rng);
            self.store.insert_user(user);
        }
        self.clock.enqueue_in(HOUR_MINUTES, EventKind::AddNewUser, EventSubject::None);
    }

    fn on_add_new_restaurant(&mut self) {
        if self.rng.bool_with_prob(self.config.restaurant_growth_rate) {
            let restaurant = random_restaurant(&self.config, &mut self.rng);
            let restaurant_id = restaurant.id;
            self.store.insert_restaurant(restaurant);
            for item in random_menu_items(restaurant_id, &mut self.rng) {
                self.store.insert_menu_item(item);
            }
            self.clock.enqueue_in(
                HOUR_MINUTES,
                EventKind::RestaurantOpenClose,
                EventSubject::Restaurant(restaurant_id),
            );
        }
        self.clock.enqueue_in(HOUR_MINUTES, EventKind::AddNewRestaurant, EventSubject::None);
    }

    fn on_add_new_partner(&mut self) {
        if self.rng.bool_with_prob(self.config.partner_growth_rate) {
            let partner = random_partner(&self.config, &mut self.rng, self.clock.now());
            let partner_id = partner.id;
            self.store.insert_partner(partner);
            let shift_end = self.rng.uniform_i(4 * HOUR_MINUTES, 8 * HOUR_MINUTES);
            self.clock.enqueue_in(
                shift_end,
                EventKind::DeliveryPartnerGoOffline,
                EventSubject::Partner(partner_id),
            );
        }
        self.clock.enqueue_in(HOUR_MINUTES, EventKind::AddNewPartner, EventSubject::None);
    }

    fn on_restaurant_open_close(&mut self, restaurant_id: RestaurantId) {
        use chrono::Timelike;
        let hour = self.clock.now_datetime().hour();
        let open = (7..23).contains(&hour);
        if let Some(restaurant) = self.store.restaurant_mut(restaurant_id) {
            restaurant.is_open = open;
        }
        self.clock.enqueue_in(
            HOUR_MINUTES,
            EventKind::RestaurantOpenClose,
            EventSubject::Restaurant(restaurant_id),
        );
    }

    /// A shift ends: an available partner goes offline for a rest period, then comes
    /// back online (spec.md §4.3 event kinds; cycle shape is this engine's own).
    fn on_partner_go_offline(&mut self, partner_id: DeliveryPartnerId) {
        let went_offline = match self.store.partner_mut(partner_id) {
            Some(partner) if partner.status == PartnerStatus::Available => {
                partner.status = PartnerStatus::Offline;
                true
            }
            _ => false,
        };
        let delay = if went_offline {
            self.rng.uniform_i(HOUR_MINUTES, 2 * HOUR_MINUTES)
        } else {
            // Busy with a delivery: check back in shortly rather than skipping the shift.
            15
        };
        self.clock
            .enqueue_in(delay, EventKind::DeliveryPartnerGoOnline, EventSubject::Partner(partner_id));
    }

    fn on_partner_go_online(&mut self, partner_id: DeliveryPartnerId) {
        if let Some(partner) = self.store.partner_mut(partner_id) {
            if partner.status == PartnerStatus::Offline {
                partner.status = PartnerStatus::Available;
            }
        }
        let next_shift_end = self.rng.uniform_i(4 * HOUR_MINUTES, 8 * HOUR_MINUTES);
        self.clock.enqueue_in(
            next_shift_end,
            EventKind::DeliveryPartnerGoOffline,
            EventSubject::Partner(partner_id),
        );
    }

    fn emit(&self, event: OutputEvent) {
        if let Err(err) = self.sink.write(event.topic(), &event.to_json()) {
            warn!(topic = event.topic(), error = %err, "sink write failed");
        }
    }
}

fn price_tier_multiplier(tier: crate::model::PriceTier) -> f64 {
    match tier {
        crate::model::PriceTier::Budget => 1.1,
        crate::model::PriceTier::Standard => 1.0,
        crate::model::PriceTier::Premium => 0.9,
    }
}

fn random_location_near(center: Location, radius_km: f64, rng: &mut SimRng) -> Location {
    let deg_per_km = 1.0 / 111.0;
    Location::new(
        center.lat + rng.uniform(-radius_km, radius_km) * deg_per_km,
        center.lon + rng.uniform(-radius_km, radius_km) * deg_per_km,
    )
}

/// Minimal in-run growth constructor for a new user (spec.md §4.13 "growth events").
/// The larger, richer initial population is built externally by `foodsim_cli::seed`.
fn random_user(config: &SimulationConfig, rng: &mut SimRng) -> User {
    let segment = if rng.bool_with_prob(0.2) {
        UserSegment::Frequent
    } else if rng.bool_with_prob(0.5 / 0.8) {
        UserSegment::Regular
    } else {
        UserSegment::Occasional
    };
    User {
        id: UserId::new(),
        join_date: 0,
        location: random_location_near(config.city_center(), config.urban_radius_km, rng),
        preferences: vec![],
        dietary_restrictions: vec![],
        order_frequency: rng.uniform(0.2, 2.0),
        segment,
        behaviour_profile: "organic".to_string(),
        lifetime_orders: 0,
        lifetime_spend: 0.0,
        last_order_time: None,
        purchase_patterns: Default::default(),
    }
}

fn random_restaurant(config: &SimulationConfig, rng: &mut SimRng) -> Restaurant {
    let cuisines = ["Italian", "American", "Thai", "Mexican", "Breakfast"];
    let cuisine = rng.pick_uniform(&cuisines).copied().unwrap_or("American").to_string();
    Restaurant {
        id: RestaurantId::new(),
        location: random_location_near(config.city_center(), config.urban_radius_km, rng),
        cuisines: vec![cuisine],
        rating: rng.uniform(3.0, 4.5),
        total_ratings: 0,
        capacity_min: 5,
        capacity_max: 30,
        avg_prep_time: rng.uniform(10.0, 30.0),
        min_prep_time: config.min_prep_time,
        pickup_efficiency: 1.0,
        menu_item_ids: vec![],
        current_orders: vec![],
        price_tier: crate::model::PriceTier::Standard,
        reputation_metrics: Default::default(),
        reputation_history: vec![],
        is_open: true,
    }
}

fn random_menu_items(restaurant_id: RestaurantId, rng: &mut SimRng) -> Vec<MenuItem> {
    use crate::model::MenuItemType::*;
    [MainCourse, SideDish, Drink, Dessert, Appetizer]
        .into_iter()
        .map(|item_type| MenuItem {
            id: crate::model::MenuItemId::new(),
            restaurant_id,
            name: format!("{:?} item", item_type),
            price: rng.uniform(3.0, 20.0),
            prep_time: rng.uniform(5.0, 20.0),
            category: "general".to_string(),
            item_type,
            popularity: rng.uniform(0.2, 0.9),
            prep_complexity: rng.uniform(0.1, 0.9),
            ingredients: vec![],
            is_discount_eligible: rng.bool_with_prob(0.6),
        })
        .collect()
}

fn random_partner(config: &SimulationConfig, rng: &mut SimRng, now: SimTime) -> DeliveryPartner {
    DeliveryPartner {
        id: DeliveryPartnerId::new(),
        location: random_location_near(config.city_center(), config.urban_radius_km, rng),
        status: PartnerStatus::Available,
        current_order_id: None,
        speed: config.partner_move_speed_km,
        avg_speed: config.partner_move_speed_km,
        experience: rng.uniform(0.0, 1.0),
        rating: rng.uniform(3.5, 5.0),
        total_ratings: 0,
        last_update_time: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;

    #[test]
    fn empty_population_produces_no_order_events_and_exits_cleanly() {
        let mut config = SimulationConfig::default();
        config.initial_users = 0;
        config.initial_restaurants = 0;
        config.initial_partners = 0;
        config.end_date = config.start_date + chrono::Duration::hours(1);

        let store = EntityStore::new();
        let sink = Arc::new(RecordingSink::new());
        let mut sim = Simulation::new(config, store, sink.clone());
        sim.schedule_initial_events();
        let cancel = AtomicBool::new(false);
        sim.run(&cancel).unwrap();

        assert_eq!(sink.total_count(), 0);
    }
}
