//! Order State Machine (spec.md §4.8): one handler per transition. Each handler
//! updates the order record, emits the corresponding output event, and enqueues its
//! successor — the same three-step shape for every state.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::clock::{EventKind, EventSubject, SimClock, SimTime};
use crate::composer;
use crate::config::SimulationConfig;
use crate::error::SimError;
use crate::events::{DeliveryAssignmentPayload, OrderEventPayload, OutputEvent};
use crate::geography::is_at_location;
use crate::model::{
    MenuItemId, Order, OrderId, OrderStatus, PartnerStatus, PaymentMethod, RestaurantId, UserId,
};
use crate::partners;
use crate::rng::SimRng;
use crate::selection;
use crate::sink::EventSink;
use crate::store::EntityStore;

const STALE_ORDER_MINUTES: SimTime = 3 * 60;
const DELIVERY_RETRY_MINUTES: i64 = 5;
const DELIVERY_POLL_MINUTES: i64 = 5;
const IN_TRANSIT_POLL_MINUTES: i64 = 5;

fn emit(sink: &dyn EventSink, event: OutputEvent) {
    if let Err(err) = sink.write(event.topic(), &event.to_json()) {
        warn!(topic = event.topic(), error = %err, "sink write failed");
    }
}

fn order_payload(order: &Order, now_dt: DateTime<Utc>) -> OrderEventPayload {
    OrderEventPayload {
        timestamp: now_dt,
        order_id: order.id,
        customer_id: order.customer_id,
        restaurant_id: order.restaurant_id,
        delivery_partner_id: order.delivery_partner_id,
        status: format!("{:?}", order.status),
        total_amount: order.total_amount,
    }
}

fn random_payment_method(rng: &mut SimRng) -> PaymentMethod {
    let options = [PaymentMethod::Card, PaymentMethod::Cash, PaymentMethod::Wallet];
    *rng.pick_uniform(&options).unwrap_or(&PaymentMethod::Card)
}

/// `PlaceOrder`: select a restaurant, compose a meal, create the order record
/// (spec.md §4.6, §4.7) and schedule its prep start.
pub fn handle_place_order(
    user_id: UserId,
    store: &mut EntityStore,
    clock: &mut SimClock,
    sink: &dyn EventSink,
    config: &SimulationConfig,
    rng: &mut SimRng,
) -> Result<(), SimError> {
    let now = clock.now();
    let now_dt = clock.now_datetime();
    let user = store
        .user(user_id)
        .ok_or(SimError::EntityNotFound { kind: "User", id: user_id.to_string() })?
        .clone();

    let dbg_sel = selection::select_restaurant(store, &user, now, now_dt, rng, config);
    eprintln!("DEBUG select_restaurant -> {:?} at now={} now_dt={}", dbg_sel, now, now_dt);
    let Some(restaurant_id) = dbg_sel
    else {
        return Err(SimError::TransientUnavailable {
            event: EventKind::PlaceOrder,
            reason: "no restaurant available".to_string(),
        });
    };
    let restaurant = store
        .restaurant(restaurant_id)
        .ok_or(SimError::EntityNotFound { kind: "Restaurant", id: restaurant_id.to_string() })?
        .clone();

    let Some(composed) = composer::compose_order(store, &restaurant, &user, config, rng) else {
        return Err(SimError::TransientUnavailable {
            event: EventKind::PlaceOrder,
            reason: "no menu items available".to_string(),
        });
    };

    let estimated_pickup_time = now + composed.estimated_prep_minutes.ceil() as SimTime;

    let order = Order {
        id: OrderId::new(),
        customer_id: user_id,
        restaurant_id,
        delivery_partner_id: None,
        item_ids: composed.item_ids,
        total_amount: composed.total,
        delivery_cost: composed.delivery_fee,
        payment_method: random_payment_method(rng),
        delivery_address: user.location,
        order_placed_at: now,
        prep_start_time: Some(now),
        estimated_pickup_time: Some(estimated_pickup_time),
        estimated_delivery_time: None,
        pickup_time: None,
        in_transit_time: None,
        actual_delivery_time: None,
        status: OrderStatus::Placed,
        review_generated: false,
    };
    let order_id = order.id;
    emit(sink, OutputEvent::OrderPlaced(order_payload(&order, now_dt)));
    store.insert_order(order);

    if let Some(r) = store.restaurant_mut(restaurant_id) {
        r.current_orders.push(order_id);
    }

    clock.enqueue(now, EventKind::PrepareOrder, EventSubject::Order(order_id));
    Ok(())
}

/// `placed -> preparing`, triggered once `now >= prepStartTime` (spec.md §4.8).
pub fn handle_prepare_order(
    order_id: OrderId,
    store: &mut EntityStore,
    clock: &mut SimClock,
    sink: &dyn EventSink,
) -> Result<(), SimError> {
    let now_dt = clock.now_datetime();
    let order = store
        .order_mut(order_id)
        .ok_or(SimError::EntityNotFound { kind: "Order", id: order_id.to_string() })?;
    order.status = OrderStatus::Preparing;
    let pickup_time = order.estimated_pickup_time.unwrap_or(clock.now());
    let order = order.clone();

    emit(sink, OutputEvent::OrderPreparation(order_payload(&order, now_dt)));
    clock.enqueue(pickup_time, EventKind::OrderReady, EventSubject::Order(order_id));
    Ok(())
}

/// `preparing -> ready`, triggered once `now >= pickupTime` (spec.md §4.8).
pub fn handle_order_ready(
    order_id: OrderId,
    store: &mut EntityStore,
    clock: &mut SimClock,
    sink: &dyn EventSink,
) -> Result<(), SimError> {
    let now_dt = clock.now_datetime();
    let order = store
        .order_mut(order_id)
        .ok_or(SimError::EntityNotFound { kind: "Order", id: order_id.to_string() })?;
    order.status = OrderStatus::Ready;
    let order = order.clone();

    emit(sink, OutputEvent::OrderReady(order_payload(&order, now_dt)));
    clock.enqueue(clock.now(), EventKind::AssignDeliveryPartner, EventSubject::Order(order_id));
    Ok(())
}

/// `ready -> picked_up`'s precondition: reserve an available, nearby partner
/// (spec.md §4.9). Retries in 5 minutes on a miss rather than failing the order.
pub fn handle_assign_delivery_partner(
    order_id: OrderId,
    store: &mut EntityStore,
    clock: &mut SimClock,
    sink: &dyn EventSink,
    config: &SimulationConfig,
    rng: &mut SimRng,
) -> Result<(), SimError> {
    let now = clock.now();
    let now_dt = clock.now_datetime();
    let order = store
        .order(order_id)
        .ok_or(SimError::EntityNotFound { kind: "Order", id: order_id.to_string() })?
        .clone();
    let restaurant = store
        .restaurant(order.restaurant_id)
        .ok_or(SimError::EntityNotFound { kind: "Restaurant", id: order.restaurant_id.to_string() })?
        .clone();

    match partners::assign_partner(
        store,
        restaurant.location,
        order.delivery_address,
        now,
        now_dt,
        config,
        rng,
    ) {
        Some(assignment) => {
            if let Some(order_mut) = store.order_mut(order_id) {
                order_mut.delivery_partner_id = Some(assignment.partner_id);
                order_mut.estimated_delivery_time = Some(assignment.estimated_delivery_time);
            }
            if let Some(partner) = store.partner_mut(assignment.partner_id) {
                partner.current_order_id = Some(order_id);
            }
            emit(
                sink,
                OutputEvent::DeliveryPartnerAssignment(DeliveryAssignmentPayload {
                    timestamp: now_dt,
                    order_id,
                    delivery_partner_id: Some(assignment.partner_id),
                    restaurant_id: order.restaurant_id,
                    assigned: true,
                    estimated_delivery_time: Some(clock.to_datetime(assignment.estimated_delivery_time)),
                }),
            );
            clock.enqueue_in(DELIVERY_POLL_MINUTES, EventKind::CheckDeliveryStatus, EventSubject::Order(order_id));
        }
        None => {
            emit(
                sink,
                OutputEvent::DeliveryPartnerAssignment(DeliveryAssignmentPayload {
                    timestamp: now_dt,
                    order_id,
                    delivery_partner_id: None,
                    restaurant_id: order.restaurant_id,
                    assigned: false,
                    estimated_delivery_time: None,
                }),
            );
            clock.enqueue_in(DELIVERY_RETRY_MINUTES, EventKind::AssignDeliveryPartner, EventSubject::Order(order_id));
        }
    }
    Ok(())
}

/// Periodic poll while `ready` (waiting for pickup) or `in_transit` (waiting for
/// delivery): checks arrival and either fires the real transition or re-polls.
/// Also catches stale orders past the 3-hour cancellation threshold (spec.md §4.8).
pub fn handle_check_delivery_status(
    order_id: OrderId,
    store: &mut EntityStore,
    clock: &mut SimClock,
    sink: &dyn EventSink,
) -> Result<(), SimError> {
    let now = clock.now();
    let now_dt = clock.now_datetime();
    let order = store
        .order(order_id)
        .ok_or(SimError::EntityNotFound { kind: "Order", id: order_id.to_string() })?
        .clone();

    emit(sink, OutputEvent::DeliveryStatusCheck(order_payload(&order, now_dt)));

    if now - order.order_placed_at > STALE_ORDER_MINUTES {
        clock.enqueue(now, EventKind::CancelOrder, EventSubject::Order(order_id));
        return Ok(());
    }

    let Some(partner_id) = order.delivery_partner_id else {
        // Lost its assignment somehow; let re-assignment pick it back up.
        clock.enqueue(now, EventKind::AssignDeliveryPartner, EventSubject::Order(order_id));
        return Ok(());
    };
    let Some(partner) = store.partner(partner_id) else {
        clock.enqueue(now, EventKind::AssignDeliveryPartner, EventSubject::Order(order_id));
        return Ok(());
    };

    match order.status {
        OrderStatus::Ready => {
            if is_at_location(partner.location, store.restaurant(order.restaurant_id).map(|r| r.location).unwrap_or(partner.location)) {
                clock.enqueue(now, EventKind::PickUpOrder, EventSubject::Order(order_id));
            } else {
                clock.enqueue_in(DELIVERY_POLL_MINUTES, EventKind::CheckDeliveryStatus, EventSubject::Order(order_id));
            }
        }
        OrderStatus::InTransit => {
            if is_at_location(partner.location, order.delivery_address) {
                clock.enqueue(now, EventKind::DeliverOrder, EventSubject::Order(order_id));
            } else {
                clock.enqueue_in(IN_TRANSIT_POLL_MINUTES, EventKind::CheckDeliveryStatus, EventSubject::Order(order_id));
            }
        }
        _ => {}
    }
    Ok(())
}

/// `ready -> picked_up`, followed immediately by `picked_up -> in_transit`
/// (spec.md §4.8: "immediately after pickup").
pub fn handle_pick_up_order(
    order_id: OrderId,
    store: &mut EntityStore,
    clock: &mut SimClock,
    sink: &dyn EventSink,
) -> Result<(), SimError> {
    let now = clock.now();
    let now_dt = clock.now_datetime();
    let order = store
        .order_mut(order_id)
        .ok_or(SimError::EntityNotFound { kind: "Order", id: order_id.to_string() })?;
    order.status = OrderStatus::PickedUp;
    order.pickup_time = Some(now);
    let order = order.clone();

    if let Some(partner_id) = order.delivery_partner_id {
        if let Some(partner) = store.partner_mut(partner_id) {
            partner.status = PartnerStatus::EnRouteToDelivery;
        }
    }
    emit(sink, OutputEvent::OrderPickup(order_payload(&order, now_dt)));
    clock.enqueue(now, EventKind::OrderInTransit, EventSubject::Order(order_id));
    Ok(())
}

/// `picked_up -> in_transit` (spec.md §4.8).
pub fn handle_order_in_transit(
    order_id: OrderId,
    store: &mut EntityStore,
    clock: &mut SimClock,
    sink: &dyn EventSink,
) -> Result<(), SimError> {
    let now = clock.now();
    let now_dt = clock.now_datetime();
    let order = store
        .order_mut(order_id)
        .ok_or(SimError::EntityNotFound { kind: "Order", id: order_id.to_string() })?;
    order.status = OrderStatus::InTransit;
    order.in_transit_time = Some(now);
    let order = order.clone();

    emit(sink, OutputEvent::OrderInTransit(order_payload(&order, now_dt)));
    clock.enqueue_in(IN_TRANSIT_POLL_MINUTES, EventKind::CheckDeliveryStatus, EventSubject::Order(order_id));
    Ok(())
}

/// `in_transit -> delivered` (spec.md §4.8): frees the partner and schedules the
/// review 30 minutes out.
pub fn handle_deliver_order(
    order_id: OrderId,
    store: &mut EntityStore,
    clock: &mut SimClock,
    sink: &dyn EventSink,
    config: &SimulationConfig,
) -> Result<(), SimError> {
    let now = clock.now();
    let now_dt = clock.now_datetime();
    let order = store
        .order_mut(order_id)
        .ok_or(SimError::EntityNotFound { kind: "Order", id: order_id.to_string() })?;
    order.status = OrderStatus::Delivered;
    order.actual_delivery_time = Some(now);
    let order = order.clone();

    if let Some(partner_id) = order.delivery_partner_id {
        if let Some(partner) = store.partner_mut(partner_id) {
            partner.status = PartnerStatus::Available;
            partner.current_order_id = None;
            partner.last_update_time = now;
        }
    }
    if let Some(restaurant) = store.restaurant_mut(order.restaurant_id) {
        restaurant.current_orders.retain(|id| *id != order_id);
    }
    store.retire_order(order_id);
    emit(sink, OutputEvent::OrderDelivery(order_payload(&order, now_dt)));
    clock.enqueue_in(config.review_generation_delay_minutes, EventKind::GenerateReview, EventSubject::Order(order_id));
    Ok(())
}

/// `* -> cancelled`, fired after the 3-hour staleness window (spec.md §4.8, §7).
pub fn handle_cancel_order(
    order_id: OrderId,
    store: &mut EntityStore,
    clock: &mut SimClock,
    sink: &dyn EventSink,
) -> Result<(), SimError> {
    let now_dt = clock.now_datetime();
    let order = store
        .order_mut(order_id)
        .ok_or(SimError::EntityNotFound { kind: "Order", id: order_id.to_string() })?;
    if order.status == OrderStatus::Delivered || order.status == OrderStatus::Cancelled {
        return Ok(());
    }
    order.status = OrderStatus::Cancelled;
    let order = order.clone();

    if let Some(partner_id) = order.delivery_partner_id {
        if let Some(partner) = store.partner_mut(partner_id) {
            partner.status = PartnerStatus::Available;
            partner.current_order_id = None;
        }
    }
    if let Some(restaurant) = store.restaurant_mut(order.restaurant_id) {
        restaurant.current_orders.retain(|id| *id != order_id);
    }
    store.retire_order(order_id);
    emit(sink, OutputEvent::OrderCancellation(order_payload(&order, now_dt)));
    Ok(())
}

/// Every non-terminal order older than 3 hours gets force-cancelled (spec.md §4.13
/// "At periodic boundaries ... stale-order cancellation").
pub fn cancel_stale_orders(store: &mut EntityStore, clock: &mut SimClock, sink: &dyn EventSink) {
    let now = clock.now();
    let stale: Vec<OrderId> = store
        .active_order_ids()
        .copied()
        .filter(|id| {
            store
                .order(*id)
                .map(|o| now - o.order_placed_at > STALE_ORDER_MINUTES)
                .unwrap_or(false)
        })
        .collect();
    for order_id in stale {
        if let Err(err) = handle_cancel_order(order_id, store, clock, sink) {
            warn!(%order_id, error = %err, "failed to cancel stale order");
        }
    }
}

/// Restaurant-side menu-item lookup used by callers that need to validate an order's
/// item list against §3's invariant ("every itemId ... belongs to order.restaurantId").
pub fn items_belong_to_restaurant(store: &EntityStore, restaurant_id: RestaurantId, item_ids: &[MenuItemId]) -> bool {
    item_ids.iter().all(|id| {
        store
            .menu_item(*id)
            .map(|item| item.restaurant_id == restaurant_id)
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PriceTier, ReputationMetrics, UserSegment};
    use crate::sink::RecordingSink;
    use std::collections::HashMap;

    fn setup() -> (EntityStore, SimClock, RecordingSink, SimulationConfig, SimRng) {
        let config = SimulationConfig::default();
        let mut store = EntityStore::new();
        let clock = SimClock::new(config.start_date);
        let sink = RecordingSink::new();
        let rng = SimRng::from_seed(config.seed);

        let user = crate::model::User {
            id: UserId::new(),
            join_date: 0,
            location: config.city_center(),
            preferences: vec![],
            dietary_restrictions: vec![],
            order_frequency: 3.0,
            segment: UserSegment::Frequent,
            behaviour_profile: "t".into(),
            lifetime_orders: 0,
            lifetime_spend: 0.0,
            last_order_time: None,
            purchase_patterns: HashMap::new(),
        };
        store.insert_user(user);

        let restaurant_id = RestaurantId::new();
        let main = crate::model::MenuItem {
            id: MenuItemId::new(),
            restaurant_id,
            name: "Burger".into(),
            price: 10.0,
            prep_time: 12.0,
            category: "main".into(),
            item_type: crate::model::MenuItemType::MainCourse,
            popularity: 0.8,
            prep_complexity: 0.4,
            ingredients: vec!["beef".into()],
            is_discount_eligible: true,
        };
        let drink = crate::model::MenuItem {
            id: MenuItemId::new(),
            restaurant_id,
            name: "Soda".into(),
            price: 2.0,
            prep_time: 1.0,
            category: "drink".into(),
            item_type: crate::model::MenuItemType::Drink,
            popularity: 0.9,
            prep_complexity: 0.1,
            ingredients: vec!["water".into()],
            is_discount_eligible: false,
        };
        let item_ids = vec![main.id, drink.id];
        store.insert_menu_item(main);
        store.insert_menu_item(drink);

        let restaurant = crate::model::Restaurant {
            id: restaurant_id,
            location: config.city_center(),
            cuisines: vec!["American".into()],
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
            reputation_metrics: ReputationMetrics::default(),
            reputation_history: vec![],
            is_open: true,
        };
        store.insert_restaurant(restaurant);

        (store, clock, sink, config, rng)
    }

    #[test]
    fn place_order_emits_and_schedules_preparation() {
        let (mut store, mut clock, sink, config, mut rng) = setup();
        let user_id = store.user_ids()[0];
        handle_place_order(user_id, &mut store, &mut clock, &sink, &config, &mut rng).unwrap();

        assert_eq!(sink.topic("order_placed_events").len(), 1);
        assert_eq!(clock.len(), 1);
        assert_eq!(clock.peek().unwrap().kind, EventKind::PrepareOrder);
    }

    #[test]
    fn full_lifecycle_without_partner_ends_in_retry_then_cancellation() {
        let (mut store, mut clock, sink, config, mut rng) = setup();
        let user_id = store.user_ids()[0];
        handle_place_order(user_id, &mut store, &mut clock, &sink, &config, &mut rng).unwrap();
        let order_id = store.orders().next().unwrap().id;

        let event = clock.dequeue().unwrap();
        handle_prepare_order(order_id, &mut store, &mut clock, &sink).unwrap();
        let _ = event;
        let event = clock.dequeue().unwrap();
        assert_eq!(event.kind, EventKind::OrderReady);
        handle_order_ready(order_id, &mut store, &mut clock, &sink).unwrap();

        let event = clock.dequeue().unwrap();
        assert_eq!(event.kind, EventKind::AssignDeliveryPartner);
        // No partners exist in the store: assignment fails and retries.
        handle_assign_delivery_partner(order_id, &mut store, &mut clock, &sink, &config, &mut rng).unwrap();
        assert_eq!(sink.topic("delivery_partner_assignment_events").len(), 1);
        assert_eq!(clock.peek().unwrap().kind, EventKind::AssignDeliveryPartner);
    }
}
