//! Typed output records, one variant per emitted topic (spec.md §6). Every payload
//! carries a `timestamp` field; `OutputEvent::topic()` gives the logical channel name
//! and `OutputEvent::to_json()` gives the sink-ready payload.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::model::{DeliveryPartnerId, OrderId, RestaurantId, ReviewId, UserId};

#[derive(Debug, Clone, Serialize)]
pub struct OrderEventPayload {
    pub timestamp: DateTime<Utc>,
    pub order_id: OrderId,
    pub customer_id: UserId,
    pub restaurant_id: RestaurantId,
    pub delivery_partner_id: Option<DeliveryPartnerId>,
    pub status: String,
    pub total_amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryAssignmentPayload {
    pub timestamp: DateTime<Utc>,
    pub order_id: OrderId,
    /// `None` when this record documents a retry attempt that found no available
    /// partner (spec.md §8 scenario 3).
    pub delivery_partner_id: Option<DeliveryPartnerId>,
    pub restaurant_id: RestaurantId,
    pub assigned: bool,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartnerLocationPayload {
    pub timestamp: DateTime<Utc>,
    pub delivery_partner_id: DeliveryPartnerId,
    pub lat: f64,
    pub lon: f64,
    pub status: String,
    pub speed: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestaurantStatusPayload {
    pub timestamp: DateTime<Utc>,
    pub restaurant_id: RestaurantId,
    pub is_open: bool,
    pub rating: f64,
    pub current_load: f64,
    /// C11 Market/Popularity Engine output (spec.md §4.11), recomputed on each tick.
    pub base_popularity: f64,
    pub popularity_trend: f64,
    pub competitive_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserBehaviourPayload {
    pub timestamp: DateTime<Utc>,
    pub user_id: UserId,
    pub order_frequency: f64,
    pub lifetime_orders: u32,
    pub lifetime_spend: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewEventPayload {
    pub timestamp: DateTime<Utc>,
    pub review_id: ReviewId,
    pub order_id: OrderId,
    pub restaurant_id: RestaurantId,
    pub delivery_partner_id: Option<DeliveryPartnerId>,
    pub food_rating: f64,
    pub delivery_rating: f64,
    pub overall_rating: f64,
    pub is_ignored: bool,
}

#[derive(Debug, Clone)]
pub enum OutputEvent {
    OrderPlaced(OrderEventPayload),
    OrderPreparation(OrderEventPayload),
    OrderReady(OrderEventPayload),
    OrderPickup(OrderEventPayload),
    OrderInTransit(OrderEventPayload),
    DeliveryStatusCheck(OrderEventPayload),
    OrderDelivery(OrderEventPayload),
    OrderCancellation(OrderEventPayload),
    DeliveryPartnerAssignment(DeliveryAssignmentPayload),
    PartnerLocation(PartnerLocationPayload),
    RestaurantStatus(RestaurantStatusPayload),
    UserBehaviour(UserBehaviourPayload),
    Review(ReviewEventPayload),
}

impl OutputEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            OutputEvent::OrderPlaced(_) => "order_placed_events",
            OutputEvent::OrderPreparation(_) => "order_preparation_events",
            OutputEvent::OrderReady(_) => "order_ready_events",
            OutputEvent::OrderPickup(_) => "order_pickup_events",
            OutputEvent::OrderInTransit(_) => "order_in_transit_events",
            OutputEvent::DeliveryStatusCheck(_) => "delivery_status_check_events",
            OutputEvent::OrderDelivery(_) => "order_delivery_events",
            OutputEvent::OrderCancellation(_) => "order_cancellation_events",
            OutputEvent::DeliveryPartnerAssignment(_) => "delivery_partner_assignment_events",
            OutputEvent::PartnerLocation(_) => "partner_location_events",
            OutputEvent::RestaurantStatus(_) => "restaurant_status_events",
            OutputEvent::UserBehaviour(_) => "user_behaviour_events",
            OutputEvent::Review(_) => "review_events",
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            OutputEvent::OrderPlaced(p)
            | OutputEvent::OrderPreparation(p)
            | OutputEvent::OrderReady(p)
            | OutputEvent::OrderPickup(p)
            | OutputEvent::OrderInTransit(p)
            | OutputEvent::DeliveryStatusCheck(p)
            | OutputEvent::OrderDelivery(p)
            | OutputEvent::OrderCancellation(p) => json!(p),
            OutputEvent::DeliveryPartnerAssignment(p) => json!(p),
            OutputEvent::PartnerLocation(p) => json!(p),
            OutputEvent::RestaurantStatus(p) => json!(p),
            OutputEvent::UserBehaviour(p) => json!(p),
            OutputEvent::Review(p) => json!(p),
        }
    }
}
