//! Entity types (spec.md §3). Plain data; all mutation goes through
//! [`crate::store::EntityStore`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::SimTime;
use crate::geography::Location;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(RestaurantId);
id_newtype!(MenuItemId);
id_newtype!(DeliveryPartnerId);
id_newtype!(OrderId);
id_newtype!(ReviewId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserSegment {
    Frequent,
    Regular,
    Occasional,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub join_date: SimTime,
    pub location: Location,
    pub preferences: Vec<String>,
    pub dietary_restrictions: Vec<String>,
    /// Orders per day, clamped to [0.01, 5.0] (spec.md §3).
    pub order_frequency: f64,
    pub segment: UserSegment,
    pub behaviour_profile: String,
    pub lifetime_orders: u32,
    pub lifetime_spend: f64,
    pub last_order_time: Option<SimTime>,
    /// weekday (0=Monday..6=Sunday) -> hours of day the user has historically ordered at.
    pub purchase_patterns: HashMap<u8, Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceTier {
    Budget,
    Standard,
    Premium,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReputationMetrics {
    pub windowed_rating: f64,
    pub consistency: f64,
    pub trend: f64,
    pub reliability: f64,
    pub price_quality: f64,
    pub computed_at: SimTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub location: Location,
    pub cuisines: Vec<String>,
    pub rating: f64,
    pub total_ratings: u64,
    pub capacity_min: u32,
    pub capacity_max: u32,
    pub avg_prep_time: f64,
    pub min_prep_time: f64,
    pub pickup_efficiency: f64,
    pub menu_item_ids: Vec<MenuItemId>,
    pub current_orders: Vec<OrderId>,
    pub price_tier: PriceTier,
    pub reputation_metrics: ReputationMetrics,
    /// Last 90 days of reputation snapshots (spec.md §3, §4.10).
    pub reputation_history: Vec<ReputationMetrics>,
    pub is_open: bool,
}

impl Restaurant {
    pub fn current_load(&self) -> f64 {
        if self.capacity_max == 0 {
            return 0.0;
        }
        (self.current_orders.len() as f64 / self.capacity_max as f64).min(1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MenuItemType {
    Appetizer,
    MainCourse,
    SideDish,
    Dessert,
    Drink,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub price: f64,
    pub prep_time: f64,
    pub category: String,
    pub item_type: MenuItemType,
    pub popularity: f64,
    pub prep_complexity: f64,
    pub ingredients: Vec<String>,
    pub is_discount_eligible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartnerStatus {
    Available,
    Assigned,
    EnRouteToPickup,
    WaitingForPickup,
    EnRouteToDelivery,
    Delivering,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryPartner {
    pub id: DeliveryPartnerId,
    pub location: Location,
    pub status: PartnerStatus,
    pub current_order_id: Option<OrderId>,
    /// Current instantaneous speed, km per simulated minute.
    pub speed: f64,
    pub avg_speed: f64,
    /// 0.0–1.0.
    pub experience: f64,
    pub rating: f64,
    pub total_ratings: u64,
    pub last_update_time: SimTime,
}

impl DeliveryPartner {
    /// `status = available <-> current_order_id = None` (spec.md §3, §8).
    pub fn invariant_holds(&self) -> bool {
        (self.status == PartnerStatus::Available) == self.current_order_id.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Placed,
    Preparing,
    Ready,
    PickedUp,
    InTransit,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Card,
    Cash,
    Wallet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: UserId,
    pub restaurant_id: RestaurantId,
    pub delivery_partner_id: Option<DeliveryPartnerId>,
    pub item_ids: Vec<MenuItemId>,
    pub total_amount: f64,
    pub delivery_cost: f64,
    pub payment_method: PaymentMethod,
    pub delivery_address: Location,
    pub order_placed_at: SimTime,
    pub prep_start_time: Option<SimTime>,
    pub estimated_pickup_time: Option<SimTime>,
    pub estimated_delivery_time: Option<SimTime>,
    pub pickup_time: Option<SimTime>,
    pub in_transit_time: Option<SimTime>,
    pub actual_delivery_time: Option<SimTime>,
    pub status: OrderStatus,
    pub review_generated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub order_id: OrderId,
    pub customer_id: UserId,
    pub restaurant_id: RestaurantId,
    pub delivery_partner_id: Option<DeliveryPartnerId>,
    pub food_rating: f64,
    pub delivery_rating: f64,
    pub overall_rating: f64,
    pub comment: String,
    pub created_at: SimTime,
    pub is_ignored: bool,
}
