//! The Entity Store (spec.md §4.4): in-memory tables keyed by id plus the secondary
//! indices the rest of the engine needs. No business logic lives here — only
//! lookup, insertion, and the append-only/never-delete bookkeeping spec.md §3
//! requires.

use std::collections::{HashMap, HashSet};

use crate::model::*;

#[derive(Debug, Default)]
pub struct EntityStore {
    users: HashMap<UserId, User>,
    restaurants: HashMap<RestaurantId, Restaurant>,
    menu_items: HashMap<MenuItemId, MenuItem>,
    partners: HashMap<DeliveryPartnerId, DeliveryPartner>,
    orders: HashMap<OrderId, Order>,
    reviews: HashMap<ReviewId, Review>,

    /// Append-only per spec.md §4.4.
    orders_by_user: HashMap<UserId, Vec<OrderId>>,
    completed_orders_by_restaurant: HashMap<RestaurantId, Vec<OrderId>>,
    active_orders: HashSet<OrderId>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Users --------------------------------------------------------------
    pub fn insert_user(&mut self, user: User) {
        self.users.insert(user.id, user);
    }
    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }
    pub fn user_mut(&mut self, id: UserId) -> Option<&mut User> {
        self.users.get_mut(&id)
    }
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }
    pub fn user_ids(&self) -> Vec<UserId> {
        self.users.keys().copied().collect()
    }

    // -- Restaurants ----------------------------------------------------------
    pub fn insert_restaurant(&mut self, restaurant: Restaurant) {
        self.restaurants.insert(restaurant.id, restaurant);
    }
    pub fn restaurant(&self, id: RestaurantId) -> Option<&Restaurant> {
        self.restaurants.get(&id)
    }
    pub fn restaurant_mut(&mut self, id: RestaurantId) -> Option<&mut Restaurant> {
        self.restaurants.get_mut(&id)
    }
    pub fn restaurants(&self) -> impl Iterator<Item = &Restaurant> {
        self.restaurants.values()
    }
    pub fn restaurant_ids(&self) -> Vec<RestaurantId> {
        self.restaurants.keys().copied().collect()
    }

    // -- Menu items -----------------------------------------------------------
    pub fn insert_menu_item(&mut self, item: MenuItem) {
        self.menu_items.insert(item.id, item);
    }
    pub fn menu_item(&self, id: MenuItemId) -> Option<&MenuItem> {
        self.menu_items.get(&id)
    }
    pub fn menu_items_for_restaurant(&self, restaurant_id: RestaurantId) -> Vec<&MenuItem> {
        self.restaurant(restaurant_id)
            .map(|r| {
                r.menu_item_ids
                    .iter()
                    .filter_map(|id| self.menu_items.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    // -- Delivery partners ------------------------------------------------------
    pub fn insert_partner(&mut self, partner: DeliveryPartner) {
        self.partners.insert(partner.id, partner);
    }
    pub fn partner(&self, id: DeliveryPartnerId) -> Option<&DeliveryPartner> {
        self.partners.get(&id)
    }
    pub fn partner_mut(&mut self, id: DeliveryPartnerId) -> Option<&mut DeliveryPartner> {
        self.partners.get_mut(&id)
    }
    pub fn partners(&self) -> impl Iterator<Item = &DeliveryPartner> {
        self.partners.values()
    }
    pub fn partner_ids(&self) -> Vec<DeliveryPartnerId> {
        self.partners.keys().copied().collect()
    }

    // -- Orders -------------------------------------------------------------
    pub fn insert_order(&mut self, order: Order) {
        let id = order.id;
        let customer = order.customer_id;
        self.orders_by_user.entry(customer).or_default().push(id);
        self.active_orders.insert(id);
        self.orders.insert(id, order);
    }
    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }
    pub fn order_mut(&mut self, id: OrderId) -> Option<&mut Order> {
        self.orders.get_mut(&id)
    }
    pub fn orders_for_user(&self, user_id: UserId) -> &[OrderId] {
        self.orders_by_user
            .get(&user_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
    pub fn active_order_ids(&self) -> impl Iterator<Item = &OrderId> {
        self.active_orders.iter()
    }
    pub fn active_order_count(&self) -> usize {
        self.active_orders.len()
    }

    /// Mark an order terminal (delivered or cancelled): removes it from the
    /// active-orders set and, if delivered, records it against the restaurant's
    /// completed-orders index. Does not delete the order record (spec.md §3
    /// "Lifecycle": completed/cancelled orders persist in output and may only be
    /// purged from the *hot set*, never from the record itself).
    pub fn retire_order(&mut self, id: OrderId) {
        self.active_orders.remove(&id);
        if let Some(order) = self.orders.get(&id) {
            if order.status == OrderStatus::Delivered {
                self.completed_orders_by_restaurant
                    .entry(order.restaurant_id)
                    .or_default()
                    .push(id);
            }
        }
    }
    pub fn completed_orders_for_restaurant(&self, restaurant_id: RestaurantId) -> &[OrderId] {
        self.completed_orders_by_restaurant
            .get(&restaurant_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    // -- Reviews --------------------------------------------------------------
    pub fn insert_review(&mut self, review: Review) {
        self.reviews.insert(review.id, review);
    }
    pub fn review(&self, id: ReviewId) -> Option<&Review> {
        self.reviews.get(&id)
    }
    pub fn review_mut(&mut self, id: ReviewId) -> Option<&mut Review> {
        self.reviews.get_mut(&id)
    }
    pub fn reviews(&self) -> impl Iterator<Item = &Review> {
        self.reviews.values()
    }
    pub fn reviews_for_restaurant(&self, restaurant_id: RestaurantId) -> Vec<&Review> {
        self.reviews
            .values()
            .filter(|r| r.restaurant_id == restaurant_id)
            .collect()
    }
    pub fn reviews_for_user(&self, user_id: UserId) -> Vec<&Review> {
        self.reviews
            .values()
            .filter(|r| r.customer_id == user_id)
            .collect()
    }
}
