//! Order Composer (spec.md §4.7): meal composition sampling, pricing, and prep-time
//! estimation for a user/restaurant pair.

use crate::config::SimulationConfig;
use crate::model::{MenuItem, MenuItemId, MenuItemType, Restaurant, User};
use crate::rng::SimRng;
use crate::store::EntityStore;

#[derive(Debug, Clone)]
pub struct ComposedOrder {
    pub item_ids: Vec<MenuItemId>,
    pub subtotal: f64,
    pub discount: f64,
    pub tax: f64,
    pub service_fee: f64,
    pub delivery_fee: f64,
    pub total: f64,
    pub estimated_prep_minutes: f64,
}

/// 70% chance of the full `{main, side, drink}` meal, each then independently gaining
/// an appetizer (30%) or a dessert (20%); the remaining 30% of the time the meal is
/// just `{main, drink}` (spec.md §4.7).
fn decide_composition(rng: &mut SimRng) -> Vec<MenuItemType> {
    let mut slots = if rng.bool_with_prob(0.7) {
        vec![
            MenuItemType::MainCourse,
            MenuItemType::SideDish,
            MenuItemType::Drink,
        ]
    } else {
        vec![MenuItemType::MainCourse, MenuItemType::Drink]
    };
    if rng.bool_with_prob(0.3) {
        slots.push(MenuItemType::Appetizer);
    }
    if rng.bool_with_prob(0.2) {
        slots.push(MenuItemType::Dessert);
    }
    slots
}

fn name_matches_preference(item: &MenuItem, user: &User) -> bool {
    user.preferences.iter().any(|pref| {
        item.name.to_lowercase().contains(&pref.to_lowercase())
            || item.category.to_lowercase().contains(&pref.to_lowercase())
    })
}

fn has_no_conflicting_ingredient(item: &MenuItem, user: &User) -> bool {
    !user.dietary_restrictions.iter().any(|restriction| {
        item.ingredients
            .iter()
            .any(|ingredient| ingredient.eq_ignore_ascii_case(restriction))
    })
}

/// Weight an item for a given slot: `popularity × 1.5^(preferenceMatch) ×
/// 1_noConflict(diet)` (spec.md §4.7).
fn item_weight(item: &MenuItem, user: &User) -> f64 {
    if !has_no_conflicting_ingredient(item, user) {
        return 0.0;
    }
    let preference_factor = if name_matches_preference(item, user) {
        1.5
    } else {
        1.0
    };
    item.popularity.max(0.01) * preference_factor
}

fn select_item_for_type(
    store: &EntityStore,
    restaurant: &Restaurant,
    item_type: MenuItemType,
    user: &User,
    rng: &mut SimRng,
) -> Option<MenuItemId> {
    let candidates: Vec<&MenuItem> = store
        .menu_items_for_restaurant(restaurant.id)
        .into_iter()
        .filter(|item| item.item_type == item_type)
        .collect();
    if candidates.is_empty() {
        // Scenario 4 (spec.md §8): a requested slot with no matching items is skipped,
        // not an error.
        return None;
    }
    rng.weighted_pick(&candidates, |item| item_weight(item, user))
        .map(|item| item.id)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

struct Pricing {
    subtotal: f64,
    discount: f64,
    tax: f64,
    service_fee: f64,
    delivery_fee: f64,
    total: f64,
}

/// `total = subtotal + tax + serviceFee + deliveryFee − discount`, rounded to 2dp
/// (spec.md §4.7).
fn price_items(items: &[&MenuItem], config: &SimulationConfig) -> Pricing {
    let subtotal: f64 = items.iter().map(|i| i.price).sum();
    let discountable: f64 = items
        .iter()
        .filter(|i| i.is_discount_eligible)
        .map(|i| i.price)
        .sum();

    let discount = if discountable >= config.min_order_for_discount {
        (discountable * config.discount_percentage).min(config.max_discount_amount)
    } else {
        0.0
    };

    let tax = subtotal * config.tax_rate;
    let service_fee = subtotal * config.service_fee_percentage;

    let delivery_fee = if subtotal >= config.free_delivery_threshold {
        0.0
    } else if subtotal < config.small_order_threshold {
        config.base_delivery_fee + config.small_order_fee
    } else {
        config.base_delivery_fee
    };

    let total = subtotal + tax + service_fee + delivery_fee - discount;

    Pricing {
        subtotal: round2(subtotal),
        discount: round2(discount),
        tax: round2(tax),
        service_fee: round2(service_fee),
        delivery_fee: round2(delivery_fee),
        total: round2(total),
    }
}

/// `avgPrepTime × (1 + 0.2·(meanComplexity − 1)) × (1 + 0.5·currentLoad) ×
/// uniform(0.95, 1.05) / pickupEfficiency`, clamped to `[minPrepTime, maxPrepTime]`
/// (spec.md §4.7; the `pickupEfficiency` divisor is this module's resolution of the
/// field's otherwise-unused update rule, see `reputation::adjust_pickup_efficiency`).
fn estimate_prep_time(
    restaurant: &Restaurant,
    items: &[&MenuItem],
    config: &SimulationConfig,
    rng: &mut SimRng,
) -> f64 {
    if items.is_empty() {
        return restaurant.min_prep_time;
    }
    let mean_complexity =
        items.iter().map(|i| i.prep_complexity).sum::<f64>() / items.len() as f64;
    let load_factor = 1.0 + 0.5 * restaurant.current_load();
    let complexity_factor = 1.0 + 0.2 * (mean_complexity - 1.0);
    let randomness = rng.uniform(0.95, 1.05);

    let adjusted = restaurant.avg_prep_time * complexity_factor * load_factor * randomness
        / restaurant.pickup_efficiency.max(0.1);
    adjusted.clamp(restaurant.min_prep_time, config.max_prep_time)
}

/// Compose a full order for `user` at `restaurant`: choose items, price them, and
/// estimate prep time. Returns `None` only if no slot could be filled at all (spec.md
/// §8 scenario 4: a partially-filled composition is still valid as long as
/// `total > 0`).
pub fn compose_order(
    store: &EntityStore,
    restaurant: &Restaurant,
    user: &User,
    config: &SimulationConfig,
    rng: &mut SimRng,
) -> Option<ComposedOrder> {
    let slots = decide_composition(rng);
    let mut item_ids = Vec::new();
    for slot in slots {
        if let Some(id) = select_item_for_type(store, restaurant, slot, user, rng) {
            item_ids.push(id);
        }
    }
    if item_ids.is_empty() {
        return None;
    }

    let items: Vec<&MenuItem> = item_ids
        .iter()
        .filter_map(|id| store.menu_item(*id))
        .collect();

    let pricing = price_items(&items, config);
    let estimated_prep_minutes = estimate_prep_time(restaurant, &items, config, rng);

    Some(ComposedOrder {
        item_ids,
        subtotal: pricing.subtotal,
        discount: pricing.discount,
        tax: pricing.tax,
        service_fee: pricing.service_fee,
        delivery_fee: pricing.delivery_fee,
        total: pricing.total,
        estimated_prep_minutes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geography::Location;
    use crate::model::{PriceTier, ReputationMetrics, RestaurantId, UserId, UserSegment};
    use std::collections::HashMap;

    fn test_user() -> User {
        User {
            id: UserId::new(),
            join_date: 0,
            location: Location::new(0.0, 0.0),
            preferences: vec![],
            dietary_restrictions: vec!["peanuts".to_string()],
            order_frequency: 1.0,
            segment: UserSegment::Regular,
            behaviour_profile: "t".into(),
            lifetime_orders: 0,
            lifetime_spend: 0.0,
            last_order_time: None,
            purchase_patterns: HashMap::new(),
        }
    }

    fn test_restaurant(id: RestaurantId, item_ids: Vec<MenuItemId>) -> Restaurant {
        Restaurant {
            id,
            location: Location::new(0.0, 0.0),
            cuisines: vec![],
            rating: 4.0,
            total_ratings: 1,
            capacity_min: 5,
            capacity_max: 20,
            avg_prep_time: 20.0,
            min_prep_time: 5.0,
            pickup_efficiency: 1.0,
            menu_item_ids: item_ids,
            current_orders: vec![],
            price_tier: PriceTier::Standard,
            reputation_metrics: ReputationMetrics::default(),
            reputation_history: vec![],
            is_open: true,
        }
    }

    fn item(restaurant_id: RestaurantId, item_type: MenuItemType, price: f64) -> MenuItem {
        MenuItem {
            id: MenuItemId::new(),
            restaurant_id,
            name: "Item".to_string(),
            price,
            prep_time: 10.0,
            category: "general".to_string(),
            item_type,
            popularity: 0.5,
            prep_complexity: 0.5,
            ingredients: vec!["wheat".to_string()],
            is_discount_eligible: true,
        }
    }

    #[test]
    fn free_delivery_above_threshold() {
        let restaurant_id = RestaurantId::new();
        let main = item(restaurant_id, MenuItemType::MainCourse, 40.0);
        let config = SimulationConfig::default();
        let pricing = price_items(&[&main], &config);
        assert_eq!(pricing.delivery_fee, 0.0);
    }

    #[test]
    fn small_order_gets_surcharge() {
        let restaurant_id = RestaurantId::new();
        let drink = item(restaurant_id, MenuItemType::Drink, 3.0);
        let config = SimulationConfig::default();
        let pricing = price_items(&[&drink], &config);
        assert_eq!(
            pricing.delivery_fee,
            config.base_delivery_fee + config.small_order_fee
        );
    }

    #[test]
    fn composer_skips_missing_slot_but_still_returns_an_order() {
        let mut store = EntityStore::new();
        let restaurant_id = RestaurantId::new();
        // Only appetizer items exist: main/side/drink/dessert slots will be skipped.
        let appetizer = item(restaurant_id, MenuItemType::Appetizer, 6.0);
        let appetizer_id = appetizer.id;
        store.insert_menu_item(appetizer);
        let restaurant = test_restaurant(restaurant_id, vec![appetizer_id]);
        store.insert_restaurant(restaurant.clone());
        let user = test_user();
        let config = SimulationConfig::default();
        let mut rng = SimRng::from_seed(2);

        // Force the "full meal" branch so main/side/drink are attempted and skipped.
        let mut found_order = None;
        for seed in 0..50 {
            let mut rng = SimRng::from_seed(seed);
            if let Some(order) = compose_order(&store, &restaurant, &user, &config, &mut rng) {
                found_order = Some(order);
                break;
            }
        }
        let order = found_order.expect("composer should eventually succeed with only appetizers available");
        assert!(order.total > 0.0);
        let _ = rng.uniform(0.0, 1.0); // keep rng used to avoid unused warning in this branch
    }
}
