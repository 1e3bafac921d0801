//! Market/Popularity Engine (spec.md §4.11): base popularity, popularity trend, and
//! competitive scoring against nearby same-cuisine restaurants.

use crate::clock::SimTime;
use crate::geography::haversine_km;
use crate::model::{MenuItemType, Order, Restaurant};
use crate::store::EntityStore;

const DAY_MINUTES: SimTime = 24 * 60;
const MENU_ITEM_TYPE_COUNT: f64 = 5.0; // Appetizer, MainCourse, SideDish, Dessert, Drink

fn distinct_item_types(restaurant: &Restaurant, store: &EntityStore) -> Vec<MenuItemType> {
    let items = store.menu_items_for_restaurant(restaurant.id);
    let mut types: Vec<MenuItemType> = items.iter().map(|i| i.item_type).collect();
    types.dedup();
    types.sort_by_key(|t| *t as u8);
    types.dedup();
    types
}

/// Menu variety: distinct item types / 5, with a 1.2x bonus when the distribution is
/// "balanced" — every present type has between 2 and half the items (spec.md §4.11).
fn menu_variety(restaurant: &Restaurant, store: &EntityStore) -> f64 {
    let items = store.menu_items_for_restaurant(restaurant.id);
    if items.is_empty() {
        return 0.0;
    }
    let mut counts: std::collections::HashMap<MenuItemType, usize> = std::collections::HashMap::new();
    for item in &items {
        *counts.entry(item.item_type).or_insert(0) += 1;
    }
    let distinct_count = counts.len() as f64;
    let half = items.len() as f64 / 2.0;
    let balanced = counts.values().all(|c| *c as f64 >= 2.0 && *c as f64 <= half);

    let variety = (distinct_count / MENU_ITEM_TYPE_COUNT).min(1.0);
    if balanced {
        (variety * 1.2).min(1.0)
    } else {
        variety
    }
}

fn orders_in_window(store: &EntityStore, restaurant_id: crate::model::RestaurantId, now: SimTime, window: SimTime) -> Vec<&Order> {
    store
        .orders()
        .filter(|o| o.restaurant_id == restaurant_id && now - o.order_placed_at <= window)
        .collect()
}

/// `0.4·(rating/5) + 0.3·min(1, orders7d/(7·capacity)) + 0.2·min(1, reviews7d/orders7d)
/// + 0.1·menuVariety` (spec.md §4.11).
pub fn base_popularity(restaurant: &Restaurant, store: &EntityStore, now: SimTime) -> f64 {
    let orders_7d = orders_in_window(store, restaurant.id, now, 7 * DAY_MINUTES);
    let reviews_7d = store
        .reviews_for_restaurant(restaurant.id)
        .into_iter()
        .filter(|r| now - r.created_at <= 7 * DAY_MINUTES)
        .count();

    let capacity = restaurant.capacity_max.max(1) as f64;
    let order_term = (orders_7d.len() as f64 / (7.0 * capacity)).min(1.0);
    let review_ratio = if orders_7d.is_empty() {
        0.0
    } else {
        (reviews_7d as f64 / orders_7d.len() as f64).min(1.0)
    };

    0.4 * (restaurant.rating / 5.0)
        + 0.3 * order_term
        + 0.2 * review_ratio
        + 0.1 * menu_variety(restaurant, store)
}

fn linear_regression_slope(points: &[(f64, f64)]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let numerator: f64 = points.iter().map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();
    let denominator: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Daily order counts for the trailing 30 days, indexed by day offset.
fn daily_order_counts(store: &EntityStore, restaurant_id: crate::model::RestaurantId, now: SimTime) -> Vec<(f64, f64)> {
    let orders = orders_in_window(store, restaurant_id, now, 30 * DAY_MINUTES);
    let mut by_day: std::collections::HashMap<i64, u32> = std::collections::HashMap::new();
    for o in &orders {
        let day = (now - o.order_placed_at) / DAY_MINUTES;
        *by_day.entry(day).or_insert(0) += 1;
    }
    let mut points: Vec<(f64, f64)> = by_day.into_iter().map(|(d, c)| (d as f64, c as f64)).collect();
    points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
    points
}

/// Linear regression on daily order counts combined with revenue growth between the
/// first and last third of the window, weighted 0.6/0.4 (spec.md §4.11).
pub fn popularity_trend(restaurant: &Restaurant, store: &EntityStore, now: SimTime) -> f64 {
    let points = daily_order_counts(store, restaurant.id, now);
    let order_slope = linear_regression_slope(&points).clamp(-1.0, 1.0);

    let orders = orders_in_window(store, restaurant.id, now, 30 * DAY_MINUTES);
    if orders.len() < 3 {
        return order_slope * 0.6;
    }
    let mut sorted: Vec<&Order> = orders;
    sorted.sort_by_key(|o| o.order_placed_at);
    let third = (sorted.len() / 3).max(1);
    let first_revenue: f64 = sorted[..third].iter().map(|o| o.total_amount).sum();
    let last_revenue: f64 = sorted[sorted.len() - third..].iter().map(|o| o.total_amount).sum();
    let revenue_growth = if first_revenue > 0.0 {
        ((last_revenue - first_revenue) / first_revenue).clamp(-1.0, 1.0)
    } else {
        0.0
    };

    0.6 * order_slope + 0.4 * revenue_growth
}

/// Restaurants sharing at least one cuisine with `target`, within 5 km, excluding
/// `target` itself (spec.md §4.11).
pub fn nearby_competitors<'a>(target: &Restaurant, store: &'a EntityStore) -> Vec<&'a Restaurant> {
    store
        .restaurants()
        .filter(|r| r.id != target.id)
        .filter(|r| haversine_km(target.location, r.location) <= 5.0)
        .filter(|r| r.cuisines.iter().any(|c| target.cuisines.contains(c)))
        .collect()
}

/// `competitiveScore(target, competitor)`: rating (0.4), price inverse (0.3), volume
/// (0.2), menu variety (0.1) (spec.md §4.11).
fn competitive_score(target: &Restaurant, competitor: &Restaurant, store: &EntityStore, now: SimTime) -> f64 {
    let rating_term = if competitor.rating > 0.0 {
        (target.rating / competitor.rating).min(2.0) / 2.0
    } else {
        1.0
    };
    let target_avg_price = average_price(target, store);
    let competitor_avg_price = average_price(competitor, store);
    let price_term = if target_avg_price > 0.0 {
        (competitor_avg_price / target_avg_price).min(2.0) / 2.0
    } else {
        0.5
    };
    let target_volume = orders_in_window(store, target.id, now, 30 * DAY_MINUTES).len() as f64;
    let competitor_volume = orders_in_window(store, competitor.id, now, 30 * DAY_MINUTES).len() as f64;
    let volume_term = if competitor_volume > 0.0 {
        (target_volume / competitor_volume).min(2.0) / 2.0
    } else {
        1.0
    };
    let variety_term = menu_variety(target, store) - menu_variety(competitor, store) + 0.5;

    (0.4 * rating_term + 0.3 * price_term + 0.2 * volume_term + 0.1 * variety_term).clamp(0.0, 1.0)
}

fn average_price(restaurant: &Restaurant, store: &EntityStore) -> f64 {
    let items = store.menu_items_for_restaurant(restaurant.id);
    if items.is_empty() {
        return 0.0;
    }
    items.iter().map(|i| i.price).sum::<f64>() / items.len() as f64
}

/// Aggregate competitive position across all nearby same-cuisine competitors
/// (spec.md §4.11).
pub fn aggregate_competitive_score(target: &Restaurant, store: &EntityStore, now: SimTime) -> f64 {
    let competitors = nearby_competitors(target, store);
    if competitors.is_empty() {
        return 1.0;
    }
    let total: f64 = competitors
        .iter()
        .map(|c| competitive_score(target, c, store, now))
        .sum();
    total / competitors.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geography::Location;
    use crate::model::{PriceTier, ReputationMetrics, RestaurantId};

    fn test_restaurant(id: RestaurantId, rating: f64) -> Restaurant {
        Restaurant {
            id,
            location: Location::new(0.0, 0.0),
            cuisines: vec!["Italian".to_string()],
            rating,
            total_ratings: 10,
            capacity_min: 5,
            capacity_max: 20,
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
    fn base_popularity_scales_with_rating() {
        let store = EntityStore::new();
        let high = test_restaurant(RestaurantId::new(), 5.0);
        let low = test_restaurant(RestaurantId::new(), 1.0);
        assert!(base_popularity(&high, &store, 0) > base_popularity(&low, &store, 0));
    }

    #[test]
    fn no_competitors_scores_neutral() {
        let store = EntityStore::new();
        let target = test_restaurant(RestaurantId::new(), 4.0);
        assert_eq!(aggregate_competitive_score(&target, &store, 0), 1.0);
    }
}
