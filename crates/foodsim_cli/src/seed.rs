//! Initial-population factories (spec.md §1: "treated as pure constructors").
//!
//! These are richer than `foodsim_core::simulation`'s in-run growth constructors —
//! they assign realistic cuisines, preferences, and full five-slot menus so the
//! first hours of a run aren't obviously synthetic. They take a config and an `rng`
//! and return plain `Vec<T>`, handed to `EntityStore` by the caller.

use foodsim_core::config::SimulationConfig;
use foodsim_core::geography::Location;
use foodsim_core::model::{
    DeliveryPartner, DeliveryPartnerId, MenuItem, MenuItemId, MenuItemType, PartnerStatus,
    PriceTier, Restaurant, RestaurantId, User, UserId, UserSegment,
};
use foodsim_core::rng::SimRng;

const CUISINES: &[&str] = &[
    "Italian", "American", "Thai", "Mexican", "Breakfast", "Chinese", "Indian", "Mediterranean",
    "Japanese", "Vegan",
];
const PREFERENCES: &[&str] = &["spicy", "vegetarian", "comfort food", "healthy", "fast"];
const DIETARY_RESTRICTIONS: &[&str] = &["gluten-free", "vegan", "nut-free", "dairy-free"];
const INGREDIENTS: &[&str] = &[
    "chicken", "beef", "tofu", "cheese", "lettuce", "rice", "peanuts", "shrimp", "gluten", "dairy",
];

fn random_location_near(center: Location, radius_km: f64, rng: &mut SimRng) -> Location {
    let deg_per_km = 1.0 / 111.0;
    Location::new(
        center.lat + rng.uniform(-radius_km, radius_km) * deg_per_km,
        center.lon + rng.uniform(-radius_km, radius_km) * deg_per_km,
    )
}

fn random_subset<'a>(items: &'a [&'a str], max: usize, rng: &mut SimRng) -> Vec<String> {
    let n = rng.uniform_i(0, max as i64 + 1) as usize;
    let mut picked = Vec::with_capacity(n);
    for _ in 0..n {
        if let Some(item) = rng.pick_uniform(items) {
            let s = item.to_string();
            if !picked.contains(&s) {
                picked.push(s);
            }
        }
    }
    picked
}

pub fn seed_users(config: &SimulationConfig, rng: &mut SimRng) -> Vec<User> {
    (0..config.initial_users)
        .map(|_| {
            let segment_roll = rng.uniform(0.0, 1.0);
            let (segment, frequency_range) = if segment_roll < 0.2 {
                (UserSegment::Frequent, (1.0, 4.0))
            } else if segment_roll < 0.7 {
                (UserSegment::Regular, (0.3, 1.2))
            } else {
                (UserSegment::Occasional, (0.05, 0.4))
            };
            User {
                id: UserId::new(),
                join_date: -rng.uniform_i(0, 365 * 24 * 60),
                location: random_location_near(
                    config.city_center(),
                    config.urban_radius_km,
                    rng,
                ),
                preferences: random_subset(PREFERENCES, 3, rng),
                dietary_restrictions: random_subset(DIETARY_RESTRICTIONS, 1, rng),
                order_frequency: rng.uniform(frequency_range.0, frequency_range.1),
                segment,
                behaviour_profile: match segment {
                    UserSegment::Frequent => "habitual",
                    UserSegment::Regular => "organic",
                    UserSegment::Occasional => "sporadic",
                }
                .to_string(),
                lifetime_orders: 0,
                lifetime_spend: 0.0,
                last_order_time: None,
                purchase_patterns: Default::default(),
            }
        })
        .collect()
}

/// Returns each restaurant paired with its menu items, so the caller inserts both
/// sides of the `menu_item_ids` relationship together.
pub fn seed_restaurants(
    config: &SimulationConfig,
    rng: &mut SimRng,
) -> Vec<(Restaurant, Vec<MenuItem>)> {
    (0..config.initial_restaurants)
        .map(|_| {
            let restaurant_id = RestaurantId::new();
            let cuisine_count = rng.uniform_i(1, 3) as usize;
            let mut cuisines = random_subset(CUISINES, cuisine_count, rng);
            if cuisines.is_empty() {
                cuisines.push(CUISINES[0].to_string());
            }
            let price_tier = match rng.uniform_i(0, 3) {
                0 => PriceTier::Budget,
                1 => PriceTier::Standard,
                _ => PriceTier::Premium,
            };
            let items = seed_menu_items(restaurant_id, rng);
            let restaurant = Restaurant {
                id: restaurant_id,
                location: random_location_near(
                    config.city_center(),
                    config.urban_radius_km,
                    rng,
                ),
                cuisines,
                rating: rng.uniform(3.0, 4.8),
                total_ratings: rng.uniform_i(0, 200) as u64,
                capacity_min: 5,
                capacity_max: rng.uniform_i(15, 60) as u32,
                avg_prep_time: rng.uniform(10.0, 35.0),
                min_prep_time: config.min_prep_time,
                pickup_efficiency: rng.uniform(0.7, 1.0),
                menu_item_ids: items.iter().map(|i| i.id).collect(),
                current_orders: vec![],
                price_tier,
                reputation_metrics: Default::default(),
                reputation_history: vec![],
                is_open: true,
            };
            (restaurant, items)
        })
        .collect()
}

/// A full five-slot menu (one item per `MenuItemType`) plus one or two extra
/// main-course variants, so `compose_order` has real choice among mains.
fn seed_menu_items(restaurant_id: RestaurantId, rng: &mut SimRng) -> Vec<MenuItem> {
    use MenuItemType::*;
    let mut items: Vec<MenuItem> = [Appetizer, MainCourse, SideDish, Dessert, Drink]
        .into_iter()
        .map(|item_type| build_menu_item(restaurant_id, item_type, rng))
        .collect();
    let extra_mains = rng.uniform_i(0, 3);
    for _ in 0..extra_mains {
        items.push(build_menu_item(restaurant_id, MainCourse, rng));
    }
    items
}

fn build_menu_item(restaurant_id: RestaurantId, item_type: MenuItemType, rng: &mut SimRng) -> MenuItem {
    let price_range = match item_type {
        MenuItemType::Appetizer => (4.0, 10.0),
        MenuItemType::MainCourse => (9.0, 28.0),
        MenuItemType::SideDish => (2.0, 7.0),
        MenuItemType::Dessert => (3.0, 9.0),
        MenuItemType::Drink => (1.5, 6.0),
    };
    MenuItem {
        id: MenuItemId::new(),
        restaurant_id,
        name: format!("{:?} #{}", item_type, rng.uniform_i(1, 1000)),
        price: rng.uniform(price_range.0, price_range.1),
        prep_time: rng.uniform(3.0, 25.0),
        category: "general".to_string(),
        item_type,
        popularity: rng.uniform(0.1, 1.0),
        prep_complexity: rng.uniform(0.1, 1.0),
        ingredients: random_subset(INGREDIENTS, 3, rng),
        is_discount_eligible: rng.bool_with_prob(0.5),
    }
}

pub fn seed_partners(config: &SimulationConfig, rng: &mut SimRng) -> Vec<DeliveryPartner> {
    (0..config.initial_partners)
        .map(|_| {
            let speed = config.partner_move_speed_km * rng.uniform(0.8, 1.2);
            DeliveryPartner {
                id: DeliveryPartnerId::new(),
                location: random_location_near(
                    config.city_center(),
                    config.urban_radius_km,
                    rng,
                ),
                status: PartnerStatus::Available,
                current_order_id: None,
                speed,
                avg_speed: speed,
                experience: rng.uniform(0.0, 1.0),
                rating: rng.uniform(3.5, 5.0),
                total_ratings: rng.uniform_i(0, 150) as u64,
                last_update_time: 0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_users_respects_initial_count() {
        let config = SimulationConfig {
            initial_users: 25,
            ..SimulationConfig::default()
        };
        let mut rng = SimRng::from_seed(7);
        let users = seed_users(&config, &mut rng);
        assert_eq!(users.len(), 25);
    }

    #[test]
    fn seed_restaurants_each_get_five_distinct_slots_at_least() {
        let config = SimulationConfig {
            initial_restaurants: 5,
            ..SimulationConfig::default()
        };
        let mut rng = SimRng::from_seed(3);
        let restaurants = seed_restaurants(&config, &mut rng);
        assert_eq!(restaurants.len(), 5);
        for (restaurant, items) in &restaurants {
            assert!(items.len() >= 5);
            assert_eq!(restaurant.menu_item_ids.len(), items.len());
            assert!(!restaurant.cuisines.is_empty());
        }
    }

    #[test]
    fn seed_partners_start_available_with_no_order() {
        let config = SimulationConfig {
            initial_partners: 10,
            ..SimulationConfig::default()
        };
        let mut rng = SimRng::from_seed(9);
        let partners = seed_partners(&config, &mut rng);
        assert_eq!(partners.len(), 10);
        assert!(partners
            .iter()
            .all(|p| p.status == PartnerStatus::Available && p.current_order_id.is_none()));
    }
}
