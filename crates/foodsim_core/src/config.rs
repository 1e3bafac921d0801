//! Engine-level configuration (spec.md §6). Every field has a documented default,
//! grounded in the donor's `ScenarioParams` (`scenario/params.rs`): a plain struct with
//! a `Default` impl and `with_*` builder methods, handed to the simulation at
//! construction time rather than read from a global.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geography::Location;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub continuous: bool,

    pub initial_users: u32,
    pub initial_restaurants: u32,
    pub initial_partners: u32,
    pub user_growth_rate: f64,
    pub partner_growth_rate: f64,
    pub restaurant_growth_rate: f64,

    pub order_frequency: f64,
    pub peak_hour_factor: f64,
    pub weekend_factor: f64,
    pub traffic_variability: f64,

    pub city_name: String,
    pub city_latitude: f64,
    pub city_longitude: f64,
    pub urban_radius_km: f64,
    pub hotspot_radius_km: f64,

    /// Km a delivery partner can cover per simulated minute tick.
    pub partner_move_speed_km: f64,
    pub near_location_threshold_km: f64,
    /// Open Question resolution per spec.md §9: the ×2 slack is a configurable knob.
    pub near_location_slack_factor: f64,
    /// Decimal places `lat`/`lon` are rounded to on output records (spec.md §6).
    pub location_precision: u32,

    /// Number of trailing orders used by `adjust_order_frequency` (spec.md §4.5).
    pub user_behaviour_window: usize,
    /// Weight of `current_load` in `reputation::adjust_pickup_efficiency`'s EMA target.
    pub restaurant_load_factor: f64,
    /// Smoothing rate of `reputation::adjust_pickup_efficiency`'s EMA.
    pub efficiency_adjust_rate: f64,

    pub min_prep_time: f64,
    /// Ceiling on `composer::estimate_prep_time`'s output.
    pub max_prep_time: f64,
    /// Clamp bounds shared by every rating update in `foodsim_core::reputation`.
    pub min_rating: f64,
    pub max_rating: f64,

    pub tax_rate: f64,
    pub service_fee_percentage: f64,
    pub discount_percentage: f64,
    pub min_order_for_discount: f64,
    pub max_discount_amount: f64,
    pub base_delivery_fee: f64,
    pub free_delivery_threshold: f64,
    pub small_order_threshold: f64,
    pub small_order_fee: f64,

    pub restaurant_rating_alpha: f64,
    pub partner_rating_alpha: f64,
    pub review_generation_delay_minutes: i64,
}

impl SimulationConfig {
    pub fn city_center(&self) -> Location {
        Location::new(self.city_latitude, self.city_longitude)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let start_date: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();
        Self {
            seed: 42,
            start_date,
            end_date: start_date + chrono::Duration::days(1),
            continuous: false,

            initial_users: 200,
            initial_restaurants: 30,
            initial_partners: 40,
            user_growth_rate: 0.001,
            partner_growth_rate: 0.0005,
            restaurant_growth_rate: 0.0002,

            order_frequency: 1.0,
            peak_hour_factor: 2.0,
            weekend_factor: 1.3,
            traffic_variability: 0.2,

            city_name: "Anytown".to_string(),
            city_latitude: 40.7128,
            city_longitude: -74.0060,
            urban_radius_km: 8.0,
            hotspot_radius_km: 2.0,

            partner_move_speed_km: 0.5,
            near_location_threshold_km: 3.0,
            near_location_slack_factor: 2.0,
            location_precision: 4,

            user_behaviour_window: 10,
            restaurant_load_factor: 1.0,
            efficiency_adjust_rate: 0.1,

            min_prep_time: 5.0,
            max_prep_time: 60.0,
            min_rating: 1.0,
            max_rating: 5.0,

            tax_rate: 0.08,
            service_fee_percentage: 0.05,
            discount_percentage: 0.1,
            min_order_for_discount: 15.0,
            max_discount_amount: 10.0,
            base_delivery_fee: 2.99,
            free_delivery_threshold: 35.0,
            small_order_threshold: 12.0,
            small_order_fee: 2.0,

            restaurant_rating_alpha: 0.1,
            partner_rating_alpha: 0.15,
            review_generation_delay_minutes: 30,
        }
    }
}
