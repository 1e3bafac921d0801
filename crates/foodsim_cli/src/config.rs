//! Configuration loading (spec.md §6): a TOML file plus `FOODSIM_`-prefixed
//! environment overrides, merged by the `config` crate into [`RawConfig`] (every
//! field optional, documented defaults filled in by [`SimulationConfig::default`])
//! and then split into the engine's [`SimulationConfig`] and this crate's
//! [`OutputConfig`].

use std::path::Path;

use chrono::{DateTime, Utc};
use foodsim_core::config::SimulationConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputDestination {
    Local,
    MessageBus,
    ObjectStore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Csv,
    Parquet,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub destination: OutputDestination,
    pub format: OutputFormat,
    pub output_path: String,
    pub output_folder: String,
    pub kafka_enabled: bool,
}

/// Every spec.md §6 key, all optional. `None` means "use `SimulationConfig::default()`".
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub seed: Option<u64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub continuous: Option<bool>,

    pub initial_users: Option<u32>,
    pub initial_restaurants: Option<u32>,
    pub initial_partners: Option<u32>,
    pub user_growth_rate: Option<f64>,
    pub partner_growth_rate: Option<f64>,
    pub restaurant_growth_rate: Option<f64>,

    pub order_frequency: Option<f64>,
    pub peak_hour_factor: Option<f64>,
    pub weekend_factor: Option<f64>,
    pub traffic_variability: Option<f64>,

    pub city_name: Option<String>,
    pub city_latitude: Option<f64>,
    pub city_longitude: Option<f64>,
    pub urban_radius: Option<f64>,
    pub hotspot_radius: Option<f64>,

    pub partner_move_speed: Option<f64>,
    pub near_location_threshold: Option<f64>,
    pub location_precision: Option<u32>,

    pub user_behavior_window: Option<usize>,
    pub restaurant_load_factor: Option<f64>,
    pub efficiency_adjust_rate: Option<f64>,

    pub min_prep_time: Option<f64>,
    pub max_prep_time: Option<f64>,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,

    pub tax_rate: Option<f64>,
    pub service_fee_percentage: Option<f64>,
    pub discount_percentage: Option<f64>,
    pub min_order_for_discount: Option<f64>,
    pub max_discount_amount: Option<f64>,
    pub base_delivery_fee: Option<f64>,
    pub free_delivery_threshold: Option<f64>,
    pub small_order_threshold: Option<f64>,
    pub small_order_fee: Option<f64>,

    pub restaurant_rating_alpha: Option<f64>,
    pub partner_rating_alpha: Option<f64>,
    pub review_generation_delay: Option<i64>,

    pub output_destination: Option<OutputDestination>,
    pub output_format: Option<OutputFormat>,
    pub output_path: Option<String>,
    pub output_folder: Option<String>,
    pub kafka_enabled: Option<bool>,
}

impl RawConfig {
    pub fn into_configs(self) -> Result<(SimulationConfig, OutputConfig), ConfigError> {
        let defaults = SimulationConfig::default();
        let start_date = self.start_date.unwrap_or(defaults.start_date);
        let end_date = self.end_date.unwrap_or(defaults.end_date);
        if end_date < start_date {
            return Err(ConfigError::Invalid {
                field: "end_date",
                reason: "must not precede start_date".to_string(),
            });
        }

        let sim = SimulationConfig {
            seed: self.seed.unwrap_or(defaults.seed),
            start_date,
            end_date,
            continuous: self.continuous.unwrap_or(defaults.continuous),

            initial_users: self.initial_users.unwrap_or(defaults.initial_users),
            initial_restaurants: self
                .initial_restaurants
                .unwrap_or(defaults.initial_restaurants),
            initial_partners: self.initial_partners.unwrap_or(defaults.initial_partners),
            user_growth_rate: self.user_growth_rate.unwrap_or(defaults.user_growth_rate),
            partner_growth_rate: self
                .partner_growth_rate
                .unwrap_or(defaults.partner_growth_rate),
            restaurant_growth_rate: self
                .restaurant_growth_rate
                .unwrap_or(defaults.restaurant_growth_rate),

            order_frequency: self.order_frequency.unwrap_or(defaults.order_frequency),
            peak_hour_factor: self.peak_hour_factor.unwrap_or(defaults.peak_hour_factor),
            weekend_factor: self.weekend_factor.unwrap_or(defaults.weekend_factor),
            traffic_variability: self
                .traffic_variability
                .unwrap_or(defaults.traffic_variability),

            city_name: self.city_name.unwrap_or(defaults.city_name),
            city_latitude: self.city_latitude.unwrap_or(defaults.city_latitude),
            city_longitude: self.city_longitude.unwrap_or(defaults.city_longitude),
            urban_radius_km: self.urban_radius.unwrap_or(defaults.urban_radius_km),
            hotspot_radius_km: self.hotspot_radius.unwrap_or(defaults.hotspot_radius_km),

            partner_move_speed_km: self
                .partner_move_speed
                .unwrap_or(defaults.partner_move_speed_km),
            near_location_threshold_km: self
                .near_location_threshold
                .unwrap_or(defaults.near_location_threshold_km),
            near_location_slack_factor: defaults.near_location_slack_factor,
            location_precision: self
                .location_precision
                .unwrap_or(defaults.location_precision),

            user_behaviour_window: self
                .user_behavior_window
                .unwrap_or(defaults.user_behaviour_window),
            restaurant_load_factor: self
                .restaurant_load_factor
                .unwrap_or(defaults.restaurant_load_factor),
            efficiency_adjust_rate: self
                .efficiency_adjust_rate
                .unwrap_or(defaults.efficiency_adjust_rate),

            min_prep_time: self.min_prep_time.unwrap_or(defaults.min_prep_time),
            max_prep_time: self.max_prep_time.unwrap_or(defaults.max_prep_time),
            min_rating: self.min_rating.unwrap_or(defaults.min_rating),
            max_rating: self.max_rating.unwrap_or(defaults.max_rating),

            tax_rate: self.tax_rate.unwrap_or(defaults.tax_rate),
            service_fee_percentage: self
                .service_fee_percentage
                .unwrap_or(defaults.service_fee_percentage),
            discount_percentage: self
                .discount_percentage
                .unwrap_or(defaults.discount_percentage),
            min_order_for_discount: self
                .min_order_for_discount
                .unwrap_or(defaults.min_order_for_discount),
            max_discount_amount: self
                .max_discount_amount
                .unwrap_or(defaults.max_discount_amount),
            base_delivery_fee: self.base_delivery_fee.unwrap_or(defaults.base_delivery_fee),
            free_delivery_threshold: self
                .free_delivery_threshold
                .unwrap_or(defaults.free_delivery_threshold),
            small_order_threshold: self
                .small_order_threshold
                .unwrap_or(defaults.small_order_threshold),
            small_order_fee: self.small_order_fee.unwrap_or(defaults.small_order_fee),

            restaurant_rating_alpha: self
                .restaurant_rating_alpha
                .unwrap_or(defaults.restaurant_rating_alpha),
            partner_rating_alpha: self
                .partner_rating_alpha
                .unwrap_or(defaults.partner_rating_alpha),
            review_generation_delay_minutes: self
                .review_generation_delay
                .unwrap_or(defaults.review_generation_delay_minutes),
        };

        let output = OutputConfig {
            destination: self.output_destination.unwrap_or(OutputDestination::Local),
            format: self.output_format.unwrap_or(OutputFormat::Json),
            output_path: self.output_path.unwrap_or_else(|| "./output".to_string()),
            output_folder: self.output_folder.unwrap_or_else(|| "foodsim".to_string()),
            kafka_enabled: self.kafka_enabled.unwrap_or(false),
        };

        Ok((sim, output))
    }
}

/// Loads `path` (if given) plus `FOODSIM_`-prefixed environment overrides
/// (double-underscore nesting, e.g. `FOODSIM_INITIAL_USERS=500`).
pub fn load(path: Option<&Path>) -> Result<(SimulationConfig, OutputConfig), ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path.to_path_buf()));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("FOODSIM")
            .separator("__")
            .try_parsing(true),
    );
    let raw: RawConfig = builder.build()?.try_deserialize()?;
    raw.into_configs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_raw_config_yields_engine_defaults() {
        let (sim, output) = RawConfig::default().into_configs().unwrap();
        let defaults = SimulationConfig::default();
        assert_eq!(sim.seed, defaults.seed);
        assert_eq!(sim.initial_users, defaults.initial_users);
        assert_eq!(output.destination, OutputDestination::Local);
        assert_eq!(output.format, OutputFormat::Json);
    }

    #[test]
    fn end_date_before_start_date_is_rejected() {
        let mut raw = RawConfig::default();
        raw.start_date = Some("2024-06-01T00:00:00Z".parse().unwrap());
        raw.end_date = Some("2024-01-01T00:00:00Z".parse().unwrap());
        assert!(raw.into_configs().is_err());
    }
}
