//! Demand Model (spec.md §4.5): per-user order-timing decisions and the global
//! demand-pressure multipliers (peak/weekend/holiday/pay-day).

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::clock::SimTime;
use crate::config::SimulationConfig;
use crate::model::User;
use crate::rng::SimRng;

pub(crate) fn is_peak_hour(hour: u32) -> bool {
    (11..14).contains(&hour) || (18..21).contains(&hour)
}

pub(crate) fn is_weekend(dt: DateTime<Utc>) -> bool {
    matches!(dt.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)
}

/// Hard-coded holiday multipliers keyed `MM-DD` (spec.md §4.5).
fn holiday_multiplier(dt: DateTime<Utc>) -> f64 {
    match format!("{:02}-{:02}", dt.month(), dt.day()).as_str() {
        "01-01" => 1.4, // New Year's Day
        "02-14" => 1.6, // Valentine's Day
        "07-04" => 1.3, // Independence Day
        "10-31" => 1.5, // Halloween
        "11-25" | "11-26" | "11-27" | "11-28" => 1.3, // Thanksgiving week
        "12-24" | "12-25" => 1.5, // Christmas
        "12-31" => 1.4, // New Year's Eve
        _ => 1.0,
    }
}

/// Pay-day effects: days 1 and 14-16 boost demand, the tail end of the month damps it
/// (spec.md §4.5).
fn payday_multiplier(day: u32) -> f64 {
    if day == 1 || (14..=16).contains(&day) {
        1.2
    } else if day >= 28 {
        0.9
    } else {
        1.0
    }
}

/// Global demand-pressure multiplier combining holiday and pay-day effects, applied on
/// top of the per-user order-frequency model.
pub fn demand_pressure_multiplier(dt: DateTime<Utc>) -> f64 {
    holiday_multiplier(dt) * payday_multiplier(dt.day())
}

/// Probability, per simulated minute, that `user` places an order right now
/// (spec.md §4.5).
pub fn should_place_order(
    user: &User,
    now: DateTime<Utc>,
    config: &SimulationConfig,
    rng: &mut SimRng,
) -> bool {
    let mut hour_factor = if is_peak_hour(now.hour()) {
        config.peak_hour_factor
    } else {
        1.0
    };
    if is_weekend(now) {
        hour_factor *= config.weekend_factor;
    }
    hour_factor *= demand_pressure_multiplier(now);

    let probability_per_minute = (user.order_frequency * hour_factor) / (24.0 * 60.0);
    rng.bool_with_prob(probability_per_minute)
}

fn time_of_day_factor(hour: u32) -> f64 {
    match hour {
        7..=10 => 0.8,
        12..=14 => 0.6,
        18..=21 => 0.5,
        22..=23 | 0..=6 => 1.5,
        _ => 1.0,
    }
}

/// Next order time for `user`, `now_time` minutes from the simulation start, with
/// `now_dt` the corresponding calendar datetime (spec.md §4.5).
pub fn generate_next_order_time(
    user: &User,
    now_time: SimTime,
    now_dt: DateTime<Utc>,
    rng: &mut SimRng,
) -> SimTime {
    let base_hours = 24.0 / user.order_frequency.max(0.01);
    let tod_factor = time_of_day_factor(now_dt.hour());
    let dow_factor = if is_weekend(now_dt) { 0.9 } else { 1.1 };
    let random_factor = rng.uniform(0.8, 1.2);

    let interval_minutes = base_hours * tod_factor * dow_factor * random_factor * 60.0;
    let candidate = now_time + interval_minutes.round() as i64;
    candidate.max(now_time + 15)
}

/// Exponentially smooth `user.order_frequency` toward the rate implied by the average
/// gap between the last `window` orders (spec.md §4.5).
pub fn adjust_order_frequency(
    current_frequency: f64,
    recent_order_times: &[SimTime],
    window: usize,
) -> f64 {
    let recent = if recent_order_times.len() > window {
        &recent_order_times[recent_order_times.len() - window..]
    } else {
        recent_order_times
    };
    if recent.len() < 2 {
        return current_frequency.clamp(0.01, 5.0);
    }
    let mut gaps = Vec::with_capacity(recent.len() - 1);
    for pair in recent.windows(2) {
        gaps.push((pair[1] - pair[0]) as f64);
    }
    let avg_gap_minutes = gaps.iter().sum::<f64>() / gaps.len() as f64;
    if avg_gap_minutes <= 0.0 {
        return current_frequency.clamp(0.01, 5.0);
    }
    let implied_orders_per_day = (24.0 * 60.0 / avg_gap_minutes).min(24.0);

    let smoothing_rate = 0.2;
    let smoothed =
        current_frequency + smoothing_rate * (implied_orders_per_day - current_frequency);
    smoothed.clamp(0.01, 5.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payday_boosts_start_and_mid_month() {
        assert_eq!(payday_multiplier(1), 1.2);
        assert_eq!(payday_multiplier(15), 1.2);
        assert_eq!(payday_multiplier(29), 0.9);
        assert_eq!(payday_multiplier(10), 1.0);
    }

    #[test]
    fn holiday_multiplier_known_dates() {
        let christmas: DateTime<Utc> = "2024-12-25T12:00:00Z".parse().unwrap();
        let ordinary: DateTime<Utc> = "2024-03-03T12:00:00Z".parse().unwrap();
        assert!(holiday_multiplier(christmas) > 1.0);
        assert_eq!(holiday_multiplier(ordinary), 1.0);
    }

    #[test]
    fn adjust_frequency_clamped_to_bounds() {
        // Extremely frequent recent orders should clamp at 5.0, not runaway.
        let times: Vec<SimTime> = (0..20).map(|i| i * 1).collect(); // 1-minute gaps
        let result = adjust_order_frequency(1.0, &times, 10);
        assert!(result <= 5.0 && result >= 0.01);
    }

    #[test]
    fn adjust_frequency_with_insufficient_history_is_unchanged() {
        let result = adjust_order_frequency(2.0, &[100], 10);
        assert_eq!(result, 2.0);
    }

    #[test]
    fn next_order_time_is_at_least_fifteen_minutes_out() {
        let mut rng = SimRng::from_seed(7);
        let user = User {
            id: crate::model::UserId::new(),
            join_date: 0,
            location: crate::geography::Location::new(0.0, 0.0),
            preferences: vec![],
            dietary_restrictions: vec![],
            order_frequency: 5.0,
            segment: crate::model::UserSegment::Frequent,
            behaviour_profile: "test".into(),
            lifetime_orders: 0,
            lifetime_spend: 0.0,
            last_order_time: None,
            purchase_patterns: Default::default(),
        };
        let now_dt: DateTime<Utc> = "2024-01-01T08:00:00Z".parse().unwrap();
        let next = generate_next_order_time(&user, 0, now_dt, &mut rng);
        assert!(next >= 15);
    }
}
