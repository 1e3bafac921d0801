//! Config loading and local-sink round-trip (spec.md §8 "Round-trip": a record
//! survives serialization and reproduces its semantic content).

use std::io::Write;

use foodsim_cli::config::{self, OutputFormat};
use foodsim_cli::sink::local::LocalFileSink;
use foodsim_core::sink::EventSink;
use serde_json::json;

#[test]
fn loads_a_toml_file_and_applies_env_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("foodsim.toml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    writeln!(file, "seed = 7").unwrap();
    writeln!(file, "initial_users = 123").unwrap();
    writeln!(file, "output_format = \"csv\"").unwrap();
    drop(file);

    std::env::set_var("FOODSIM__INITIAL_USERS", "999");
    let (sim, output) = config::load(Some(&config_path)).unwrap();
    std::env::remove_var("FOODSIM__INITIAL_USERS");

    assert_eq!(sim.seed, 7);
    assert_eq!(sim.initial_users, 999, "env override must win over the file value");
    assert_eq!(output.format, OutputFormat::Csv);
}

#[test]
fn missing_config_file_falls_back_to_engine_defaults() {
    let (sim, output) = config::load(None).unwrap();
    let defaults = foodsim_core::config::SimulationConfig::default();
    assert_eq!(sim.initial_users, defaults.initial_users);
    assert_eq!(output.format, OutputFormat::Json);
}

#[test]
fn local_sink_json_round_trip_preserves_semantic_content() {
    let dir = tempfile::tempdir().unwrap();
    let sink = LocalFileSink::new(
        dir.path().to_str().unwrap().to_string(),
        "foodsim".to_string(),
        OutputFormat::Json,
    );
    let payload = json!({
        "timestamp": "2024-02-10T12:30:00Z",
        "order_id": "11111111-1111-1111-1111-111111111111",
        "total_amount": 24.97,
        "status": "delivered",
    });
    sink.write("order_delivery_events", &payload).unwrap();
    sink.flush().unwrap();

    let path = dir.path().join(
        "foodsim/order_delivery_events/year=2024/month=02/day=10/hour=12/data.json",
    );
    let contents = std::fs::read_to_string(path).unwrap();
    let round_tripped: serde_json::Value = serde_json::from_str(contents.trim()).unwrap();
    assert_eq!(round_tripped, payload);
}
