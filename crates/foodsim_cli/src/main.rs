//! CLI entry point (spec.md §6): "a single command that reads configuration from a
//! file and/or environment overrides and runs until completion."

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use foodsim_cli::config::{self, OutputConfig, OutputDestination, OutputFormat};
use foodsim_cli::seed;
use foodsim_cli::sink::bus::MessageBusSink;
use foodsim_cli::sink::local::LocalFileSink;
use foodsim_cli::sink::object_store::ObjectStoreSink;
use foodsim_core::config::SimulationConfig;
use foodsim_core::rng::SimRng;
use foodsim_core::sink::EventSink;
use foodsim_core::simulation::Simulation;
use foodsim_core::store::EntityStore;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "foodsim",
    about = "Synthetic event-stream generator for a food-delivery marketplace"
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    start_date: Option<chrono::DateTime<chrono::Utc>>,
    #[arg(long)]
    end_date: Option<chrono::DateTime<chrono::Utc>>,
    #[arg(long)]
    continuous: bool,

    #[arg(long, value_enum)]
    output_destination: Option<CliOutputDestination>,
    #[arg(long, value_enum)]
    output_format: Option<CliOutputFormat>,

    /// Raise the tracing filter; repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum CliOutputDestination {
    Local,
    MessageBus,
    ObjectStore,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Csv,
    Parquet,
}

fn apply_cli_overrides(cli: &Cli, mut sim: SimulationConfig, mut output: OutputConfig) -> (SimulationConfig, OutputConfig) {
    if let Some(seed) = cli.seed {
        sim.seed = seed;
    }
    if let Some(start_date) = cli.start_date {
        sim.start_date = start_date;
    }
    if let Some(end_date) = cli.end_date {
        sim.end_date = end_date;
    }
    if cli.continuous {
        sim.continuous = true;
    }
    if let Some(dest) = cli.output_destination {
        output.destination = match dest {
            CliOutputDestination::Local => OutputDestination::Local,
            CliOutputDestination::MessageBus => OutputDestination::MessageBus,
            CliOutputDestination::ObjectStore => OutputDestination::ObjectStore,
        };
    }
    if let Some(format) = cli.output_format {
        output.format = match format {
            CliOutputFormat::Json => OutputFormat::Json,
            CliOutputFormat::Csv => OutputFormat::Csv,
            CliOutputFormat::Parquet => OutputFormat::Parquet,
        };
    }
    (sim, output)
}

fn build_sink(output: &OutputConfig) -> Arc<dyn EventSink> {
    match output.destination {
        OutputDestination::Local => Arc::new(LocalFileSink::new(
            output.output_path.clone(),
            output.output_folder.clone(),
            output.format,
        )),
        OutputDestination::ObjectStore => Arc::new(ObjectStoreSink::new(
            output.output_path.clone(),
            output.output_folder.clone(),
            output.format,
        )),
        OutputDestination::MessageBus => Arc::new(MessageBusSink::new(&output.output_path)),
    }
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn seed_store(sim_config: &SimulationConfig, rng: &mut SimRng) -> EntityStore {
    let mut store = EntityStore::new();
    for user in seed::seed_users(sim_config, rng) {
        store.insert_user(user);
    }
    for (restaurant, items) in seed::seed_restaurants(sim_config, rng) {
        for item in items {
            store.insert_menu_item(item);
        }
        store.insert_restaurant(restaurant);
    }
    for partner in seed::seed_partners(sim_config, rng) {
        store.insert_partner(partner);
    }
    store
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let raw_path = cli.config.as_deref();
    let (sim_config, output_config) = config::load(raw_path)
        .context("failed to load configuration")
        .map_err(|e| {
            error!("{e:?}");
            e
        })?;
    let (sim_config, output_config) = apply_cli_overrides(&cli, sim_config, output_config);

    info!(
        seed = sim_config.seed,
        continuous = sim_config.continuous,
        initial_users = sim_config.initial_users,
        initial_restaurants = sim_config.initial_restaurants,
        initial_partners = sim_config.initial_partners,
        "starting simulation"
    );

    let mut rng = SimRng::from_seed(sim_config.seed);
    let store = seed_store(&sim_config, &mut rng);
    let sink: Arc<dyn EventSink> = build_sink(&output_config);

    let cancel = Arc::new(AtomicBool::new(false));
    if sim_config.continuous {
        let cancel_for_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received interrupt signal, winding down");
                cancel_for_signal.store(true, Ordering::SeqCst);
            }
        });
    }

    let mut simulation = Simulation::new(sim_config, store, sink);
    simulation.schedule_initial_events();

    match simulation.run(&cancel) {
        Ok(()) => {
            info!("simulation completed");
            Ok(())
        }
        Err(foodsim_core::error::SimError::Cancelled) => {
            info!("simulation cancelled");
            Ok(())
        }
        Err(e) => {
            error!("simulation ended with an unexpected error: {e}");
            Err(e.into())
        }
    }
}
