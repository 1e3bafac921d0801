//! Discrete-event simulation engine for a synthetic food-delivery marketplace.
//!
//! The engine owns a simulated clock, a min-heap event queue, and an in-memory
//! entity store; a single loop ([`simulation::Simulation`]) pops the earliest event,
//! dispatches it to a handler by kind, and lets that handler mutate the store and
//! enqueue successor events. Everything downstream of configuration and seeding —
//! demand generation, restaurant selection, order composition, delivery-partner
//! routing, reputation, and market scoring — lives here as plain functions over the
//! store, so the loop stays a thin dispatch table.
//!
//! ```no_run
//! use std::sync::Arc;
//! use foodsim_core::config::SimulationConfig;
//! use foodsim_core::sink::NullSink;
//! use foodsim_core::simulation::Simulation;
//! use foodsim_core::store::EntityStore;
//!
//! let config = SimulationConfig::default();
//! let store = EntityStore::new(); // seeded by an external collaborator
//! let mut sim = Simulation::new(config, store, Arc::new(NullSink));
//! sim.schedule_initial_events();
//! sim.run(&std::sync::atomic::AtomicBool::new(false)).ok();
//! ```

pub mod clock;
pub mod composer;
pub mod config;
pub mod demand;
pub mod error;
pub mod events;
pub mod geography;
pub mod market;
pub mod model;
pub mod orders;
pub mod partners;
pub mod reputation;
pub mod rng;
pub mod selection;
pub mod simulation;
pub mod sink;
pub mod store;
