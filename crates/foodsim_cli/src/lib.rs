//! Configuration loading, initial-population seeding, and output sinks for the
//! `foodsim` binary. Split into a library so `tests/` can exercise config loading
//! and the sink round-trip without shelling out to the compiled binary.

pub mod config;
pub mod seed;
pub mod sink;
