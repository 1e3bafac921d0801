//! Error taxonomy for the simulation engine (spec.md §7).
//!
//! Handlers never propagate these to the loop driver: they log via `tracing` and
//! return. `SimError` exists so the failure-semantics table has a concrete type to
//! construct and log, not so it gets threaded through `?` up to `main`.

use thiserror::Error;

use crate::clock::EventKind;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("entity not found: {kind} {id}")]
    EntityNotFound { kind: &'static str, id: String },

    #[error("transient unavailability for {event:?}: {reason}")]
    TransientUnavailable { event: EventKind, reason: String },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("simulation cancelled")]
    Cancelled,
}
