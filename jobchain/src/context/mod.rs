//! Run context management.
//!
//! This module provides the mutable per-run context that carries the
//! execution record, the job descriptor, the logger handle and the chain
//! control state through every middleware.

mod run;

pub use run::RunContext;
