//! cohortq - a streaming filter-query engine for partitioned
//! patient-survey data
//!
//! An operator composes a boolean filter (AND/OR/parentheses over
//! per-question conditions); the engine validates it, resolves the
//! applicable time-versioned snapshot of every sub-form, evaluates the
//! filter across the whole roster in adaptively sized batches, and
//! streams progress and matches incrementally.

pub mod cli;
pub mod expr;
pub mod http_server;
pub mod observability;
pub mod scanner;
pub mod store;
pub mod temporal;
