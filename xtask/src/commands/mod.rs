//! Maintenance task implementations.

pub mod completions;

pub mod man;
