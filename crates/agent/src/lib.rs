//! Utilization agent internals shared by the binary and its tests

pub mod api;
pub mod config;
