//! Agent library for container utilization recording
//!
//! This crate provides the core functionality for:
//! - Polling kubelet summary stats across a fixed node set
//! - Extracting and encoding per-container samples
//! - Appending samples to a sorted-set store, and scanning them back
//! - Health checks and observability

pub mod codec;
pub mod collector;
pub mod extract;
pub mod health;
pub mod models;
pub mod observability;
pub mod store;

pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{AgentMetrics, StructuredLogger};
