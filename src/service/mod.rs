//! Service layer for the fleet-allocator application
//!
//! This module contains the application state, HTTP surface, and health
//! check functionality for running as a service.

pub mod app;
pub mod health;

pub use app::{create_router, default_registry, AppState};
pub use health::{HealthCheck, HealthStatus};
