//! Configuration management for the fleet-allocator service
//!
//! This module handles all configuration loading from environment variables,
//! TOML files, validation, and default values for the allocation service.

pub mod app;
pub mod backend;

// Re-export commonly used types
pub use app::{
    validate_config, AllocatorSettings, AppConfig, ContextSettings, ServiceSettings,
};
pub use backend::{AgonesSettings, GameLiftSettings, MultiplaySettings, PlayFabSettings};
