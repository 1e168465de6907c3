//! Fleet Allocator - Game server allocation microservice
//!
//! This crate bridges a matchmaker to interchangeable fleet backends
//! (Agones, GameLift, Multiplay, PlayFab) behind a single two-call
//! protocol: submit an allocation, then poll it to a terminal outcome.

pub mod allocator;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod remote_config;
pub mod secrets;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{AllocatorError, Result};
pub use types::*;

// Re-export key components
pub use allocator::{AllocatorRegistry, Dispatcher, ServerAllocator};
pub use secrets::{Secret, SecretSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
