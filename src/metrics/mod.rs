//! Metrics and monitoring for the fleet-allocator service

pub mod collector;

pub use collector::MetricsCollector;
