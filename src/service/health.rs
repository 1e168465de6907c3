//! Health check reporting
//!
//! This module provides health check functionality for the fleet-allocator
//! service, used by the HTTP health endpoint and the CLI health mode.

use crate::service::app::AppState;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Service statistics
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional error message if unhealthy
    pub message: Option<String>,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Backend new allocations are dispatched to
    pub configured_backend: String,
    /// Backends with a registered adapter
    pub registered_backends: Vec<String>,
    /// Service uptime information
    pub uptime_info: String,
}

impl HealthCheck {
    /// Perform a health check of the service
    pub async fn check(app_state: Arc<AppState>) -> Result<Self> {
        let mut checks = Vec::new();
        let mut overall_status = HealthStatus::Healthy;

        // The configured backend must have a registered adapter
        let backend = app_state.dispatcher().backend();
        let registered = app_state.dispatcher().registered_backends();
        if registered.contains(&backend) {
            checks.push(ComponentCheck {
                name: "dispatcher".to_string(),
                status: HealthStatus::Healthy,
                message: None,
            });
        } else {
            overall_status = HealthStatus::Unhealthy;
            checks.push(ComponentCheck {
                name: "dispatcher".to_string(),
                status: HealthStatus::Unhealthy,
                message: Some(format!(
                    "No allocator registered for configured backend '{}'",
                    backend
                )),
            });
        }

        // Missing project identity degrades but does not fail the service
        let context = &app_state.config().context;
        if context.project_id.is_empty() || context.environment_id.is_empty() {
            if overall_status == HealthStatus::Healthy {
                overall_status = HealthStatus::Degraded;
            }
            checks.push(ComponentCheck {
                name: "context".to_string(),
                status: HealthStatus::Degraded,
                message: Some("Project or environment id is not configured".to_string()),
            });
        } else {
            checks.push(ComponentCheck {
                name: "context".to_string(),
                status: HealthStatus::Healthy,
                message: None,
            });
        }

        Ok(HealthCheck {
            status: overall_status,
            service: app_state.config().service.name.clone(),
            version: crate::VERSION.to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats: ServiceStats {
                configured_backend: backend.to_string(),
                registered_backends: registered.iter().map(|b| b.to_string()).collect(),
                uptime_info: format!("{}s", app_state.uptime().as_secs()),
            },
        })
    }
}
