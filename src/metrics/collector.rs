//! Metrics collection using Prometheus
//!
//! Allocation and poll outcomes are counted per backend and canonical
//! status, and backend call latency is tracked per operation.

use crate::types::{AllocateStatus, BackendKind, PollStatus};
use anyhow::Result;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Duration;

/// Main metrics collector for the allocation service
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,

    /// Allocation submissions by backend and outcome
    pub allocations_total: IntCounterVec,

    /// Poll attempts by backend and outcome
    pub polls_total: IntCounterVec,

    /// Wall-clock duration of allocate/poll calls by backend and operation
    pub call_duration_seconds: HistogramVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with a dedicated registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let allocations_total = IntCounterVec::new(
            Opts::new(
                "allocator_allocations_total",
                "Allocation submissions by backend and outcome",
            ),
            &["backend", "status"],
        )?;
        registry.register(Box::new(allocations_total.clone()))?;

        let polls_total = IntCounterVec::new(
            Opts::new(
                "allocator_polls_total",
                "Poll attempts by backend and outcome",
            ),
            &["backend", "status"],
        )?;
        registry.register(Box::new(polls_total.clone()))?;

        let call_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "allocator_call_duration_seconds",
                "Duration of allocate/poll calls by backend and operation",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["backend", "operation"],
        )?;
        registry.register(Box::new(call_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            allocations_total,
            polls_total,
            call_duration_seconds,
        })
    }

    /// Record an allocation outcome
    pub fn record_allocation(
        &self,
        backend: BackendKind,
        status: AllocateStatus,
        duration: Duration,
    ) {
        let status_label = match status {
            AllocateStatus::Created => "created",
            AllocateStatus::Error => "error",
        };
        self.allocations_total
            .with_label_values(&[&backend.to_string(), status_label])
            .inc();
        self.call_duration_seconds
            .with_label_values(&[&backend.to_string(), "allocate"])
            .observe(duration.as_secs_f64());
    }

    /// Record a poll outcome
    pub fn record_poll(&self, backend: BackendKind, status: PollStatus, duration: Duration) {
        let status_label = match status {
            PollStatus::Pending => "pending",
            PollStatus::Allocated => "allocated",
            PollStatus::Error => "error",
        };
        self.polls_total
            .with_label_values(&[&backend.to_string(), status_label])
            .inc();
        self.call_duration_seconds
            .with_label_values(&[&backend.to_string(), "poll"])
            .observe(duration.as_secs_f64());
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcomes_are_counted_per_backend() {
        let collector = MetricsCollector::new().unwrap();

        collector.record_allocation(
            BackendKind::GameLift,
            AllocateStatus::Created,
            Duration::from_millis(120),
        );
        collector.record_poll(
            BackendKind::GameLift,
            PollStatus::Pending,
            Duration::from_millis(30),
        );
        collector.record_poll(
            BackendKind::GameLift,
            PollStatus::Allocated,
            Duration::from_millis(35),
        );

        let rendered = collector.render().unwrap();
        assert!(rendered.contains("allocator_allocations_total"));
        assert!(rendered.contains("allocator_polls_total"));
        assert!(rendered.contains("gamelift"));
    }

    #[test]
    fn test_collectors_use_independent_registries() {
        let first = MetricsCollector::new().unwrap();
        let second = MetricsCollector::new().unwrap();

        first.record_poll(
            BackendKind::Agones,
            PollStatus::Allocated,
            Duration::from_millis(1),
        );

        assert!(first.render().unwrap().contains("agones"));
        assert!(!second.render().unwrap().contains("agones"));
    }
}
