//! User-facing event recording for the owning cluster.
//!
//! Events are a side channel: recording never fails and never influences
//! reconciliation decisions. The default sink writes to `tracing` under the
//! `audit` target.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

/// Severity of a recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Normal,
    Warning,
}

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub event_type: EventType,
    pub reason: &'static str,
    pub message: String,
    pub cluster: String,
    pub timestamp: DateTime<Utc>,
}

/// Destination for recorded events.
pub trait EventSink: Send + Sync {
    fn record(&self, event: Event);
}

/// Sink that logs events through `tracing`.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: Event) {
        match event.event_type {
            EventType::Normal => {
                tracing::info!(target: "audit", cluster = %event.cluster, reason = event.reason, "{}", event.message)
            }
            EventType::Warning => {
                tracing::warn!(target: "audit", cluster = %event.cluster, reason = event.reason, "{}", event.message)
            }
        }
    }
}

/// Sink that keeps events in memory.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn reasons(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.reason).collect()
    }
}

impl EventSink for RecordingSink {
    fn record(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

struct NoopSink;

impl EventSink for NoopSink {
    fn record(&self, _event: Event) {}
}

/// Security group audit logger with domain-specific methods.
#[derive(Clone)]
pub struct ClusterAuditLogger {
    sink: Arc<dyn EventSink>,
    cluster: String,
}

impl ClusterAuditLogger {
    /// Logger that writes through `tracing`.
    pub fn new(cluster: &str) -> Self {
        Self::with_sink(cluster, Arc::new(TracingSink))
    }

    pub fn with_sink(cluster: &str, sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            cluster: cluster.to_string(),
        }
    }

    /// Create a noop audit logger (for testing)
    pub fn new_noop() -> Self {
        Self::with_sink("", Arc::new(NoopSink))
    }

    fn emit(&self, event_type: EventType, reason: &'static str, message: String) {
        self.sink.record(Event {
            event_type,
            reason,
            message,
            cluster: self.cluster.clone(),
            timestamp: Utc::now(),
        });
    }

    // === Security Group Events ===

    pub fn security_group_created(&self, name: &str, id: &str) {
        self.emit(
            EventType::Normal,
            "SuccessfulCreateSecurityGroup",
            format!("Created security group {} with id {}", name, id),
        );
    }

    pub fn security_group_create_failed(&self, name: &str, error: &dyn std::fmt::Display) {
        self.emit(
            EventType::Warning,
            "FailedCreateSecurityGroup",
            format!("Failed to create security group {}: {}", name, error),
        );
    }

    pub fn security_group_deleted(&self, name: &str, id: &str) {
        self.emit(
            EventType::Normal,
            "SuccessfulDeleteSecurityGroup",
            format!("Deleted security group {} with id {}", name, id),
        );
    }

    pub fn security_group_delete_failed(
        &self,
        name: &str,
        id: &str,
        error: &dyn std::fmt::Display,
    ) {
        self.emit(
            EventType::Warning,
            "FailedDeleteSecurityGroup",
            format!(
                "Failed to delete security group {} with id {}: {}",
                name, id, error
            ),
        );
    }

    // === Reconciliation Events ===

    pub fn reconcile_failed(&self, error: &dyn std::fmt::Display) {
        self.emit(
            EventType::Warning,
            "FailedReconcileSecurityGroups",
            format!("Failed to reconcile security groups: {}", error),
        );
    }
}
