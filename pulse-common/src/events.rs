//! Event types for the StudyPulse event system
//!
//! Every noteworthy observation (failed validation, flow/journey drop-off,
//! performance alert) is broadcast as a [`PulseEvent`] on the [`EventBus`].
//! Emission is fire-and-forget: the host UI or telemetry layer may subscribe,
//! but nothing in the engine blocks on delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::severity::Severity;

/// Alert classification for performance threshold breaches
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Latency metric exceeded its threshold
    SlowResponse,
    /// Memory usage exceeded its threshold
    MemoryLeak,
    /// Error rate exceeded its threshold
    ErrorSpike,
    /// Web-vitals metric degraded past its threshold
    Degradation,
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertType::SlowResponse => write!(f, "slow_response"),
            AlertType::MemoryLeak => write!(f, "memory_leak"),
            AlertType::ErrorSpike => write!(f, "error_spike"),
            AlertType::Degradation => write!(f, "degradation"),
        }
    }
}

/// Efficiency classification for a completed flow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlowEfficiency {
    /// Finished faster than the critical path's expected duration
    High,
    /// Finished at or slower than the expected duration
    Low,
}

/// StudyPulse event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PulseEvent {
    /// A rule validation produced errors (or warnings only)
    ValidationFailed {
        category: String,
        failed_rules: Vec<String>,
        severity: Severity,
        errors: Vec<String>,
        warnings: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A tracked flow recorded its first failed step
    FlowDropOff {
        flow_id: Uuid,
        kind: String,
        step: String,
        completion_rate: f64,
        timestamp: DateTime<Utc>,
    },

    /// A tracked flow completed
    FlowCompleted {
        flow_id: Uuid,
        kind: String,
        duration_ms: i64,
        efficiency: FlowEfficiency,
        timestamp: DateTime<Utc>,
    },

    /// A participant journey recorded a failed block
    JourneyDropOff {
        journey_id: Uuid,
        participant_id: String,
        study_id: String,
        drop_off_point: String,
        blocks_completed: usize,
        timestamp: DateTime<Utc>,
    },

    /// A metric breached its configured threshold
    PerformanceAlert {
        alert_type: AlertType,
        severity: Severity,
        metric: String,
        threshold: f64,
        actual_value: f64,
        timestamp: DateTime<Utc>,
    },
}

impl PulseEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            PulseEvent::ValidationFailed { .. } => "ValidationFailed",
            PulseEvent::FlowDropOff { .. } => "FlowDropOff",
            PulseEvent::FlowCompleted { .. } => "FlowCompleted",
            PulseEvent::JourneyDropOff { .. } => "JourneyDropOff",
            PulseEvent::PerformanceAlert { .. } => "PerformanceAlert",
        }
    }
}

/// One-to-many event broadcaster backed by `tokio::sync::broadcast`
///
/// Subscribers receive events emitted after subscription; slow subscribers
/// lose the oldest buffered events rather than applying backpressure to the
/// emitting component.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PulseEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PulseEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PulseEvent,
    ) -> Result<usize, broadcast::error::SendError<PulseEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// This is the normal emission path inside the engine: observations are
    /// fire-and-forget and never gate the ingestion call that produced them.
    pub fn emit_lossy(&self, event: PulseEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_alert_event() -> PulseEvent {
        PulseEvent::PerformanceAlert {
            alert_type: AlertType::SlowResponse,
            severity: Severity::Medium,
            metric: "api_response_time".to_string(),
            threshold: 2000.0,
            actual_value: 2500.0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_emit_lossy_without_subscribers() {
        let bus = EventBus::new(16);
        // Must not panic or error with nobody listening
        bus.emit_lossy(sample_alert_event());
    }

    #[tokio::test]
    async fn test_emit_with_subscriber() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        assert!(bus.emit(sample_alert_event()).is_ok());

        let received = rx.recv().await.unwrap();
        match received {
            PulseEvent::PerformanceAlert {
                alert_type,
                actual_value,
                ..
            } => {
                assert_eq!(alert_type, AlertType::SlowResponse);
                assert_eq!(actual_value, 2500.0);
            }
            other => panic!("wrong event type received: {}", other.event_type()),
        }
    }

    #[test]
    fn test_emit_no_subscribers_errors() {
        let bus = EventBus::new(16);
        assert!(bus.emit(sample_alert_event()).is_err());
    }

    #[test]
    fn test_event_serialization_tagged() {
        let json = serde_json::to_string(&sample_alert_event()).unwrap();
        assert!(json.contains("\"type\":\"PerformanceAlert\""));
        assert!(json.contains("\"alert_type\":\"slow_response\""));

        let parsed: PulseEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event_type(), "PerformanceAlert");
    }

    #[test]
    fn test_alert_type_display() {
        assert_eq!(AlertType::SlowResponse.to_string(), "slow_response");
        assert_eq!(AlertType::MemoryLeak.to_string(), "memory_leak");
        assert_eq!(AlertType::ErrorSpike.to_string(), "error_spike");
        assert_eq!(AlertType::Degradation.to_string(), "degradation");
    }
}
