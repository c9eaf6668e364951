//! Telemetry batch payload
//!
//! Wire format accepted by `POST /app/analytics/batch`. Everything except the
//! engagement `content_id` is optional on the wire; validation beyond serde
//! (the required `session_id`) happens in the handler so the client gets the
//! structured `{error}` envelope instead of a deserialization failure.

use serde::{Deserialize, Serialize};

/// One ingestion batch from a client
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchRequest {
    /// Client-generated session token; required, validated in the handler
    pub session_id: Option<String>,
    pub batch_id: Option<String>,
    /// Client-side batch timestamp (ISO 8601); server time when absent
    pub timestamp: Option<String>,
    #[serde(default)]
    pub events: BatchEvents,
    #[serde(default)]
    pub device_info: Option<serde_json::Value>,
}

/// Event categories within a batch
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchEvents {
    #[serde(default)]
    pub engagement: Vec<EngagementEventPayload>,
    #[serde(default)]
    pub performance: Vec<PerfMetricPayload>,
    #[serde(default)]
    pub errors: Vec<ErrorEventPayload>,
    /// Navigation events are counted but not persisted
    #[serde(default)]
    pub navigation: Vec<serde_json::Value>,
}

/// One exposure-to-exit cycle for one feed slot
#[derive(Debug, Clone, Deserialize)]
pub struct EngagementEventPayload {
    pub item_id: Option<String>,
    pub content_id: String,
    pub content_type: Option<String>,
    pub timestamp: Option<String>,
    pub dwell_time_ms: Option<i64>,
    pub viewport_percentage: Option<f64>,
    pub video_watch_percentage: Option<f64>,
    #[serde(default)]
    pub actions: Vec<ActionPayload>,
    #[serde(default)]
    pub gestures: Vec<serde_json::Value>,
    pub exit_action: Option<String>,
    pub swipe_velocity: Option<f64>,
}

impl EngagementEventPayload {
    /// Dwell time, treating absent as zero
    pub fn dwell_ms(&self) -> i64 {
        self.dwell_time_ms.unwrap_or(0)
    }

    /// Whether any action of the given type is present
    pub fn has_action(&self, action_type: &str) -> bool {
        self.actions.iter().any(|a| a.action_type == action_type)
    }
}

/// A typed user action inside an engagement event (like, share, save, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPayload {
    #[serde(rename = "type")]
    pub action_type: String,
    /// Action-specific extras, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// One client performance metric, stored verbatim
#[derive(Debug, Clone, Deserialize)]
pub struct PerfMetricPayload {
    #[serde(rename = "type")]
    pub metric_type: Option<String>,
    pub value: Option<f64>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    pub timestamp: Option<String>,
}

/// One client-side error report, stored verbatim
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEventPayload {
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub message: Option<String>,
    pub stack_trace: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    pub timestamp: Option<String>,
}

/// Per-category insert counts reported back to the client
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ProcessedCounts {
    pub engagement: u64,
    pub performance: u64,
    pub errors: u64,
    pub navigation: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_batch_deserializes() {
        let batch: BatchRequest = serde_json::from_str(r#"{"session_id": "s1"}"#).unwrap();
        assert_eq!(batch.session_id.as_deref(), Some("s1"));
        assert!(batch.events.engagement.is_empty());
        assert!(batch.batch_id.is_none());
    }

    #[test]
    fn engagement_event_with_actions() {
        let raw = r#"{
            "session_id": "s1",
            "events": {
                "engagement": [{
                    "content_id": "c1",
                    "dwell_time_ms": 6000,
                    "actions": [{"type": "like"}]
                }]
            }
        }"#;
        let batch: BatchRequest = serde_json::from_str(raw).unwrap();
        let event = &batch.events.engagement[0];
        assert_eq!(event.content_id, "c1");
        assert_eq!(event.dwell_ms(), 6000);
        assert!(event.has_action("like"));
        assert!(!event.has_action("share"));
    }

    #[test]
    fn unknown_event_fields_are_ignored() {
        let raw = r#"{
            "session_id": "s1",
            "events": {
                "engagement": [{"content_id": "c1", "future_field": 42}]
            }
        }"#;
        let batch: BatchRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(batch.events.engagement.len(), 1);
    }
}
