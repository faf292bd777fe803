//! Segment event bus — trait for emitting analytics notifications of
//! chosen segments.
//!
//! The personalization layer accepts an `Arc<dyn EventSink>`; sinks are
//! best-effort and must never block or fail the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Analytics notification emitted after a segment has been chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentEvent {
    pub event_id: Uuid,
    pub session_id: String,
    pub segment: String,
    pub confidence: f64,
    /// True when the segment came from the error fallback rather than scoring.
    pub fallback: bool,
    pub timestamp: DateTime<Utc>,
}

impl SegmentEvent {
    pub fn new(
        session_id: impl Into<String>,
        segment: impl Into<String>,
        confidence: f64,
        fallback: bool,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            session_id: session_id.into(),
            segment: segment.into(),
            confidence,
            fallback,
            timestamp,
        }
    }
}

/// Trait for emitting segment events. Implementations route events to a
/// batched file writer or an in-memory buffer for tests.
///
/// `emit` should not panic. The personalizer contains a panic that does
/// escape, so the visitor still gets their segment.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SegmentEvent);
}

/// No-op sink for callers that don't record analytics.
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _event: SegmentEvent) {}
}

/// In-memory sink that captures events for testing.
#[derive(Default)]
pub struct CaptureSink {
    events: Mutex<Vec<SegmentEvent>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<SegmentEvent> {
        self.events.lock().expect("event bus mutex poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().expect("event bus mutex poisoned").len()
    }

    pub fn clear(&self) {
        self.events.lock().expect("event bus mutex poisoned").clear();
    }
}

impl EventSink for CaptureSink {
    fn emit(&self, event: SegmentEvent) {
        self.events.lock().expect("event bus mutex poisoned").push(event);
    }
}

/// Convenience: create a no-op sink.
pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpSink)
}

/// Convenience: create a capture sink for tests.
pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_sink() {
        let sink = capture_sink();
        assert_eq!(sink.count(), 0);

        let now = Utc::now();
        sink.emit(SegmentEvent::new("s-1", "new_visitor", 0.9, false, now));
        sink.emit(SegmentEvent::new("s-2", "new_visitor", 0.1, true, now));

        assert_eq!(sink.count(), 2);
        let events = sink.events();
        assert_eq!(events[0].session_id, "s-1");
        assert!(events[1].fallback);

        sink.clear();
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_noop_sink_discards() {
        let event = SegmentEvent::new("s-1", "price_conscious", 0.9, false, Utc::now());
        noop_sink().emit(event);
    }
}
