use std::time::Duration;

use serde_json::json;

use crate::logging::{LogEvent, LogFields, LogLevel};

/// Counters accumulated by the runtime loop and snapshotted on an interval.
#[derive(Debug, Default, Clone)]
pub struct RuntimeMetrics {
    events: u64,
    dropped_inputs: u64,
    frames: u64,
    window_repaints: u64,
    ticks: u64,
}

impl RuntimeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&mut self) {
        self.events = self.events.saturating_add(1);
    }

    pub fn record_dropped_input(&mut self) {
        self.dropped_inputs = self.dropped_inputs.saturating_add(1);
    }

    pub fn record_frame(&mut self, repainted_windows: usize) {
        self.frames = self.frames.saturating_add(1);
        self.window_repaints = self
            .window_repaints
            .saturating_add(repainted_windows as u64);
    }

    pub fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            events: self.events,
            dropped_inputs: self.dropped_inputs,
            frames: self.frames,
            window_repaints: self.window_repaints,
            ticks: self.ticks,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub events: u64,
    pub dropped_inputs: u64,
    pub frames: u64,
    pub window_repaints: u64,
    pub ticks: u64,
}

impl MetricSnapshot {
    pub fn as_fields(&self) -> LogFields {
        let mut fields = LogFields::new();
        fields.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        fields.insert("events".to_string(), json!(self.events));
        fields.insert("dropped_inputs".to_string(), json!(self.dropped_inputs));
        fields.insert("frames".to_string(), json!(self.frames));
        fields.insert("window_repaints".to_string(), json!(self.window_repaints));
        fields.insert("ticks".to_string(), json!(self.ticks));
        fields
    }

    pub fn to_log_event(&self, target: &str) -> LogEvent {
        let mut event = LogEvent::new(LogLevel::Info, target, "runtime_metrics");
        event.fields = self.as_fields();
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let mut metrics = RuntimeMetrics::new();
        metrics.record_event();
        metrics.record_event();
        metrics.record_dropped_input();
        metrics.record_frame(3);
        metrics.record_frame(0);
        metrics.record_tick();

        let snapshot = metrics.snapshot(Duration::from_millis(1500));
        assert_eq!(snapshot.uptime_ms, 1500);
        assert_eq!(snapshot.events, 2);
        assert_eq!(snapshot.dropped_inputs, 1);
        assert_eq!(snapshot.frames, 2);
        assert_eq!(snapshot.window_repaints, 3);
        assert_eq!(snapshot.ticks, 1);
    }

    #[test]
    fn snapshot_converts_to_log_event() {
        let mut metrics = RuntimeMetrics::new();
        metrics.record_frame(1);

        let event = metrics
            .snapshot(Duration::from_secs(2))
            .to_log_event("casement::runtime.metrics");
        assert_eq!(event.message, "runtime_metrics");
        assert_eq!(event.fields["frames"], serde_json::json!(1));
        assert_eq!(event.fields["uptime_ms"], serde_json::json!(2000));
    }
}
