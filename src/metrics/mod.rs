use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;

#[derive(Debug, Default, Clone)]
pub struct PanelMetrics {
    created: u64,
    reused: u64,
    opened: u64,
    closed: u64,
    recycled: u64,
    destroyed: u64,
    events_handled: u64,
    events_unhandled: u64,
    callback_failures: u64,
}

impl PanelMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_created(&mut self) {
        self.created = self.created.saturating_add(1);
    }

    pub fn record_reused(&mut self) {
        self.reused = self.reused.saturating_add(1);
    }

    pub fn record_opened(&mut self) {
        self.opened = self.opened.saturating_add(1);
    }

    pub fn record_closed(&mut self) {
        self.closed = self.closed.saturating_add(1);
    }

    pub fn record_recycled(&mut self) {
        self.recycled = self.recycled.saturating_add(1);
    }

    pub fn record_destroyed(&mut self) {
        self.destroyed = self.destroyed.saturating_add(1);
    }

    pub fn record_event(&mut self, handled: bool) {
        if handled {
            self.events_handled = self.events_handled.saturating_add(1);
        } else {
            self.events_unhandled = self.events_unhandled.saturating_add(1);
        }
    }

    pub fn record_callback_failures(&mut self, count: usize) {
        if count > 0 {
            self.callback_failures = self.callback_failures.saturating_add(count as u64);
        }
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            created: self.created,
            reused: self.reused,
            opened: self.opened,
            closed: self.closed,
            recycled: self.recycled,
            destroyed: self.destroyed,
            events_handled: self.events_handled,
            events_unhandled: self.events_unhandled,
            callback_failures: self.callback_failures,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub created: u64,
    pub reused: u64,
    pub opened: u64,
    pub closed: u64,
    pub recycled: u64,
    pub destroyed: u64,
    pub events_handled: u64,
    pub events_unhandled: u64,
    pub callback_failures: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "panel_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("created".to_string(), json!(self.created));
        map.insert("reused".to_string(), json!(self.reused));
        map.insert("opened".to_string(), json!(self.opened));
        map.insert("closed".to_string(), json!(self.closed));
        map.insert("recycled".to_string(), json!(self.recycled));
        map.insert("destroyed".to_string(), json!(self.destroyed));
        map.insert("events_handled".to_string(), json!(self.events_handled));
        map.insert("events_unhandled".to_string(), json!(self.events_unhandled));
        map.insert("callback_failures".to_string(), json!(self.callback_failures));
        map
    }
}
