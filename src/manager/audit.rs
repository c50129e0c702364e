//! Panel lifecycle audit hooks.
//!
//! The manager reports each lifecycle checkpoint as a [`PanelAuditEvent`] so
//! callers can buffer, log or assert on the sequence without hooking the
//! panels themselves.

use std::sync::Mutex;
use std::time::SystemTime;

use serde_json::Value;

use crate::panel::PanelId;

/// Lifecycle checkpoints emitted by `PanelManager`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAuditStage {
    /// A template produced a new panel.
    Created,
    /// A cached panel was handed out again.
    Reused,
    Opened,
    /// Covered by a newly opened panel.
    Deactivated,
    /// Back on top after the panel above it closed.
    Activated,
    Closed,
    /// Closed with the cache policy and parked for reuse.
    Recycled,
    Destroyed,
    ParentPushed,
    ParentPopped,
}

#[derive(Debug, Clone)]
pub struct PanelAuditEvent {
    pub timestamp: SystemTime,
    pub stage: PanelAuditStage,
    pub panel: Option<PanelId>,
    pub details: Vec<(String, Value)>,
}

impl PanelAuditEvent {
    fn new(stage: PanelAuditStage) -> Self {
        Self {
            timestamp: SystemTime::now(),
            stage,
            panel: None,
            details: Vec::new(),
        }
    }
}

pub struct PanelAuditEventBuilder {
    event: PanelAuditEvent,
}

impl PanelAuditEventBuilder {
    pub fn new(stage: PanelAuditStage) -> Self {
        Self {
            event: PanelAuditEvent::new(stage),
        }
    }

    pub fn panel(&mut self, panel: PanelId) -> &mut Self {
        self.event.panel = Some(panel);
        self
    }

    pub fn detail(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.event.details.push((key.into(), value));
        self
    }

    pub fn finish(self) -> PanelAuditEvent {
        self.event
    }
}

pub trait PanelAudit: Send + Sync {
    fn record(&self, event: PanelAuditEvent);
}

#[derive(Debug, Default)]
pub struct NullPanelAudit;

impl PanelAudit for NullPanelAudit {
    fn record(&self, _event: PanelAuditEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingAudit {
    events: Mutex<Vec<PanelAuditEvent>>,
}

impl RecordingAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PanelAuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn stages(&self) -> Vec<PanelAuditStage> {
        self.events().into_iter().map(|event| event.stage).collect()
    }

    pub fn stages_for(&self, panel: PanelId) -> Vec<PanelAuditStage> {
        self.events()
            .into_iter()
            .filter(|event| event.panel == Some(panel))
            .map(|event| event.stage)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.events.lock() {
            guard.clear();
        }
    }
}

impl PanelAudit for RecordingAudit {
    fn record(&self, event: PanelAuditEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_collects_details() {
        let mut builder = PanelAuditEventBuilder::new(PanelAuditStage::Opened);
        builder.panel(PanelId(4)).detail("layer", json!(1));
        let event = builder.finish();
        assert_eq!(event.panel, Some(PanelId(4)));
        assert_eq!(event.details, vec![("layer".to_string(), json!(1))]);
    }

    #[test]
    fn recording_audit_filters_by_panel() {
        let audit = RecordingAudit::new();
        for (stage, panel) in [
            (PanelAuditStage::Created, PanelId(1)),
            (PanelAuditStage::Created, PanelId(2)),
            (PanelAuditStage::Opened, PanelId(1)),
        ] {
            let mut builder = PanelAuditEventBuilder::new(stage);
            builder.panel(panel);
            audit.record(builder.finish());
        }
        assert_eq!(
            audit.stages_for(PanelId(1)),
            vec![PanelAuditStage::Created, PanelAuditStage::Opened]
        );
        assert_eq!(audit.stages().len(), 3);
    }
}
