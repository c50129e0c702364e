use std::sync::{Arc, Mutex};

use super::{LayerMode, NullPanelAudit, PanelAudit};
use crate::input::DEFAULT_CANCEL_ACTION;
use crate::logging::Logger;
use crate::metrics::PanelMetrics;

/// Construction-time settings for [`PanelManager`](super::PanelManager).
#[derive(Clone)]
pub struct ManagerConfig {
    /// Action that cancel bindings attach to.
    pub cancel_action: String,
    /// Layer used by [`PanelManager::open`](super::PanelManager::open) unless overridden.
    pub default_layer: LayerMode,
    pub logger: Option<Logger>,
    pub metrics: Option<Arc<Mutex<PanelMetrics>>>,
    pub audit: Arc<dyn PanelAudit>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            cancel_action: DEFAULT_CANCEL_ACTION.to_string(),
            default_layer: LayerMode::SameLayer,
            logger: None,
            metrics: None,
            audit: Arc::new(NullPanelAudit),
        }
    }
}

impl ManagerConfig {
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn PanelAudit>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_cancel_action(mut self, action: impl Into<String>) -> Self {
        self.cancel_action = action.into();
        self
    }

    pub fn with_default_layer(mut self, layer: LayerMode) -> Self {
        self.default_layer = layer;
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(PanelMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<PanelMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}

impl std::fmt::Debug for ManagerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerConfig")
            .field("cancel_action", &self.cancel_action)
            .field("default_layer", &self.default_layer)
            .field("logger", &self.logger.is_some())
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}
