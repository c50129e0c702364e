use super::PanelManager;
use crate::bridge::Bridge;
use crate::error::Result;
use crate::host::UiHost;
use crate::panel::{PanelId, PreviousVisual};

/// Where an opened panel goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayerMode {
    /// Push onto the topmost layer, covering only its current top.
    #[default]
    SameLayer,
    /// Start a new layer, suspending every panel of the current one.
    NewLayer,
}

/// What happens to a panel after it closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClosePolicy {
    /// Destroyed once its close transition has finished, on the next frame.
    #[default]
    Delete,
    /// Parked in the recycle cache for its template.
    Cache,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReusePolicy {
    #[default]
    TryReuse,
    AlwaysNew,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenOptions {
    pub previous: PreviousVisual,
    pub layer: LayerMode,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous(mut self, previous: PreviousVisual) -> Self {
        self.previous = previous;
        self
    }

    pub fn layer(mut self, layer: LayerMode) -> Self {
        self.layer = layer;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CloseOptions {
    pub policy: ClosePolicy,
    /// Accepted for symmetry with [`OpenOptions`]; the revealed panel is
    /// always reactivated and shown.
    pub previous: PreviousVisual,
}

impl CloseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy(mut self, policy: ClosePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn cache() -> Self {
        Self::default().policy(ClosePolicy::Cache)
    }
}

/// Builder returned by [`PanelManager::open`].
#[must_use = "an open request does nothing until submitted"]
pub struct OpenRequest<'m, H: UiHost> {
    manager: &'m mut PanelManager<H>,
    panel: PanelId,
    options: OpenOptions,
}

impl<'m, H: UiHost> OpenRequest<'m, H> {
    pub(crate) fn new(manager: &'m mut PanelManager<H>, panel: PanelId, options: OpenOptions) -> Self {
        Self {
            manager,
            panel,
            options,
        }
    }

    pub fn previous(mut self, previous: PreviousVisual) -> Self {
        self.options.previous = previous;
        self
    }

    pub fn hide_previous(self) -> Self {
        self.previous(PreviousVisual::Hidden)
    }

    pub fn layer(mut self, layer: LayerMode) -> Self {
        self.options.layer = layer;
        self
    }

    pub fn new_layer(self) -> Self {
        self.layer(LayerMode::NewLayer)
    }

    pub fn submit(self) -> Result<()> {
        self.manager.open_panel(self.panel, self.options)
    }

    /// Opens now; the bridge completes when the show transition finishes.
    pub fn submit_async(self) -> Result<Bridge<()>> {
        self.manager.open_async(self.panel, self.options)
    }
}

/// Builder returned by [`PanelManager::close`].
#[must_use = "a close request does nothing until submitted"]
pub struct CloseRequest<'m, H: UiHost> {
    manager: &'m mut PanelManager<H>,
    panel: PanelId,
    options: CloseOptions,
}

impl<'m, H: UiHost> CloseRequest<'m, H> {
    pub(crate) fn new(manager: &'m mut PanelManager<H>, panel: PanelId) -> Self {
        Self {
            manager,
            panel,
            options: CloseOptions::default(),
        }
    }

    pub fn policy(mut self, policy: ClosePolicy) -> Self {
        self.options.policy = policy;
        self
    }

    pub fn cache(self) -> Self {
        self.policy(ClosePolicy::Cache)
    }

    pub fn previous(mut self, previous: PreviousVisual) -> Self {
        self.options.previous = previous;
        self
    }

    pub fn submit(self) -> Result<()> {
        self.manager.close_panel(self.panel, self.options)
    }

    /// Closes now; the bridge completes when the hide transition finishes.
    pub fn submit_async(self) -> Result<Bridge<()>> {
        self.manager.close_async(self.panel, self.options)
    }
}
