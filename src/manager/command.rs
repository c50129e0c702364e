use super::{CloseOptions, OpenOptions};
use crate::panel::PanelId;

/// Stack mutation requested from inside an input callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelCommand {
    Open { panel: PanelId, options: OpenOptions },
    Close { panel: PanelId, options: CloseOptions },
}

/// Commands queued during dispatch. The manager applies them in order once
/// the callbacks have returned, so no callback mutates the stack it is being
/// dispatched from.
#[derive(Debug, Default)]
pub struct PanelCommands {
    queue: Vec<PanelCommand>,
}

impl PanelCommands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, panel: PanelId, options: OpenOptions) {
        self.queue.push(PanelCommand::Open { panel, options });
    }

    pub fn close(&mut self, panel: PanelId, options: CloseOptions) {
        self.queue.push(PanelCommand::Close { panel, options });
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PanelCommand> {
        self.queue.iter()
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, PanelCommand> {
        self.queue.drain(..)
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
