use std::fmt;

use super::PanelId;
use crate::error::{PanelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelState {
    Uninitialized,
    Initialized,
    Opened,
    Closed,
}

impl PanelState {
    pub fn can_open(self) -> bool {
        matches!(self, PanelState::Initialized | PanelState::Closed)
    }

    pub fn can_close(self) -> bool {
        self == PanelState::Opened
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PanelState::Uninitialized => "uninitialized",
            PanelState::Initialized => "initialized",
            PanelState::Opened => "opened",
            PanelState::Closed => "closed",
        }
    }
}

impl fmt::Display for PanelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn ensure_initializable(panel: PanelId, state: PanelState) -> Result<()> {
    match state {
        PanelState::Uninitialized => Ok(()),
        from => Err(PanelError::InvalidTransition {
            panel,
            from,
            to: PanelState::Initialized,
        }),
    }
}

pub(crate) fn ensure_openable(panel: PanelId, state: PanelState) -> Result<()> {
    match state {
        PanelState::Uninitialized => Err(PanelError::UninitializedOpen(panel)),
        PanelState::Initialized | PanelState::Closed => Ok(()),
        PanelState::Opened => Err(PanelError::InvalidTransition {
            panel,
            from: PanelState::Opened,
            to: PanelState::Opened,
        }),
    }
}

pub(crate) fn ensure_closable(panel: PanelId, state: PanelState) -> Result<()> {
    if state.can_close() {
        Ok(())
    } else {
        Err(PanelError::InvalidTransition {
            panel,
            from: state,
            to: PanelState::Closed,
        })
    }
}
