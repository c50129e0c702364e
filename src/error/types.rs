use thiserror::Error;

use crate::logging::LoggingError;
use crate::panel::{PanelId, PanelState};

/// Unified result type for the panel stack crate.
pub type Result<T> = std::result::Result<T, PanelError>;

/// Errors surfaced by the panel stack.
///
/// Everything except the logging and configuration variants signals a
/// usage mistake by the caller; the failing operation leaves the stacks
/// untouched.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("panel {0} is uninitialized and cannot be opened")]
    UninitializedOpen(PanelId),
    #[error("panel {panel} cannot move from {from} to {to}")]
    InvalidTransition {
        panel: PanelId,
        from: PanelState,
        to: PanelState,
    },
    #[error("panel {0} is not the top of the active stack")]
    NotTopOfStack(PanelId),
    #[error("panel {0} is scheduled for destruction")]
    PendingDestruction(PanelId),
    #[error("panel {0} not found")]
    PanelNotFound(PanelId),
    #[error("parent scope owned by `{owner}` cannot be popped by `{requester}`")]
    ParentOwnerMismatch { requester: String, owner: String },
    #[error("parent stack is empty")]
    EmptyParentStack,
    #[error("template `{0}` is not registered")]
    TemplateNotFound(String),
    #[error("template `{template}` did not produce a `{expected}`")]
    TemplateTypeMismatch {
        template: String,
        expected: &'static str,
    },
    #[error("bridge result requested before completion")]
    BridgeNotCompleted,
    #[error("bridge has already been consumed")]
    BridgeConsumed,
    #[error("callback failed: {0}")]
    Callback(String),
    #[error("host error: {0}")]
    Host(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Logging(#[from] LoggingError),
}
