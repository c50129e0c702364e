//! Layered modal panel stack for Room hosts.
//!
//! Panels are node subtrees (dialogs, menus, sub-screens) opened on top of
//! each other. The [`PanelManager`] keeps them in LIFO layers, saves and
//! restores focus as panels get covered and uncovered, routes input to the
//! top panel only, and recycles closed panels per template. The host toolkit
//! stays behind the [`UiHost`] trait; [`MemoryHost`] is the headless one.

pub mod bridge;
pub mod error;
pub mod host;
pub mod input;
pub mod logging;
pub mod manager;
pub mod metrics;
pub mod panel;
pub mod parents;
pub mod pool;
pub mod signal;
pub mod transition;

pub use bridge::{Bridge, Completer};
pub use error::{PanelError, Result};
pub use host::{
    DeferredCall, DeferredQueue, FocusMode, Interaction, MemoryHost, NodeId, PointerMode, UiHost,
};
pub use input::{
    ActionMap, ActionMatchCache, BindingId, Chord, DEFAULT_ACCEPT_ACTION, DEFAULT_CANCEL_ACTION,
    DispatchOutcome, EventFlow, InputBindings, InputCallback, InputContext, InputPhase,
    KeyActionMap, PanelEvent,
};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink, NullSink,
};
pub use manager::{
    CloseOptions, ClosePolicy, CloseRequest, LayerMode, ManagerConfig, NullPanelAudit,
    OpenOptions, OpenRequest, PanelAudit, PanelAuditEvent, PanelAuditEventBuilder,
    PanelAuditStage, PanelCommand, PanelCommands, PanelManager, RecordingAudit, ReusePolicy,
};
pub use metrics::{MetricSnapshot, PanelMetrics};
pub use panel::{
    AsAny, CacheOutcome, FocusCache, Instance, Panel, PanelBehavior, PanelId, PanelSetup,
    PanelState, PanelTemplate, PreviousVisual, RestoreCycle,
};
pub use parents::{ParentEntry, ParentStack};
pub use pool::ObjectPool;
pub use signal::{PanelSignals, Signal};
pub use transition::{FinishCallback, InstantTransition, SharedTransition, TransitionEffect};
