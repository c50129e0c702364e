//! Input routing for the panel stack.
//!
//! Each panel owns an [`InputBindings`] table of callbacks grouped by action.
//! Only the top panel of the active stack is consulted for an event; an
//! [`ActionMap`] decides which actions the event satisfies.

mod action_map;
mod bindings;
mod dispatch;
mod event;

pub use action_map::{ActionMap, Chord, DEFAULT_ACCEPT_ACTION, DEFAULT_CANCEL_ACTION, KeyActionMap};
pub use bindings::{BindingId, InputBindings, InputCallback};
pub use dispatch::{ActionMatchCache, DispatchOutcome, InputContext};
pub use event::{EventFlow, InputPhase, PanelEvent};

pub(crate) use bindings::ActionBindings;
pub(crate) use dispatch::{DispatchEnv, DispatchTarget, dispatch_bindings};
