//! Show/hide transition effects.
//!
//! An effect must call `on_finish` exactly once per `show`/`hide`, either
//! synchronously or later (for example after an animation spanning several
//! frames). The panel stack hangs its open/close-finished signals off that
//! callback.

use std::rc::Rc;

use crate::host::{NodeId, UiHost};

pub type FinishCallback = Box<dyn FnOnce()>;

pub type SharedTransition = Rc<dyn TransitionEffect>;

pub trait TransitionEffect {
    fn show(&self, host: &mut dyn UiHost, node: NodeId, on_finish: FinishCallback);
    fn hide(&self, host: &mut dyn UiHost, node: NodeId, on_finish: FinishCallback);
}

/// Toggles visibility and finishes immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantTransition;

impl TransitionEffect for InstantTransition {
    fn show(&self, host: &mut dyn UiHost, node: NodeId, on_finish: FinishCallback) {
        host.set_visible(node, true);
        on_finish();
    }

    fn hide(&self, host: &mut dyn UiHost, node: NodeId, on_finish: FinishCallback) {
        host.set_visible(node, false);
        on_finish();
    }
}

pub fn instant() -> SharedTransition {
    Rc::new(InstantTransition)
}
