use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::{NodeId, UiHost};
use crate::panel::PanelId;

/// Work postponed until the host says it is safe, usually the next frame.
pub enum DeferredCall {
    GrabFocus(NodeId),
    DestroyPanel(PanelId),
    Call(Box<dyn FnOnce(&mut dyn UiHost)>),
}

impl std::fmt::Debug for DeferredCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeferredCall::GrabFocus(node) => f.debug_tuple("GrabFocus").field(node).finish(),
            DeferredCall::DestroyPanel(panel) => {
                f.debug_tuple("DestroyPanel").field(panel).finish()
            }
            DeferredCall::Call(_) => f.write_str("Call(..)"),
        }
    }
}

/// FIFO of deferred calls. Clones push into the same queue, so signal
/// continuations can schedule work without holding the manager.
#[derive(Clone, Default)]
pub struct DeferredQueue {
    inner: Rc<RefCell<VecDeque<DeferredCall>>>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn defer(&self, call: DeferredCall) {
        self.inner.borrow_mut().push_back(call);
    }

    pub fn defer_fn<F>(&self, call: F)
    where
        F: FnOnce(&mut dyn UiHost) + 'static,
    {
        self.defer(DeferredCall::Call(Box::new(call)));
    }

    pub fn pop(&self) -> Option<DeferredCall> {
        self.inner.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

impl std::fmt::Debug for DeferredQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("pending", &self.len())
            .finish()
    }
}
