//! One-shot cooperative signals.
//!
//! A [`Signal`] fires at most once. Continuations registered before it fires
//! run in registration order when it does; continuations registered afterwards
//! run immediately. Panels carry three of them so transition effects and
//! deferred cleanup can observe when a panel is asked to close and when its
//! open/close transitions finish.

use std::cell::RefCell;
use std::rc::Rc;

type Continuation = Box<dyn FnOnce()>;

#[derive(Default)]
struct SignalInner {
    signaled: bool,
    continuations: Vec<Continuation>,
}

/// Shared one-shot flag. Clones observe and fire the same signal.
#[derive(Clone, Default)]
pub struct Signal {
    inner: Rc<RefCell<SignalInner>>,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_signaled(&self) -> bool {
        self.inner.borrow().signaled
    }

    /// Fires the signal. Later calls are no-ops.
    pub fn signal(&self) {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            if inner.signaled {
                return;
            }
            inner.signaled = true;
            std::mem::take(&mut inner.continuations)
        };
        // Borrow released: continuations may register on this signal again.
        for continuation in pending {
            continuation();
        }
    }

    pub fn on_signal<F>(&self, continuation: F)
    where
        F: FnOnce() + 'static,
    {
        {
            let mut inner = self.inner.borrow_mut();
            if !inner.signaled {
                inner.continuations.push(Box::new(continuation));
                return;
            }
        }
        continuation();
    }

    pub fn pending(&self) -> usize {
        self.inner.borrow().continuations.len()
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Signal")
            .field("signaled", &inner.signaled)
            .field("pending", &inner.continuations.len())
            .finish()
    }
}

/// The three per-panel cancellation signals, renewed on every open.
#[derive(Debug, Clone, Default)]
pub struct PanelSignals {
    pub close_requested: Signal,
    pub open_finished: Signal,
    pub close_finished: Signal,
}

impl PanelSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all three signals with fresh ones. Holders of the old signals
    /// keep their (possibly already fired) copies.
    pub fn renew(&mut self) {
        *self = Self::new();
    }
}
