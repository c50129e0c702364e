use std::cell::RefCell;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::error::{PanelError, Result};
use crate::logging::{BRIDGE_TARGET, LogLevel, Logger, json_kv};
use crate::pool::ObjectPool;

type Operation<T> = Box<dyn FnOnce(Completer<T>)>;
type Continuation = Box<dyn FnOnce()>;
type SharedState<T> = Rc<RefCell<BridgeState<T>>>;

struct BridgeState<T> {
    completed: bool,
    result: Option<T>,
    continuation: Option<Continuation>,
    waker: Option<Waker>,
}

impl<T> Default for BridgeState<T> {
    fn default() -> Self {
        Self {
            completed: false,
            result: None,
            continuation: None,
            waker: None,
        }
    }
}

impl<T> BridgeState<T> {
    fn reset(&mut self) {
        self.completed = false;
        self.result = None;
        self.continuation = None;
        self.waker = None;
    }
}

/// Completion callback handed to the wrapped operation. Consumed on use, so
/// an operation can complete its bridge at most once.
pub struct Completer<T> {
    state: SharedState<T>,
}

impl<T> Completer<T> {
    pub fn complete(self, value: T) {
        let (continuation, waker) = {
            let mut state = self.state.borrow_mut();
            state.result = Some(value);
            state.completed = true;
            (state.continuation.take(), state.waker.take())
        };
        if let Some(continuation) = continuation {
            continuation();
        }
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

/// Single-use awaitable over a callback-driven operation.
///
/// `state` is `None` once the result has been consumed; every method checks
/// it first and reports [`PanelError::BridgeConsumed`].
pub struct Bridge<T: 'static> {
    state: Option<SharedState<T>>,
    operation: Option<Operation<T>>,
    pool: Option<ObjectPool>,
    logger: Option<Logger>,
}

impl<T: 'static> Bridge<T> {
    pub fn new<F>(operation: F) -> Self
    where
        F: FnOnce(Completer<T>) + 'static,
    {
        Self {
            state: Some(Rc::new(RefCell::new(BridgeState::default()))),
            operation: Some(Box::new(operation)),
            pool: None,
            logger: None,
        }
    }

    /// Like [`Bridge::new`], but the shared state is drawn from and returned
    /// to `pool`.
    pub fn pooled<F>(pool: &ObjectPool, operation: F) -> Self
    where
        F: FnOnce(Completer<T>) + 'static,
    {
        let state: SharedState<T> = pool.get(|| Rc::new(RefCell::new(BridgeState::default())));
        Self {
            state: Some(state),
            operation: Some(Box::new(operation)),
            pool: Some(pool.clone()),
            logger: None,
        }
    }

    /// A bridge that is already complete with `value`.
    pub fn ready(value: T) -> Self {
        Self::new(move |completer| completer.complete(value))
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    fn shared(&self) -> Result<&SharedState<T>> {
        self.state.as_ref().ok_or(PanelError::BridgeConsumed)
    }

    fn ensure_started(&mut self) -> Result<()> {
        let state = Rc::clone(self.shared()?);
        if let Some(operation) = self.operation.take() {
            operation(Completer { state });
        }
        Ok(())
    }

    /// Starts the operation if needed and reports whether it has finished.
    pub fn is_completed(&mut self) -> Result<bool> {
        self.ensure_started()?;
        Ok(self.shared()?.borrow().completed)
    }

    /// Takes the result. Fails before completion and on every call after the
    /// first successful one.
    pub fn get_result(&mut self) -> Result<T> {
        if !self.is_completed()? {
            return Err(PanelError::BridgeNotCompleted);
        }
        let state = self.state.take().ok_or(PanelError::BridgeConsumed)?;
        let value = state.borrow_mut().result.take();
        self.recycle(state);
        value.ok_or(PanelError::BridgeConsumed)
    }

    pub fn into_result(mut self) -> Result<T> {
        self.get_result()
    }

    /// Runs `continuation` once the operation completes, or right away if it
    /// already has.
    pub fn on_completed<F>(&mut self, continuation: F) -> Result<()>
    where
        F: FnOnce() + 'static,
    {
        self.ensure_started()?;
        {
            let mut state = self.shared()?.borrow_mut();
            if !state.completed {
                state.continuation = Some(Box::new(continuation));
                return Ok(());
            }
        }
        continuation();
        Ok(())
    }

    /// Fire-and-forget: hands the result to `on_finish` whenever the
    /// operation completes. Errors and panics raised by `on_finish` are logged
    /// and swallowed.
    pub fn start<F>(mut self, on_finish: F) -> Result<()>
    where
        F: FnOnce(T) -> Result<()> + 'static,
    {
        if self.is_completed()? {
            let value = self.get_result()?;
            run_guarded(self.logger.as_ref(), move || on_finish(value));
            return Ok(());
        }

        let state = self.state.take().ok_or(PanelError::BridgeConsumed)?;
        let logger = self.logger.clone();
        // Weak: the state owns this continuation, the completer keeps it alive.
        let handle = Rc::downgrade(&state);
        state.borrow_mut().continuation = Some(Box::new(move || {
            let Some(handle) = handle.upgrade() else {
                return;
            };
            let value = handle.borrow_mut().result.take();
            if let Some(value) = value {
                run_guarded(logger.as_ref(), move || on_finish(value));
            }
        }));
        Ok(())
    }

    fn recycle(&mut self, state: SharedState<T>) {
        state.borrow_mut().reset();
        // The completer may still be alive inside a collaborator; only a
        // state nobody else references can be handed out again.
        if let Some(pool) = self.pool.as_ref() {
            if Rc::strong_count(&state) == 1 {
                pool.collect(state);
            }
        }
    }
}

fn run_guarded<F>(logger: Option<&Logger>, callback: F)
where
    F: FnOnce() -> Result<()>,
{
    let failure = match catch_unwind(AssertUnwindSafe(callback)) {
        Ok(Ok(())) => return,
        Ok(Err(err)) => err.to_string(),
        Err(payload) => panic_message(payload.as_ref()),
    };
    if let Some(logger) = logger {
        logger.emit(
            LogLevel::Error,
            BRIDGE_TARGET,
            "bridge_callback_failed",
            [json_kv("error", failure)],
        );
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}

impl<T: 'static> Future for Bridge<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match this.is_completed() {
            Err(err) => Poll::Ready(Err(err)),
            Ok(true) => Poll::Ready(this.get_result()),
            Ok(false) => {
                if let Ok(state) = this.shared() {
                    state.borrow_mut().waker = Some(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

impl<T: 'static> std::fmt::Debug for Bridge<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("started", &self.operation.is_none())
            .field("consumed", &self.state.is_none())
            .finish()
    }
}
