//! Callback-to-future bridge.
//!
//! A [`Bridge`] wraps an operation that reports completion through a callback
//! (a [`Completer`]) and exposes it as a single-use completion handle. The
//! operation is started lazily on the first poll-like call and runs exactly
//! once. The result can be taken once, either by `.await`, by
//! [`Bridge::into_result`], or by [`Bridge::get_result`]; afterwards the
//! shared state goes back to the [`ObjectPool`](crate::pool::ObjectPool) it came from.

mod core;

pub use self::core::{Bridge, Completer};
pub(crate) use self::core::panic_message;
