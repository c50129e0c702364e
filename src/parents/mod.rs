//! Owner-checked stack of container nodes that newly opened panels attach to.

mod core;

pub use self::core::{ParentEntry, ParentStack};
