//! Boundary to the host UI toolkit.
//!
//! The panel stack never owns widgets itself. Everything it needs from the
//! node tree (parenting, visibility, focus and pointer modes, the global focus
//! query, destruction) goes through [`UiHost`]. [`MemoryHost`] is a headless
//! implementation for tests, benches and tooling.

mod deferred;
mod memory;

pub use deferred::{DeferredCall, DeferredQueue};
pub use memory::MemoryHost;

use std::fmt;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// How an element takes keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusMode {
    None,
    Click,
    All,
}

/// How an element reacts to pointer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerMode {
    Stop,
    Pass,
    Ignore,
}

/// Focus and pointer capability of one interactive element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interaction {
    pub focus: FocusMode,
    pub pointer: PointerMode,
}

impl Interaction {
    pub const DISABLED: Interaction = Interaction {
        focus: FocusMode::None,
        pointer: PointerMode::Ignore,
    };

    pub fn new(focus: FocusMode, pointer: PointerMode) -> Self {
        Self { focus, pointer }
    }

    pub fn is_disabled(&self) -> bool {
        self.focus == FocusMode::None && self.pointer == PointerMode::Ignore
    }
}

impl Default for Interaction {
    fn default() -> Self {
        Self::new(FocusMode::All, PointerMode::Stop)
    }
}

/// Node-tree operations the panel stack consumes.
pub trait UiHost {
    /// Container used when no parent scope has been pushed.
    fn default_root(&mut self) -> NodeId;

    /// Builds one node for a panel template. `interaction` is `None` for
    /// plain containers.
    fn create_element(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        interaction: Option<Interaction>,
    ) -> NodeId;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Appends the direct children of `node` to `out`, in tree order.
    fn children(&self, node: NodeId, out: &mut Vec<NodeId>);

    fn reparent(&mut self, node: NodeId, parent: NodeId) -> Result<()>;

    /// Raises `node` above its siblings.
    fn move_to_front(&mut self, node: NodeId);

    fn set_visible(&mut self, node: NodeId, visible: bool);

    fn is_visible(&self, node: NodeId) -> bool;

    /// `None` for nodes that are not interactive elements.
    fn interaction(&self, node: NodeId) -> Option<Interaction>;

    fn set_interaction(&mut self, node: NodeId, interaction: Interaction);

    /// Global focus query.
    fn focused(&self) -> Option<NodeId>;

    fn grab_focus(&mut self, node: NodeId);

    /// Destroys `node` and its subtree.
    fn free(&mut self, node: NodeId);

    fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }
}
