use crate::error::{PanelError, Result};
use crate::host::{NodeId, UiHost};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentEntry {
    pub owner: String,
    pub container: NodeId,
}

/// Parent scopes pushed by panels hosting sub-panels. Only the owner of the
/// top scope may pop it.
#[derive(Debug, Default)]
pub struct ParentStack {
    entries: Vec<ParentEntry>,
    default_root: Option<NodeId>,
}

impl ParentStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, owner: impl Into<String>, container: NodeId) {
        self.entries.push(ParentEntry {
            owner: owner.into(),
            container,
        });
    }

    /// Pops the top scope if `requester` owns it; otherwise the stack is
    /// left as it was.
    pub fn pop(&mut self, requester: &str) -> Result<ParentEntry> {
        match self.entries.last() {
            None => Err(PanelError::EmptyParentStack),
            Some(top) if top.owner != requester => Err(PanelError::ParentOwnerMismatch {
                requester: requester.to_string(),
                owner: top.owner.clone(),
            }),
            Some(_) => self.entries.pop().ok_or(PanelError::EmptyParentStack),
        }
    }

    pub fn top(&self) -> Option<&ParentEntry> {
        self.entries.last()
    }

    /// Container new panels attach to. Falls back to the host's default
    /// root, resolved on first use.
    pub fn current_root(&mut self, host: &mut dyn UiHost) -> NodeId {
        if let Some(top) = self.entries.last() {
            return top.container;
        }
        *self.default_root.get_or_insert_with(|| host.default_root())
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.default_root = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    #[test]
    fn foreign_pop_is_rejected_and_stack_unchanged() {
        let mut stack = ParentStack::new();
        stack.push("inventory", NodeId(10));
        stack.push("tooltip", NodeId(11));

        let err = stack.pop("inventory").unwrap_err();
        assert!(matches!(
            err,
            PanelError::ParentOwnerMismatch { ref owner, .. } if owner == "tooltip"
        ));
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.top().map(|e| e.container), Some(NodeId(11)));

        assert_eq!(stack.pop("tooltip").unwrap().container, NodeId(11));
        assert_eq!(stack.pop("inventory").unwrap().owner, "inventory");
        assert!(matches!(stack.pop("inventory"), Err(PanelError::EmptyParentStack)));
    }

    #[test]
    fn current_root_defaults_lazily() {
        let mut host = MemoryHost::new();
        let mut stack = ParentStack::new();
        assert_eq!(host.node_count(), 0);

        let root = stack.current_root(&mut host);
        assert_eq!(host.node_count(), 1);
        assert_eq!(stack.current_root(&mut host), root);

        let container = host.create_node("sidebar", Some(root));
        stack.push("sidebar", container);
        assert_eq!(stack.current_root(&mut host), container);
    }
}
