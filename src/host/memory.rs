use std::collections::HashMap;

use super::{Interaction, NodeId, UiHost};
use crate::error::{PanelError, Result};

#[derive(Debug, Clone)]
struct NodeData {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    visible: bool,
    interaction: Option<Interaction>,
}

/// In-memory node tree implementing [`UiHost`].
#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: HashMap<NodeId, NodeData>,
    next_id: u64,
    root: Option<NodeId>,
    focused: Option<NodeId>,
    freed: Vec<NodeId>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plain container node.
    pub fn create_node(&mut self, name: impl Into<String>, parent: Option<NodeId>) -> NodeId {
        self.insert(name.into(), parent, None)
    }

    /// Adds an interactive element.
    pub fn create_control(
        &mut self,
        name: impl Into<String>,
        parent: Option<NodeId>,
        interaction: Interaction,
    ) -> NodeId {
        self.insert(name.into(), parent, Some(interaction))
    }

    fn insert(
        &mut self,
        name: String,
        parent: Option<NodeId>,
        interaction: Option<Interaction>,
    ) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        let parent = parent.filter(|p| self.nodes.contains_key(p));
        self.nodes.insert(
            id,
            NodeData {
                name,
                parent,
                children: Vec::new(),
                visible: true,
                interaction,
            },
        );
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.push(id);
        }
        id
    }

    /// Moves global focus directly, the way a user click would.
    pub fn set_focus(&mut self, node: Option<NodeId>) {
        self.focused = node.filter(|n| self.nodes.contains_key(n));
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn is_freed(&self, node: NodeId) -> bool {
        self.freed.contains(&node)
    }

    pub fn name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|data| data.name.as_str())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn detach(&mut self, node: NodeId) {
        let parent = self.nodes.get(&node).and_then(|data| data.parent);
        if let Some(siblings) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            siblings.children.retain(|child| *child != node);
        }
    }
}

impl UiHost for MemoryHost {
    fn default_root(&mut self) -> NodeId {
        match self.root {
            Some(root) => root,
            None => {
                let root = self.create_node("root", None);
                self.root = Some(root);
                root
            }
        }
    }

    fn create_element(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        interaction: Option<Interaction>,
    ) -> NodeId {
        self.insert(name.to_string(), parent, interaction)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|data| data.parent)
    }

    fn children(&self, node: NodeId, out: &mut Vec<NodeId>) {
        if let Some(data) = self.nodes.get(&node) {
            out.extend_from_slice(&data.children);
        }
    }

    fn reparent(&mut self, node: NodeId, parent: NodeId) -> Result<()> {
        if !self.nodes.contains_key(&node) || !self.nodes.contains_key(&parent) {
            return Err(PanelError::Host(format!(
                "cannot attach {node} under {parent}: unknown node"
            )));
        }
        if node == parent || self.is_ancestor_of(node, parent) {
            return Err(PanelError::Host(format!(
                "cannot attach {node} under its own descendant {parent}"
            )));
        }
        self.detach(node);
        if let Some(data) = self.nodes.get_mut(&node) {
            data.parent = Some(parent);
        }
        if let Some(data) = self.nodes.get_mut(&parent) {
            data.children.push(node);
        }
        Ok(())
    }

    fn move_to_front(&mut self, node: NodeId) {
        let parent = self.parent(node);
        if let Some(data) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            data.children.retain(|child| *child != node);
            data.children.push(node);
        }
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) {
        if let Some(data) = self.nodes.get_mut(&node) {
            data.visible = visible;
        }
    }

    fn is_visible(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|data| data.visible)
    }

    fn interaction(&self, node: NodeId) -> Option<Interaction> {
        self.nodes.get(&node).and_then(|data| data.interaction)
    }

    fn set_interaction(&mut self, node: NodeId, interaction: Interaction) {
        if let Some(data) = self.nodes.get_mut(&node) {
            if data.interaction.is_some() {
                data.interaction = Some(interaction);
            }
        }
    }

    fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    fn grab_focus(&mut self, node: NodeId) {
        let focusable = self
            .interaction(node)
            .is_some_and(|i| i.focus != super::FocusMode::None);
        if focusable {
            self.focused = Some(node);
        }
    }

    fn free(&mut self, node: NodeId) {
        if !self.nodes.contains_key(&node) {
            return;
        }
        self.detach(node);
        let mut pending = vec![node];
        while let Some(current) = pending.pop() {
            if let Some(data) = self.nodes.remove(&current) {
                pending.extend(data.children);
                self.freed.push(current);
                if self.focused == Some(current) {
                    self.focused = None;
                }
                if self.root == Some(current) {
                    self.root = None;
                }
            }
        }
    }
}
