use std::collections::HashMap;

use super::{InputContext, InputPhase};
use crate::error::Result;
use crate::manager::PanelCommands;
use crate::panel::PanelId;

pub type InputCallback = Box<dyn FnMut(&mut InputContext<'_>) -> Result<()>>;

/// Handle returned by a registration; removal goes through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

pub(crate) struct Binding {
    pub(crate) id: BindingId,
    pub(crate) phase: InputPhase,
    pub(crate) callback: InputCallback,
}

pub(crate) struct ActionBindings {
    pub(crate) action: String,
    pub(crate) bindings: Vec<Binding>,
}

/// Per-panel callbacks grouped by action, in registration order.
#[derive(Default)]
pub struct InputBindings {
    pub(crate) actions: Vec<ActionBindings>,
    cancel: HashMap<BindingId, String>,
    next_id: u64,
}

impl InputBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, action: &str, phase: InputPhase, callback: F) -> BindingId
    where
        F: FnMut(&mut InputContext<'_>) -> Result<()> + 'static,
    {
        self.next_id += 1;
        let id = BindingId(self.next_id);
        let binding = Binding {
            id,
            phase,
            callback: Box::new(callback),
        };
        match self.actions.iter_mut().find(|group| group.action == action) {
            Some(group) => group.bindings.push(binding),
            None => self.actions.push(ActionBindings {
                action: action.to_string(),
                bindings: vec![binding],
            }),
        }
        id
    }

    /// Returns false when nothing was registered under `id` for `action`.
    pub fn remove(&mut self, action: &str, id: BindingId) -> bool {
        let Some(index) = self.actions.iter().position(|group| group.action == action) else {
            return false;
        };
        let group = &mut self.actions[index];
        let before = group.bindings.len();
        group.bindings.retain(|binding| binding.id != id);
        let removed = group.bindings.len() != before;
        if group.bindings.is_empty() {
            self.actions.remove(index);
        }
        if removed {
            self.cancel.remove(&id);
        }
        removed
    }

    /// Binds a no-argument style callback to the cancel action. The callback
    /// sees only the panel id and the command queue.
    pub fn register_cancel<F>(
        &mut self,
        cancel_action: &str,
        phase: InputPhase,
        mut callback: F,
    ) -> BindingId
    where
        F: FnMut(PanelId, &mut PanelCommands) -> Result<()> + 'static,
    {
        let id = self.register(cancel_action, phase, move |ctx| {
            let panel = ctx.panel();
            callback(panel, ctx.commands())
        });
        self.cancel.insert(id, cancel_action.to_string());
        id
    }

    /// Removes a cancel binding under whatever action was the cancel action
    /// when it was registered.
    pub fn remove_cancel(&mut self, id: BindingId) -> bool {
        match self.cancel.get(&id).cloned() {
            Some(action) => self.remove(&action, id),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.actions.iter().map(|group| group.bindings.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn bindings_for(&self, action: &str) -> usize {
        self.actions
            .iter()
            .find(|group| group.action == action)
            .map_or(0, |group| group.bindings.len())
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|group| group.action.as_str())
    }

    pub fn clear(&mut self) {
        self.actions.clear();
        self.cancel.clear();
    }
}

impl std::fmt::Debug for InputBindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputBindings")
            .field("actions", &self.actions().collect::<Vec<_>>())
            .field("bindings", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_by_action_in_registration_order() {
        let mut bindings = InputBindings::new();
        bindings.register("confirm", InputPhase::Pressed, |_| Ok(()));
        bindings.register("cancel", InputPhase::Pressed, |_| Ok(()));
        bindings.register("confirm", InputPhase::Released, |_| Ok(()));

        assert_eq!(bindings.actions().collect::<Vec<_>>(), vec!["confirm", "cancel"]);
        assert_eq!(bindings.bindings_for("confirm"), 2);
        assert_eq!(bindings.len(), 3);
    }

    #[test]
    fn removing_last_binding_drops_the_group() {
        let mut bindings = InputBindings::new();
        let id = bindings.register("confirm", InputPhase::Any, |_| Ok(()));
        assert!(!bindings.remove("cancel", id));
        assert!(bindings.remove("confirm", id));
        assert!(bindings.is_empty());
        assert!(!bindings.remove("confirm", id));
    }

    #[test]
    fn cancel_binding_is_removed_through_its_original_handle() {
        let mut bindings = InputBindings::new();
        let id = bindings.register_cancel("ui_cancel", InputPhase::Pressed, |_, _| Ok(()));
        assert_eq!(bindings.bindings_for("ui_cancel"), 1);

        assert!(bindings.remove_cancel(id));
        assert_eq!(bindings.bindings_for("ui_cancel"), 0);
        assert!(!bindings.remove_cancel(id));
    }
}
