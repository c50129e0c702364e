use std::any::Any;

use super::PanelId;
use crate::error::Result;
use crate::host::{NodeId, UiHost};
use crate::input::{BindingId, InputBindings, InputContext, InputPhase};
use crate::manager::PanelCommands;

/// Upcast helper so `dyn PanelBehavior` can be downcast to its concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Application logic attached to a panel. All hooks are optional.
pub trait PanelBehavior: AsAny {
    fn name(&self) -> &str {
        "panel"
    }

    /// Runs once, after the node is attached and before the first open.
    fn on_initialize(&mut self, _setup: &mut PanelSetup<'_>) -> Result<()> {
        Ok(())
    }

    fn on_open(&mut self, _panel: PanelId) {}

    fn on_close(&mut self, _panel: PanelId) {}

    fn on_activation_changed(&mut self, _panel: PanelId, _active: bool) {}
}

/// Handed to [`PanelBehavior::on_initialize`].
pub struct PanelSetup<'a> {
    pub(crate) id: PanelId,
    pub(crate) node: NodeId,
    pub(crate) host: &'a mut dyn UiHost,
    pub(crate) bindings: &'a mut InputBindings,
    pub(crate) cancel_action: &'a str,
}

impl<'a> PanelSetup<'a> {
    pub fn id(&self) -> PanelId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn host(&mut self) -> &mut dyn UiHost {
        &mut *self.host
    }

    pub fn bindings(&mut self) -> &mut InputBindings {
        self.bindings
    }

    pub fn register_input<F>(&mut self, action: &str, phase: InputPhase, callback: F) -> BindingId
    where
        F: FnMut(&mut InputContext<'_>) -> Result<()> + 'static,
    {
        self.bindings.register(action, phase, callback)
    }

    pub fn register_cancel_input<F>(&mut self, phase: InputPhase, callback: F) -> BindingId
    where
        F: FnMut(PanelId, &mut PanelCommands) -> Result<()> + 'static,
    {
        self.bindings.register_cancel(self.cancel_action, phase, callback)
    }
}

/// A freshly built panel: its root node plus the behavior driving it.
pub struct Instance {
    pub node: NodeId,
    pub behavior: Box<dyn PanelBehavior>,
}

impl Instance {
    pub fn new<P: PanelBehavior>(node: NodeId, behavior: P) -> Self {
        Self {
            node,
            behavior: Box::new(behavior),
        }
    }

    pub fn is<P: PanelBehavior>(&self) -> bool {
        AsAny::as_any(&*self.behavior).is::<P>()
    }
}

/// Builds panel instances for a named template.
pub trait PanelTemplate {
    fn instantiate(&self, host: &mut dyn UiHost) -> Result<Instance>;
}

impl<F> PanelTemplate for F
where
    F: Fn(&mut dyn UiHost) -> Result<Instance>,
{
    fn instantiate(&self, host: &mut dyn UiHost) -> Result<Instance> {
        self(host)
    }
}
