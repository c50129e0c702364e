//! A panel: one node subtree with a lifecycle, a focus cache and its own
//! input bindings.
//!
//! Panels live in the manager's arena and are addressed by [`PanelId`]. A
//! recycled panel keeps its id, so identity survives a close/reuse cycle.

mod behavior;
mod focus;
mod lifecycle;

pub use behavior::{AsAny, Instance, PanelBehavior, PanelSetup, PanelTemplate};
pub use focus::{CacheOutcome, FocusCache, RestoreCycle};
pub use lifecycle::PanelState;

pub(crate) use lifecycle::{ensure_closable, ensure_initializable, ensure_openable};

use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::host::{DeferredQueue, NodeId, UiHost};
use crate::input::InputBindings;
use crate::pool::ObjectPool;
use crate::signal::PanelSignals;
use crate::transition::{FinishCallback, SharedTransition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PanelId(pub(crate) u64);

impl PanelId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panel#{}", self.0)
    }
}

/// What happens to the panel being covered by a newly opened one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviousVisual {
    #[default]
    Visible,
    Hidden,
}

/// Borrowed manager state a panel needs while its activation changes.
pub(crate) struct PanelEnv<'a> {
    pub(crate) host: &'a mut dyn UiHost,
    pub(crate) deferred: &'a DeferredQueue,
    pub(crate) pool: &'a ObjectPool,
    pub(crate) default_transition: &'a SharedTransition,
    pub(crate) is_panel: &'a dyn Fn(NodeId) -> bool,
}

pub struct Panel {
    id: PanelId,
    template: String,
    node: NodeId,
    state: PanelState,
    shown: bool,
    input_enabled: bool,
    pending_destroy: bool,
    transition: Option<SharedTransition>,
    signals: PanelSignals,
    bindings: InputBindings,
    focus: FocusCache,
    behavior: Box<dyn PanelBehavior>,
}

impl Panel {
    pub(crate) fn new(id: PanelId, template: &str, instance: Instance) -> Self {
        Self {
            id,
            template: template.to_string(),
            node: instance.node,
            state: PanelState::Uninitialized,
            shown: false,
            input_enabled: false,
            pending_destroy: false,
            transition: None,
            signals: PanelSignals::new(),
            bindings: InputBindings::new(),
            focus: FocusCache::new(),
            behavior: instance.behavior,
        }
    }

    pub fn id(&self) -> PanelId {
        self.id
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn name(&self) -> &str {
        self.behavior.name()
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }

    pub fn is_input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn is_pending_destroy(&self) -> bool {
        self.pending_destroy
    }

    pub fn signals(&self) -> &PanelSignals {
        &self.signals
    }

    pub fn bindings(&self) -> &InputBindings {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut InputBindings {
        &mut self.bindings
    }

    pub fn focus(&self) -> &FocusCache {
        &self.focus
    }

    /// Per-panel override; `None` falls back to the manager default.
    pub fn transition(&self) -> Option<&SharedTransition> {
        self.transition.as_ref()
    }

    pub fn set_transition(&mut self, transition: Option<SharedTransition>) {
        self.transition = transition;
    }

    pub fn behavior<P: PanelBehavior>(&self) -> Option<&P> {
        AsAny::as_any(&*self.behavior).downcast_ref::<P>()
    }

    pub fn behavior_mut<P: PanelBehavior>(&mut self) -> Option<&mut P> {
        AsAny::as_any_mut(&mut *self.behavior).downcast_mut::<P>()
    }

    pub(crate) fn dispatch_parts(&mut self) -> (&mut InputBindings, &str) {
        (&mut self.bindings, self.behavior.name())
    }

    pub(crate) fn mark_pending_destroy(&mut self) {
        self.pending_destroy = true;
    }

    pub(crate) fn initialize(&mut self, host: &mut dyn UiHost, cancel_action: &str) -> Result<()> {
        ensure_initializable(self.id, self.state)?;
        let mut setup = PanelSetup {
            id: self.id,
            node: self.node,
            host,
            bindings: &mut self.bindings,
            cancel_action,
        };
        self.behavior.on_initialize(&mut setup)?;
        self.state = PanelState::Initialized;
        Ok(())
    }

    pub(crate) fn mark_opened(&mut self) -> Result<()> {
        ensure_openable(self.id, self.state)?;
        self.state = PanelState::Opened;
        self.signals.renew();
        self.behavior.on_open(self.id);
        Ok(())
    }

    pub(crate) fn mark_closed(&mut self) -> Result<()> {
        ensure_closable(self.id, self.state)?;
        self.signals.close_requested.signal();
        self.state = PanelState::Closed;
        self.input_enabled = false;
        self.behavior.on_close(self.id);
        Ok(())
    }

    /// Covered by another panel: remember focus, lock the subtree, and hide
    /// it when asked to.
    pub(crate) fn deactivate(&mut self, env: &mut PanelEnv<'_>, visual: PreviousVisual) -> CacheOutcome {
        let outcome = self.focus.cache_selection(&*env.host, self.node);
        self.focus
            .disable_tree(&mut *env.host, self.node, env.is_panel, env.pool);
        self.input_enabled = false;
        if visual == PreviousVisual::Hidden && self.shown {
            self.shown = false;
            let effect = self.effect(env.default_transition);
            effect.hide(&mut *env.host, self.node, Box::new(|| {}));
        }
        self.behavior.on_activation_changed(self.id, false);
        outcome
    }

    /// Back on top: unlock the subtree, restore focus and show if hidden.
    /// `on_shown` runs once the panel is visible.
    pub(crate) fn activate(
        &mut self,
        env: &mut PanelEnv<'_>,
        cycle: &mut RestoreCycle,
        on_shown: FinishCallback,
    ) -> bool {
        self.focus
            .enable_tree(&mut *env.host, self.node, env.is_panel, env.pool);
        self.input_enabled = true;
        let restored = self.focus.restore_selection(env.deferred, cycle);
        self.behavior.on_activation_changed(self.id, true);
        if self.shown {
            on_shown();
        } else {
            self.shown = true;
            let effect = self.effect(env.default_transition);
            effect.show(&mut *env.host, self.node, on_shown);
        }
        restored
    }

    /// Shows a panel that stays inactive, used when a suspended layer comes
    /// back and this panel was visible underneath its top.
    pub(crate) fn reveal(&mut self, env: &mut PanelEnv<'_>) {
        if !self.shown {
            self.shown = true;
            let effect = self.effect(env.default_transition);
            effect.show(&mut *env.host, self.node, Box::new(|| {}));
        }
    }

    pub(crate) fn hide_for_close(&mut self, env: &mut PanelEnv<'_>) {
        self.shown = false;
        let finished = self.signals.close_finished.clone();
        let effect = self.effect(env.default_transition);
        effect.hide(&mut *env.host, self.node, Box::new(move || finished.signal()));
    }

    fn effect(&self, default: &SharedTransition) -> SharedTransition {
        self.transition.clone().unwrap_or_else(|| Rc::clone(default))
    }
}

impl fmt::Debug for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Panel")
            .field("id", &self.id)
            .field("template", &self.template)
            .field("node", &self.node)
            .field("state", &self.state)
            .field("shown", &self.shown)
            .field("input_enabled", &self.input_enabled)
            .field("pending_destroy", &self.pending_destroy)
            .finish_non_exhaustive()
    }
}
