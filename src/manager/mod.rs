//! The panel stack orchestrator.
//!
//! [`PanelManager`] owns every panel in an arena keyed by [`PanelId`] and
//! keeps them in layers of LIFO stacks. Only the top panel of the topmost
//! layer is active: it receives input and keeps its subtree interactive.
//! Opening a panel covers (and deactivates) the previous top, closing the
//! top reactivates whatever it covered.
//!
//! Work that must not run mid-operation (focus grabs, destruction of closed
//! panels) goes through the deferred queue and runs in
//! [`PanelManager::process_frame`].

mod audit;
mod command;
mod config;
mod requests;

pub use audit::{
    NullPanelAudit, PanelAudit, PanelAuditEvent, PanelAuditEventBuilder, PanelAuditStage,
    RecordingAudit,
};
pub use command::{PanelCommand, PanelCommands};
pub use config::ManagerConfig;
pub use requests::{
    CloseOptions, ClosePolicy, CloseRequest, LayerMode, OpenOptions, OpenRequest, ReusePolicy,
};

use std::any::type_name;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::bridge::Bridge;
use crate::error::{PanelError, Result};
use crate::host::{DeferredCall, DeferredQueue, NodeId, UiHost};
use crate::input::{
    ActionMap, BindingId, DispatchEnv, DispatchTarget, EventFlow, InputContext, InputPhase,
    KeyActionMap, PanelEvent, dispatch_bindings,
};
use crate::logging::{LogLevel, MANAGER_TARGET, METRICS_TARGET, json_kv};
use crate::metrics::PanelMetrics;
use crate::panel::{
    Instance, Panel, PanelBehavior, PanelEnv, PanelId, PanelState, PanelTemplate, PreviousVisual,
    RestoreCycle, ensure_closable, ensure_openable,
};
use crate::parents::{ParentEntry, ParentStack};
use crate::pool::ObjectPool;
use crate::signal::Signal;
use crate::transition::{FinishCallback, SharedTransition, instant};

/// A panel of a layer that was covered by a newer layer, and how it looked.
#[derive(Debug, Clone, Copy)]
struct Suspended {
    panel: PanelId,
    was_active: bool,
    was_shown: bool,
}

#[derive(Debug, Default)]
struct Layer {
    panels: Vec<PanelId>,
    suspended: Vec<Suspended>,
}

pub struct PanelManager<H: UiHost> {
    host: H,
    config: ManagerConfig,
    actions: Box<dyn ActionMap>,
    templates: HashMap<String, Box<dyn PanelTemplate>>,
    panels: HashMap<PanelId, Panel>,
    panel_nodes: HashMap<NodeId, PanelId>,
    layers: Vec<Layer>,
    parents: ParentStack,
    recycle: HashMap<String, Vec<PanelId>>,
    default_transition: SharedTransition,
    deferred: DeferredQueue,
    pool: ObjectPool,
    next_panel: u64,
}

impl<H: UiHost> PanelManager<H> {
    /// Manager with the default key bindings and configuration.
    pub fn new(host: H) -> Self {
        Self::with_config(host, KeyActionMap::with_defaults(), ManagerConfig::default())
    }

    pub fn with_config<A>(host: H, actions: A, config: ManagerConfig) -> Self
    where
        A: ActionMap + 'static,
    {
        Self {
            host,
            config,
            actions: Box::new(actions),
            templates: HashMap::new(),
            panels: HashMap::new(),
            panel_nodes: HashMap::new(),
            layers: Vec::new(),
            parents: ParentStack::new(),
            recycle: HashMap::new(),
            default_transition: instant(),
            deferred: DeferredQueue::new(),
            pool: ObjectPool::new(),
            next_panel: 0,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn pool(&self) -> &ObjectPool {
        &self.pool
    }

    pub fn deferred(&self) -> &DeferredQueue {
        &self.deferred
    }

    pub fn set_action_map<A>(&mut self, actions: A)
    where
        A: ActionMap + 'static,
    {
        self.actions = Box::new(actions);
    }

    pub fn register_template<T>(&mut self, name: impl Into<String>, template: T)
    where
        T: PanelTemplate + 'static,
    {
        self.templates.insert(name.into(), Box::new(template));
    }

    pub fn register_template_fn<F>(&mut self, name: impl Into<String>, build: F)
    where
        F: Fn(&mut dyn UiHost) -> Result<Instance> + 'static,
    {
        self.register_template(name, build);
    }

    pub fn default_transition(&self) -> SharedTransition {
        Rc::clone(&self.default_transition)
    }

    pub fn set_default_transition(&mut self, transition: SharedTransition) {
        self.default_transition = transition;
    }

    /// Overrides the transition of one panel; `None` restores the default.
    pub fn set_panel_transition(
        &mut self,
        panel: PanelId,
        transition: Option<SharedTransition>,
    ) -> Result<()> {
        self.panel_entry(panel)?.set_transition(transition);
        Ok(())
    }

    pub fn cancel_action(&self) -> &str {
        &self.config.cancel_action
    }

    /// Affects cancel bindings registered from now on.
    pub fn set_cancel_action(&mut self, action: impl Into<String>) {
        self.config.cancel_action = action.into();
    }

    pub fn push_parent(&mut self, owner: impl Into<String>, container: NodeId) {
        let owner = owner.into();
        self.audit(
            PanelAuditStage::ParentPushed,
            None,
            [
                json_kv("owner", owner.as_str()),
                json_kv("container", container.0),
            ],
        );
        self.log(
            LogLevel::Debug,
            "parent_pushed",
            [
                json_kv("owner", owner.as_str()),
                json_kv("depth", self.parents.depth() + 1),
            ],
        );
        self.parents.push(owner, container);
    }

    pub fn pop_parent(&mut self, requester: &str) -> Result<ParentEntry> {
        let entry = self.parents.pop(requester)?;
        self.audit(
            PanelAuditStage::ParentPopped,
            None,
            [json_kv("owner", entry.owner.as_str())],
        );
        self.log(
            LogLevel::Debug,
            "parent_popped",
            [
                json_kv("owner", entry.owner.as_str()),
                json_kv("depth", self.parents.depth()),
            ],
        );
        Ok(entry)
    }

    pub fn current_root(&mut self) -> NodeId {
        self.parents.current_root(&mut self.host)
    }

    pub fn parent_depth(&self) -> usize {
        self.parents.depth()
    }

    pub fn create<P: PanelBehavior>(&mut self, template: &str) -> Result<PanelId> {
        self.create_panel::<P, _>(template, ReusePolicy::TryReuse, |_| {})
    }

    /// Hands out a panel of type `P` from `template`, recycled when the
    /// policy allows and the cache has one. `init` runs on the behavior
    /// before a fresh panel initializes, and on every reuse.
    pub fn create_panel<P, F>(&mut self, template: &str, policy: ReusePolicy, init: F) -> Result<PanelId>
    where
        P: PanelBehavior,
        F: FnOnce(&mut P),
    {
        if policy == ReusePolicy::TryReuse {
            if let Some(id) = self.take_cached::<P>(template) {
                if let Some(behavior) = self.panel_entry(id)?.behavior_mut::<P>() {
                    init(behavior);
                }
                self.with_metrics(PanelMetrics::record_reused);
                self.audit(
                    PanelAuditStage::Reused,
                    Some(id),
                    [json_kv("template", template)],
                );
                self.log(
                    LogLevel::Debug,
                    "panel_reused",
                    [
                        json_kv("panel", id.to_string()),
                        json_kv("template", template),
                    ],
                );
                return Ok(id);
            }
        }

        let instance = {
            let source = self
                .templates
                .get(template)
                .ok_or_else(|| PanelError::TemplateNotFound(template.to_string()))?;
            source.instantiate(&mut self.host)?
        };
        if !instance.is::<P>() {
            self.host.free(instance.node);
            return Err(PanelError::TemplateTypeMismatch {
                template: template.to_string(),
                expected: type_name::<P>(),
            });
        }

        let node = instance.node;
        let root = self.parents.current_root(&mut self.host);
        if let Err(err) = self.host.reparent(node, root) {
            self.host.free(node);
            return Err(err);
        }
        self.host.set_visible(node, false);

        let id = self.allocate_id();
        let mut panel = Panel::new(id, template, instance);
        if let Some(behavior) = panel.behavior_mut::<P>() {
            init(behavior);
        }
        if let Err(err) = panel.initialize(&mut self.host, &self.config.cancel_action) {
            self.host.free(node);
            return Err(err);
        }
        self.panel_nodes.insert(node, id);
        self.panels.insert(id, panel);

        self.with_metrics(PanelMetrics::record_created);
        self.audit(
            PanelAuditStage::Created,
            Some(id),
            [json_kv("template", template), json_kv("node", node.0)],
        );
        self.log(
            LogLevel::Debug,
            "panel_created",
            [
                json_kv("panel", id.to_string()),
                json_kv("template", template),
            ],
        );
        Ok(id)
    }

    fn take_cached<P: PanelBehavior>(&mut self, template: &str) -> Option<PanelId> {
        let cached = self.recycle.get_mut(template)?;
        let candidate = *cached.last()?;
        let fits = self
            .panels
            .get(&candidate)
            .is_some_and(|panel| panel.behavior::<P>().is_some());
        if !fits {
            return None;
        }
        cached.pop();
        if cached.is_empty() {
            self.recycle.remove(template);
        }
        Some(candidate)
    }

    /// Drops `id` from the recycle cache of `template`, for a cached panel
    /// reopened directly.
    fn forget_cached(&mut self, template: &str, id: PanelId) {
        let Some(cached) = self.recycle.get_mut(template) else {
            return;
        };
        cached.retain(|candidate| *candidate != id);
        if cached.is_empty() {
            self.recycle.remove(template);
        }
    }

    fn allocate_id(&mut self) -> PanelId {
        self.next_panel += 1;
        PanelId(self.next_panel)
    }

    pub fn open(&mut self, panel: PanelId) -> OpenRequest<'_, H> {
        let options = OpenOptions::new().layer(self.config.default_layer);
        OpenRequest::new(self, panel, options)
    }

    pub fn close(&mut self, panel: PanelId) -> CloseRequest<'_, H> {
        CloseRequest::new(self, panel)
    }

    pub fn open_panel(&mut self, id: PanelId, options: OpenOptions) -> Result<()> {
        let panel = self.panel_ref(id)?;
        if panel.is_pending_destroy() {
            return Err(PanelError::PendingDestruction(id));
        }
        ensure_openable(id, panel.state())?;
        let node = panel.node();
        let template = panel.template().to_string();

        let root = self.parents.current_root(&mut self.host);
        if self.host.parent(node) == Some(root) {
            self.host.move_to_front(node);
        } else {
            self.host.reparent(node, root)?;
        }
        self.forget_cached(&template, id);

        match options.layer {
            LayerMode::SameLayer => {
                if let Some(top) = self.active_panel() {
                    self.deactivate(top, options.previous)?;
                }
                if self.layers.is_empty() {
                    let layer = self.new_layer();
                    self.layers.push(layer);
                }
                if let Some(layer) = self.layers.last_mut() {
                    layer.panels.push(id);
                }
            }
            LayerMode::NewLayer => {
                self.suspend_top_layer(options.previous)?;
                let mut layer = self.new_layer();
                layer.panels.push(id);
                self.layers.push(layer);
            }
        }

        let panel = self.panel_entry(id)?;
        panel.mark_opened()?;
        let finished = panel.signals().open_finished.clone();
        let mut cycle = RestoreCycle::new();
        self.activate(id, &mut cycle, Box::new(move || finished.signal()))?;

        self.with_metrics(PanelMetrics::record_opened);
        self.audit(
            PanelAuditStage::Opened,
            Some(id),
            [
                json_kv("layer", self.layers.len()),
                json_kv("mode", format!("{:?}", options.layer)),
            ],
        );
        self.log(
            LogLevel::Info,
            "panel_opened",
            [
                json_kv("panel", id.to_string()),
                json_kv("layer", self.layers.len()),
                json_kv("depth", self.stack_depth()),
                json_kv("previous", format!("{:?}", options.previous)),
            ],
        );
        Ok(())
    }

    /// Closes the active panel. Any other panel is rejected with
    /// [`PanelError::NotTopOfStack`] and nothing changes.
    pub fn close_panel(&mut self, id: PanelId, options: CloseOptions) -> Result<()> {
        let panel = self.panel_ref(id)?;
        ensure_closable(id, panel.state())?;
        if self.active_panel() != Some(id) {
            return Err(PanelError::NotTopOfStack(id));
        }
        let template = panel.template().to_string();

        let finished = self.with_panel(id, |panel, env| -> Result<Signal> {
            panel.mark_closed()?;
            panel.hide_for_close(env);
            Ok(panel.signals().close_finished.clone())
        })??;

        if let Some(layer) = self.layers.last_mut() {
            layer.panels.pop();
        }
        let emptied = self.layers.last().is_some_and(|layer| layer.panels.is_empty());
        if emptied {
            if let Some(layer) = self.layers.pop() {
                self.retire_layer(layer);
            }
            self.resume_top_layer()?;
        } else if let Some(top) = self.active_panel() {
            let mut cycle = RestoreCycle::new();
            self.activate(top, &mut cycle, Box::new(|| {}))?;
        }

        match options.policy {
            ClosePolicy::Delete => {
                self.panel_entry(id)?.mark_pending_destroy();
                let deferred = self.deferred.clone();
                finished.on_signal(move || deferred.defer(DeferredCall::DestroyPanel(id)));
            }
            ClosePolicy::Cache => {
                self.recycle.entry(template.clone()).or_default().push(id);
                self.with_metrics(PanelMetrics::record_recycled);
                self.audit(
                    PanelAuditStage::Recycled,
                    Some(id),
                    [json_kv("template", template.as_str())],
                );
                self.log(
                    LogLevel::Debug,
                    "panel_recycled",
                    [
                        json_kv("panel", id.to_string()),
                        json_kv("template", template.as_str()),
                        json_kv("cached", self.cached_count(&template)),
                    ],
                );
            }
        }

        self.with_metrics(PanelMetrics::record_closed);
        self.audit(
            PanelAuditStage::Closed,
            Some(id),
            [json_kv("policy", format!("{:?}", options.policy))],
        );
        self.log(
            LogLevel::Info,
            "panel_closed",
            [
                json_kv("panel", id.to_string()),
                json_kv("policy", format!("{:?}", options.policy)),
                json_kv("previous", format!("{:?}", options.previous)),
                json_kv("depth", self.stack_depth()),
            ],
        );
        Ok(())
    }

    /// Opens now and returns a bridge that completes once the panel is
    /// fully shown.
    pub fn open_async(&mut self, id: PanelId, options: OpenOptions) -> Result<Bridge<()>> {
        self.open_panel(id, options)?;
        let finished = self.panel_ref(id)?.signals().open_finished.clone();
        Ok(self.signal_bridge(finished))
    }

    /// Closes now and returns a bridge that completes once the hide
    /// transition has finished.
    pub fn close_async(&mut self, id: PanelId, options: CloseOptions) -> Result<Bridge<()>> {
        self.close_panel(id, options)?;
        let finished = self.panel_ref(id)?.signals().close_finished.clone();
        Ok(self.signal_bridge(finished))
    }

    fn signal_bridge(&self, signal: Signal) -> Bridge<()> {
        let bridge = Bridge::pooled(&self.pool, move |completer| {
            signal.on_signal(move || completer.complete(()));
        });
        match self.config.logger.as_ref() {
            Some(logger) => bridge.with_logger(logger.clone()),
            None => bridge,
        }
    }

    fn new_layer(&self) -> Layer {
        Layer {
            panels: self.pool.get_default(),
            suspended: Vec::new(),
        }
    }

    fn retire_layer(&self, mut layer: Layer) {
        layer.panels.clear();
        self.pool.collect(layer.panels);
    }

    fn suspend_top_layer(&mut self, visual: PreviousVisual) -> Result<()> {
        let mut ids: Vec<PanelId> = self.pool.get_default();
        if let Some(layer) = self.layers.last() {
            ids.extend(layer.panels.iter().rev().copied());
        }
        let mut records = Vec::with_capacity(ids.len());
        for &id in ids.iter() {
            let panel = self.panel_ref(id)?;
            let record = Suspended {
                panel: id,
                was_active: panel.is_input_enabled(),
                was_shown: panel.is_shown(),
            };
            self.deactivate(id, visual)?;
            records.push(record);
        }
        if let Some(layer) = self.layers.last_mut() {
            layer.suspended = records;
        }
        ids.clear();
        self.pool.collect(ids);
        Ok(())
    }

    fn resume_top_layer(&mut self) -> Result<()> {
        let Some(layer) = self.layers.last_mut() else {
            return Ok(());
        };
        let records = std::mem::take(&mut layer.suspended);
        let fallback = layer.panels.last().copied();
        let mut cycle = RestoreCycle::new();
        if records.is_empty() {
            if let Some(top) = fallback {
                self.activate(top, &mut cycle, Box::new(|| {}))?;
            }
            return Ok(());
        }
        for record in records {
            if record.was_active {
                self.activate(record.panel, &mut cycle, Box::new(|| {}))?;
            } else if record.was_shown {
                self.with_panel(record.panel, |panel, env| panel.reveal(env))?;
            }
        }
        Ok(())
    }

    fn deactivate(&mut self, id: PanelId, visual: PreviousVisual) -> Result<()> {
        let outcome = self.with_panel(id, |panel, env| panel.deactivate(env, visual))?;
        self.audit(
            PanelAuditStage::Deactivated,
            Some(id),
            [
                json_kv("focus", format!("{outcome:?}")),
                json_kv("visual", format!("{visual:?}")),
            ],
        );
        Ok(())
    }

    fn activate(&mut self, id: PanelId, cycle: &mut RestoreCycle, on_shown: FinishCallback) -> Result<()> {
        let restored = self.with_panel(id, |panel, env| panel.activate(env, cycle, on_shown))?;
        self.audit(
            PanelAuditStage::Activated,
            Some(id),
            [json_kv("focus_restored", restored)],
        );
        Ok(())
    }

    /// Runs `f` with the panel and the rest of the manager state it needs,
    /// borrowed side by side.
    fn with_panel<R>(
        &mut self,
        id: PanelId,
        f: impl FnOnce(&mut Panel, &mut PanelEnv<'_>) -> R,
    ) -> Result<R> {
        let Self {
            host,
            panels,
            panel_nodes,
            deferred,
            pool,
            default_transition,
            ..
        } = self;
        let panel = panels.get_mut(&id).ok_or(PanelError::PanelNotFound(id))?;
        let nodes = &*panel_nodes;
        let is_panel = |node: NodeId| nodes.contains_key(&node);
        let mut env = PanelEnv {
            host,
            deferred,
            pool,
            default_transition,
            is_panel: &is_panel,
        };
        Ok(f(panel, &mut env))
    }

    pub fn register_input<F>(
        &mut self,
        panel: PanelId,
        action: &str,
        phase: InputPhase,
        callback: F,
    ) -> Result<BindingId>
    where
        F: FnMut(&mut InputContext<'_>) -> Result<()> + 'static,
    {
        Ok(self
            .panel_entry(panel)?
            .bindings_mut()
            .register(action, phase, callback))
    }

    pub fn remove_input(&mut self, panel: PanelId, action: &str, id: BindingId) -> Result<bool> {
        Ok(self.panel_entry(panel)?.bindings_mut().remove(action, id))
    }

    /// Binds `callback` to the current cancel action of this manager.
    pub fn register_cancel_input<F>(
        &mut self,
        panel: PanelId,
        phase: InputPhase,
        callback: F,
    ) -> Result<BindingId>
    where
        F: FnMut(PanelId, &mut PanelCommands) -> Result<()> + 'static,
    {
        let Self { panels, config, .. } = self;
        let entry = panels.get_mut(&panel).ok_or(PanelError::PanelNotFound(panel))?;
        Ok(entry
            .bindings_mut()
            .register_cancel(&config.cancel_action, phase, callback))
    }

    pub fn remove_cancel_input(&mut self, panel: PanelId, id: BindingId) -> Result<bool> {
        Ok(self.panel_entry(panel)?.bindings_mut().remove_cancel(id))
    }

    /// Routes `event` to the active panel. Stack changes requested by its
    /// callbacks are applied after they all ran.
    pub fn dispatch_input(&mut self, event: &PanelEvent) -> Result<EventFlow> {
        let Some(active) = self.active_panel() else {
            self.with_metrics(|metrics| metrics.record_event(false));
            self.log(
                LogLevel::Debug,
                "input_unhandled",
                [
                    json_kv("reason", "no_active_panel"),
                    json_kv("event", event.describe()),
                ],
            );
            return Ok(EventFlow::Continue);
        };

        let mut commands: PanelCommands = self.pool.get_default();
        let outcome = {
            let Self {
                panels,
                actions,
                pool,
                config,
                ..
            } = self;
            let panel = panels
                .get_mut(&active)
                .ok_or(PanelError::PanelNotFound(active))?;
            if panel.is_input_enabled() {
                let (bindings, name) = panel.dispatch_parts();
                let env = DispatchEnv {
                    actions: &**actions,
                    pool,
                    logger: config.logger.as_ref(),
                };
                let target = DispatchTarget {
                    panel: active,
                    name,
                    bindings,
                };
                dispatch_bindings(target, event, &env, &mut commands)
            } else {
                Default::default()
            }
        };

        self.with_metrics(|metrics| {
            metrics.record_event(outcome.handled);
            metrics.record_callback_failures(outcome.failures);
        });
        if !outcome.handled {
            self.log(
                LogLevel::Debug,
                "input_unhandled",
                [
                    json_kv("reason", "no_binding"),
                    json_kv("panel", active.to_string()),
                    json_kv("event", event.describe()),
                ],
            );
        }

        let applied = self.apply_commands(&mut commands);
        commands.clear();
        self.pool.collect(commands);
        applied?;

        Ok(if outcome.handled {
            EventFlow::Consumed
        } else {
            EventFlow::Continue
        })
    }

    fn apply_commands(&mut self, commands: &mut PanelCommands) -> Result<()> {
        for command in commands.drain() {
            match command {
                PanelCommand::Open { panel, options } => self.open_panel(panel, options)?,
                PanelCommand::Close { panel, options } => self.close_panel(panel, options)?,
            }
        }
        Ok(())
    }

    /// Drains the deferred queue. Returns how many calls ran.
    pub fn process_frame(&mut self) -> usize {
        let mut processed = 0;
        while let Some(call) = self.deferred.pop() {
            processed += 1;
            match call {
                DeferredCall::GrabFocus(node) => self.host.grab_focus(node),
                DeferredCall::DestroyPanel(id) => self.destroy_panel(id),
                DeferredCall::Call(call) => {
                    let host: &mut dyn UiHost = &mut self.host;
                    call(host);
                }
            }
        }
        processed
    }

    fn destroy_panel(&mut self, id: PanelId) {
        let Some(panel) = self.panels.remove(&id) else {
            return;
        };
        let node = panel.node();
        self.panel_nodes.remove(&node);
        for cached in self.recycle.values_mut() {
            cached.retain(|candidate| *candidate != id);
        }
        self.recycle.retain(|_, cached| !cached.is_empty());
        self.host.free(node);

        self.with_metrics(PanelMetrics::record_destroyed);
        self.audit(
            PanelAuditStage::Destroyed,
            Some(id),
            [json_kv("template", panel.template())],
        );
        self.log(
            LogLevel::Debug,
            "panel_destroyed",
            [
                json_kv("panel", id.to_string()),
                json_kv("template", panel.template()),
            ],
        );
    }

    /// Closes every open panel top-down, then destroys every panel the
    /// manager still owns, cached ones included.
    pub fn teardown(&mut self) {
        while let Some(top) = self.active_panel() {
            if let Err(err) = self.close_panel(top, CloseOptions::default()) {
                self.log(
                    LogLevel::Warn,
                    "teardown_close_failed",
                    [
                        json_kv("panel", top.to_string()),
                        json_kv("error", err.to_string()),
                    ],
                );
                break;
            }
        }
        self.process_frame();

        let mut remaining: Vec<PanelId> = self.panels.keys().copied().collect();
        remaining.sort();
        for id in remaining {
            self.destroy_panel(id);
        }
        for layer in std::mem::take(&mut self.layers) {
            self.retire_layer(layer);
        }
        self.recycle.clear();
        self.parents.clear();
        self.log_metrics();
    }

    /// Top of the topmost layer.
    pub fn active_panel(&self) -> Option<PanelId> {
        self.layers
            .last()
            .and_then(|layer| layer.panels.last().copied())
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Open panels across all layers.
    pub fn stack_depth(&self) -> usize {
        self.layers.iter().map(|layer| layer.panels.len()).sum()
    }

    /// Panels of layer `index`, bottom first.
    pub fn layer(&self, index: usize) -> Option<&[PanelId]> {
        self.layers.get(index).map(|layer| layer.panels.as_slice())
    }

    pub fn cached_count(&self, template: &str) -> usize {
        self.recycle.get(template).map_or(0, Vec::len)
    }

    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    pub fn panel(&self, id: PanelId) -> Option<&Panel> {
        self.panels.get(&id)
    }

    pub fn panel_mut(&mut self, id: PanelId) -> Option<&mut Panel> {
        self.panels.get_mut(&id)
    }

    pub fn panel_state(&self, id: PanelId) -> Option<PanelState> {
        self.panels.get(&id).map(Panel::state)
    }

    /// The panel owning `node` as its root, if any.
    pub fn panel_for_node(&self, node: NodeId) -> Option<PanelId> {
        self.panel_nodes.get(&node).copied()
    }

    pub fn behavior<P: PanelBehavior>(&self, id: PanelId) -> Option<&P> {
        self.panels.get(&id).and_then(|panel| panel.behavior::<P>())
    }

    pub fn behavior_mut<P: PanelBehavior>(&mut self, id: PanelId) -> Option<&mut P> {
        self.panels
            .get_mut(&id)
            .and_then(|panel| panel.behavior_mut::<P>())
    }

    /// Emits the current metrics snapshot to the logger, if both are set.
    pub fn log_metrics(&self) {
        let (Some(logger), Some(metrics)) = (self.config.logger.as_ref(), self.config.metrics.as_ref())
        else {
            return;
        };
        if let Ok(guard) = metrics.lock() {
            let _ = logger.log_event(guard.snapshot().to_log_event(METRICS_TARGET));
        }
    }

    fn panel_ref(&self, id: PanelId) -> Result<&Panel> {
        self.panels.get(&id).ok_or(PanelError::PanelNotFound(id))
    }

    fn panel_entry(&mut self, id: PanelId) -> Result<&mut Panel> {
        self.panels.get_mut(&id).ok_or(PanelError::PanelNotFound(id))
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref() {
            logger.emit(level, MANAGER_TARGET, message, fields);
        }
    }

    fn with_metrics(&self, update: impl FnOnce(&mut PanelMetrics)) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                update(&mut *guard);
            }
        }
    }

    fn audit<I>(&self, stage: PanelAuditStage, panel: Option<PanelId>, details: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut builder = PanelAuditEventBuilder::new(stage);
        if let Some(panel) = panel {
            builder.panel(panel);
        }
        for (key, value) in details {
            builder.detail(key, value);
        }
        self.config.audit.record(builder.finish());
    }
}

impl<H: UiHost + std::fmt::Debug> std::fmt::Debug for PanelManager<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelManager")
            .field("host", &self.host)
            .field("panels", &self.panels.len())
            .field("layers", &self.layers)
            .field("parents", &self.parents)
            .field("deferred", &self.deferred)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Interaction, MemoryHost};
    use crate::input::DEFAULT_CANCEL_ACTION;
    use crate::logging::{Logger, MemorySink};
    use crate::panel::PanelSetup;
    use crate::transition::TransitionEffect;
    use std::cell::{Cell, RefCell};
    use std::sync::Arc;

    #[derive(Default)]
    struct Dialog {
        title: String,
        opened: usize,
        closed: usize,
        button: Option<NodeId>,
    }

    impl PanelBehavior for Dialog {
        fn name(&self) -> &str {
            "dialog"
        }

        fn on_initialize(&mut self, setup: &mut PanelSetup<'_>) -> Result<()> {
            let node = setup.node();
            self.button = Some(setup.host().create_element(
                "ok",
                Some(node),
                Some(Interaction::default()),
            ));
            setup.register_cancel_input(InputPhase::Pressed, |panel, commands| {
                commands.close(panel, CloseOptions::default());
                Ok(())
            });
            Ok(())
        }

        fn on_open(&mut self, _panel: PanelId) {
            self.opened += 1;
        }

        fn on_close(&mut self, _panel: PanelId) {
            self.closed += 1;
        }
    }

    struct Toast;

    impl PanelBehavior for Toast {}

    fn dialog(host: &mut dyn UiHost) -> Result<Instance> {
        let node = host.create_element("dialog", None, None);
        Ok(Instance::new(node, Dialog::default()))
    }

    fn toast(host: &mut dyn UiHost) -> Result<Instance> {
        let node = host.create_element("toast", None, None);
        Ok(Instance::new(node, Toast))
    }

    fn manager() -> PanelManager<MemoryHost> {
        let mut manager = PanelManager::new(MemoryHost::new());
        manager.register_template_fn("dialog", dialog);
        manager.register_template_fn("toast", toast);
        manager
    }

    fn open_dialog(manager: &mut PanelManager<MemoryHost>) -> PanelId {
        let id = manager
            .create_panel::<Dialog, _>("dialog", ReusePolicy::AlwaysNew, |_| {})
            .unwrap();
        manager.open(id).submit().unwrap();
        id
    }

    fn button(manager: &PanelManager<MemoryHost>, id: PanelId) -> NodeId {
        manager.behavior::<Dialog>(id).and_then(|d| d.button).unwrap()
    }

    #[test]
    fn created_panels_attach_hidden_under_current_root() {
        let mut manager = manager();
        let id = manager
            .create_panel::<Dialog, _>("dialog", ReusePolicy::TryReuse, |d| {
                d.title = "Quit?".into();
            })
            .unwrap();

        let node = manager.panel(id).unwrap().node();
        let root = manager.current_root();
        assert_eq!(manager.host().parent(node), Some(root));
        assert!(!manager.host().is_visible(node));
        assert_eq!(manager.panel_state(id), Some(PanelState::Initialized));
        assert_eq!(manager.behavior::<Dialog>(id).unwrap().title, "Quit?");
        assert_eq!(manager.panel_for_node(node), Some(id));
        assert_eq!(manager.active_panel(), None);
    }

    #[test]
    fn close_reveals_the_panel_below() {
        let mut manager = manager();
        let a = open_dialog(&mut manager);
        let b = open_dialog(&mut manager);
        let c = open_dialog(&mut manager);
        assert_eq!(manager.active_panel(), Some(c));
        assert_eq!(manager.stack_depth(), 3);

        manager.close(c).submit().unwrap();
        assert_eq!(manager.active_panel(), Some(b));
        manager.close(b).submit().unwrap();
        assert_eq!(manager.active_panel(), Some(a));
        assert!(manager.panel(a).unwrap().is_input_enabled());
    }

    #[test]
    fn closing_below_the_top_fails_without_side_effects() {
        let mut manager = manager();
        let a = open_dialog(&mut manager);
        let b = open_dialog(&mut manager);

        let err = manager.close(a).submit().unwrap_err();
        assert!(matches!(err, PanelError::NotTopOfStack(id) if id == a));
        assert_eq!(manager.panel_state(a), Some(PanelState::Opened));
        assert_eq!(manager.active_panel(), Some(b));
        assert_eq!(manager.stack_depth(), 2);
        assert_eq!(manager.behavior::<Dialog>(a).unwrap().closed, 0);
    }

    #[test]
    fn lifecycle_misuse_is_reported() {
        let mut manager = manager();
        let a = open_dialog(&mut manager);
        assert!(matches!(
            manager.open(a).submit(),
            Err(PanelError::InvalidTransition { .. })
        ));

        manager.close(a).cache().submit().unwrap();
        assert!(matches!(
            manager.close(a).submit(),
            Err(PanelError::InvalidTransition {
                from: PanelState::Closed,
                ..
            })
        ));
        assert!(matches!(
            manager.open(PanelId(99)).submit(),
            Err(PanelError::PanelNotFound(_))
        ));
        assert!(matches!(
            manager.create::<Dialog>("missing"),
            Err(PanelError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn template_type_mismatch_frees_the_instance() {
        let mut manager = manager();
        let before = manager.host().node_count();
        let err = manager.create::<Toast>("dialog").unwrap_err();
        assert!(matches!(err, PanelError::TemplateTypeMismatch { ref template, .. } if template == "dialog"));
        assert_eq!(manager.panel_count(), 0);
        assert_eq!(manager.host().node_count(), before);
    }

    #[test]
    fn cached_panel_is_reused_by_identity() {
        let mut manager = manager();
        let a = open_dialog(&mut manager);
        let node = manager.panel(a).unwrap().node();
        manager.close(a).cache().submit().unwrap();
        assert_eq!(manager.cached_count("dialog"), 1);

        let reused = manager
            .create_panel::<Dialog, _>("dialog", ReusePolicy::TryReuse, |d| {
                d.title = "again".into();
            })
            .unwrap();
        assert_eq!(reused, a);
        assert_eq!(manager.panel(reused).unwrap().node(), node);
        assert_eq!(manager.cached_count("dialog"), 0);
        assert_eq!(manager.behavior::<Dialog>(a).unwrap().title, "again");

        manager.open(reused).submit().unwrap();
        assert_eq!(manager.behavior::<Dialog>(a).unwrap().opened, 2);

        let fresh = manager
            .create_panel::<Dialog, _>("dialog", ReusePolicy::AlwaysNew, |_| {})
            .unwrap();
        assert_ne!(fresh, a);
    }

    #[test]
    fn delete_policy_destroys_on_the_next_frame() {
        let mut manager = manager();
        let a = open_dialog(&mut manager);
        let node = manager.panel(a).unwrap().node();
        manager.close(a).submit().unwrap();

        assert!(manager.panel(a).is_some());
        assert!(matches!(
            manager.open(a).submit(),
            Err(PanelError::PendingDestruction(_))
        ));

        assert_eq!(manager.process_frame(), 1);
        assert!(manager.panel(a).is_none());
        assert!(manager.host().is_freed(node));
        assert_eq!(manager.panel_for_node(node), None);
    }

    #[test]
    fn focus_returns_to_the_covered_panel_once() {
        let mut manager = manager();
        let a = open_dialog(&mut manager);
        let ok = button(&manager, a);
        manager.host_mut().set_focus(Some(ok));

        let b = open_dialog(&mut manager);
        assert!(!manager.panel(a).unwrap().is_input_enabled());
        assert_eq!(manager.host().interaction(ok), Some(Interaction::DISABLED));
        assert!(manager.host().is_visible(manager.panel(a).unwrap().node()));

        let b_ok = button(&manager, b);
        manager.host_mut().set_focus(Some(b_ok));
        manager.close(b).cache().submit().unwrap();
        assert_eq!(manager.host().interaction(ok), Some(Interaction::default()));
        assert_eq!(manager.deferred().len(), 1);

        manager.process_frame();
        assert_eq!(manager.host().focused(), Some(ok));
        assert_eq!(manager.panel(a).unwrap().focus().selection(), Some(ok));
    }

    #[test]
    fn hidden_previous_is_hidden_and_shown_again() {
        let mut manager = manager();
        let a = open_dialog(&mut manager);
        let node = manager.panel(a).unwrap().node();
        let b = manager.create::<Dialog>("dialog").unwrap();
        manager.open(b).hide_previous().submit().unwrap();
        assert!(!manager.host().is_visible(node));

        manager.close(b).submit().unwrap();
        assert!(manager.host().is_visible(node));
        assert!(manager.panel(a).unwrap().is_shown());
    }

    #[test]
    fn new_layer_suspends_the_whole_layer() {
        let mut manager = manager();
        let a = open_dialog(&mut manager);
        let b = open_dialog(&mut manager);
        let a_node = manager.panel(a).unwrap().node();
        let b_node = manager.panel(b).unwrap().node();

        let overlay = manager.create::<Toast>("toast").unwrap();
        manager.open(overlay).new_layer().hide_previous().submit().unwrap();
        assert_eq!(manager.layer_count(), 2);
        assert_eq!(manager.layer(0), Some(&[a, b][..]));
        assert!(!manager.host().is_visible(a_node));
        assert!(!manager.host().is_visible(b_node));
        assert!(!manager.panel(b).unwrap().is_input_enabled());

        manager.close(overlay).submit().unwrap();
        assert_eq!(manager.layer_count(), 1);
        assert_eq!(manager.active_panel(), Some(b));
        assert!(manager.panel(b).unwrap().is_input_enabled());
        assert!(!manager.panel(a).unwrap().is_input_enabled());
        assert!(manager.host().is_visible(a_node));
        assert!(manager.host().is_visible(b_node));
    }

    #[test]
    fn released_confirm_runs_matching_phases_in_order() {
        let mut manager = manager();
        let a = open_dialog(&mut manager);
        let order = Rc::new(RefCell::new(Vec::new()));
        for (label, phase) in [
            ("pressed", InputPhase::Pressed),
            ("released", InputPhase::Released),
            ("any", InputPhase::Any),
        ] {
            let order = Rc::clone(&order);
            manager
                .register_input(a, "confirm", phase, move |_| {
                    order.borrow_mut().push(label);
                    Ok(())
                })
                .unwrap();
        }

        let flow = manager
            .dispatch_input(&PanelEvent::action("confirm", false))
            .unwrap();
        assert_eq!(flow, EventFlow::Consumed);
        assert_eq!(*order.borrow(), vec!["released", "any"]);
    }

    #[test]
    fn only_the_top_panel_sees_input() {
        let mut manager = manager();
        let a = open_dialog(&mut manager);
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let binding = manager
            .register_input(a, "confirm", InputPhase::Any, move |_| {
                counter.set(counter.get() + 1);
                Ok(())
            })
            .unwrap();
        let _b = open_dialog(&mut manager);

        let flow = manager
            .dispatch_input(&PanelEvent::action("confirm", true))
            .unwrap();
        assert_eq!(flow, EventFlow::Continue);
        assert_eq!(hits.get(), 0);
        assert!(manager.remove_input(a, "confirm", binding).unwrap());
    }

    #[test]
    fn cancel_closes_panels_until_input_goes_unhandled() {
        let sink = MemorySink::new();
        let mut config = ManagerConfig::default().with_logger(Logger::new(sink.clone()));
        config.enable_metrics();
        let metrics = config.metrics_handle().unwrap();
        let mut manager =
            PanelManager::with_config(MemoryHost::new(), KeyActionMap::with_defaults(), config);
        manager.register_template_fn("dialog", dialog);

        let a = open_dialog(&mut manager);
        let a_ok = button(&manager, a);
        manager.host_mut().set_focus(Some(a_ok));
        let b = open_dialog(&mut manager);
        assert!(!manager.panel(a).unwrap().is_input_enabled());
        assert_eq!(manager.active_panel(), Some(b));

        let esc = PanelEvent::action(DEFAULT_CANCEL_ACTION, true);
        assert_eq!(manager.dispatch_input(&esc).unwrap(), EventFlow::Consumed);
        assert_eq!(manager.active_panel(), Some(a));
        manager.process_frame();
        assert_eq!(manager.host().focused(), Some(a_ok));

        assert_eq!(manager.dispatch_input(&esc).unwrap(), EventFlow::Consumed);
        assert_eq!(manager.active_panel(), None);
        assert_eq!(manager.dispatch_input(&esc).unwrap(), EventFlow::Continue);

        let snapshot = metrics.lock().unwrap().snapshot();
        assert_eq!(snapshot.opened, 2);
        assert_eq!(snapshot.closed, 2);
        assert_eq!(snapshot.events_unhandled, 1);
        let messages = sink.messages();
        assert!(messages.iter().any(|m| m == "panel_opened"));
        assert!(messages.iter().any(|m| m == "input_unhandled"));
    }

    #[test]
    fn cancel_binding_follows_the_configured_action() {
        let mut manager = manager();
        manager.set_cancel_action("back");
        assert_eq!(manager.cancel_action(), "back");
        let a = open_dialog(&mut manager);

        let flow = manager.dispatch_input(&PanelEvent::action("back", true)).unwrap();
        assert_eq!(flow, EventFlow::Consumed);
        assert_eq!(manager.panel_state(a), Some(PanelState::Closed));

        let b = open_dialog(&mut manager);
        let extra = manager
            .register_cancel_input(b, InputPhase::Released, |_, _| Ok(()))
            .unwrap();
        assert!(manager.remove_cancel_input(b, extra).unwrap());
        assert!(!manager.remove_cancel_input(b, extra).unwrap());
    }

    #[test]
    fn parent_scopes_redirect_new_panels() {
        let mut manager = manager();
        let root = manager.current_root();
        let sidebar = manager.host_mut().create_node("sidebar", Some(root));
        manager.push_parent("sidebar", sidebar);

        let a = open_dialog(&mut manager);
        let node = manager.panel(a).unwrap().node();
        assert_eq!(manager.host().parent(node), Some(sidebar));

        let err = manager.pop_parent("inventory").unwrap_err();
        assert!(matches!(err, PanelError::ParentOwnerMismatch { .. }));
        assert_eq!(manager.parent_depth(), 1);
        manager.pop_parent("sidebar").unwrap();
        assert_eq!(manager.current_root(), root);
    }

    #[test]
    fn reopening_moves_the_panel_under_the_current_root() {
        let mut manager = manager();
        let a = open_dialog(&mut manager);
        manager.close(a).cache().submit().unwrap();

        let root = manager.current_root();
        let sidebar = manager.host_mut().create_node("sidebar", Some(root));
        manager.push_parent("sidebar", sidebar);
        manager.open(a).submit().unwrap();
        let node = manager.panel(a).unwrap().node();
        assert_eq!(manager.host().parent(node), Some(sidebar));
        assert_eq!(manager.cached_count("dialog"), 0);
    }

    #[test]
    fn reopened_cached_panel_is_not_handed_out_again() {
        let mut manager = manager();
        let a = open_dialog(&mut manager);
        manager.close(a).cache().submit().unwrap();
        assert_eq!(manager.cached_count("dialog"), 1);

        manager.open(a).submit().unwrap();
        assert_eq!(manager.cached_count("dialog"), 0);

        let b = manager.create::<Dialog>("dialog").unwrap();
        assert_ne!(a, b);
        assert_eq!(manager.panel_state(b), Some(PanelState::Initialized));
        manager.open(b).submit().unwrap();
        assert_eq!(manager.active_panel(), Some(b));
        assert_eq!(manager.stack_depth(), 2);
    }

    struct Deferred {
        pending: Rc<RefCell<Vec<FinishCallback>>>,
    }

    impl TransitionEffect for Deferred {
        fn show(&self, host: &mut dyn UiHost, node: NodeId, on_finish: FinishCallback) {
            host.set_visible(node, true);
            self.pending.borrow_mut().push(on_finish);
        }

        fn hide(&self, host: &mut dyn UiHost, node: NodeId, on_finish: FinishCallback) {
            host.set_visible(node, false);
            self.pending.borrow_mut().push(on_finish);
        }
    }

    fn finish_all(pending: &Rc<RefCell<Vec<FinishCallback>>>) {
        let callbacks: Vec<FinishCallback> = pending.borrow_mut().drain(..).collect();
        for callback in callbacks {
            callback();
        }
    }

    #[test]
    fn async_open_and_close_complete_with_the_transition() {
        let mut manager = manager();
        let pending = Rc::new(RefCell::new(Vec::new()));
        manager.set_default_transition(Rc::new(Deferred {
            pending: Rc::clone(&pending),
        }));

        let a = manager.create::<Dialog>("dialog").unwrap();
        let mut opening = manager.open(a).submit_async().unwrap();
        assert!(!opening.is_completed().unwrap());
        finish_all(&pending);
        assert!(opening.is_completed().unwrap());
        opening.get_result().unwrap();

        let closing = manager.close(a).submit_async().unwrap();
        assert_eq!(manager.process_frame(), 0);
        finish_all(&pending);
        futures::executor::block_on(closing).unwrap();
        assert_eq!(manager.process_frame(), 1);
        assert!(manager.panel(a).is_none());
    }

    #[test]
    fn per_panel_transition_overrides_the_default() {
        let mut manager = manager();
        let pending = Rc::new(RefCell::new(Vec::new()));
        let a = manager.create::<Dialog>("dialog").unwrap();
        manager
            .set_panel_transition(
                a,
                Some(Rc::new(Deferred {
                    pending: Rc::clone(&pending),
                })),
            )
            .unwrap();
        manager.open(a).submit().unwrap();
        assert_eq!(pending.borrow().len(), 1);
        assert!(!manager.panel(a).unwrap().signals().open_finished.is_signaled());

        manager.set_panel_transition(a, None).unwrap();
        assert!(manager.panel(a).unwrap().transition().is_none());
    }

    #[test]
    fn audit_records_the_lifecycle() {
        let audit = Arc::new(RecordingAudit::new());
        let config = ManagerConfig::default().with_audit(audit.clone());
        let mut manager =
            PanelManager::with_config(MemoryHost::new(), KeyActionMap::with_defaults(), config);
        manager.register_template_fn("dialog", dialog);

        let a = open_dialog(&mut manager);
        manager.close(a).cache().submit().unwrap();
        assert_eq!(
            audit.stages_for(a),
            vec![
                PanelAuditStage::Created,
                PanelAuditStage::Activated,
                PanelAuditStage::Opened,
                PanelAuditStage::Recycled,
                PanelAuditStage::Closed,
            ]
        );
    }

    #[test]
    fn teardown_destroys_everything() {
        let mut manager = manager();
        let a = open_dialog(&mut manager);
        let b = open_dialog(&mut manager);
        let c = manager.create::<Dialog>("dialog").unwrap();
        manager.open(c).submit().unwrap();
        manager.close(c).cache().submit().unwrap();
        let nodes: Vec<NodeId> = [a, b, c]
            .iter()
            .map(|id| manager.panel(*id).unwrap().node())
            .collect();

        manager.teardown();
        assert_eq!(manager.panel_count(), 0);
        assert_eq!(manager.layer_count(), 0);
        assert_eq!(manager.cached_count("dialog"), 0);
        assert!(nodes.iter().all(|node| manager.host().is_freed(*node)));
        assert_eq!(manager.behavior::<Dialog>(a).map(|d| d.closed), None);
    }
}
