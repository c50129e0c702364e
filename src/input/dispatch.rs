use std::collections::{HashMap, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};

use super::{ActionBindings, ActionMap, InputBindings, InputPhase, PanelEvent};
use crate::bridge::panic_message;
use crate::logging::{INPUT_TARGET, LogLevel, Logger, json_kv};
use crate::manager::{CloseOptions, OpenOptions, PanelCommands};
use crate::pool::ObjectPool;
use crate::panel::PanelId;

/// Per-event memo of action queries, so each action is asked of the
/// [`ActionMap`] at most once while one event is dispatched.
#[derive(Debug, Default)]
pub struct ActionMatchCache {
    memo: HashMap<String, bool>,
    lookups: usize,
}

impl ActionMatchCache {
    pub fn matches(&mut self, actions: &dyn ActionMap, event: &PanelEvent, action: &str) -> bool {
        if let Some(hit) = self.memo.get(action) {
            return *hit;
        }
        self.lookups += 1;
        let hit = actions.matches(action, event);
        self.memo.insert(action.to_string(), hit);
        hit
    }

    /// Number of queries that actually reached the action map.
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    fn reset(&mut self) {
        self.memo.clear();
        self.lookups = 0;
    }
}

/// What a callback sees while it runs.
pub struct InputContext<'a> {
    panel: PanelId,
    action: &'a str,
    phase: InputPhase,
    event: &'a PanelEvent,
    actions: &'a dyn ActionMap,
    matcher: &'a mut ActionMatchCache,
    commands: &'a mut PanelCommands,
}

impl<'a> InputContext<'a> {
    pub fn panel(&self) -> PanelId {
        self.panel
    }

    pub fn action(&self) -> &str {
        self.action
    }

    pub fn phase(&self) -> InputPhase {
        self.phase
    }

    pub fn event(&self) -> &PanelEvent {
        self.event
    }

    /// Asks whether the current event also satisfies `action`. Answers are
    /// memoized for the rest of this event.
    pub fn is_action(&mut self, action: &str) -> bool {
        self.matcher.matches(self.actions, self.event, action)
    }

    pub fn commands(&mut self) -> &mut PanelCommands {
        self.commands
    }

    /// Queues a close of the panel that owns this binding. Applied once
    /// dispatch returns.
    pub fn request_close(&mut self, options: CloseOptions) {
        self.commands.close(self.panel, options);
    }

    pub fn request_open(&mut self, panel: PanelId, options: OpenOptions) {
        self.commands.open(panel, options);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub handled: bool,
    pub fired: usize,
    pub failures: usize,
    pub lookups: usize,
}

pub(crate) struct DispatchTarget<'a> {
    pub(crate) panel: PanelId,
    pub(crate) name: &'a str,
    pub(crate) bindings: &'a mut InputBindings,
}

pub(crate) struct DispatchEnv<'a> {
    pub(crate) actions: &'a dyn ActionMap,
    pub(crate) pool: &'a ObjectPool,
    pub(crate) logger: Option<&'a Logger>,
}

/// Runs every binding of `target` whose action matches `event` and whose
/// phase accepts it. A failing callback is logged and the rest still run.
pub(crate) fn dispatch_bindings(
    target: DispatchTarget<'_>,
    event: &PanelEvent,
    env: &DispatchEnv<'_>,
    commands: &mut PanelCommands,
) -> DispatchOutcome {
    let phase = event.phase();
    let mut matcher: ActionMatchCache = env.pool.get_default();
    let mut queue: VecDeque<usize> = env.pool.get_default();

    for (index, group) in target.bindings.actions.iter().enumerate() {
        if matcher.matches(env.actions, event, &group.action) {
            queue.push_back(index);
        }
    }

    let mut outcome = DispatchOutcome::default();
    while let Some(index) = queue.pop_front() {
        let Some(ActionBindings { action, bindings }) = target.bindings.actions.get_mut(index)
        else {
            continue;
        };
        for binding in bindings.iter_mut() {
            if !binding.phase.accepts(phase) {
                continue;
            }
            outcome.fired += 1;
            let mut ctx = InputContext {
                panel: target.panel,
                action: action.as_str(),
                phase,
                event,
                actions: env.actions,
                matcher: &mut matcher,
                commands: &mut *commands,
            };
            let failure = match catch_unwind(AssertUnwindSafe(|| (binding.callback)(&mut ctx))) {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err.to_string(),
                Err(payload) => panic_message(payload.as_ref()),
            };
            outcome.failures += 1;
            if let Some(logger) = env.logger {
                logger.emit(
                    LogLevel::Error,
                    INPUT_TARGET,
                    "input_callback_failed",
                    [
                        json_kv("panel", target.panel.to_string()),
                        json_kv("panel_name", target.name),
                        json_kv("action", action.as_str()),
                        json_kv("binding", format!("{:?}", binding.id)),
                        json_kv("error", failure),
                    ],
                );
            }
        }
    }

    outcome.handled = outcome.fired > 0;
    outcome.lookups = matcher.lookups();
    matcher.reset();
    env.pool.collect(matcher);
    queue.clear();
    env.pool.collect(queue);
    outcome
}
