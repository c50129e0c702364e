use std::collections::HashMap;

use crate::host::{DeferredCall, DeferredQueue, Interaction, NodeId, UiHost};
use crate::pool::ObjectPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    NoSelections,
    NotAChild,
    Successful,
}

/// Shared across the panels reactivated together; the first panel to
/// restore its selection wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreCycle {
    restored: bool,
}

impl RestoreCycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restored(&self) -> bool {
        self.restored
    }
}

/// Remembered selection and the interaction modes overwritten while the
/// panel was inactive.
#[derive(Debug, Default)]
pub struct FocusCache {
    snapshots: HashMap<NodeId, Interaction>,
    selection: Option<NodeId>,
    restored: bool,
}

impl FocusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> Option<NodeId> {
        self.selection
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// Starts a new deactivation cycle and remembers the focused element if
    /// it lives under `root`. A failed cache keeps the previous selection.
    pub fn cache_selection(&mut self, host: &dyn UiHost, root: NodeId) -> CacheOutcome {
        self.restored = false;
        let Some(focused) = host.focused() else {
            return CacheOutcome::NoSelections;
        };
        if !host.is_ancestor_of(root, focused) {
            return CacheOutcome::NotAChild;
        }
        self.selection = Some(focused);
        CacheOutcome::Successful
    }

    /// Schedules a deferred focus grab on the cached selection, at most once
    /// per cycle and only if no other panel in `cycle` already did.
    pub fn restore_selection(&mut self, deferred: &DeferredQueue, cycle: &mut RestoreCycle) -> bool {
        if self.restored || cycle.restored {
            return false;
        }
        let Some(node) = self.selection else {
            return false;
        };
        deferred.defer(DeferredCall::GrabFocus(node));
        self.restored = true;
        cycle.restored = true;
        true
    }

    /// Forces every interactive descendant of `root` to fully disabled,
    /// remembering what it was. Nested panel roots are skipped with their
    /// subtrees.
    pub fn disable_tree(
        &mut self,
        host: &mut dyn UiHost,
        root: NodeId,
        is_panel: &dyn Fn(NodeId) -> bool,
        pool: &ObjectPool,
    ) {
        let snapshots = &mut self.snapshots;
        walk_descendants(host, root, is_panel, pool, &mut |host, node| {
            if let Some(current) = host.interaction(node) {
                if !current.is_disabled() {
                    snapshots.insert(node, current);
                    host.set_interaction(node, Interaction::DISABLED);
                }
            }
        });
    }

    /// Puts back the modes saved by [`FocusCache::disable_tree`].
    pub fn enable_tree(
        &mut self,
        host: &mut dyn UiHost,
        root: NodeId,
        is_panel: &dyn Fn(NodeId) -> bool,
        pool: &ObjectPool,
    ) {
        let snapshots = &mut self.snapshots;
        walk_descendants(host, root, is_panel, pool, &mut |host, node| {
            if let Some(saved) = snapshots.remove(&node) {
                host.set_interaction(node, saved);
            }
        });
    }
}

fn walk_descendants(
    host: &mut dyn UiHost,
    root: NodeId,
    is_panel: &dyn Fn(NodeId) -> bool,
    pool: &ObjectPool,
    visit: &mut dyn FnMut(&mut dyn UiHost, NodeId),
) {
    let mut pending: Vec<NodeId> = pool.get_default();
    let mut children: Vec<NodeId> = pool.get_default();

    host.children(root, &mut children);
    pending.extend(children.drain(..).rev());
    while let Some(node) = pending.pop() {
        if is_panel(node) {
            continue;
        }
        visit(host, node);
        host.children(node, &mut children);
        pending.extend(children.drain(..).rev());
    }

    pool.collect(pending);
    pool.collect(children);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{FocusMode, MemoryHost, PointerMode};

    struct Tree {
        host: MemoryHost,
        panel: NodeId,
        button: NodeId,
        label: NodeId,
        nested: NodeId,
        nested_button: NodeId,
    }

    fn tree() -> Tree {
        let mut host = MemoryHost::new();
        let root = host.default_root();
        let panel = host.create_node("panel", Some(root));
        let row = host.create_node("row", Some(panel));
        let button = host.create_control("ok", Some(row), Interaction::default());
        let label = host.create_control(
            "label",
            Some(panel),
            Interaction::new(FocusMode::None, PointerMode::Pass),
        );
        let nested = host.create_node("nested", Some(panel));
        let nested_button = host.create_control("inner", Some(nested), Interaction::default());
        Tree {
            host,
            panel,
            button,
            label,
            nested,
            nested_button,
        }
    }

    #[test]
    fn disable_then_enable_restores_original_modes() {
        let Tree {
            mut host,
            panel,
            button,
            label,
            nested,
            nested_button,
        } = tree();
        let pool = ObjectPool::new();
        let is_panel = move |node: NodeId| node == nested;
        let mut cache = FocusCache::new();

        cache.disable_tree(&mut host, panel, &is_panel, &pool);
        assert_eq!(host.interaction(button), Some(Interaction::DISABLED));
        assert_eq!(host.interaction(label), Some(Interaction::DISABLED));
        assert_eq!(host.interaction(nested_button), Some(Interaction::default()));
        assert_eq!(cache.snapshot_count(), 2);

        cache.enable_tree(&mut host, panel, &is_panel, &pool);
        assert_eq!(host.interaction(button), Some(Interaction::default()));
        assert_eq!(
            host.interaction(label),
            Some(Interaction::new(FocusMode::None, PointerMode::Pass))
        );
        assert_eq!(cache.snapshot_count(), 0);
        assert_eq!(pool.available::<Vec<NodeId>>(), 2);
    }

    #[test]
    fn repeated_disable_keeps_the_first_snapshot() {
        let Tree {
            mut host,
            panel,
            button,
            label,
            ..
        } = tree();
        let pool = ObjectPool::new();
        let mut cache = FocusCache::new();

        cache.disable_tree(&mut host, panel, &|_| false, &pool);
        cache.disable_tree(&mut host, panel, &|_| false, &pool);
        assert_eq!(cache.snapshot_count(), 3);

        cache.enable_tree(&mut host, panel, &|_| false, &pool);
        assert_eq!(host.interaction(button), Some(Interaction::default()));
        assert_eq!(
            host.interaction(label),
            Some(Interaction::new(FocusMode::None, PointerMode::Pass))
        );
        assert_eq!(cache.snapshot_count(), 0);
    }

    #[test]
    fn already_disabled_elements_are_left_alone() {
        let Tree {
            mut host,
            panel,
            button,
            ..
        } = tree();
        host.set_interaction(button, Interaction::DISABLED);
        let pool = ObjectPool::new();
        let mut cache = FocusCache::new();
        cache.disable_tree(&mut host, panel, &|_| false, &pool);
        cache.enable_tree(&mut host, panel, &|_| false, &pool);
        assert_eq!(host.interaction(button), Some(Interaction::DISABLED));
    }

    #[test]
    fn cache_reports_why_nothing_was_remembered() {
        let Tree {
            mut host,
            panel,
            button,
            ..
        } = tree();
        let mut cache = FocusCache::new();
        assert_eq!(cache.cache_selection(&host, panel), CacheOutcome::NoSelections);

        let root = host.default_root();
        let outside = host.create_control("outside", Some(root), Interaction::default());
        host.set_focus(Some(outside));
        assert_eq!(cache.cache_selection(&host, panel), CacheOutcome::NotAChild);

        host.set_focus(Some(button));
        assert_eq!(cache.cache_selection(&host, panel), CacheOutcome::Successful);
        assert_eq!(cache.selection(), Some(button));
    }

    #[test]
    fn restoration_happens_once_per_cycle() {
        let Tree {
            mut host,
            panel,
            button,
            label,
            ..
        } = tree();
        host.set_focus(Some(button));
        let deferred = DeferredQueue::new();

        let mut first = FocusCache::new();
        first.cache_selection(&host, panel);
        let mut second = FocusCache::new();
        host.set_focus(Some(label));
        second.cache_selection(&host, panel);

        let mut cycle = RestoreCycle::new();
        assert!(first.restore_selection(&deferred, &mut cycle));
        assert!(!first.restore_selection(&deferred, &mut cycle));
        assert!(!second.restore_selection(&deferred, &mut cycle));
        assert_eq!(deferred.len(), 1);
        assert!(matches!(deferred.pop(), Some(DeferredCall::GrabFocus(node)) if node == button));
    }
}
