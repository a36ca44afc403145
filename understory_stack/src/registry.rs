// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Controller arena: generational ids resolved to live controllers.
//!
//! Stacks and transition contexts refer to controllers by [`ControllerId`].
//! The [`Registry`] owns the controllers; removing one makes every id that
//! refers to it stale, and the stack treats it as absent from then on.
//! Stacks watch their registry so a release in the middle of a transition is
//! noticed without waiting for another event.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use understory_transition::presentation::Presentation;
use understory_transition::types::{ControllerId, Liveness};

/// An opaque unit of screen content with lifecycle hooks.
///
/// Hooks are called by the stack while it is dispatching and must not call
/// the stack's read accessors. Issuing new requests from a hook is fine; they
/// are queued.
pub trait Controller {
    /// Presentation this controller prefers when it is shown without an
    /// explicit one.
    fn presentation(&self) -> Option<Presentation> {
        None
    }

    /// The controller's view is about to become visible.
    fn will_appear(&self, id: ControllerId, animated: bool) {
        let _ = (id, animated);
    }

    /// The controller's view became visible.
    fn did_appear(&self, id: ControllerId, animated: bool) {
        let _ = (id, animated);
    }

    /// The controller's view is about to stop being visible.
    fn will_disappear(&self, id: ControllerId, animated: bool) {
        let _ = (id, animated);
    }

    /// The controller's view stopped being visible.
    fn did_disappear(&self, id: ControllerId, animated: bool) {
        let _ = (id, animated);
    }

    /// The controller joined a committed stack.
    fn did_move_to_parent(&self, id: ControllerId) {
        let _ = id;
    }

    /// The controller left its stack, or its insertion was rolled back.
    fn did_remove_from_parent(&self, id: ControllerId) {
        let _ = id;
    }
}

type Watcher = Rc<dyn Fn(ControllerId) -> bool>;

#[derive(Default)]
struct Slots {
    entries: Vec<Option<Rc<dyn Controller>>>,
    generations: Vec<u32>, // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    watchers: Vec<(u64, Watcher)>,
    next_watcher: u64,
}

impl Slots {
    fn slot(&self, id: ControllerId) -> Option<&Rc<dyn Controller>> {
        let idx = id.slot() as usize;
        if self.generations.get(idx).copied() != Some(id.generation()) {
            return None;
        }
        self.entries.get(idx)?.as_ref()
    }
}

/// Shared arena of controllers.
///
/// Cloning a registry yields another handle to the same arena.
#[derive(Clone, Default)]
pub struct Registry {
    slots: Rc<RefCell<Slots>>,
}

impl core::fmt::Debug for Registry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let slots = self.slots.borrow();
        let total = slots.entries.len();
        let alive = slots.entries.iter().filter(|e| e.is_some()).count();
        f.debug_struct("Registry")
            .field("slots_total", &total)
            .field("slots_alive", &alive)
            .field("free_list", &slots.free_list.len())
            .field("watchers", &slots.watchers.len())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a controller and return its id.
    pub fn insert(&self, controller: impl Controller + 'static) -> ControllerId {
        self.insert_rc(Rc::new(controller))
    }

    /// Register a shared controller and return its id.
    ///
    /// Registering the same `Rc` twice yields two distinct ids.
    pub fn insert_rc(&self, controller: Rc<dyn Controller>) -> ControllerId {
        let mut slots = self.slots.borrow_mut();
        let (idx, generation) = if let Some(idx) = slots.free_list.pop() {
            let generation = slots.generations[idx].saturating_add(1);
            slots.generations[idx] = generation;
            slots.entries[idx] = Some(controller);
            (idx, generation)
        } else {
            slots.entries.push(Some(controller));
            slots.generations.push(1);
            (slots.entries.len() - 1, 1)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "ControllerId uses 32-bit slot indices."
        )]
        ControllerId::new(idx as u32, generation)
    }

    /// Release a controller. Its id, and every copy of it, becomes stale.
    ///
    /// Returns the controller if `id` was alive. Watchers are told after the
    /// slot is freed.
    pub fn remove(&self, id: ControllerId) -> Option<Rc<dyn Controller>> {
        let (controller, watchers) = {
            let mut slots = self.slots.borrow_mut();
            slots.slot(id)?;
            let idx = id.slot() as usize;
            let controller = slots.entries[idx].take();
            slots.free_list.push(idx);
            (controller, slots.watchers.clone())
        };
        let stale: Vec<u64> = watchers
            .iter()
            .filter(|(_, watcher)| !watcher(id))
            .map(|(key, _)| *key)
            .collect();
        if !stale.is_empty() {
            self.slots
                .borrow_mut()
                .watchers
                .retain(|(key, _)| !stale.contains(key));
        }
        controller
    }

    /// Call `watcher` with the id of every controller removed from now on.
    ///
    /// The watcher runs with the registry unborrowed and may use it. Returning
    /// false unsubscribes it.
    pub fn watch(&self, watcher: impl Fn(ControllerId) -> bool + 'static) {
        let mut slots = self.slots.borrow_mut();
        let key = slots.next_watcher;
        slots.next_watcher += 1;
        slots.watchers.push((key, Rc::new(watcher)));
    }

    /// The controller behind `id`, if it is alive.
    pub fn get(&self, id: ControllerId) -> Option<Rc<dyn Controller>> {
        self.slots.borrow().slot(id).cloned()
    }

    /// Returns true if `id` refers to a live controller.
    pub fn is_alive(&self, id: ControllerId) -> bool {
        self.slots.borrow().slot(id).is_some()
    }

    /// Number of live controllers.
    pub fn len(&self) -> usize {
        let slots = self.slots.borrow();
        slots.entries.len() - slots.free_list.len()
    }

    /// Returns true if no controller is alive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Liveness for Registry {
    fn is_alive(&self, controller: ControllerId) -> bool {
        Self::is_alive(self, controller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct Plain;
    impl Controller for Plain {}

    struct Counting(Rc<Cell<u32>>);
    impl Controller for Counting {
        fn did_move_to_parent(&self, _id: ControllerId) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn insert_and_resolve() {
        let registry = Registry::new();
        let hits = Rc::new(Cell::new(0));
        let a = registry.insert(Counting(hits.clone()));
        let b = registry.insert(Plain);
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        registry.get(a).unwrap().did_move_to_parent(a);
        assert_eq!(hits.get(), 1);
        assert!(registry.get(b).unwrap().presentation().is_none());
    }

    #[test]
    fn removed_ids_go_stale_and_slots_are_reused() {
        let registry = Registry::new();
        let a = registry.insert(Plain);
        assert!(registry.remove(a).is_some());
        assert!(!registry.is_alive(a));
        assert!(registry.get(a).is_none());
        assert!(registry.remove(a).is_none(), "double remove is a no-op");
        assert!(registry.is_empty());

        let b = registry.insert(Plain);
        assert_eq!(b.slot(), a.slot());
        assert!(b.generation() > a.generation());
        assert!(registry.is_alive(b));
        assert!(!registry.is_alive(a));
    }

    #[test]
    fn clones_share_the_arena() {
        let registry = Registry::new();
        let handle = registry.clone();
        let a = handle.insert(Plain);
        assert!(registry.is_alive(a));
        let liveness: &dyn Liveness = &registry;
        assert!(liveness.is_alive(a));
        registry.remove(a);
        assert!(!liveness.is_alive(a));
    }

    #[test]
    fn watchers_see_removals_until_they_unsubscribe() {
        let registry = Registry::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let handle = registry.clone();
        registry.watch(move |id| {
            assert!(!handle.is_alive(id), "slot is freed before watchers run");
            log.borrow_mut().push(id);
            log.borrow().len() < 2
        });

        let a = registry.insert(Plain);
        let b = registry.insert(Plain);
        let c = registry.insert(Plain);
        registry.remove(a);
        registry.remove(a);
        registry.remove(b);
        registry.remove(c);
        assert_eq!(*seen.borrow(), [a, b], "dead ids are not reported");
    }

    #[test]
    fn ids_from_nowhere_are_dead() {
        let registry = Registry::new();
        assert!(!registry.is_alive(ControllerId::new(42, 1)));
        let a = registry.insert(Plain);
        assert!(!registry.is_alive(ControllerId::new(a.slot(), a.generation() + 1)));
    }
}
