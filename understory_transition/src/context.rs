// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared state threaded through one transition.
//!
//! ## Overview
//!
//! A transition is described once by a [`TransitionInfo`]: its id, direction,
//! source and target stacks, and the animated/interactive flags. Every
//! strategy call receives a [`TransitionContext`], which is that info scoped to
//! one controller plus mutable access to the shared [`Cache`] and the
//! per-controller [`ViewTable`].
//!
//! Stack snapshots hold controller ids only. Reads go through a
//! [`Liveness`] lookup, so a controller released mid-transition simply
//! disappears from [`TransitionContext::from`] and [`TransitionContext::to`].
//!
//! ## Cache
//!
//! Strategies keep private per-transition state in the cache under their own
//! [`CacheKey`]. Keys are compared by name, so each strategy should pick a
//! name nobody else uses.
//!
//! ```
//! use understory_transition::context::{Cache, CacheKey};
//!
//! const START_OFFSET: CacheKey<f64> = CacheKey::new("my_slide::start_offset");
//!
//! let mut cache = Cache::new();
//! cache.insert(&START_OFFSET, 120.0);
//! assert_eq!(cache.get(&START_OFFSET), Some(&120.0));
//! *cache.get_or_insert_with(&START_OFFSET, || 0.0) += 1.0;
//! assert_eq!(cache.remove(&START_OFFSET), Some(121.0));
//! ```

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;
use core::marker::PhantomData;

use crate::progress::Direction;
use crate::timing::AnimationTiming;
use crate::types::{ControllerId, Liveness, Role};
use crate::view::{Container, Environment, ViewEntry, ViewProps, ViewTable};

/// Identifier of one transition run.
///
/// Ids increase monotonically per stack; events tagged with a finished
/// transition's id are ignored.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TransitionId(pub u64);

/// Immutable description of a transition.
#[derive(Clone, Debug)]
pub struct TransitionInfo {
    /// Run identifier.
    pub id: TransitionId,
    /// Overall direction.
    pub direction: Direction,
    /// Stack before the transition.
    pub from: Rc<[ControllerId]>,
    /// Stack after a completed transition.
    pub to: Rc<[ControllerId]>,
    /// Whether the transition animates.
    pub animated: bool,
    /// Whether progress is driven by a gesture.
    pub interactive: bool,
    /// Bounds of the hosting stack.
    pub bounds: kurbo::Rect,
    /// Safe-area insets of the hosting stack.
    pub safe_area: kurbo::Insets,
}

impl TransitionInfo {
    /// Role of `controller` in this transition.
    pub fn role(&self, controller: ControllerId) -> Role {
        Role::of(controller, &self.from, &self.to)
    }
}

/// Typed key into a [`Cache`].
pub struct CacheKey<T> {
    name: &'static str,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> CacheKey<T> {
    /// Create a key. Names must be unique per strategy.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _phantom: PhantomData,
        }
    }

    /// Name of this key.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> core::fmt::Debug for CacheKey<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("CacheKey").field(&self.name).finish()
    }
}

/// Side-channel storage for strategies, scoped to one transition.
#[derive(Default)]
pub struct Cache {
    entries: BTreeMap<&'static str, Box<dyn Any>>,
}

impl core::fmt::Debug for Cache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

impl Cache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, returning the previous value of the same type.
    pub fn insert<T: 'static>(&mut self, key: &CacheKey<T>, value: T) -> Option<T> {
        self.entries
            .insert(key.name, Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    /// Value under `key`, if present with type `T`.
    pub fn get<T: 'static>(&self, key: &CacheKey<T>) -> Option<&T> {
        self.entries.get(key.name)?.downcast_ref::<T>()
    }

    /// Mutable value under `key`, if present with type `T`.
    pub fn get_mut<T: 'static>(&mut self, key: &CacheKey<T>) -> Option<&mut T> {
        self.entries.get_mut(key.name)?.downcast_mut::<T>()
    }

    /// Value under `key`, inserting `init()` when absent or of another type.
    pub fn get_or_insert_with<T: 'static>(
        &mut self,
        key: &CacheKey<T>,
        init: impl FnOnce() -> T,
    ) -> &mut T {
        let present = self.entries.get(key.name).is_some_and(|v| v.is::<T>());
        if !present {
            self.entries.insert(key.name, Box::new(init()));
        }
        self.entries
            .get_mut(key.name)
            .and_then(|v| v.downcast_mut::<T>())
            .expect("cache slot holds a value of this type")
    }

    /// Remove and return the value under `key`.
    pub fn remove<T: 'static>(&mut self, key: &CacheKey<T>) -> Option<T> {
        let boxed = self.entries.remove(key.name)?;
        boxed.downcast::<T>().ok().map(|b| *b)
    }

    /// Returns true if anything is stored under `key`'s name.
    pub fn contains<T>(&self, key: &CacheKey<T>) -> bool {
        self.entries.contains_key(key.name)
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A transition seen from one controller.
///
/// Shares the cache, snapshots, and view table with every other controller's
/// context for the same transition.
pub struct TransitionContext<'a> {
    info: &'a TransitionInfo,
    cache: &'a mut Cache,
    views: &'a mut ViewTable,
    liveness: &'a dyn Liveness,
    controller: ControllerId,
    timing: AnimationTiming,
}

impl core::fmt::Debug for TransitionContext<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TransitionContext")
            .field("id", &self.info.id)
            .field("controller", &self.controller)
            .field("direction", &self.info.direction)
            .field("interactive", &self.info.interactive)
            .finish_non_exhaustive()
    }
}

impl<'a> TransitionContext<'a> {
    /// Scope `info` to `controller`.
    pub fn new(
        info: &'a TransitionInfo,
        cache: &'a mut Cache,
        views: &'a mut ViewTable,
        liveness: &'a dyn Liveness,
        controller: ControllerId,
        timing: AnimationTiming,
    ) -> Self {
        Self {
            info,
            cache,
            views,
            liveness,
            controller,
            timing,
        }
    }

    /// The same transition scoped to `other`.
    pub fn for_controller(&mut self, other: ControllerId) -> TransitionContext<'_> {
        TransitionContext {
            info: self.info,
            cache: &mut *self.cache,
            views: &mut *self.views,
            liveness: self.liveness,
            controller: other,
            timing: self.timing,
        }
    }

    /// The transition description.
    pub fn info(&self) -> &TransitionInfo {
        self.info
    }

    /// Run identifier.
    pub fn id(&self) -> TransitionId {
        self.info.id
    }

    /// Controller this context is scoped to.
    pub fn controller(&self) -> ControllerId {
        self.controller
    }

    /// Overall direction.
    pub fn direction(&self) -> Direction {
        self.info.direction
    }

    /// Role of the scoped controller.
    pub fn role(&self) -> Role {
        self.info.role(self.controller)
    }

    /// Live controllers of the source stack, bottom to top.
    pub fn from(&self) -> Vec<ControllerId> {
        self.alive(&self.info.from)
    }

    /// Live controllers of the target stack, bottom to top.
    pub fn to(&self) -> Vec<ControllerId> {
        self.alive(&self.info.to)
    }

    /// Whether the transition animates.
    pub fn is_animated(&self) -> bool {
        self.info.animated
    }

    /// Whether progress is driven by a gesture.
    pub fn is_interactive(&self) -> bool {
        self.info.interactive
    }

    /// Timing of the presentation driving the scoped controller.
    pub fn timing(&self) -> AnimationTiming {
        self.timing
    }

    /// Returns true if `controller` is still alive.
    pub fn is_alive(&self, controller: ControllerId) -> bool {
        self.liveness.is_alive(controller)
    }

    /// Shared strategy cache.
    pub fn cache(&self) -> &Cache {
        self.cache
    }

    /// Shared strategy cache, mutably.
    pub fn cache_mut(&mut self) -> &mut Cache {
        self.cache
    }

    /// View props of `controller`, if it is alive and has a view.
    pub fn view(&self, controller: ControllerId) -> Option<&ViewProps> {
        self.entry(controller).map(|e| &e.props)
    }

    /// Mutable view props of `controller`, if it is alive and has a view.
    pub fn view_mut(&mut self, controller: ControllerId) -> Option<&mut ViewProps> {
        if !self.liveness.is_alive(controller) {
            return None;
        }
        self.views.get_mut(controller).map(|e| &mut e.props)
    }

    /// View props of the scoped controller.
    pub fn own_view_mut(&mut self) -> Option<&mut ViewProps> {
        self.view_mut(self.controller)
    }

    /// Container of `controller`, if it is alive and has a view.
    pub fn container(&self, controller: ControllerId) -> Option<&Container> {
        self.entry(controller).map(|e| &e.container)
    }

    /// Environment of `controller`, if it is alive and has a view.
    pub fn environment(&self, controller: ControllerId) -> Option<Environment> {
        let entry = self.entry(controller)?;
        let stack_index = self.info.to.iter().position(|c| *c == controller);
        Some(Environment {
            bounds: self.info.bounds,
            safe_area: self.info.safe_area,
            stack_index,
            visible: entry.is_drawn(),
        })
    }

    fn entry(&self, controller: ControllerId) -> Option<&ViewEntry> {
        if !self.liveness.is_alive(controller) {
            return None;
        }
        self.views.get(controller)
    }

    fn alive(&self, list: &[ControllerId]) -> Vec<ControllerId> {
        list.iter()
            .copied()
            .filter(|c| self.liveness.is_alive(*c))
            .collect()
    }
}
