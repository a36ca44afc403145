// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Platform-neutral view state owned per controller.
//!
//! Transitions never touch platform views directly. They edit a controller's
//! [`ViewProps`] through the transition context; the owner of the
//! [`ViewTable`] flushes changed entries to its host after each strategy call.

use alloc::collections::BTreeMap;

use kurbo::{Affine, Insets, Rect};

use crate::types::ControllerId;

bitflags::bitflags! {
    /// Hierarchy state of a controller's view.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ViewFlags: u8 {
        /// The view is installed in its container.
        const ATTACHED = 0b0000_0001;
        /// The view is installed but not drawn.
        const HIDDEN   = 0b0000_0010;
    }
}

/// Animatable properties of a controller's view.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViewProps {
    /// Frame in container coordinates.
    pub frame: Rect,
    /// Transform applied on top of the frame.
    pub transform: Affine,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Corner radius of the view's clip.
    pub corner_radius: f64,
}

impl Default for ViewProps {
    fn default() -> Self {
        Self {
            frame: Rect::ZERO,
            transform: Affine::IDENTITY,
            opacity: 1.0,
            corner_radius: 0.0,
        }
    }
}

impl ViewProps {
    /// Props filling `frame` with no transform.
    pub fn filling(frame: Rect) -> Self {
        Self {
            frame,
            ..Self::default()
        }
    }
}

/// The container a controller's view is installed into.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Container {
    /// Container frame in stack coordinates.
    pub frame: Rect,
    /// Stacking order; higher is drawn on top.
    pub z_index: i32,
}

impl Default for Container {
    fn default() -> Self {
        Self {
            frame: Rect::ZERO,
            z_index: 0,
        }
    }
}

/// Values a strategy may read about a controller's surroundings.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Environment {
    /// Bounds of the hosting stack.
    pub bounds: Rect,
    /// Insets that content should avoid.
    pub safe_area: Insets,
    /// Index in the target stack, if the controller is part of it.
    pub stack_index: Option<usize>,
    /// Whether the controller is drawn once the transition completes.
    pub visible: bool,
}

/// Everything the core tracks about one controller's view.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewEntry {
    /// Animatable properties.
    pub props: ViewProps,
    /// Container the view is installed into.
    pub container: Container,
    /// Hierarchy flags.
    pub flags: ViewFlags,
    dirty: bool,
}

impl ViewEntry {
    /// A detached entry for `container` with props filling the container.
    pub fn new(container: Container) -> Self {
        Self {
            props: ViewProps::filling(container.frame),
            container,
            flags: ViewFlags::empty(),
            dirty: true,
        }
    }

    /// Returns true if the view is attached and not hidden.
    pub fn is_drawn(&self) -> bool {
        self.flags.contains(ViewFlags::ATTACHED) && !self.flags.contains(ViewFlags::HIDDEN)
    }

    /// Returns true if the entry changed since the last flush.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Per-controller view entries with dirty tracking.
#[derive(Clone, Debug, Default)]
pub struct ViewTable {
    entries: BTreeMap<ControllerId, ViewEntry>,
}

impl ViewTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `controller`, returning the previous one.
    pub fn insert(&mut self, controller: ControllerId, entry: ViewEntry) -> Option<ViewEntry> {
        self.entries.insert(controller, entry)
    }

    /// Remove the entry for `controller`.
    pub fn remove(&mut self, controller: ControllerId) -> Option<ViewEntry> {
        self.entries.remove(&controller)
    }

    /// Entry for `controller`.
    pub fn get(&self, controller: ControllerId) -> Option<&ViewEntry> {
        self.entries.get(&controller)
    }

    /// Mutable entry for `controller`; marks it dirty.
    pub fn get_mut(&mut self, controller: ControllerId) -> Option<&mut ViewEntry> {
        let entry = self.entries.get_mut(&controller)?;
        entry.dirty = true;
        Some(entry)
    }

    /// Returns true if the table has an entry for `controller`.
    pub fn contains(&self, controller: ControllerId) -> bool {
        self.entries.contains_key(&controller)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Controllers with an entry, in id order.
    pub fn controllers(&self) -> impl Iterator<Item = ControllerId> + '_ {
        self.entries.keys().copied()
    }

    /// Set or clear `flag` on `controller`'s entry.
    ///
    /// Returns true if the flag changed.
    pub fn set_flag(&mut self, controller: ControllerId, flag: ViewFlags, on: bool) -> bool {
        let Some(entry) = self.entries.get_mut(&controller) else {
            return false;
        };
        if entry.flags.contains(flag) == on {
            return false;
        }
        entry.flags.set(flag, on);
        entry.dirty = true;
        true
    }

    /// Visit every dirty entry and clear its dirty bit.
    pub fn flush(&mut self, mut f: impl FnMut(ControllerId, &ViewEntry)) {
        for (&id, entry) in self.entries.iter_mut() {
            if entry.dirty {
                entry.dirty = false;
                f(id, entry);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn id(n: u32) -> ControllerId {
        ControllerId::new(n, 1)
    }

    #[test]
    fn new_entry_fills_container_and_is_dirty() {
        let container = Container {
            frame: Rect::new(0.0, 0.0, 320.0, 480.0),
            z_index: 2,
        };
        let entry = ViewEntry::new(container);
        assert_eq!(entry.props.frame, container.frame);
        assert!(entry.is_dirty());
        assert!(!entry.is_drawn());
    }

    #[test]
    fn flush_visits_only_dirty_entries() {
        let mut table = ViewTable::new();
        table.insert(id(1), ViewEntry::new(Container::default()));
        table.insert(id(2), ViewEntry::new(Container::default()));

        let mut seen = Vec::new();
        table.flush(|c, _| seen.push(c));
        assert_eq!(seen, [id(1), id(2)]);

        seen.clear();
        table.flush(|c, _| seen.push(c));
        assert!(seen.is_empty());

        table.get_mut(id(2)).unwrap().props.opacity = 0.5;
        table.flush(|c, e| {
            seen.push(c);
            assert_eq!(e.props.opacity, 0.5);
        });
        assert_eq!(seen, [id(2)]);
    }

    #[test]
    fn set_flag_reports_changes() {
        let mut table = ViewTable::new();
        table.insert(id(1), ViewEntry::new(Container::default()));
        table.flush(|_, _| {});

        assert!(table.set_flag(id(1), ViewFlags::ATTACHED, true));
        assert!(!table.set_flag(id(1), ViewFlags::ATTACHED, true));
        assert!(table.get(id(1)).unwrap().is_drawn());
        assert!(table.set_flag(id(1), ViewFlags::HIDDEN, true));
        assert!(!table.get(id(1)).unwrap().is_drawn());
        assert!(!table.set_flag(id(9), ViewFlags::HIDDEN, true));
    }
}
