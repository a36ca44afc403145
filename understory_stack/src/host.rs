// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! View host glue.
//!
//! The stack owns a [`ViewTable`](understory_transition::view::ViewTable) and
//! reports every hierarchy change and every changed entry to a [`ViewHost`].
//! Platform glue implements the trait to mirror that state into real views;
//! [`HeadlessHost`] records it for tests and tools.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use understory_transition::types::ControllerId;
use understory_transition::view::{Container, ViewEntry, ViewFlags, ViewProps};

/// Receives view hierarchy changes from a stack.
pub trait ViewHost {
    /// Install `controller`'s view in `container`.
    fn attach(&mut self, controller: ControllerId, container: &Container);

    /// Remove `controller`'s view from its container.
    fn detach(&mut self, controller: ControllerId);

    /// Show or hide an attached view without detaching it.
    fn set_hidden(&mut self, controller: ControllerId, hidden: bool);

    /// Apply changed props and container of `controller`.
    fn apply(&mut self, controller: ControllerId, entry: &ViewEntry) {
        let _ = (controller, entry);
    }
}

impl ViewHost for () {
    fn attach(&mut self, _controller: ControllerId, _container: &Container) {}
    fn detach(&mut self, _controller: ControllerId) {}
    fn set_hidden(&mut self, _controller: ControllerId, _hidden: bool) {}
}

/// A view as a [`HeadlessHost`] last saw it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HeadlessView {
    /// Container the view is installed into.
    pub container: Container,
    /// Last applied props.
    pub props: ViewProps,
    /// Hierarchy state.
    pub flags: ViewFlags,
}

/// A [`ViewHost`] that records state instead of drawing.
#[derive(Clone, Debug, Default)]
pub struct HeadlessHost {
    views: BTreeMap<ControllerId, HeadlessView>,
    mutations: u64,
}

impl HeadlessHost {
    /// Create an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded state of `controller`'s view, if it is attached.
    pub fn view(&self, controller: ControllerId) -> Option<&HeadlessView> {
        self.views.get(&controller)
    }

    /// Returns true if `controller`'s view is attached.
    pub fn is_attached(&self, controller: ControllerId) -> bool {
        self.views.contains_key(&controller)
    }

    /// Returns true if `controller`'s view is attached and not hidden.
    pub fn is_drawn(&self, controller: ControllerId) -> bool {
        self.views
            .get(&controller)
            .is_some_and(|v| !v.flags.contains(ViewFlags::HIDDEN))
    }

    /// Drawn views, back to front.
    pub fn drawn(&self) -> Vec<ControllerId> {
        let mut drawn: Vec<_> = self
            .views
            .iter()
            .filter(|(_, v)| !v.flags.contains(ViewFlags::HIDDEN))
            .map(|(c, v)| (v.container.z_index, *c))
            .collect();
        drawn.sort();
        drawn.into_iter().map(|(_, c)| c).collect()
    }

    /// Number of hierarchy changes (attach, detach, hide, show) seen so far.
    pub fn mutations(&self) -> u64 {
        self.mutations
    }
}

impl ViewHost for HeadlessHost {
    fn attach(&mut self, controller: ControllerId, container: &Container) {
        self.mutations += 1;
        self.views.insert(
            controller,
            HeadlessView {
                container: *container,
                props: ViewProps::filling(container.frame),
                flags: ViewFlags::ATTACHED,
            },
        );
    }

    fn detach(&mut self, controller: ControllerId) {
        if self.views.remove(&controller).is_some() {
            self.mutations += 1;
        }
    }

    fn set_hidden(&mut self, controller: ControllerId, hidden: bool) {
        if let Some(view) = self.views.get_mut(&controller) {
            self.mutations += 1;
            view.flags.set(ViewFlags::HIDDEN, hidden);
        }
    }

    fn apply(&mut self, controller: ControllerId, entry: &ViewEntry) {
        if let Some(view) = self.views.get_mut(&controller) {
            view.props = entry.props;
            view.container = entry.container;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;

    fn id(n: u32) -> ControllerId {
        ControllerId::new(n, 1)
    }

    #[test]
    fn records_hierarchy_changes() {
        let mut host = HeadlessHost::new();
        let back = Container {
            frame: Rect::new(0.0, 0.0, 10.0, 10.0),
            z_index: 0,
        };
        let front = Container { z_index: 1, ..back };
        host.attach(id(2), &front);
        host.attach(id(1), &back);
        assert_eq!(host.drawn(), [id(1), id(2)]);

        host.set_hidden(id(1), true);
        assert!(host.is_attached(id(1)));
        assert!(!host.is_drawn(id(1)));
        assert_eq!(host.drawn(), [id(2)]);

        host.detach(id(2));
        host.detach(id(2));
        assert!(!host.is_attached(id(2)));
        assert_eq!(host.mutations(), 4);
    }

    #[test]
    fn apply_updates_attached_views_only() {
        let mut host = HeadlessHost::new();
        let mut entry = ViewEntry::new(Container::default());
        entry.props.opacity = 0.25;
        host.apply(id(1), &entry);
        assert!(host.view(id(1)).is_none());

        host.attach(id(1), &Container::default());
        host.apply(id(1), &entry);
        assert_eq!(host.view(id(1)).unwrap().props.opacity, 0.25);
        assert_eq!(host.mutations(), 1);
    }
}
