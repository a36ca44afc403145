// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identifiers, roles, and the liveness lookup shared by transitions and stacks.

/// Identifier for a controller.
///
/// This is a small, copyable handle that stays stable while the controller is
/// alive and becomes stale once the controller is released by its owner.
/// It consists of a slot index and a generation counter.
///
/// ## Semantics
///
/// - A registry hands out a fresh slot with generation `1`.
/// - Releasing a controller frees the slot; existing ids for it are now stale.
/// - Reusing a freed slot increments its generation, producing a new, distinct id.
///
/// Stale ids never alias a different live controller because the generation must match.
/// Use a [`Liveness`] lookup to check whether an id still refers to a live controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ControllerId(u32, u32);

impl ControllerId {
    /// Build an id from a slot index and generation.
    ///
    /// Registries use this when allocating; callers normally receive ids from a registry.
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self(slot, generation)
    }

    /// Slot index of this id.
    pub const fn slot(self) -> u32 {
        self.0
    }

    /// Generation of this id.
    pub const fn generation(self) -> u32 {
        self.1
    }
}

/// What a single controller does within one transition.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Role {
    /// Present only in the target stack.
    Inserting,
    /// Present only in the source stack.
    Removing,
    /// Present in both stacks.
    Remaining,
}

impl Role {
    /// Derive the role of `controller` from the two stack snapshots.
    ///
    /// A controller in neither list is reported as [`Role::Remaining`]; it has
    /// nothing to enter or leave.
    pub fn of(controller: ControllerId, from: &[ControllerId], to: &[ControllerId]) -> Self {
        match (from.contains(&controller), to.contains(&controller)) {
            (false, true) => Self::Inserting,
            (true, false) => Self::Removing,
            _ => Self::Remaining,
        }
    }

    /// Returns true for [`Role::Inserting`] and [`Role::Removing`].
    pub fn is_changing(self) -> bool {
        !matches!(self, Self::Remaining)
    }
}

/// Check whether a controller is still alive.
///
/// Transition contexts hold controllers weakly: they keep ids and resolve them
/// through this lookup, treating a dead id as absent.
pub trait Liveness {
    /// Returns true if `controller` refers to a live controller.
    fn is_alive(&self, controller: ControllerId) -> bool;
}

/// A lookup that reports every controller as alive.
///
/// Useful for tests and for hosts that never release controllers mid-transition.
#[derive(Copy, Clone, Debug, Default)]
pub struct AlwaysAlive;

impl Liveness for AlwaysAlive {
    #[inline]
    fn is_alive(&self, _controller: ControllerId) -> bool {
        true
    }
}
