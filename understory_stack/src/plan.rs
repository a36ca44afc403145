// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pure planning: what a stack change touches, in which order, and what stays drawn.
//!
//! ```
//! use understory_stack::plan::{Plan, infer_direction};
//! use understory_transition::progress::Direction;
//! use understory_transition::types::ControllerId;
//!
//! let [a, b, c] = [0, 1, 2].map(|n| ControllerId::new(n, 1));
//! assert_eq!(infer_direction(&[a], &[a, b]), Direction::Insertion);
//! assert_eq!(infer_direction(&[a, b], &[a]), Direction::Removal);
//!
//! let plan = Plan::new(&[a, b], &[a, c], Direction::Insertion);
//! assert_eq!(plan.to_insert, [c]);
//! assert_eq!(plan.to_remove, [b]);
//! assert_eq!(plan.remaining, [a]);
//! // The previous and the new top come last.
//! assert_eq!(plan.affected, [a, b, c]);
//! ```

use alloc::vec::Vec;

use understory_transition::progress::Direction;
use understory_transition::types::{ControllerId, Role};

/// Direction of a change from `current` to `target` when the caller gave none.
///
/// Insertion iff the new top is not already in `current`. An empty target is a
/// removal.
pub fn infer_direction(current: &[ControllerId], target: &[ControllerId]) -> Direction {
    match target.last() {
        Some(top) if !current.contains(top) => Direction::Insertion,
        _ => Direction::Removal,
    }
}

/// Index of the lowest drawn controller of `stack`.
///
/// Walking down from the top, every controller that is shown over the current
/// context keeps the one below it drawn; the first one that is not hides
/// everything underneath. Returns 0 for an empty stack.
pub fn visible_from(
    stack: &[ControllerId],
    over_current_context: impl Fn(ControllerId) -> bool,
) -> usize {
    let Some(mut lowest) = stack.len().checked_sub(1) else {
        return 0;
    };
    while lowest > 0 && over_current_context(stack[lowest]) {
        lowest -= 1;
    }
    lowest
}

/// The controllers a change touches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    /// Direction of the change.
    pub direction: Direction,
    /// In the target only, in target order.
    pub to_insert: Vec<ControllerId>,
    /// In the current stack only, in current order.
    pub to_remove: Vec<ControllerId>,
    /// In both, in target order.
    pub remaining: Vec<ControllerId>,
    /// Every controller of either stack, back to front for the duration of the
    /// change: untouched entries first, then the previous and new tops.
    pub affected: Vec<ControllerId>,
}

impl Plan {
    /// Plan a change from `from` to `to`.
    pub fn new(from: &[ControllerId], to: &[ControllerId], direction: Direction) -> Self {
        let to_insert: Vec<_> = to.iter().copied().filter(|c| !from.contains(c)).collect();
        let to_remove: Vec<_> = from.iter().copied().filter(|c| !to.contains(c)).collect();
        let remaining: Vec<_> = to.iter().copied().filter(|c| from.contains(c)).collect();

        let previous_top = from.last().copied();
        let new_top = to.last().copied();
        let is_top = |c: &ControllerId| Some(*c) == previous_top || Some(*c) == new_top;

        let mut affected = Vec::with_capacity(from.len() + to_insert.len());
        affected.extend(from.iter().copied().filter(|c| !is_top(c)));
        affected.extend(to_insert.iter().copied().filter(|c| !is_top(c)));
        let tops = match direction {
            Direction::Insertion => [previous_top, new_top],
            Direction::Removal => [new_top, previous_top],
        };
        for top in tops.into_iter().flatten() {
            if !affected.contains(&top) {
                affected.push(top);
            }
        }

        Self {
            direction,
            to_insert,
            to_remove,
            remaining,
            affected,
        }
    }

    /// Role of `controller` in this change.
    pub fn role(&self, controller: ControllerId) -> Role {
        if self.to_insert.contains(&controller) {
            Role::Inserting
        } else if self.to_remove.contains(&controller) {
            Role::Removing
        } else {
            Role::Remaining
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn ids<const N: usize>() -> [ControllerId; N] {
        core::array::from_fn(|n| {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Test arrays are tiny."
            )]
            ControllerId::new(n as u32, 1)
        })
    }

    #[test]
    fn direction_follows_new_top() {
        let [a, b, c] = ids();
        assert_eq!(infer_direction(&[a], &[a, b]), Direction::Insertion);
        assert_eq!(infer_direction(&[a, b], &[a]), Direction::Removal);
        // Reordering onto an existing controller reads as a removal.
        assert_eq!(infer_direction(&[a, b], &[b, a]), Direction::Removal);
        assert_eq!(infer_direction(&[a, b], &[a, c]), Direction::Insertion);
        assert_eq!(infer_direction(&[a], &[]), Direction::Removal);
        assert_eq!(infer_direction(&[], &[a]), Direction::Insertion);
    }

    #[test]
    fn sets_preserve_order() {
        let [a, b, c, d, e] = ids();
        let plan = Plan::new(&[a, b, c], &[a, d, c, e], Direction::Insertion);
        assert_eq!(plan.to_insert, vec![d, e]);
        assert_eq!(plan.to_remove, vec![b]);
        assert_eq!(plan.remaining, vec![a, c]);
        assert_eq!(plan.role(d), Role::Inserting);
        assert_eq!(plan.role(b), Role::Removing);
        assert_eq!(plan.role(a), Role::Remaining);
    }

    #[test]
    fn tops_are_last_and_ordered_by_direction() {
        let [a, b, c] = ids();
        let push = Plan::new(&[a, b], &[a, b, c], Direction::Insertion);
        assert_eq!(push.affected, vec![a, b, c]);

        let pop = Plan::new(&[a, b, c], &[a, b], Direction::Removal);
        assert_eq!(pop.affected, vec![a, b, c]);

        // The new top sits under the leaving one during a removal.
        let pop_two = Plan::new(&[a, b, c], &[a], Direction::Removal);
        assert_eq!(pop_two.affected, vec![b, a, c]);

        // Replacing the whole stack keeps the old middle entries first.
        let replace = Plan::new(&[a, b], &[c], Direction::Insertion);
        assert_eq!(replace.affected, vec![a, b, c]);
    }

    #[test]
    fn same_top_appears_once() {
        let [a, b, c] = ids();
        let plan = Plan::new(&[a, b, c], &[a, c], Direction::Removal);
        assert_eq!(plan.affected, vec![a, b, c]);
        assert_eq!(plan.to_remove, vec![b]);
    }

    #[test]
    fn visibility_stops_at_first_opaque_controller() {
        let [a, b, c, d] = ids();
        let stack = [a, b, c, d];
        // Nothing opts in: only the top is drawn.
        assert_eq!(visible_from(&stack, |_| false), 3);
        // The top is shown over the context: the one below stays drawn.
        assert_eq!(visible_from(&stack, |x| x == d), 2);
        assert_eq!(visible_from(&stack, |x| x == d || x == c), 1);
        // The bottom is always drawn when everything above opts in.
        assert_eq!(visible_from(&stack, |_| true), 0);
        assert_eq!(visible_from(&[], |_| true), 0);
        assert_eq!(visible_from(&[a], |_| false), 0);
    }
}
