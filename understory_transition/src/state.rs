// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The three-phase vocabulary shared by animations and gestures.

use crate::progress::Progress;

/// State reported by an animation or a gesture.
///
/// Every run reports [`Begin`](TransitionState::Begin) once, any number of
/// [`Change`](TransitionState::Change) values, and exactly one
/// [`End`](TransitionState::End).
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TransitionState {
    /// The run started.
    Begin,
    /// The run moved to a new position. Positions may move backward.
    Change(Progress),
    /// The run is over.
    End {
        /// `true` when the run reached its destination, `false` when it was cancelled.
        completed: bool,
    },
}

impl TransitionState {
    /// Returns true for [`TransitionState::End`].
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End { .. })
    }

    /// Progress carried by a [`TransitionState::Change`].
    pub fn progress(&self) -> Option<Progress> {
        match self {
            Self::Change(p) => Some(*p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Direction;

    #[test]
    fn only_end_is_terminal() {
        assert!(!TransitionState::Begin.is_terminal());
        assert!(!TransitionState::Change(Direction::Insertion.at(0.5)).is_terminal());
        assert!(TransitionState::End { completed: false }.is_terminal());
    }

    #[test]
    fn progress_only_for_change() {
        let p = Direction::Removal.at(0.2);
        assert_eq!(TransitionState::Change(p).progress(), Some(p));
        assert_eq!(TransitionState::Begin.progress(), None);
    }
}
