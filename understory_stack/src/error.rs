// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Request validation errors.

use understory_transition::types::ControllerId;

/// A request the stack refused at submission.
///
/// Nothing is queued and the completion is dropped when a request is refused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StackError {
    /// The target stack lists a controller more than once.
    #[error("controller {0:?} appears more than once in the target stack")]
    DuplicateController(ControllerId),
    /// The controller is not alive in the stack's registry.
    #[error("controller {0:?} is not registered")]
    UnknownController(ControllerId),
}
