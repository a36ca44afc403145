// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_stack --heading-base-level=0

//! Understory Stack: a deterministic orchestrator for stacks of UI controllers.
//!
//! ## Overview
//!
//! A [`StackController`] owns an ordered stack of controllers and moves it
//! from one state to another through transitions described by
//! [`understory_transition`]. It computes which controllers enter, leave, and
//! stay, prepares all of them before any animates, waits for every animation
//! to end, then commits the new stack or rolls back to the old one.
//!
//! - One transition runs at a time. Requests made meanwhile are queued and run
//!   in submission order; none are merged.
//! - Controllers live in a [`Registry`] and are referred to by generational
//!   ids. A controller released mid-transition counts as finished.
//! - Only the visible suffix of the stack animates: walking down from the top,
//!   the first controller not shown over the current context hides everything
//!   below it.
//! - After a push whose presentation declares interactivity, the new top gets
//!   a gesture that can drive its own dismissal, scrub it, and cancel it.
//!
//! View hierarchy changes go to a [`ViewHost`]; [`HeadlessHost`] records them.
//!
//! ## Example
//!
//! ```
//! use understory_stack::{HeadlessHost, Options, Registry, StackConfig, StackController};
//! use understory_stack::registry::Controller;
//! use understory_transition::presentation::{Presentation, PresentationOptions};
//! use understory_transition::transition::Cut;
//!
//! struct Screen;
//! impl Controller for Screen {}
//!
//! let registry = Registry::new();
//! let stack = StackController::new(registry.clone(), StackConfig::default(), HeadlessHost::new());
//!
//! let list = registry.insert(Screen);
//! let sheet = registry.insert(Screen);
//! stack.set_controllers(vec![list], Options::default(), |_| {}).unwrap();
//!
//! // A sheet keeps the list drawn underneath.
//! let over = Presentation::new(Cut).with_options(PresentationOptions::OVER_CURRENT_CONTEXT);
//! stack
//!     .show(sheet, Options::default().with_presentation(over), |done| assert!(done))
//!     .unwrap();
//! assert_eq!(stack.with_host(|host| host.drawn()), [list, sheet]);
//!
//! // The root stack never becomes empty.
//! stack.set_controllers(vec![], Options::default(), |done| assert!(!done)).unwrap();
//! assert_eq!(stack.controllers(), [list, sheet]);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod error;
pub mod host;
pub mod plan;
pub mod registry;
pub mod stack;

pub use error::StackError;
pub use host::{HeadlessHost, HeadlessView, ViewHost};
pub use plan::Plan;
pub use registry::{Controller, Registry};
pub use stack::{Options, StackConfig, StackController, StackPhase};
