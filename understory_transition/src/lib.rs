// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_transition --heading-base-level=0

//! Understory Transition: the vocabulary of stacked UI transitions.
//!
//! ## Overview
//!
//! This crate describes *how* content enters and leaves a stack without
//! deciding *when*. It is the leaf layer under a stack orchestrator such as
//! `understory_stack`, and it is usable on its own by anything that animates
//! between two lists of controllers.
//!
//! - [`Progress`](crate::progress::Progress): a [`Direction`](crate::progress::Direction)
//!   (insertion or removal) plus a clamped value in `[0, 1]`.
//! - [`TransitionState`](crate::state::TransitionState): `Begin`, `Change(progress)`,
//!   `End { completed }`, the only vocabulary strategies report in.
//! - [`Presentation`](crate::presentation::Presentation): an immutable bundle
//!   of a [`Transition`](crate::transition::Transition), an optional
//!   [`Interactivity`](crate::interactivity::Interactivity), timing, and options.
//! - [`TransitionContext`](crate::context::TransitionContext): per-transition
//!   shared state scoped to one controller: snapshots, flags, a typed cache,
//!   and view accessors.
//!
//! ## Strategies
//!
//! Concrete effects (slide, sheet, fade, curl) implement
//! [`Transition`](crate::transition::Transition). They edit platform-neutral
//! [`ViewProps`](crate::view::ViewProps); the orchestrator owns the
//! [`ViewTable`](crate::view::ViewTable) and forwards changes to the platform.
//! The only built-in transition is [`Cut`](crate::transition::Cut), which
//! finishes immediately.
//!
//! Gesture-driven dismissal implements
//! [`Interactivity`](crate::interactivity::Interactivity).
//! [`DragDismissal`](crate::interactivity::DragDismissal) covers the common
//! drag-to-dismiss case with threshold and velocity rules.
//!
//! ## Example
//!
//! A fade that renders progress into opacity:
//!
//! ```
//! use understory_transition::context::TransitionContext;
//! use understory_transition::presentation::{Presentation, PresentationOptions};
//! use understory_transition::progress::Progress;
//! use understory_transition::transition::{AnimationObserver, Transition};
//!
//! struct Fade;
//!
//! impl Transition for Fade {
//!     fn animate(&self, _cx: &mut TransitionContext<'_>, observer: AnimationObserver) {
//!         // A real driver would report changes from a display link.
//!         observer.begin();
//!         observer.end(true);
//!     }
//!
//!     fn update(&self, cx: &mut TransitionContext<'_>, progress: Progress) {
//!         if let Some(view) = cx.own_view_mut() {
//!             view.opacity = progress.interpolate(1.0, 0.0);
//!         }
//!     }
//! }
//!
//! let sheet = Presentation::new(Fade).with_options(PresentationOptions::OVER_CURRENT_CONTEXT);
//! assert!(sheet.is_over_current_context());
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod context;
pub mod interactivity;
pub mod presentation;
pub mod progress;
pub mod state;
pub mod timing;
pub mod transition;
pub mod types;
pub mod view;

pub use context::{Cache, CacheKey, TransitionContext, TransitionId, TransitionInfo};
pub use interactivity::{DragDismissal, DragPhase, GestureEvent, GestureObserver, Interactivity};
pub use presentation::{Presentation, PresentationOptions};
pub use progress::{Direction, Interpolate, Progress};
pub use state::TransitionState;
pub use timing::{AnimationTiming, Curve};
pub use transition::{AnimationEvent, AnimationObserver, Cut, Scrub, Transition};
pub use types::{AlwaysAlive, ControllerId, Liveness, Role};
pub use view::{Container, Environment, ViewEntry, ViewFlags, ViewProps, ViewTable};
