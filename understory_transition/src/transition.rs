// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The transition strategy contract.
//!
//! ## Phases
//!
//! For every controller affected by a stack change, the orchestrator calls:
//!
//! 1. [`Transition::prepare`] for all controllers (a barrier: nobody animates
//!    before everybody is prepared);
//! 2. [`Transition::animate`] with an [`AnimationObserver`] for each controller
//!    that needs animating;
//! 3. [`Transition::update`] whenever new progress must be rendered;
//! 4. [`Transition::complete`] once, after every animated controller reported
//!    its terminal state.
//!
//! `animate` starts whatever drives time (a display link, a property animator,
//! a test clock) and returns immediately. That driver then reports
//! [`TransitionState`] values through the observer: `Begin` once, any number of
//! `Change`, and exactly one `End`. A driver that can be scrubbed offers a
//! [`Scrub`] handle instead of running its own clock when the transition is
//! interactive.
//!
//! A driver that never reports `End` stalls its stack.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::time::Duration;

use crate::context::TransitionContext;
use crate::progress::Progress;
use crate::state::TransitionState;

/// Handle an interactive transition uses to drive an animation directly.
pub trait Scrub {
    /// Jump to `value` in `[0, 1]` of the transition's direction.
    fn seek(&mut self, value: f64);

    /// Resume from the current position toward the end (`completed`) or back
    /// to the start, taking `duration`, then report `End` through the
    /// animation's observer.
    fn finish(&mut self, completed: bool, duration: Duration);
}

/// Something an animation reports to the orchestrator.
pub enum AnimationEvent {
    /// Phase progress.
    State(TransitionState),
    /// The animation can be scrubbed; progress will come from the orchestrator.
    Scrubbable(Box<dyn Scrub>),
}

impl core::fmt::Debug for AnimationEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::State(state) => f.debug_tuple("State").field(state).finish(),
            Self::Scrubbable(_) => f.write_str("Scrubbable(..)"),
        }
    }
}

/// Sink an animation reports into.
///
/// Cheap to clone; drivers keep a clone until they report `End`.
#[derive(Clone)]
pub struct AnimationObserver {
    sink: Rc<dyn Fn(AnimationEvent)>,
}

impl core::fmt::Debug for AnimationObserver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AnimationObserver").finish_non_exhaustive()
    }
}

impl AnimationObserver {
    /// Wrap a sink.
    pub fn new(sink: impl Fn(AnimationEvent) + 'static) -> Self {
        Self {
            sink: Rc::new(sink),
        }
    }

    /// Report a state.
    pub fn send(&self, state: TransitionState) {
        (self.sink)(AnimationEvent::State(state));
    }

    /// Report [`TransitionState::Begin`].
    pub fn begin(&self) {
        self.send(TransitionState::Begin);
    }

    /// Report [`TransitionState::Change`].
    pub fn change(&self, progress: Progress) {
        self.send(TransitionState::Change(progress));
    }

    /// Report [`TransitionState::End`].
    pub fn end(&self, completed: bool) {
        self.send(TransitionState::End { completed });
    }

    /// Hand the orchestrator a scrub control.
    pub fn offer_scrub(&self, scrub: impl Scrub + 'static) {
        (self.sink)(AnimationEvent::Scrubbable(Box::new(scrub)));
    }
}

/// A pluggable transition strategy.
///
/// Implementations are shared by value inside a
/// [`Presentation`](crate::presentation::Presentation) and must keep
/// per-run state in the context's [`Cache`](crate::context::Cache), not in
/// `self`.
pub trait Transition {
    /// Synchronous setup for the scoped controller.
    ///
    /// May run again before `complete` and must tolerate it.
    fn prepare(&self, cx: &mut TransitionContext<'_>) {
        let _ = cx;
    }

    /// Start animating the scoped controller and report through `observer`.
    fn animate(&self, cx: &mut TransitionContext<'_>, observer: AnimationObserver);

    /// Render `progress` for the scoped controller.
    fn update(&self, cx: &mut TransitionContext<'_>, progress: Progress) {
        let _ = (cx, progress);
    }

    /// Synchronous cleanup; called exactly once per live controller per run.
    fn complete(&self, cx: &mut TransitionContext<'_>, completed: bool) {
        let _ = (cx, completed);
    }
}

/// A transition without visuals that finishes immediately.
///
/// This is the global default presentation's transition.
#[derive(Copy, Clone, Debug, Default)]
pub struct Cut;

impl Transition for Cut {
    fn animate(&self, _cx: &mut TransitionContext<'_>, observer: AnimationObserver) {
        observer.begin();
        observer.end(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Cache, TransitionId, TransitionInfo};
    use crate::progress::Direction;
    use crate::timing::AnimationTiming;
    use crate::types::{AlwaysAlive, ControllerId};
    use crate::view::ViewTable;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    #[test]
    fn cut_reports_begin_then_end() {
        let a = ControllerId::new(0, 1);
        let info = TransitionInfo {
            id: TransitionId(1),
            direction: Direction::Insertion,
            from: vec![].into(),
            to: vec![a].into(),
            animated: true,
            interactive: false,
            bounds: kurbo::Rect::ZERO,
            safe_area: kurbo::Insets::ZERO,
        };
        let mut cache = Cache::new();
        let mut views = ViewTable::new();
        let mut cx = TransitionContext::new(
            &info,
            &mut cache,
            &mut views,
            &AlwaysAlive,
            a,
            AnimationTiming::default(),
        );

        let log: Rc<RefCell<Vec<TransitionState>>> = Rc::default();
        let sink = log.clone();
        let observer = AnimationObserver::new(move |ev| {
            if let AnimationEvent::State(s) = ev {
                sink.borrow_mut().push(s);
            }
        });
        Cut.prepare(&mut cx);
        Cut.animate(&mut cx, observer);
        assert_eq!(
            *log.borrow(),
            vec![
                TransitionState::Begin,
                TransitionState::End { completed: true }
            ]
        );
    }

    #[test]
    fn offered_scrub_reaches_the_sink() {
        struct Recorder(Rc<RefCell<Vec<f64>>>);
        impl Scrub for Recorder {
            fn seek(&mut self, value: f64) {
                self.0.borrow_mut().push(value);
            }
            fn finish(&mut self, _completed: bool, _duration: Duration) {}
        }

        let seeks: Rc<RefCell<Vec<f64>>> = Rc::default();
        let taken: Rc<RefCell<Option<Box<dyn Scrub>>>> = Rc::default();
        let slot = taken.clone();
        let observer = AnimationObserver::new(move |ev| {
            if let AnimationEvent::Scrubbable(s) = ev {
                *slot.borrow_mut() = Some(s);
            }
        });
        observer.offer_scrub(Recorder(seeks.clone()));
        taken.borrow_mut().as_mut().unwrap().seek(0.4);
        assert_eq!(*seeks.borrow(), vec![0.4]);
    }
}
