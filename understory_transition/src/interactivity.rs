// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The interactivity strategy contract and a platform-neutral drag dismissal.
//!
//! ## Contract
//!
//! After a controller is pushed with a presentation that declares
//! interactivity, the orchestrator calls [`Interactivity::install`] with a
//! context describing the reverse (removal) transition and a
//! [`GestureObserver`]. The strategy attaches an input source and reports
//! `Begin` when tracking starts, `Change` while it moves (possibly backward),
//! and one terminal `End` on release. [`Interactivity::uninstall`] detaches the
//! source; it is called when the controller leaves the stack for good and must
//! be safe without a prior install.
//!
//! ## Drag dismissal
//!
//! [`DragDismissal`] turns drag translations into removal progress. Platform
//! glue forwards [`DragPhase`] values for a controller; hit testing and
//! recognizer arbitration stay with the glue.
//!
//! ```
//! use understory_transition::interactivity::DragDismissal;
//! use kurbo::Vec2;
//!
//! let drag = DragDismissal::vertical();
//! // Half the extent, slow release: stays.
//! assert!(!drag.should_complete(0.4, Vec2::new(0.0, 100.0)));
//! // Past the threshold: completes.
//! assert!(drag.should_complete(0.6, Vec2::ZERO));
//! // A fast flick completes early.
//! assert!(drag.should_complete(0.1, Vec2::new(0.0, 2000.0)));
//! ```

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::time::Duration;

use kurbo::{Rect, Vec2};

use crate::context::TransitionContext;
use crate::progress::{Direction, Progress, clamp_unit};
use crate::state::TransitionState;
use crate::timing::AnimationTiming;
use crate::types::ControllerId;

/// Something a gesture reports to the orchestrator.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum GestureEvent {
    /// Tracking started.
    Begin,
    /// Tracking moved.
    Change(Progress),
    /// Tracking ended.
    End {
        /// Whether the transition should complete.
        completed: bool,
        /// Time to settle from the current position, if the gesture chose one.
        duration: Option<Duration>,
    },
}

impl From<TransitionState> for GestureEvent {
    fn from(state: TransitionState) -> Self {
        match state {
            TransitionState::Begin => Self::Begin,
            TransitionState::Change(p) => Self::Change(p),
            TransitionState::End { completed } => Self::End {
                completed,
                duration: None,
            },
        }
    }
}

/// Sink a gesture reports into. Cheap to clone.
#[derive(Clone)]
pub struct GestureObserver {
    sink: Rc<dyn Fn(GestureEvent)>,
}

impl core::fmt::Debug for GestureObserver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GestureObserver").finish_non_exhaustive()
    }
}

impl GestureObserver {
    /// Wrap a sink.
    pub fn new(sink: impl Fn(GestureEvent) + 'static) -> Self {
        Self {
            sink: Rc::new(sink),
        }
    }

    /// Report a state.
    pub fn send(&self, state: TransitionState) {
        (self.sink)(state.into());
    }

    /// Report a raw event.
    pub fn send_event(&self, event: GestureEvent) {
        (self.sink)(event);
    }

    /// Report [`TransitionState::Begin`].
    pub fn begin(&self) {
        self.send_event(GestureEvent::Begin);
    }

    /// Report progress.
    pub fn change(&self, progress: Progress) {
        self.send_event(GestureEvent::Change(progress));
    }

    /// Report release, letting the orchestrator pick the settle duration.
    pub fn end(&self, completed: bool) {
        self.send_event(GestureEvent::End {
            completed,
            duration: None,
        });
    }

    /// Report release with an explicit settle duration.
    pub fn end_with_duration(&self, completed: bool, duration: Duration) {
        self.send_event(GestureEvent::End {
            completed,
            duration: Some(duration),
        });
    }
}

/// A pluggable interactivity strategy.
pub trait Interactivity {
    /// Attach an input source for the scoped controller.
    fn install(&self, cx: &mut TransitionContext<'_>, observer: GestureObserver);

    /// Detach the input source of the scoped controller. Safe to call when
    /// nothing was installed.
    fn uninstall(&self, cx: &mut TransitionContext<'_>);
}

/// Raw drag input forwarded by platform glue.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DragPhase {
    /// The finger went down on the controller's dismissal region.
    Began,
    /// The drag moved; `translation` is relative to the start point.
    Moved {
        /// Offset from the start point.
        translation: Vec2,
    },
    /// The finger lifted.
    Ended {
        /// Offset from the start point.
        translation: Vec2,
        /// Release velocity in points per second.
        velocity: Vec2,
    },
    /// The platform cancelled the drag.
    Cancelled,
}

#[derive(Clone, Debug)]
struct DragSession {
    observer: GestureObserver,
    extent: f64,
    timing: AnimationTiming,
    progress: f64,
    tracking: bool,
}

/// Drag-to-dismiss interactivity.
///
/// Progress is the translation projected on `axis` over the container's
/// extent along that axis. A release completes when progress passes
/// `threshold` or the projected velocity exceeds `velocity_threshold`; a flick
/// against the axis faster than `velocity_threshold` always cancels. The
/// settle duration is the presentation's timing scaled by the remaining
/// distance.
#[derive(Debug)]
pub struct DragDismissal {
    axis: Vec2,
    threshold: f64,
    velocity_threshold: f64,
    sessions: RefCell<BTreeMap<ControllerId, DragSession>>,
}

impl Default for DragDismissal {
    fn default() -> Self {
        Self::vertical()
    }
}

impl DragDismissal {
    /// Dismiss by dragging along `axis`, which should be a unit vector.
    pub fn new(axis: Vec2) -> Self {
        Self {
            axis,
            threshold: 0.5,
            velocity_threshold: 800.0,
            sessions: RefCell::new(BTreeMap::new()),
        }
    }

    /// Dismiss by dragging down (sheets, covers).
    pub fn vertical() -> Self {
        Self::new(Vec2::new(0.0, 1.0))
    }

    /// Dismiss by dragging right (edge-swipe back).
    pub fn horizontal() -> Self {
        Self::new(Vec2::new(1.0, 0.0))
    }

    /// Replace the progress threshold (clamped to `[0, 1]`).
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = clamp_unit(threshold);
        self
    }

    /// Replace the velocity threshold, in points per second along the axis.
    #[must_use]
    pub fn with_velocity_threshold(mut self, velocity: f64) -> Self {
        self.velocity_threshold = velocity;
        self
    }

    /// Returns true if `controller` has an installed session.
    pub fn is_installed(&self, controller: ControllerId) -> bool {
        self.sessions.borrow().contains_key(&controller)
    }

    /// Extent of `frame` along the axis.
    pub fn extent_of(&self, frame: Rect) -> f64 {
        self.axis.x.abs() * frame.width() + self.axis.y.abs() * frame.height()
    }

    /// Progress for `translation` over `extent`, clamped to `[0, 1]`.
    pub fn progress_for(&self, translation: Vec2, extent: f64) -> f64 {
        if extent <= 0.0 {
            return 0.0;
        }
        clamp_unit(translation.dot(self.axis) / extent)
    }

    /// Release decision for `progress` and `velocity`.
    pub fn should_complete(&self, progress: f64, velocity: Vec2) -> bool {
        let along = velocity.dot(self.axis);
        if along < -self.velocity_threshold {
            return false;
        }
        progress > self.threshold || along > self.velocity_threshold
    }

    /// Feed drag input for `controller`.
    ///
    /// Returns true if the input belonged to an installed session.
    pub fn handle(&self, controller: ControllerId, phase: DragPhase) -> bool {
        // Resolve the event first; the observer may re-enter `uninstall`.
        let (observer, event) = {
            let mut sessions = self.sessions.borrow_mut();
            let Some(session) = sessions.get_mut(&controller) else {
                return false;
            };
            let event = match phase {
                DragPhase::Began => {
                    if session.tracking {
                        return true;
                    }
                    session.tracking = true;
                    session.progress = 0.0;
                    GestureEvent::Begin
                }
                DragPhase::Moved { translation } => {
                    if !session.tracking {
                        return true;
                    }
                    session.progress = self.progress_for(translation, session.extent);
                    GestureEvent::Change(Direction::Removal.at(session.progress))
                }
                DragPhase::Ended {
                    translation,
                    velocity,
                } => {
                    if !session.tracking {
                        return true;
                    }
                    session.tracking = false;
                    session.progress = self.progress_for(translation, session.extent);
                    let completed = self.should_complete(session.progress, velocity);
                    GestureEvent::End {
                        completed,
                        duration: Some(session.timing.remaining(session.progress, completed)),
                    }
                }
                DragPhase::Cancelled => {
                    if !session.tracking {
                        return true;
                    }
                    session.tracking = false;
                    GestureEvent::End {
                        completed: false,
                        duration: Some(session.timing.remaining(session.progress, false)),
                    }
                }
            };
            (session.observer.clone(), event)
        };
        tracing::trace!(?controller, ?event, "drag dismissal input");
        observer.send_event(event);
        true
    }
}

impl Interactivity for DragDismissal {
    fn install(&self, cx: &mut TransitionContext<'_>, observer: GestureObserver) {
        let controller = cx.controller();
        let frame = cx
            .container(controller)
            .map(|c| c.frame)
            .unwrap_or(cx.info().bounds);
        let session = DragSession {
            observer,
            extent: self.extent_of(frame),
            timing: cx.timing(),
            progress: 0.0,
            tracking: false,
        };
        self.sessions.borrow_mut().insert(controller, session);
    }

    fn uninstall(&self, cx: &mut TransitionContext<'_>) {
        self.sessions.borrow_mut().remove(&cx.controller());
    }
}
