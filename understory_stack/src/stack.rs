// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The stack controller: one transition at a time, everything else queued.
//!
//! ## Model
//!
//! A [`StackController`] owns an ordered stack of [`ControllerId`]s, their
//! presentations and view entries, and at most one in-flight transition.
//! Every entry point (requests, animation observers, gesture observers) posts
//! an event and pumps the event queue; calls made while the queue is being
//! pumped only post. Strategies therefore never re-enter the orchestrator,
//! and a long chain of queued requests runs iteratively.
//!
//! A transition goes through [`StackPhase::Preparing`] (every affected
//! controller is prepared), [`StackPhase::Animating`] (visible controllers
//! animate and report through their own observers) and
//! [`StackPhase::Completing`] (strategies complete, the stack commits or rolls
//! back, and unreferenced controller state is released).
//!
//! ## Re-entrancy
//!
//! Strategies and [`Controller`](crate::registry::Controller) hooks run while
//! the stack is borrowed: they may post requests and report through their
//! observers, but must not call the read accessors. Request completions run
//! with the stack released.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, VecDeque};
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use kurbo::{Insets, Rect};
use understory_transition::context::{Cache, TransitionContext, TransitionId, TransitionInfo};
use understory_transition::interactivity::{GestureEvent, GestureObserver, Interactivity};
use understory_transition::presentation::Presentation;
use understory_transition::progress::Direction;
use understory_transition::state::TransitionState;
use understory_transition::transition::{AnimationEvent, AnimationObserver, Scrub, Transition};
use understory_transition::types::{ControllerId, Role};
use understory_transition::view::{Container, ViewEntry, ViewFlags, ViewTable};

use crate::error::StackError;
use crate::host::ViewHost;
use crate::plan::{Plan, infer_direction, visible_from};
use crate::registry::{Controller, Registry};

/// Stack-wide configuration.
#[derive(Clone, Debug)]
pub struct StackConfig {
    /// A root stack refuses to become empty.
    pub root: bool,
    /// Presentation for controllers that declare none.
    pub default_presentation: Option<Presentation>,
    /// Bounds of the stack; new containers fill them.
    pub bounds: Rect,
    /// Safe-area insets reported to strategies.
    pub safe_area: Insets,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            root: true,
            default_presentation: None,
            bounds: Rect::ZERO,
            safe_area: Insets::ZERO,
        }
    }
}

/// Per-request options.
#[derive(Clone, Debug)]
pub struct Options {
    /// Presentation for the controllers this request inserts or removes.
    pub presentation: Option<Presentation>,
    /// Direction; inferred from the new top when `None`.
    pub direction: Option<Direction>,
    /// Animate the change. Defaults to `true`.
    pub animated: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            presentation: None,
            direction: None,
            animated: true,
        }
    }
}

impl Options {
    /// Options for a change without animation.
    pub fn instant() -> Self {
        Self {
            animated: false,
            ..Self::default()
        }
    }

    /// Use `presentation` for the changing controllers.
    #[must_use]
    pub fn with_presentation(mut self, presentation: Presentation) -> Self {
        self.presentation = Some(presentation);
        self
    }

    /// Force the direction.
    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }
}

/// Where a stack is in its transition cycle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum StackPhase {
    /// No transition in flight.
    #[default]
    Idle,
    /// Affected controllers are being prepared.
    Preparing,
    /// Animations are running.
    Animating,
    /// Strategies are completing; the stack is committing or rolling back.
    Completing,
}

type Completion = Box<dyn FnOnce(bool)>;

enum Target {
    Exact(Vec<ControllerId>),
    Show(ControllerId),
    HideTop(usize),
}

struct Request {
    target: Target,
    options: Options,
    completion: Option<Completion>,
}

impl Request {
    fn references(&self, controller: ControllerId) -> bool {
        match &self.target {
            Target::Exact(list) => list.contains(&controller),
            Target::Show(c) => *c == controller,
            Target::HideTop(_) => false,
        }
    }
}

enum Event {
    Request(Request),
    Animation {
        id: TransitionId,
        controller: ControllerId,
        event: AnimationEvent,
    },
    Gesture {
        controller: ControllerId,
        event: GestureEvent,
    },
    Released(ControllerId),
}

struct Run {
    presentation: Presentation,
    animate: bool,
    ended: Option<bool>,
    scrub: Option<Box<dyn Scrub>>,
    progress: f64,
}

struct Gesture {
    owner: ControllerId,
    result: Option<bool>,
}

struct Active {
    info: TransitionInfo,
    plan: Plan,
    cache: Cache,
    runs: BTreeMap<ControllerId, Run>,
    appearing: Vec<ControllerId>,
    disappearing: Vec<ControllerId>,
    gesture: Option<Gesture>,
    completion: Option<Completion>,
}

struct Installed {
    interactivity: Rc<dyn Interactivity>,
    info: TransitionInfo,
    cache: Cache,
    presentation: Presentation,
}

type Done = Option<(Completion, bool)>;

struct Inner<H> {
    link: Weak<Shared<H>>,
    registry: Registry,
    config: StackConfig,
    host: H,
    stack: Vec<ControllerId>,
    presentations: BTreeMap<ControllerId, Presentation>,
    views: ViewTable,
    installed: BTreeMap<ControllerId, Installed>,
    pending: VecDeque<Request>,
    active: Option<Active>,
    phase: StackPhase,
    next_id: u64,
}

struct Shared<H> {
    registry: Registry,
    inner: RefCell<Inner<H>>,
    events: RefCell<VecDeque<Event>>,
    pumping: Cell<bool>,
}

/// Handle to a stack of controllers.
///
/// Cloning yields another handle to the same stack.
///
/// ```
/// use understory_stack::{HeadlessHost, Options, Registry, StackConfig, StackController};
/// use understory_stack::registry::Controller;
///
/// struct Screen;
/// impl Controller for Screen {}
///
/// let registry = Registry::new();
/// let stack = StackController::new(registry.clone(), StackConfig::default(), HeadlessHost::new());
/// let home = registry.insert(Screen);
/// let detail = registry.insert(Screen);
///
/// stack.show(home, Options::default(), |_| {}).unwrap();
/// stack.show(detail, Options::default(), |_| {}).unwrap();
/// assert_eq!(stack.controllers(), [home, detail]);
/// assert!(stack.with_host(|host| host.is_drawn(detail) && !host.is_drawn(home)));
///
/// stack.hide_top(1, Options::default(), |done| assert!(done));
/// assert_eq!(stack.top(), Some(home));
/// ```
pub struct StackController<H: ViewHost + 'static> {
    shared: Rc<Shared<H>>,
}

impl<H: ViewHost + 'static> Clone for StackController<H> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<H: ViewHost + 'static> core::fmt::Debug for StackController<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut s = f.debug_struct("StackController");
        if let Ok(inner) = self.shared.inner.try_borrow() {
            s.field("stack", &inner.stack)
                .field("phase", &inner.phase)
                .field("pending", &inner.pending.len());
        }
        s.finish_non_exhaustive()
    }
}

impl<H: ViewHost + 'static> StackController<H> {
    /// Create an empty stack over `registry`, reporting view changes to `host`.
    pub fn new(registry: Registry, config: StackConfig, host: H) -> Self {
        let shared = Rc::new_cyclic(|link| Shared {
            registry: registry.clone(),
            inner: RefCell::new(Inner {
                link: link.clone(),
                registry,
                config,
                host,
                stack: Vec::new(),
                presentations: BTreeMap::new(),
                views: ViewTable::new(),
                installed: BTreeMap::new(),
                pending: VecDeque::new(),
                active: None,
                phase: StackPhase::Idle,
                next_id: 0,
            }),
            events: RefCell::new(VecDeque::new()),
            pumping: Cell::new(false),
        });
        let link = Rc::downgrade(&shared);
        shared.registry.watch(move |controller| {
            let Some(shared) = link.upgrade() else {
                return false;
            };
            post(&shared, Event::Released(controller));
            true
        });
        Self { shared }
    }

    /// Replace the stack with `target`.
    ///
    /// Runs now when the stack is idle and nothing is queued, otherwise after
    /// every earlier request. `completion` receives `true` when the stack ended
    /// up at `target` and `false` when the change was refused or cancelled.
    /// Controllers that are no longer alive are dropped from `target`.
    pub fn set_controllers(
        &self,
        target: Vec<ControllerId>,
        options: Options,
        completion: impl FnOnce(bool) + 'static,
    ) -> Result<(), StackError> {
        for (i, c) in target.iter().enumerate() {
            if target[..i].contains(c) {
                return Err(StackError::DuplicateController(*c));
            }
        }
        self.submit(Target::Exact(target), options, completion);
        Ok(())
    }

    /// Push `controller`, or pop back to it if it is already in the stack.
    ///
    /// The target is computed from the stack the request runs against.
    pub fn show(
        &self,
        controller: ControllerId,
        options: Options,
        completion: impl FnOnce(bool) + 'static,
    ) -> Result<(), StackError> {
        if !self.shared.registry.is_alive(controller) {
            return Err(StackError::UnknownController(controller));
        }
        self.submit(Target::Show(controller), options, completion);
        Ok(())
    }

    /// Pop `count` controllers from the top.
    pub fn hide_top(&self, count: usize, options: Options, completion: impl FnOnce(bool) + 'static) {
        self.submit(Target::HideTop(count), options, completion);
    }

    /// Live controllers of the committed stack, bottom to top.
    pub fn controllers(&self) -> Vec<ControllerId> {
        let inner = self.shared.inner.borrow();
        inner
            .stack
            .iter()
            .copied()
            .filter(|c| inner.registry.is_alive(*c))
            .collect()
    }

    /// Live top of the committed stack.
    pub fn top(&self) -> Option<ControllerId> {
        self.controllers().last().copied()
    }

    /// Current phase.
    pub fn phase(&self) -> StackPhase {
        self.shared.inner.borrow().phase
    }

    /// Number of queued requests.
    pub fn pending(&self) -> usize {
        self.shared.inner.borrow().pending.len()
    }

    /// Description of the in-flight transition.
    pub fn transition(&self) -> Option<TransitionInfo> {
        let inner = self.shared.inner.borrow();
        inner.active.as_ref().map(|a| a.info.clone())
    }

    /// Presentation assigned to `controller`.
    pub fn presentation(&self, controller: ControllerId) -> Option<Presentation> {
        self.shared
            .inner
            .borrow()
            .presentations
            .get(&controller)
            .cloned()
    }

    /// View entry of `controller`.
    pub fn view(&self, controller: ControllerId) -> Option<ViewEntry> {
        self.shared.inner.borrow().views.get(controller).cloned()
    }

    /// Returns true if `controller` has an installed interactivity.
    pub fn has_interactivity(&self, controller: ControllerId) -> bool {
        self.shared
            .inner
            .borrow()
            .installed
            .contains_key(&controller)
    }

    /// Run `f` with the view host.
    ///
    /// `f` must not issue requests or release controllers.
    pub fn with_host<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        f(&mut self.shared.inner.borrow_mut().host)
    }

    /// The registry this stack resolves controllers through.
    pub fn registry(&self) -> &Registry {
        &self.shared.registry
    }

    /// Resize the stack.
    ///
    /// Containers of existing views follow, and installed interactivity is
    /// installed again against the new containers. While a transition runs,
    /// only views it creates use the new bounds; the rest follow when it
    /// finishes.
    pub fn set_bounds(&self, bounds: Rect, safe_area: Insets) {
        let mut inner = self.shared.inner.borrow_mut();
        inner.config.bounds = bounds;
        inner.config.safe_area = safe_area;
        if inner.active.is_none() {
            inner.apply_bounds();
        }
    }

    fn submit(&self, target: Target, options: Options, completion: impl FnOnce(bool) + 'static) {
        let request = Request {
            target,
            options,
            completion: Some(Box::new(completion)),
        };
        post(&self.shared, Event::Request(request));
    }
}

fn post<H: ViewHost + 'static>(shared: &Shared<H>, event: Event) {
    shared.events.borrow_mut().push_back(event);
    pump(shared);
}

fn pump<H: ViewHost + 'static>(shared: &Shared<H>) {
    if shared.pumping.replace(true) {
        return;
    }
    loop {
        let event = shared.events.borrow_mut().pop_front();
        let done = if let Some(event) = event {
            shared.inner.borrow_mut().handle(event)
        } else {
            let mut inner = shared.inner.borrow_mut();
            let Some(request) = inner.next_pending() else {
                break;
            };
            inner.start(request, None)
        };
        if let Some((completion, finished)) = done {
            completion(finished);
        }
    }
    shared.pumping.set(false);
}

impl<H: ViewHost + 'static> Inner<H> {
    fn handle(&mut self, event: Event) -> Done {
        match event {
            Event::Request(request) => {
                if self.active.is_some() || !self.pending.is_empty() {
                    self.pending.push_back(request);
                    tracing::debug!(pending = self.pending.len(), "request queued");
                    None
                } else {
                    self.start(request, None)
                }
            }
            Event::Animation {
                id,
                controller,
                event,
            } => self.on_animation(id, controller, event),
            Event::Gesture { controller, event } => self.on_gesture(controller, event),
            Event::Released(controller) => self.on_released(controller),
        }
    }

    fn next_pending(&mut self) -> Option<Request> {
        if self.active.is_some() {
            return None;
        }
        self.pending.pop_front()
    }

    // --- starting ---

    fn start(&mut self, request: Request, gesture: Option<ControllerId>) -> Done {
        let Request {
            target,
            options,
            completion,
        } = request;
        self.prune();

        let Some(target) = self.resolve(target) else {
            return completion.map(|c| (c, false));
        };
        if target.is_empty() && self.config.root {
            tracing::debug!("refusing to empty a root stack");
            return completion.map(|c| (c, false));
        }
        if target == self.stack {
            tracing::trace!("target equals the current stack");
            return completion.map(|c| (c, true));
        }

        let direction = options
            .direction
            .unwrap_or_else(|| infer_direction(&self.stack, &target));
        let plan = Plan::new(&self.stack, &target, direction);

        for &c in &plan.to_insert {
            let presentation = self.resolve_presentation(c, options.presentation.as_ref());
            self.presentations.insert(c, presentation);
        }

        let from_visible = self.visible(&self.stack);
        let to_visible = self.visible(&target);
        let mut runs = BTreeMap::new();
        for &c in &plan.affected {
            let presentation = match (plan.role(c), options.presentation.as_ref()) {
                (Role::Removing, Some(explicit)) => explicit.clone(),
                _ => self.presentations.get(&c).cloned().unwrap_or_default(),
            };
            runs.insert(
                c,
                Run {
                    presentation,
                    animate: from_visible.contains(&c) || to_visible.contains(&c),
                    ended: None,
                    scrub: None,
                    progress: 0.0,
                },
            );
        }
        let appearing: Vec<_> = to_visible
            .iter()
            .copied()
            .filter(|c| !from_visible.contains(c))
            .collect();
        let disappearing: Vec<_> = from_visible
            .iter()
            .copied()
            .filter(|c| !to_visible.contains(c))
            .collect();

        self.next_id += 1;
        let info = TransitionInfo {
            id: TransitionId(self.next_id),
            direction,
            from: self.stack.clone().into(),
            to: target.clone().into(),
            animated: options.animated,
            interactive: gesture.is_some(),
            bounds: self.config.bounds,
            safe_area: self.config.safe_area,
        };
        tracing::debug!(
            id = info.id.0,
            ?direction,
            from = info.from.len(),
            to = info.to.len(),
            animated = info.animated,
            interactive = info.interactive,
            "transition started"
        );

        self.place(&target);
        for &c in &plan.affected {
            if runs.get(&c).is_some_and(|r: &Run| r.animate) {
                self.attach(c);
                self.set_hidden(c, false);
            } else if plan.role(c) == Role::Inserting {
                self.attach(c);
                self.set_hidden(c, true);
            }
        }
        let animated = info.animated;
        for &c in &disappearing {
            self.hook(c, |ctrl| ctrl.will_disappear(c, animated));
        }
        for &c in &appearing {
            self.hook(c, |ctrl| ctrl.will_appear(c, animated));
        }

        let order = plan.affected.clone();
        self.active = Some(Active {
            info,
            plan,
            cache: Cache::new(),
            runs,
            appearing,
            disappearing,
            gesture: gesture.map(|owner| Gesture {
                owner,
                result: None,
            }),
            completion,
        });

        self.phase = StackPhase::Preparing;
        for &c in &order {
            if self.registry.is_alive(c) {
                tracing::trace!(controller = ?c, "prepare");
                self.call(c, |t, cx| t.prepare(cx));
            }
        }

        self.phase = StackPhase::Animating;
        if animated {
            for &c in &order {
                if self.registry.is_alive(c) && self.run(c).is_some_and(|r| r.animate) {
                    tracing::trace!(controller = ?c, "animate");
                    let observer = self.observer(c);
                    self.call(c, move |t, cx| t.animate(cx, observer));
                } else if let Some(run) = self.run_mut(c) {
                    run.ended = Some(true);
                }
            }
        } else {
            for &c in &order {
                if self.registry.is_alive(c) && self.run(c).is_some_and(|r| r.animate) {
                    self.call(c, move |t, cx| t.update(cx, direction.at(1.0)));
                }
                if let Some(run) = self.run_mut(c) {
                    run.ended = Some(true);
                }
            }
        }
        self.try_finish()
    }

    fn resolve(&self, target: Target) -> Option<Vec<ControllerId>> {
        match target {
            Target::Exact(mut list) => {
                list.retain(|c| self.registry.is_alive(*c));
                Some(list)
            }
            Target::Show(controller) => {
                if !self.registry.is_alive(controller) {
                    tracing::debug!(?controller, "show target was released before it ran");
                    return None;
                }
                let mut list = self.stack.clone();
                match list.iter().position(|c| *c == controller) {
                    Some(index) => list.truncate(index + 1),
                    None => list.push(controller),
                }
                Some(list)
            }
            Target::HideTop(count) => {
                let keep = self.stack.len().saturating_sub(count);
                Some(self.stack[..keep].to_vec())
            }
        }
    }

    fn resolve_presentation(
        &self,
        controller: ControllerId,
        explicit: Option<&Presentation>,
    ) -> Presentation {
        if let Some(explicit) = explicit {
            return explicit.clone();
        }
        self.registry
            .get(controller)
            .and_then(|ctrl| ctrl.presentation())
            .or_else(|| self.config.default_presentation.clone())
            .unwrap_or_default()
    }

    fn visible(&self, stack: &[ControllerId]) -> Vec<ControllerId> {
        let lowest = visible_from(stack, |c| {
            self.presentations
                .get(&c)
                .is_some_and(Presentation::is_over_current_context)
        });
        stack[lowest..].to_vec()
    }

    fn observer(&self, controller: ControllerId) -> AnimationObserver {
        let link = self.link.clone();
        let id = self
            .active
            .as_ref()
            .map(|a| a.info.id)
            .unwrap_or(TransitionId(0));
        AnimationObserver::new(move |event| {
            if let Some(shared) = link.upgrade() {
                post(
                    &shared,
                    Event::Animation {
                        id,
                        controller,
                        event,
                    },
                );
            }
        })
    }

    // --- events ---

    fn on_animation(
        &mut self,
        id: TransitionId,
        controller: ControllerId,
        event: AnimationEvent,
    ) -> Done {
        let Some(active) = self.active.as_mut() else {
            tracing::trace!(id = id.0, ?controller, "event for a finished transition");
            return None;
        };
        if active.info.id != id {
            tracing::trace!(id = id.0, ?controller, "event for a finished transition");
            return None;
        }
        let interactive = active.info.interactive;
        let Some(run) = active.runs.get_mut(&controller) else {
            return None;
        };
        if run.ended.is_some() {
            if matches!(event, AnimationEvent::State(TransitionState::End { .. })) {
                tracing::warn!(?controller, "animation reported End more than once");
            }
            return None;
        }
        if !self.registry.is_alive(controller) {
            run.ended = Some(true);
            return self.try_finish();
        }
        match event {
            AnimationEvent::Scrubbable(scrub) => {
                if interactive {
                    run.scrub = Some(scrub);
                }
                None
            }
            AnimationEvent::State(TransitionState::Begin) => {
                tracing::trace!(?controller, "animation began");
                None
            }
            AnimationEvent::State(TransitionState::Change(progress)) => {
                run.progress = progress.value();
                self.call(controller, |t, cx| t.update(cx, progress));
                None
            }
            AnimationEvent::State(TransitionState::End { completed }) => {
                tracing::trace!(?controller, completed, "animation ended");
                run.ended = Some(completed);
                self.try_finish()
            }
        }
    }

    /// A controller left the registry. If the transition was waiting on it,
    /// it no longer is.
    fn on_released(&mut self, controller: ControllerId) -> Done {
        let active = self.active.as_ref()?;
        let awaited = active
            .runs
            .get(&controller)
            .is_some_and(|r| r.ended.is_none())
            || active
                .gesture
                .as_ref()
                .is_some_and(|g| g.owner == controller && g.result.is_none());
        if !awaited {
            return None;
        }
        tracing::debug!(?controller, "released while the transition waited on it");
        self.try_finish()
    }

    fn on_gesture(&mut self, controller: ControllerId, event: GestureEvent) -> Done {
        match event {
            GestureEvent::Begin => self.begin_interactive(controller),
            GestureEvent::Change(progress) => {
                let Some(direction) = self.gesture_direction(controller) else {
                    return None;
                };
                let value = if progress.direction() == direction {
                    progress.value()
                } else {
                    progress.mirrored().value()
                };
                for c in self.unsettled() {
                    let Some(run) = self.run_mut(c) else {
                        continue;
                    };
                    run.progress = value;
                    if let Some(scrub) = run.scrub.as_mut() {
                        scrub.seek(value);
                    } else {
                        self.call(c, move |t, cx| t.update(cx, direction.at(value)));
                    }
                }
                None
            }
            GestureEvent::End {
                completed,
                duration,
            } => {
                let Some(direction) = self.gesture_direction(controller) else {
                    return None;
                };
                if let Some(gesture) = self.active.as_mut().and_then(|a| a.gesture.as_mut()) {
                    gesture.result = Some(completed);
                }
                tracing::debug!(?controller, completed, "gesture released");
                let settled = direction.at(if completed { 1.0 } else { 0.0 });
                for c in self.unsettled() {
                    let Some(run) = self.run_mut(c) else {
                        continue;
                    };
                    let remaining = duration.unwrap_or_else(|| {
                        run.presentation.timing().remaining(run.progress, completed)
                    });
                    if let Some(scrub) = run.scrub.as_mut() {
                        scrub.finish(completed, remaining);
                    } else {
                        run.ended = Some(completed);
                        self.call(c, move |t, cx| t.update(cx, settled));
                    }
                }
                self.try_finish()
            }
        }
    }

    fn begin_interactive(&mut self, controller: ControllerId) -> Done {
        let live = self.live_stack();
        let refused = if self.active.is_some() {
            Some("a transition is in flight")
        } else if !self.pending.is_empty() {
            Some("requests are queued")
        } else if live.last() != Some(&controller) {
            Some("source is not the top controller")
        } else if live.len() < 2 {
            Some("nothing to reveal below the top")
        } else if !self.installed.contains_key(&controller) {
            Some("no interactivity installed")
        } else {
            None
        };
        if let Some(reason) = refused {
            tracing::warn!(?controller, reason, "interactive transition refused");
            return None;
        }
        let below = live[..live.len() - 1].to_vec();
        let request = Request {
            target: Target::Exact(below),
            options: Options::default().with_direction(Direction::Removal),
            completion: None,
        };
        self.start(request, Some(controller))
    }

    /// Direction of the interactive transition `controller` is driving, if its
    /// gesture is still tracking.
    fn gesture_direction(&self, controller: ControllerId) -> Option<Direction> {
        let active = self.active.as_ref()?;
        let gesture = active.gesture.as_ref()?;
        (gesture.owner == controller && gesture.result.is_none()).then_some(active.info.direction)
    }

    /// Live, animating controllers that have not ended, in affected order.
    fn unsettled(&self) -> Vec<ControllerId> {
        let Some(active) = self.active.as_ref() else {
            return Vec::new();
        };
        active
            .plan
            .affected
            .iter()
            .copied()
            .filter(|c| {
                active
                    .runs
                    .get(c)
                    .is_some_and(|r| r.animate && r.ended.is_none())
                    && self.registry.is_alive(*c)
            })
            .collect()
    }

    // --- finishing ---

    fn try_finish(&mut self) -> Done {
        let active = self.active.as_mut()?;
        for (c, run) in &mut active.runs {
            if run.ended.is_none() && !self.registry.is_alive(*c) {
                tracing::trace!(controller = ?c, "released mid-transition; settled");
                run.ended = Some(true);
            }
        }
        if active.runs.values().any(|r| r.ended.is_none()) {
            return None;
        }
        let gesture = match &active.gesture {
            Some(g) => match g.result {
                Some(result) => Some(result),
                // Nothing is left to drive or cancel the gesture.
                None if !self.registry.is_alive(g.owner) => Some(true),
                None => return None,
            },
            None => None,
        };
        let completed =
            gesture.unwrap_or(true) && active.runs.values().all(|r| r.ended == Some(true));
        self.finish(completed)
    }

    fn finish(&mut self, completed: bool) -> Done {
        self.phase = StackPhase::Completing;
        let order = self.active.as_ref()?.plan.affected.clone();
        for &c in &order {
            if self.registry.is_alive(c) {
                tracing::trace!(controller = ?c, completed, "complete");
                self.call(c, |t, cx| t.complete(cx, completed));
            }
        }
        let Active {
            info,
            plan,
            appearing,
            disappearing,
            completion,
            ..
        } = self.active.take()?;

        if completed {
            self.stack = info.to.to_vec();
        }
        self.stack.retain(|c| self.registry.is_alive(*c));

        self.show_committed();
        for &c in &order {
            if !self.stack.contains(&c) {
                self.detach(c);
            }
        }

        let animated = info.animated;
        for &c in &disappearing {
            if completed {
                self.hook(c, |ctrl| ctrl.did_disappear(c, animated));
            } else {
                self.hook(c, |ctrl| ctrl.did_appear(c, animated));
            }
        }
        for &c in &appearing {
            if completed {
                self.hook(c, |ctrl| ctrl.did_appear(c, animated));
            } else {
                self.hook(c, |ctrl| ctrl.did_disappear(c, animated));
            }
        }
        if completed {
            for &c in &plan.to_insert {
                self.hook(c, |ctrl| ctrl.did_move_to_parent(c));
            }
            for &c in &plan.to_remove {
                self.hook(c, |ctrl| ctrl.did_remove_from_parent(c));
            }
        } else {
            for &c in &plan.to_insert {
                self.hook(c, |ctrl| ctrl.did_remove_from_parent(c));
            }
        }

        if completed {
            tracing::debug!(id = info.id.0, len = self.stack.len(), "transition committed");
        } else {
            tracing::debug!(id = info.id.0, len = self.stack.len(), "transition rolled back");
        }

        self.sweep();
        self.apply_bounds();
        if completed && info.direction == Direction::Insertion {
            self.install_top(&info);
        }
        self.phase = StackPhase::Idle;
        completion.map(|c| (c, completed))
    }

    fn install_top(&mut self, finished: &TransitionInfo) {
        let Some(&top) = self.stack.last() else {
            return;
        };
        if self.stack.len() < 2 || self.installed.contains_key(&top) {
            return;
        }
        let Some(presentation) = self.presentations.get(&top).cloned() else {
            return;
        };
        let Some(interactivity) = presentation.interactivity().cloned() else {
            return;
        };
        let info = TransitionInfo {
            id: finished.id,
            direction: Direction::Removal,
            from: self.stack.clone().into(),
            to: self.stack[..self.stack.len() - 1].to_vec().into(),
            animated: true,
            interactive: true,
            bounds: self.config.bounds,
            safe_area: self.config.safe_area,
        };
        let observer = self.gesture_observer(top);
        let mut cache = Cache::new();
        {
            let mut cx = TransitionContext::new(
                &info,
                &mut cache,
                &mut self.views,
                &self.registry,
                top,
                presentation.timing(),
            );
            interactivity.install(&mut cx, observer);
        }
        self.flush();
        tracing::debug!(controller = ?top, "interactivity installed");
        self.installed.insert(
            top,
            Installed {
                interactivity,
                info,
                cache,
                presentation,
            },
        );
    }

    fn gesture_observer(&self, controller: ControllerId) -> GestureObserver {
        let link = self.link.clone();
        GestureObserver::new(move |event| {
            if let Some(shared) = link.upgrade() {
                post(&shared, Event::Gesture { controller, event });
            }
        })
    }

    /// Move views whose containers no longer match the configured bounds.
    ///
    /// Props that still fill the old container are resized with it; props a
    /// strategy left elsewhere are kept.
    fn apply_bounds(&mut self) {
        let bounds = self.config.bounds;
        let stale: Vec<ControllerId> = self
            .views
            .controllers()
            .filter(|c| {
                self.views
                    .get(*c)
                    .is_some_and(|e| e.container.frame != bounds)
            })
            .collect();
        if stale.is_empty() {
            return;
        }
        tracing::debug!(views = stale.len(), ?bounds, "resizing containers");
        for &c in &stale {
            if let Some(entry) = self.views.get_mut(c) {
                if entry.props.frame == entry.container.frame {
                    entry.props.frame = bounds;
                }
                entry.container.frame = bounds;
            }
        }
        self.flush();
        for c in stale {
            self.reinstall(c);
        }
    }

    /// Uninstall and install `controller`'s interactivity with fresh bounds.
    fn reinstall(&mut self, controller: ControllerId) {
        let Some(mut installed) = self.installed.remove(&controller) else {
            return;
        };
        {
            let mut cx = TransitionContext::new(
                &installed.info,
                &mut installed.cache,
                &mut self.views,
                &self.registry,
                controller,
                installed.presentation.timing(),
            );
            installed.interactivity.uninstall(&mut cx);
        }
        installed.info.bounds = self.config.bounds;
        installed.info.safe_area = self.config.safe_area;
        installed.cache = Cache::new();
        let observer = self.gesture_observer(controller);
        {
            let mut cx = TransitionContext::new(
                &installed.info,
                &mut installed.cache,
                &mut self.views,
                &self.registry,
                controller,
                installed.presentation.timing(),
            );
            installed.interactivity.install(&mut cx, observer);
        }
        self.flush();
        tracing::trace!(?controller, "interactivity reinstalled");
        self.installed.insert(controller, installed);
    }

    // --- release ---

    /// Drop stack entries whose controllers were released, then release state
    /// nobody references.
    fn prune(&mut self) {
        let before = self.stack.len();
        self.stack.retain(|c| self.registry.is_alive(*c));
        if self.stack.len() != before {
            tracing::debug!(
                dropped = before - self.stack.len(),
                "released controllers left the stack"
            );
            self.show_committed();
        }
        self.sweep();
    }

    fn sweep(&mut self) {
        let mut known: Vec<ControllerId> = self.views.controllers().collect();
        known.extend(self.presentations.keys().copied());
        known.extend(self.installed.keys().copied());
        known.sort();
        known.dedup();
        for c in known {
            let referenced = self.stack.contains(&c)
                || (self.registry.is_alive(c) && self.pending.iter().any(|r| r.references(c)));
            if !referenced {
                self.release(c);
            }
        }
    }

    fn release(&mut self, controller: ControllerId) {
        if let Some(mut installed) = self.installed.remove(&controller) {
            {
                let mut cx = TransitionContext::new(
                    &installed.info,
                    &mut installed.cache,
                    &mut self.views,
                    &self.registry,
                    controller,
                    installed.presentation.timing(),
                );
                installed.interactivity.uninstall(&mut cx);
            }
            tracing::debug!(?controller, "interactivity uninstalled");
        }
        self.detach(controller);
        self.views.remove(controller);
        self.presentations.remove(&controller);
        tracing::trace!(?controller, "released");
    }

    // --- views ---

    /// Attach the committed stack and hide what the visible suffix covers.
    fn show_committed(&mut self) {
        let committed = self.stack.clone();
        self.place(&committed);
        let lowest = visible_from(&committed, |c| {
            self.presentations
                .get(&c)
                .is_some_and(Presentation::is_over_current_context)
        });
        for (index, &c) in committed.iter().enumerate() {
            self.attach(c);
            self.set_hidden(c, index < lowest);
        }
        self.flush();
    }

    fn place(&mut self, stack: &[ControllerId]) {
        let frame = self.config.bounds;
        for (index, &c) in stack.iter().enumerate() {
            let z_index = i32::try_from(index).unwrap_or(i32::MAX);
            match self.views.get(c) {
                None => {
                    self.views
                        .insert(c, ViewEntry::new(Container { frame, z_index }));
                }
                Some(entry) if entry.container.z_index != z_index => {
                    if let Some(entry) = self.views.get_mut(c) {
                        entry.container.z_index = z_index;
                    }
                }
                Some(_) => {}
            }
        }
    }

    fn attach(&mut self, controller: ControllerId) {
        if self.views.set_flag(controller, ViewFlags::ATTACHED, true) {
            if let Some(entry) = self.views.get(controller) {
                self.host.attach(controller, &entry.container);
            }
        }
    }

    fn detach(&mut self, controller: ControllerId) {
        if self.views.set_flag(controller, ViewFlags::ATTACHED, false) {
            self.views.set_flag(controller, ViewFlags::HIDDEN, false);
            self.host.detach(controller);
        }
    }

    fn set_hidden(&mut self, controller: ControllerId, hidden: bool) {
        let attached = self
            .views
            .get(controller)
            .is_some_and(|e| e.flags.contains(ViewFlags::ATTACHED));
        if attached && self.views.set_flag(controller, ViewFlags::HIDDEN, hidden) {
            self.host.set_hidden(controller, hidden);
        }
    }

    fn flush(&mut self) {
        let host = &mut self.host;
        self.views.flush(|c, entry| host.apply(c, entry));
    }

    // --- dispatch helpers ---

    fn run(&self, controller: ControllerId) -> Option<&Run> {
        self.active.as_ref()?.runs.get(&controller)
    }

    fn run_mut(&mut self, controller: ControllerId) -> Option<&mut Run> {
        self.active.as_mut()?.runs.get_mut(&controller)
    }

    /// Call `controller`'s transition with its context, then flush views.
    fn call(
        &mut self,
        controller: ControllerId,
        f: impl FnOnce(&dyn Transition, &mut TransitionContext<'_>),
    ) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let Some(run) = active.runs.get(&controller) else {
            return;
        };
        let transition = Rc::clone(run.presentation.transition());
        let timing = run.presentation.timing();
        {
            let mut cx = TransitionContext::new(
                &active.info,
                &mut active.cache,
                &mut self.views,
                &self.registry,
                controller,
                timing,
            );
            f(&*transition, &mut cx);
        }
        self.flush();
    }

    fn hook(&self, controller: ControllerId, f: impl FnOnce(&dyn Controller)) {
        if let Some(ctrl) = self.registry.get(controller) {
            f(&*ctrl);
        }
    }

    fn live_stack(&self) -> Vec<ControllerId> {
        self.stack
            .iter()
            .copied()
            .filter(|c| self.registry.is_alive(*c))
            .collect()
    }
}
