// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stack basics.
//!
//! Pushes and pops a screen with a slide transition driven by a hand-stepped
//! clock, printing the offsets the host sees on every frame.
//!
//! Run:
//! - `cargo run -p understory_demos --example stack_basics`

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use kurbo::{Affine, Rect, Vec2};
use understory_stack::registry::Controller;
use understory_stack::{HeadlessHost, Options, Registry, StackConfig, StackController};
use understory_transition::context::{CacheKey, TransitionContext};
use understory_transition::presentation::Presentation;
use understory_transition::progress::{Direction, Progress};
use understory_transition::timing::AnimationTiming;
use understory_transition::transition::{AnimationObserver, Transition};
use understory_transition::types::{ControllerId, Role};

struct Running {
    observer: AnimationObserver,
    direction: Direction,
    timing: AnimationTiming,
    elapsed: Duration,
}

/// Animations advanced by explicit ticks instead of a display link.
#[derive(Default)]
struct Clock {
    running: RefCell<Vec<Running>>,
}

impl Clock {
    fn start(&self, observer: AnimationObserver, direction: Direction, timing: AnimationTiming) {
        observer.begin();
        self.running.borrow_mut().push(Running {
            observer,
            direction,
            timing,
            elapsed: Duration::ZERO,
        });
    }

    /// Advance every animation by `dt`. Returns true while any is running.
    fn tick(&self, dt: Duration) -> bool {
        // Ending an animation can start the next transition, which starts new
        // animations on this clock.
        let running = std::mem::take(&mut *self.running.borrow_mut());
        let mut still = Vec::new();
        for mut r in running {
            r.elapsed += dt;
            let t = if r.timing.duration.is_zero() {
                1.0
            } else {
                r.elapsed.as_secs_f64() / r.timing.duration.as_secs_f64()
            };
            if t >= 1.0 {
                r.observer.change(r.direction.at(1.0));
                r.observer.end(true);
            } else {
                r.observer.change(r.direction.at(r.timing.curve.apply(t)));
                still.push(r);
            }
        }
        let mut running = self.running.borrow_mut();
        running.extend(still);
        !running.is_empty()
    }
}

const WIDTH: CacheKey<f64> = CacheKey::new("stack_basics::slide::width");

/// Changing controllers slide in from the trailing edge; the one underneath
/// drifts a little to the leading edge.
struct Slide {
    clock: Rc<Clock>,
}

impl Transition for Slide {
    fn prepare(&self, cx: &mut TransitionContext<'_>) {
        let width = cx.info().bounds.width();
        cx.cache_mut().insert(&WIDTH, width);
        let start = Progress::start(cx.direction());
        self.update(cx, start);
    }

    fn animate(&self, cx: &mut TransitionContext<'_>, observer: AnimationObserver) {
        self.clock.start(observer, cx.direction(), cx.timing());
    }

    fn update(&self, cx: &mut TransitionContext<'_>, progress: Progress) {
        let width = cx.cache().get(&WIDTH).copied().unwrap_or_default();
        let offset = match cx.role() {
            Role::Remaining => Vec2::new(-0.3 * width, 0.0) * progress.presence(),
            Role::Inserting | Role::Removing => {
                progress.interpolate(Vec2::ZERO, Vec2::new(width, 0.0))
            }
        };
        if let Some(view) = cx.own_view_mut() {
            view.transform = Affine::translate(offset);
        }
    }

    fn complete(&self, cx: &mut TransitionContext<'_>, _completed: bool) {
        if let Some(view) = cx.own_view_mut() {
            view.transform = Affine::IDENTITY;
        }
    }
}

struct Screen(&'static str);

impl Controller for Screen {
    fn did_appear(&self, _id: ControllerId, animated: bool) {
        println!("  {} appeared (animated: {animated})", self.0);
    }

    fn did_disappear(&self, _id: ControllerId, _animated: bool) {
        println!("  {} disappeared", self.0);
    }
}

fn run(clock: &Clock, stack: &StackController<HeadlessHost>, names: &[(ControllerId, &str)]) {
    let mut frame = 0;
    while clock.tick(Duration::from_millis(50)) {
        frame += 1;
        let offsets: Vec<String> = stack.with_host(|host| {
            host.drawn()
                .into_iter()
                .filter_map(|c| {
                    let name = names.iter().find(|(id, _)| *id == c)?.1;
                    let x = host.view(c)?.props.transform.translation().x;
                    Some(format!("{name}@{x:.0}"))
                })
                .collect()
        });
        println!("  frame {frame:2}: {}", offsets.join("  "));
    }
}

fn main() {
    let clock = Rc::new(Clock::default());
    let slide = Presentation::new(Slide {
        clock: clock.clone(),
    })
    .with_timing(AnimationTiming::new(Duration::from_millis(300)));

    let registry = Registry::new();
    let stack = StackController::new(
        registry.clone(),
        StackConfig {
            bounds: Rect::new(0.0, 0.0, 390.0, 844.0),
            default_presentation: Some(slide),
            ..StackConfig::default()
        },
        HeadlessHost::new(),
    );

    let inbox = registry.insert(Screen("inbox"));
    let thread = registry.insert(Screen("thread"));
    let names = [(inbox, "inbox"), (thread, "thread")];

    println!("== Root ==");
    stack
        .set_controllers(vec![inbox], Options::instant(), |done| {
            println!("  root set: {done}");
        })
        .unwrap();

    println!("== Push ==");
    stack
        .show(thread, Options::default(), |done| println!("  pushed: {done}"))
        .unwrap();
    run(&clock, &stack, &names);
    assert_eq!(stack.controllers(), [inbox, thread]);

    println!("== Pop ==");
    stack.hide_top(1, Options::default(), |done| println!("  popped: {done}"));
    run(&clock, &stack, &names);
    assert_eq!(stack.controllers(), [inbox]);
    assert!(stack.view(thread).is_none());
}
