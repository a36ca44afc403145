// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Queued requests.
//!
//! Submits several stack changes while the first one is still animating. The
//! stack runs them one at a time in submission order; each step below lets
//! the running transition's animations finish.
//!
//! Run:
//! - `cargo run -p understory_demos --example queued_requests`

use std::cell::RefCell;
use std::rc::Rc;

use kurbo::Rect;
use understory_stack::registry::Controller;
use understory_stack::{HeadlessHost, Options, Registry, StackConfig, StackController, StackError};
use understory_transition::context::TransitionContext;
use understory_transition::presentation::Presentation;
use understory_transition::progress::{Direction, Progress};
use understory_transition::transition::{AnimationObserver, Transition};
use understory_transition::types::ControllerId;

/// Animations that finish only when [`Animations::settle`] is called.
#[derive(Default)]
struct Animations(RefCell<Vec<(AnimationObserver, Direction)>>);

impl Animations {
    /// Finish everything started so far. Returns how many animations ended.
    fn settle(&self) -> usize {
        let batch = std::mem::take(&mut *self.0.borrow_mut());
        let count = batch.len();
        for (observer, direction) in batch {
            observer.change(direction.at(1.0));
            observer.end(true);
        }
        count
    }
}

struct Fade {
    animations: Rc<Animations>,
}

impl Transition for Fade {
    fn prepare(&self, cx: &mut TransitionContext<'_>) {
        let start = Progress::start(cx.direction());
        self.update(cx, start);
    }

    fn animate(&self, cx: &mut TransitionContext<'_>, observer: AnimationObserver) {
        observer.begin();
        self.animations
            .0
            .borrow_mut()
            .push((observer, cx.direction()));
    }

    fn update(&self, cx: &mut TransitionContext<'_>, progress: Progress) {
        if !cx.role().is_changing() {
            return;
        }
        if let Some(view) = cx.own_view_mut() {
            view.opacity = progress.presence();
        }
    }
}

struct Screen;

impl Controller for Screen {}

fn main() {
    let animations = Rc::new(Animations::default());
    let registry = Registry::new();
    let stack = StackController::new(
        registry.clone(),
        StackConfig {
            bounds: Rect::new(0.0, 0.0, 390.0, 844.0),
            default_presentation: Some(Presentation::new(Fade {
                animations: animations.clone(),
            })),
            ..StackConfig::default()
        },
        HeadlessHost::new(),
    );

    let names = ["home", "search", "results", "detail", "settings"];
    let ids: Vec<ControllerId> = names.iter().map(|_| registry.insert(Screen)).collect();
    let [home, search, results, detail, settings] = [ids[0], ids[1], ids[2], ids[3], ids[4]];
    let describe = |stack: &[ControllerId]| -> Vec<&'static str> {
        stack
            .iter()
            .filter_map(|c| ids.iter().position(|id| id == c).map(|i| names[i]))
            .collect()
    };

    stack
        .set_controllers(vec![home], Options::instant(), |_| {})
        .unwrap();

    let log = Rc::new(RefCell::new(Vec::new()));
    let done = |label: &'static str| {
        let log = log.clone();
        move |completed: bool| {
            println!("  completed {label}: {completed}");
            log.borrow_mut().push(label);
        }
    };

    println!("== Submit ==");
    stack.show(search, Options::default(), done("show search")).unwrap();
    stack.show(results, Options::default(), done("show results")).unwrap();
    stack.show(detail, Options::default(), done("show detail")).unwrap();
    stack.hide_top(2, Options::default(), done("hide two"));
    stack
        .set_controllers(vec![home, settings], Options::default(), done("replace"))
        .unwrap();
    println!("  running: {:?}", stack.phase());
    println!("  queued: {}", stack.pending());

    // Refused requests never reach the queue.
    let err = stack
        .set_controllers(vec![home, home], Options::default(), |_| {})
        .unwrap_err();
    println!("  refused: {err}");
    assert_eq!(err, StackError::DuplicateController(home));
    let gone = registry.insert(Screen);
    registry.remove(gone);
    let err = stack.show(gone, Options::default(), |_| {}).unwrap_err();
    println!("  refused: {err}");

    println!("== Settle ==");
    let mut step = 0;
    loop {
        let ended = animations.settle();
        if ended == 0 {
            break;
        }
        step += 1;
        println!(
            "  step {step}: {ended} animations ended, stack {:?}",
            describe(&stack.controllers())
        );
    }

    assert_eq!(
        *log.borrow(),
        ["show search", "show results", "show detail", "hide two", "replace"]
    );
    assert_eq!(stack.controllers(), [home, settings]);
    assert_eq!(stack.pending(), 0);
}
