// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interactive dismissal.
//!
//! Presents a sheet over a feed, then drags it down twice: a short slow drag
//! that settles back, and a flick that dismisses it. The sheet's transition
//! hands the stack a scrub so the drag moves the sheet directly.
//!
//! Run:
//! - `cargo run -p understory_demos --example interactive_dismiss`

use std::rc::Rc;
use std::time::Duration;

use kurbo::{Affine, Rect, Vec2};
use understory_stack::registry::Controller;
use understory_stack::{HeadlessHost, Options, Registry, StackConfig, StackController};
use understory_transition::context::{CacheKey, TransitionContext};
use understory_transition::interactivity::{DragDismissal, DragPhase};
use understory_transition::presentation::{Presentation, PresentationOptions};
use understory_transition::progress::{Direction, Progress};
use understory_transition::timing::AnimationTiming;
use understory_transition::transition::{AnimationObserver, Scrub, Transition};
use understory_transition::types::{ControllerId, Role};

const HEIGHT: CacheKey<f64> = CacheKey::new("interactive_dismiss::sheet::height");

/// Slides the changing controller up from the bottom edge.
struct Sheet;

impl Transition for Sheet {
    fn prepare(&self, cx: &mut TransitionContext<'_>) {
        let height = cx.info().bounds.height();
        cx.cache_mut().insert(&HEIGHT, height);
        let start = Progress::start(cx.direction());
        self.update(cx, start);
    }

    fn animate(&self, cx: &mut TransitionContext<'_>, observer: AnimationObserver) {
        let direction = cx.direction();
        observer.begin();
        if cx.is_interactive() {
            observer.offer_scrub(SheetScrub {
                observer: observer.clone(),
                direction,
            });
        } else {
            observer.change(direction.at(1.0));
            observer.end(true);
        }
    }

    fn update(&self, cx: &mut TransitionContext<'_>, progress: Progress) {
        if cx.role() == Role::Remaining {
            return;
        }
        let height = cx.cache().get(&HEIGHT).copied().unwrap_or_default();
        let offset = progress.interpolate(Vec2::ZERO, Vec2::new(0.0, height));
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

/// Follows the finger, then settles without a real animation.
struct SheetScrub {
    observer: AnimationObserver,
    direction: Direction,
}

impl Scrub for SheetScrub {
    fn seek(&mut self, value: f64) {
        self.observer.change(self.direction.at(value));
    }

    fn finish(&mut self, completed: bool, duration: Duration) {
        let verb = if completed { "dismissing" } else { "settling back" };
        println!("  {verb} over {}ms", duration.as_millis());
        let value = if completed { 1.0 } else { 0.0 };
        self.observer.change(self.direction.at(value));
        self.observer.end(completed);
    }
}

struct Screen(&'static str);

impl Controller for Screen {
    fn did_appear(&self, _id: ControllerId, _animated: bool) {
        println!("  {} appeared", self.0);
    }

    fn did_remove_from_parent(&self, _id: ControllerId) {
        println!("  {} left the stack", self.0);
    }
}

fn sheet_offset(stack: &StackController<HeadlessHost>, sheet: ControllerId) -> f64 {
    stack.with_host(|host| {
        host.view(sheet)
            .map(|v| v.props.transform.translation().y)
            .unwrap_or_default()
    })
}

fn drag(
    stack: &StackController<HeadlessHost>,
    drag: &DragDismissal,
    sheet: ControllerId,
    moves: &[f64],
    velocity: f64,
) {
    drag.handle(sheet, DragPhase::Began);
    for &y in moves {
        drag.handle(
            sheet,
            DragPhase::Moved {
                translation: Vec2::new(0.0, y),
            },
        );
        println!("  dragged {y:>5.0}: sheet at {:.0}", sheet_offset(stack, sheet));
    }
    let last = moves.last().copied().unwrap_or_default();
    drag.handle(
        sheet,
        DragPhase::Ended {
            translation: Vec2::new(0.0, last),
            velocity: Vec2::new(0.0, velocity),
        },
    );
}

fn main() {
    let registry = Registry::new();
    let stack = StackController::new(
        registry.clone(),
        StackConfig {
            bounds: Rect::new(0.0, 0.0, 390.0, 844.0),
            ..StackConfig::default()
        },
        HeadlessHost::new(),
    );
    let feed = registry.insert(Screen("feed"));
    let compose = registry.insert(Screen("compose"));
    stack
        .set_controllers(vec![feed], Options::instant(), |_| {})
        .unwrap();

    let dismissal = Rc::new(DragDismissal::vertical());
    let sheet = Presentation::new(Sheet)
        .with_options(PresentationOptions::OVER_CURRENT_CONTEXT)
        .with_timing(AnimationTiming::new(Duration::from_millis(400)))
        .with_shared_interactivity(dismissal.clone());

    println!("== Present ==");
    stack
        .show(
            compose,
            Options::default().with_presentation(sheet),
            |done| println!("  presented: {done}"),
        )
        .unwrap();
    assert!(dismissal.is_installed(compose));
    println!("  drawn: {:?}", stack.with_host(|host| host.drawn()));

    println!("== Short drag ==");
    drag(&stack, &dismissal, compose, &[60.0, 150.0, 220.0], 120.0);
    assert_eq!(stack.controllers(), [feed, compose]);
    assert_eq!(sheet_offset(&stack, compose), 0.0);

    println!("== Flick ==");
    drag(&stack, &dismissal, compose, &[40.0, 90.0], 1600.0);
    assert_eq!(stack.controllers(), [feed]);
    assert!(!dismissal.is_installed(compose));
    println!("  drawn: {:?}", stack.with_host(|host| host.drawn()));
}
