// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::RefCell;
use std::rc::Rc;

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_stack::plan::{Plan, visible_from};
use understory_stack::registry::Controller;
use understory_stack::{Options, Registry, StackConfig, StackController};
use understory_transition::context::TransitionContext;
use understory_transition::presentation::Presentation;
use understory_transition::progress::Direction;
use understory_transition::transition::{AnimationObserver, Transition};
use understory_transition::types::ControllerId;

struct Screen;

impl Controller for Screen {}

/// Holds every observer until the bench ends it.
#[derive(Default)]
struct Held(RefCell<Vec<AnimationObserver>>);

impl Held {
    fn end_all(&self) -> usize {
        let batch = std::mem::take(&mut *self.0.borrow_mut());
        let n = batch.len();
        for observer in batch {
            observer.end(true);
        }
        n
    }
}

struct HeldTransition(Rc<Held>);

impl Transition for HeldTransition {
    fn animate(&self, _cx: &mut TransitionContext<'_>, observer: AnimationObserver) {
        observer.begin();
        self.0.0.borrow_mut().push(observer);
    }
}

fn gen_ids(n: usize) -> Vec<ControllerId> {
    (0..n as u32).map(|i| ControllerId::new(i, 1)).collect()
}

fn gen_stack(
    depth: usize,
    presentation: Option<Presentation>,
) -> (StackController<()>, Vec<ControllerId>) {
    let registry = Registry::new();
    let stack = StackController::new(
        registry.clone(),
        StackConfig {
            default_presentation: presentation,
            ..StackConfig::default()
        },
        (),
    );
    let ids: Vec<_> = (0..depth).map(|_| registry.insert(Screen)).collect();
    stack
        .set_controllers(ids.clone(), Options::instant(), |_| {})
        .unwrap();
    (stack, ids)
}

fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan");
    for &n in &[8usize, 64, 256] {
        let from = gen_ids(n);
        let mut to = from[..n / 2].to_vec();
        to.extend(gen_ids(n + 4).into_iter().skip(n));
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("replace_half_n{}", n), |b| {
            b.iter(|| {
                let plan = Plan::new(black_box(&from), black_box(&to), Direction::Insertion);
                black_box(plan.affected.len());
            })
        });
        group.bench_function(format!("visible_from_n{}", n), |b| {
            b.iter(|| black_box(visible_from(black_box(&from), |c| c.slot() % 4 != 0)))
        });
    }
    group.finish();
}

fn bench_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_pop_cut");
    for &depth in &[1usize, 16, 128] {
        group.bench_function(format!("depth{}", depth), |b| {
            b.iter_batched(
                || {
                    let (stack, _) = gen_stack(depth, None);
                    let extra = stack.registry().insert(Screen);
                    (stack, extra)
                },
                |(stack, extra)| {
                    stack.show(extra, Options::default(), |_| {}).unwrap();
                    stack.hide_top(1, Options::default(), |_| {});
                    black_box(stack.controllers().len());
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_queue_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_drain");
    for &requests in &[4usize, 32] {
        group.throughput(Throughput::Elements(requests as u64));
        group.bench_function(format!("requests{}", requests), |b| {
            b.iter_batched(
                || {
                    let held = Rc::new(Held::default());
                    let presentation = Presentation::new(HeldTransition(held.clone()));
                    let (stack, _) = gen_stack(1, Some(presentation));
                    let extra: Vec<_> = (0..requests)
                        .map(|_| stack.registry().insert(Screen))
                        .collect();
                    (stack, held, extra)
                },
                |(stack, held, extra)| {
                    for c in extra {
                        stack.show(c, Options::default(), |_| {}).unwrap();
                    }
                    while held.end_all() > 0 {}
                    black_box(stack.controllers().len());
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_plan, bench_push_pop, bench_queue_drain);
criterion_main!(benches);
