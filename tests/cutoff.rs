//! Equality cutoff: recomputations that reproduce the previous value stop
//! propagating, and the `AlwaysChanged` wrapper opts out of that.

use std::cell::Cell;
use std::rc::Rc;

use kedge::cutoff::AlwaysChanged;
use kedge::{Anchor, Engine};

#[test]
fn untouched_branches_are_not_recomputed() {
    let mut engine = Engine::new();
    let w = Anchor::create(10);
    let x = Anchor::create(4);

    let additions = Rc::new(Cell::new(0u32));
    let y = {
        let runs = additions.clone();
        Anchor::map2(&w, &x, move |a, b| {
            runs.set(runs.get() + 1);
            a + b
        })
    };

    let z = Anchor::create(5);

    let subtractions = Rc::new(Cell::new(0u32));
    let r = {
        let runs = subtractions.clone();
        Anchor::map2(&y, &z, move |a, b| {
            runs.set(runs.get() + 1);
            a - b
        })
    };

    engine.observe(&r);

    assert_eq!(engine.get(&r).unwrap(), 9);
    assert_eq!(additions.get(), 1);
    assert_eq!(subtractions.get(), 1);

    engine.set(&z, 7);

    assert_eq!(engine.get(&r).unwrap(), 7);
    // y's inputs did not change, so it was not recomputed.
    assert_eq!(additions.get(), 1);
    assert_eq!(subtractions.get(), 2);
}

#[test]
fn an_unchanged_recomputation_cuts_off_downstream() {
    let mut engine = Engine::new();
    let w = Anchor::create(10);
    let x = Anchor::create(4);

    let sum = Anchor::map2(&w, &x, |a, b| a + b);

    let downstream_runs = Rc::new(Cell::new(0u32));
    let shifted = {
        let runs = downstream_runs.clone();
        Anchor::map(&sum, move |s| {
            runs.set(runs.get() + 1);
            s + 100
        })
    };

    engine.observe(&shifted);
    assert_eq!(engine.get(&shifted).unwrap(), 114);
    assert_eq!(downstream_runs.get(), 1);

    // Two changes that cancel out: the sum recomputes to the same value and
    // nothing below it runs.
    engine.set(&w, 9);
    engine.set(&x, 5);
    assert_eq!(engine.get(&shifted).unwrap(), 114);
    assert_eq!(downstream_runs.get(), 1);
}

#[test]
fn always_changed_values_never_cut_off() {
    let mut engine = Engine::new();
    let source = Anchor::create(11);
    let bucket = Anchor::map(&source, |s| AlwaysChanged::new(s / 10));

    let downstream_runs = Rc::new(Cell::new(0u32));
    let doubled = {
        let runs = downstream_runs.clone();
        Anchor::map(&bucket, move |b| {
            runs.set(runs.get() + 1);
            *b * 2
        })
    };

    engine.observe(&doubled);
    assert_eq!(engine.get(&doubled).unwrap(), 2);
    assert_eq!(downstream_runs.get(), 1);

    // Same bucket value, but the wrapper reports every recomputation as a
    // change.
    engine.set(&source, 12);
    assert_eq!(engine.get(&doubled).unwrap(), 2);
    assert_eq!(downstream_runs.get(), 2);
}

#[test]
fn plain_values_cut_off_where_always_changed_would_not() {
    let mut engine = Engine::new();
    let source = Anchor::create(11);
    let bucket = Anchor::map(&source, |s| s / 10);

    let downstream_runs = Rc::new(Cell::new(0u32));
    let doubled = {
        let runs = downstream_runs.clone();
        Anchor::map(&bucket, move |b| {
            runs.set(runs.get() + 1);
            b * 2
        })
    };

    engine.observe(&doubled);
    engine.get(&doubled).unwrap();
    engine.set(&source, 12);
    engine.get(&doubled).unwrap();

    assert_eq!(downstream_runs.get(), 1);
}

#[test]
fn errors_always_propagate_when_wrapped() {
    type Division = Result<i32, AlwaysChanged<String>>;

    let mut engine = Engine::new();
    let numerator = Anchor::create(10);
    let denominator = Anchor::create(2);

    let quotient = Anchor::map2(&numerator, &denominator, |n, d| -> Division {
        if d == 0 {
            Err(AlwaysChanged::new("division by zero".to_string()))
        } else {
            Ok(n / d)
        }
    });

    let downstream_runs = Rc::new(Cell::new(0u32));
    let result = {
        let runs = downstream_runs.clone();
        Anchor::map(&quotient, move |q: Division| {
            runs.set(runs.get() + 1);
            q.ok()
        })
    };

    engine.observe(&result);
    assert_eq!(engine.get(&result).unwrap(), Some(5));
    assert_eq!(downstream_runs.get(), 1);

    engine.set(&denominator, 0);
    assert_eq!(engine.get(&result).unwrap(), None);
    assert_eq!(downstream_runs.get(), 2);

    // A fresh error never compares equal to the previous one, so downstream
    // anchors see it.
    engine.set(&numerator, 20);
    assert_eq!(engine.get(&result).unwrap(), None);
    assert_eq!(downstream_runs.get(), 3);
}
