//! The stabilization engine.
//!
//! The engine owns the set of observed anchors, the recompute heap, and the
//! stabilization counter. It is the only coordinator: anchors carry state,
//! but every state transition (marking necessary, enqueueing, recomputing)
//! happens inside an engine call, on the calling thread, to completion.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::anchor::Anchor;
use crate::error::EngineError;
use crate::heap::RecomputeHeap;
use crate::node::{ErasedNode, NodeId, StabilizationNumber};
use crate::tracer::{NoopTracer, RecomputeResult, Tracer};

type Visited = HashSet<NodeId, ahash::RandomState>;

/// Coordinator for a graph of anchors.
///
/// Anchors built with [`Anchor::create`] and the `map` constructors carry no
/// engine reference; an engine gives them meaning by observing them, setting
/// inputs, and retrieving values. The engine is not thread-safe: all
/// operations run on the calling thread (see the crate docs).
///
/// # Example
///
/// ```ignore
/// use kedge::{Anchor, Engine};
///
/// let mut engine = Engine::new();
/// let name = Anchor::create("John".to_string());
/// let greeting = Anchor::map(&name, |name| format!("Hello, {name}"));
///
/// engine.observe(&greeting);
/// assert_eq!(engine.get(&greeting).unwrap(), "Hello, John");
/// ```
pub struct Engine {
    /// Current stabilization number. Advances on each input change and once
    /// per stabilization pass that has work to do.
    cycle: StabilizationNumber,
    /// Anchors explicitly observed by the user, held strongly so an observed
    /// subgraph stays alive even if the user drops their handles.
    observed: HashMap<NodeId, Rc<dyn ErasedNode>, ahash::RandomState>,
    heap: RecomputeHeap,
    tracer: Box<dyn Tracer>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine that discards trace events.
    pub fn new() -> Self {
        Self::with_tracer(NoopTracer)
    }

    /// Create an engine reporting execution events to the given tracer.
    pub fn with_tracer(tracer: impl Tracer) -> Self {
        Self {
            cycle: 0,
            observed: HashMap::default(),
            heap: RecomputeHeap::new(),
            tracer: Box::new(tracer),
        }
    }

    /// Current stabilization number.
    pub fn stabilization_number(&self) -> StabilizationNumber {
        self.cycle
    }

    /// Mark an anchor as observed.
    ///
    /// An observed anchor is guaranteed to be up to date when its value is
    /// retrieved with [`get`](Engine::get). Observing walks the anchor's
    /// dependency cone once: every reached node gains one necessary count,
    /// registers itself as a dependant of each of its inputs, and is enqueued
    /// for recomputation if stale. Observing an already-observed anchor is a
    /// no-op.
    pub fn observe<T>(&mut self, anchor: &Anchor<T>)
    where
        T: Clone + PartialEq + 'static,
    {
        let node = anchor.erased();
        if self.observed.contains_key(&node.id()) {
            return;
        }
        self.tracer.on_observe(node.id());
        self.observed.insert(node.id(), node.clone());

        let mut visited = Visited::default();
        self.observe_node(&node, &mut visited);
    }

    /// Mark several anchors of the same value type as observed.
    pub fn observe_all<T>(&mut self, anchors: &[Anchor<T>])
    where
        T: Clone + PartialEq + 'static,
    {
        for anchor in anchors {
            self.observe(anchor);
        }
    }

    /// Remove an anchor from the observed set.
    ///
    /// Walks the dependency cone once, undoing what [`observe`](Engine::observe)
    /// did: every reached node loses one necessary count, and dependant
    /// back-edges pointing at nodes that are no longer necessary are removed.
    /// Unobserving an anchor that is not observed is a no-op.
    pub fn unobserve<T>(&mut self, anchor: &Anchor<T>)
    where
        T: Clone + PartialEq + 'static,
    {
        let node = anchor.erased();
        if self.observed.remove(&node.id()).is_none() {
            return;
        }
        self.tracer.on_unobserve(node.id());

        let mut visited = Visited::default();
        self.unobserve_node(&node, &mut visited);
    }

    /// Set the value of an input anchor.
    ///
    /// If the new value equals the current one, nothing happens and the
    /// stabilization number does not advance. Otherwise the change is
    /// recorded and every necessary dependant is enqueued, to be recomputed
    /// on the next retrieval of an observed anchor downstream.
    ///
    /// `set` is intended for input anchors. Setting a derived anchor injects
    /// a value that only lasts until its inputs next change.
    pub fn set<T>(&mut self, anchor: &Anchor<T>, value: T)
    where
        T: Clone + PartialEq + 'static,
    {
        let node = anchor.node();
        if node.value_eq(&value) {
            self.tracer.on_set(node.id(), false);
            return;
        }

        self.cycle += 1;
        node.set_value(value);

        let erased = anchor.erased();
        erased.set_change_id(self.cycle);
        self.tracer.on_set(erased.id(), true);

        if erased.is_necessary() {
            for dependant in erased.dependants() {
                if dependant.is_necessary() {
                    self.heap.push(dependant);
                }
            }
        }
    }

    /// Retrieve the value of an anchor.
    ///
    /// If the anchor is observed, the graph is stabilized first, so the
    /// returned value reflects all preceding `set` calls. For an unobserved
    /// anchor the value is best-effort: possibly stale, or absent if the
    /// anchor is derived and has never been computed.
    ///
    /// # Errors
    ///
    /// [`EngineError::Uncomputed`] if the anchor has no value yet.
    pub fn get<T>(&mut self, anchor: &Anchor<T>) -> Result<T, EngineError>
    where
        T: Clone + PartialEq + 'static,
    {
        if self.observed.contains_key(&anchor.id()) {
            self.stabilize();
        }
        anchor
            .node()
            .value()
            .ok_or(EngineError::Uncomputed { node: anchor.id() })
    }

    fn observe_node(&mut self, node: &Rc<dyn ErasedNode>, visited: &mut Visited) {
        if !visited.insert(node.id()) {
            return;
        }
        node.mark_necessary();

        if node.is_stale() {
            self.heap.push(node.clone());
        }

        for dependency in node.dependencies() {
            dependency.add_dependant(node);
            self.observe_node(&dependency, visited);
        }
    }

    fn unobserve_node(&mut self, node: &Rc<dyn ErasedNode>, visited: &mut Visited) {
        if !visited.insert(node.id()) {
            return;
        }
        if !node.decrement_necessary() {
            self.tracer.on_necessary_underflow(node.id());
        }

        // Keep the back-edges of a node that is still necessary: another
        // observation's propagation path runs through them.
        let defunct = !node.is_necessary();
        for dependency in node.dependencies() {
            self.unobserve_node(&dependency, visited);
            if defunct {
                dependency.remove_dependant(node.id());
            }
        }
    }

    /// Bring every enqueued node up to date, in ascending height order.
    ///
    /// Height ordering guarantees that a popped node reads fresh inputs: all
    /// of them were either not stale this cycle or already recomputed.
    /// Dependants are enqueued only when a recomputation actually changed the
    /// node's value, which is what makes the equality cutoff effective.
    fn stabilize(&mut self) {
        if self.heap.is_empty() {
            return;
        }

        self.cycle += 1;
        self.tracer.on_stabilize_start(self.cycle);
        let mut recomputed = 0;

        while let Some(node) = self.heap.pop() {
            if !node.is_stale() {
                // Enqueued, but the upstream changes cancelled out before it
                // was popped.
                self.tracer.on_recompute(node.id(), RecomputeResult::Skipped);
                continue;
            }

            node.compute(self.cycle);
            recomputed += 1;

            let changed = node.change_id() == self.cycle;
            let result = if changed {
                RecomputeResult::Changed
            } else {
                RecomputeResult::Unchanged
            };
            self.tracer.on_recompute(node.id(), result);

            if changed {
                for dependant in node.dependants() {
                    if dependant.is_necessary() {
                        self.heap.push(dependant);
                    }
                }
            }
        }

        self.tracer.on_stabilize_end(self.cycle, recomputed);
    }
}
