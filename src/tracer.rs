//! Tracer trait for observing engine execution.
//!
//! This module defines the [`Tracer`] trait and related types for observing
//! what the engine does: observation changes, input sets, and the outcome of
//! each node processed during stabilization. The default [`NoopTracer`]
//! provides zero cost when tracing is not needed.
//!
//! All methods have default empty implementations, so you only need to
//! override the events you are interested in.
//!
//! # Example
//!
//! ```ignore
//! use kedge::{Engine, NodeId, RecomputeResult, Tracer};
//!
//! struct PrintTracer;
//!
//! impl Tracer for PrintTracer {
//!     fn on_recompute(&self, node: NodeId, result: RecomputeResult) {
//!         println!("recomputed {node:?}: {result:?}");
//!     }
//! }
//!
//! let engine = Engine::with_tracer(PrintTracer);
//! ```

use serde::{Deserialize, Serialize};

use crate::node::{NodeId, StabilizationNumber};

/// Outcome of processing one node popped from the recompute heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecomputeResult {
    /// The updater ran and produced a different value.
    Changed,
    /// The updater ran and reproduced the previous value, so propagation to
    /// dependants was cut off.
    Unchanged,
    /// The node was no longer stale when popped; nothing ran. This happens
    /// when the changes that enqueued it cancelled out upstream.
    Skipped,
}

/// Tracer trait for observing engine execution.
///
/// Implementations can collect events for testing, forward them to a logging
/// backend, or feed external tooling. The engine invokes the callbacks
/// synchronously on the calling thread.
pub trait Tracer: 'static {
    /// Called when an anchor is newly observed.
    #[inline]
    fn on_observe(&self, _node: NodeId) {}

    /// Called when an observed anchor is unobserved.
    #[inline]
    fn on_unobserve(&self, _node: NodeId) {}

    /// Called on every `set`. `changed` is `false` when the new value equals
    /// the current one and the call was a no-op.
    #[inline]
    fn on_set(&self, _node: NodeId, _changed: bool) {}

    /// Called when a stabilization pass with pending work begins.
    #[inline]
    fn on_stabilize_start(&self, _cycle: StabilizationNumber) {}

    /// Called for each node popped from the recompute heap.
    #[inline]
    fn on_recompute(&self, _node: NodeId, _result: RecomputeResult) {}

    /// Called when a stabilization pass finishes. `recomputed` counts the
    /// nodes whose updater actually ran this cycle.
    #[inline]
    fn on_stabilize_end(&self, _cycle: StabilizationNumber, _recomputed: usize) {}

    /// Called when an unobserve pass reaches a node whose necessary count is
    /// already zero. This indicates an observe/unobserve imbalance in the
    /// caller; the engine continues.
    #[inline]
    fn on_necessary_underflow(&self, _node: NodeId) {}
}

/// Zero-cost tracer that discards all events.
///
/// This is the default tracer for [`Engine`](crate::Engine).
pub struct NoopTracer;

impl Tracer for NoopTracer {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Default)]
    struct CountingTracer {
        recomputes: Rc<Cell<usize>>,
        underflows: Rc<Cell<usize>>,
    }

    impl Tracer for CountingTracer {
        fn on_recompute(&self, _node: NodeId, _result: RecomputeResult) {
            self.recomputes.set(self.recomputes.get() + 1);
        }

        fn on_necessary_underflow(&self, _node: NodeId) {
            self.underflows.set(self.underflows.get() + 1);
        }
    }

    #[test]
    fn default_callbacks_are_no_ops() {
        let tracer = NoopTracer;
        tracer.on_observe(NodeId::next());
        tracer.on_recompute(NodeId::next(), RecomputeResult::Changed);
        tracer.on_stabilize_end(1, 0);
    }

    #[test]
    fn overridden_callbacks_fire() {
        let tracer = CountingTracer::default();
        tracer.on_recompute(NodeId::next(), RecomputeResult::Changed);
        tracer.on_recompute(NodeId::next(), RecomputeResult::Unchanged);
        tracer.on_necessary_underflow(NodeId::next());

        assert_eq!(tracer.recomputes.get(), 2);
        assert_eq!(tracer.underflows.get(), 1);
    }
}
