//! Graph node state and recomputation.
//!
//! Each anchor is backed by a [`Node`] holding its current value, its height
//! in the graph, and the bookkeeping the engine needs to decide when the node
//! must recompute. The engine's containers (recompute heap, observed set,
//! dependant back-links) are heterogeneous over value types, so they hold
//! nodes through the type-erased [`ErasedNode`] capability trait; typed value
//! access stays on `Node<T>` and is reached through the handle the user holds.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Monotonic counter tagging stabilizations.
///
/// Every input change and every stabilization pass advances the engine's
/// counter; nodes remember the number at which they were last recomputed and
/// at which their value last changed. `0` means "never".
pub type StabilizationNumber = u64;

/// Unique identifier for a node in the computation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw identifier value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Updater closure of a derived node.
///
/// The closure captures its typed input handles and reads their values
/// directly, so arbitrary arities and heterogeneous input types erase to the
/// same shape. `None` signals that an input had no value yet; the engine's
/// height ordering makes that unreachable in a stabilization, and the node is
/// then simply left unchanged for the cycle.
pub(crate) type Updater<T> = Box<dyn Fn() -> Option<T>>;

/// Type-erased node capabilities, as consumed by the engine.
///
/// Everything here is independent of the node's value type; the typed
/// operations (`value`, `set_value`) live on [`Node`] itself.
pub(crate) trait ErasedNode {
    fn id(&self) -> NodeId;

    /// Height in the graph: `0` for inputs, `max(inputs) + 1` for derived
    /// nodes. Immutable after construction.
    fn height(&self) -> usize;

    /// True if at least one observed anchor depends on this node, directly or
    /// indirectly.
    fn is_necessary(&self) -> bool;

    fn mark_necessary(&self);

    /// Decrement the necessary count. Returns `false` if the count was
    /// already zero (an unobserve imbalance in the caller).
    fn decrement_necessary(&self) -> bool;

    /// True if the node is necessary and either has never been computed or
    /// has an input whose value changed after this node's last recompute.
    fn is_stale(&self) -> bool;

    fn recompute_id(&self) -> StabilizationNumber;

    fn change_id(&self) -> StabilizationNumber;

    /// Record that the node's value changed at `cycle`. Also raises the
    /// recompute id to `cycle` so that `change_id <= recompute_id` holds for
    /// input nodes as well.
    fn set_change_id(&self, cycle: StabilizationNumber);

    /// Recompute the node's value for the given cycle.
    ///
    /// The engine guarantees, through height ordering, that every input is up
    /// to date when this runs. Computing a node twice in the same cycle is a
    /// no-op. The recompute id is set *before* the updater runs, so a
    /// panicking updater leaves the value and change id untouched and the
    /// node is not retried until an input changes again.
    fn compute(&self, cycle: StabilizationNumber);

    /// Upstream nodes this node reads from. Empty for inputs.
    fn dependencies(&self) -> Vec<Rc<dyn ErasedNode>>;

    /// Downstream nodes currently registered on this node. Dependants are
    /// held weakly: entries whose node has been dropped are pruned here.
    fn dependants(&self) -> Vec<Rc<dyn ErasedNode>>;

    fn add_dependant(&self, dependant: &Rc<dyn ErasedNode>);

    fn remove_dependant(&self, id: NodeId);
}

/// A single node in the computation graph.
pub(crate) struct Node<T> {
    id: NodeId,
    height: usize,
    /// `None` for a derived node that has never been computed.
    value: RefCell<Option<T>>,
    /// How many observe-rooted traversals currently reach this node.
    necessary: Cell<u32>,
    recompute_id: Cell<StabilizationNumber>,
    change_id: Cell<StabilizationNumber>,
    ever_computed: Cell<bool>,
    dependencies: Vec<Rc<dyn ErasedNode>>,
    dependants: RefCell<HashMap<NodeId, Weak<dyn ErasedNode>, ahash::RandomState>>,
    updater: Option<Updater<T>>,
}

impl<T> Node<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create an input node holding a seed value.
    ///
    /// Inputs count as computed from the start: their seed is definitive.
    pub(crate) fn input(value: T) -> Self {
        Self {
            id: NodeId::next(),
            height: 0,
            value: RefCell::new(Some(value)),
            necessary: Cell::new(0),
            recompute_id: Cell::new(0),
            change_id: Cell::new(0),
            ever_computed: Cell::new(true),
            dependencies: Vec::new(),
            dependants: RefCell::new(HashMap::default()),
            updater: None,
        }
    }

    /// Create a derived node from its inputs and an updater.
    pub(crate) fn derived(dependencies: Vec<Rc<dyn ErasedNode>>, updater: Updater<T>) -> Self {
        let height = dependencies
            .iter()
            .map(|dependency| dependency.height())
            .max()
            .map_or(0, |tallest| tallest + 1);

        Self {
            id: NodeId::next(),
            height,
            value: RefCell::new(None),
            necessary: Cell::new(0),
            recompute_id: Cell::new(0),
            change_id: Cell::new(0),
            ever_computed: Cell::new(false),
            dependencies,
            dependants: RefCell::new(HashMap::default()),
            updater: Some(updater),
        }
    }

    /// Current value, if the node has one.
    pub(crate) fn value(&self) -> Option<T> {
        self.value.borrow().clone()
    }

    /// Replace the stored value. Does not touch the change id; the engine
    /// records that around the call.
    pub(crate) fn set_value(&self, value: T) {
        *self.value.borrow_mut() = Some(value);
    }

    /// True if the stored value equals `other`.
    pub(crate) fn value_eq(&self, other: &T) -> bool {
        self.value.borrow().as_ref() == Some(other)
    }

    #[cfg(test)]
    pub(crate) fn necessary_count(&self) -> u32 {
        self.necessary.get()
    }
}

impl<T> ErasedNode for Node<T>
where
    T: Clone + PartialEq + 'static,
{
    fn id(&self) -> NodeId {
        self.id
    }

    fn height(&self) -> usize {
        self.height
    }

    fn is_necessary(&self) -> bool {
        self.necessary.get() > 0
    }

    fn mark_necessary(&self) {
        self.necessary.set(self.necessary.get() + 1);
    }

    fn decrement_necessary(&self) -> bool {
        let count = self.necessary.get();
        if count == 0 {
            return false;
        }
        self.necessary.set(count - 1);
        true
    }

    fn is_stale(&self) -> bool {
        if !self.is_necessary() {
            return false;
        }
        if !self.ever_computed.get() {
            return true;
        }
        let recomputed = self.recompute_id.get();
        self.dependencies
            .iter()
            .any(|dependency| recomputed < dependency.change_id())
    }

    fn recompute_id(&self) -> StabilizationNumber {
        self.recompute_id.get()
    }

    fn change_id(&self) -> StabilizationNumber {
        self.change_id.get()
    }

    fn set_change_id(&self, cycle: StabilizationNumber) {
        self.change_id.set(cycle);
        if self.recompute_id.get() < cycle {
            self.recompute_id.set(cycle);
        }
    }

    fn compute(&self, cycle: StabilizationNumber) {
        if self.recompute_id.get() == cycle {
            return;
        }
        self.recompute_id.set(cycle);
        self.ever_computed.set(true);

        let Some(updater) = &self.updater else {
            // Input node: the stored value is already definitive.
            return;
        };
        let Some(new_value) = updater() else {
            return;
        };

        let changed = self.value.borrow().as_ref() != Some(&new_value);
        if changed {
            *self.value.borrow_mut() = Some(new_value);
            self.change_id.set(cycle);
        }
    }

    fn dependencies(&self) -> Vec<Rc<dyn ErasedNode>> {
        self.dependencies.clone()
    }

    fn dependants(&self) -> Vec<Rc<dyn ErasedNode>> {
        let mut dependants = self.dependants.borrow_mut();
        dependants.retain(|_, dependant| dependant.strong_count() > 0);
        dependants.values().filter_map(Weak::upgrade).collect()
    }

    fn add_dependant(&self, dependant: &Rc<dyn ErasedNode>) {
        self.dependants
            .borrow_mut()
            .insert(dependant.id(), Rc::downgrade(dependant));
    }

    fn remove_dependant(&self, id: NodeId) {
        self.dependants.borrow_mut().remove(&id);
    }
}
