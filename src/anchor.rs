//! Anchor handles and graph construction.
//!
//! An [`Anchor<T>`] is a cheap-to-clone handle to one node of the computation
//! graph. Anchors are built bottom-up: inputs with [`Anchor::create`], derived
//! anchors with the `map` family, which captures the input handles in the
//! node's updater. Since every constructor requires its inputs to already
//! exist, the resulting graph is acyclic by construction.
//!
//! Handles share ownership of the underlying node. A derived anchor keeps its
//! inputs alive; the reverse links (from an input to its dependants) are weak
//! and managed by the [`Engine`](crate::Engine) during observation.

use std::fmt;
use std::rc::Rc;

use crate::node::{ErasedNode, Node, NodeId};

/// Handle to a node in the computation graph.
///
/// `T` is the value type of the node. Values must be cloneable (retrieval
/// hands out a copy) and comparable (the engine cuts off propagation when a
/// recomputation reproduces the previous value). For types without usable
/// equality, see [`cutoff::AlwaysChanged`](crate::cutoff::AlwaysChanged).
///
/// Cloning an `Anchor` clones the handle, not the node: both handles refer to
/// the same cell.
pub struct Anchor<T> {
    node: Rc<Node<T>>,
}

impl<T> Clone for Anchor<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
        }
    }
}

impl<T> Anchor<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create an input anchor holding a seed value.
    ///
    /// Input anchors sit at height 0 and are updated through
    /// [`Engine::set`](crate::Engine::set).
    pub fn create(value: T) -> Self {
        Self::from_node(Node::input(value))
    }

    /// Derive an anchor from one input.
    ///
    /// The updater must be pure: same input value, same output. It runs only
    /// during stabilization, when the anchor is necessary and its input
    /// changed.
    pub fn map<A, F>(input: &Anchor<A>, updater: F) -> Self
    where
        A: Clone + PartialEq + 'static,
        F: Fn(A) -> T + 'static,
    {
        let a = input.node.clone();
        Self::from_node(Node::derived(
            vec![input.erased()],
            Box::new(move || Some(updater(a.value()?))),
        ))
    }

    /// Derive an anchor from two inputs.
    pub fn map2<A, B, F>(first: &Anchor<A>, second: &Anchor<B>, updater: F) -> Self
    where
        A: Clone + PartialEq + 'static,
        B: Clone + PartialEq + 'static,
        F: Fn(A, B) -> T + 'static,
    {
        let a = first.node.clone();
        let b = second.node.clone();
        Self::from_node(Node::derived(
            vec![first.erased(), second.erased()],
            Box::new(move || Some(updater(a.value()?, b.value()?))),
        ))
    }

    /// Derive an anchor from three inputs.
    pub fn map3<A, B, C, F>(
        first: &Anchor<A>,
        second: &Anchor<B>,
        third: &Anchor<C>,
        updater: F,
    ) -> Self
    where
        A: Clone + PartialEq + 'static,
        B: Clone + PartialEq + 'static,
        C: Clone + PartialEq + 'static,
        F: Fn(A, B, C) -> T + 'static,
    {
        let a = first.node.clone();
        let b = second.node.clone();
        let c = third.node.clone();
        Self::from_node(Node::derived(
            vec![first.erased(), second.erased(), third.erased()],
            Box::new(move || Some(updater(a.value()?, b.value()?, c.value()?))),
        ))
    }

    /// Derive an anchor from four inputs.
    pub fn map4<A, B, C, D, F>(
        first: &Anchor<A>,
        second: &Anchor<B>,
        third: &Anchor<C>,
        fourth: &Anchor<D>,
        updater: F,
    ) -> Self
    where
        A: Clone + PartialEq + 'static,
        B: Clone + PartialEq + 'static,
        C: Clone + PartialEq + 'static,
        D: Clone + PartialEq + 'static,
        F: Fn(A, B, C, D) -> T + 'static,
    {
        let a = first.node.clone();
        let b = second.node.clone();
        let c = third.node.clone();
        let d = fourth.node.clone();
        Self::from_node(Node::derived(
            vec![
                first.erased(),
                second.erased(),
                third.erased(),
                fourth.erased(),
            ],
            Box::new(move || Some(updater(a.value()?, b.value()?, c.value()?, d.value()?))),
        ))
    }

    /// Identifier of the underlying node.
    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    /// Height of the underlying node: 0 for inputs, one more than the
    /// tallest input for derived anchors.
    pub fn height(&self) -> usize {
        self.node.height()
    }

    pub(crate) fn erased(&self) -> Rc<dyn ErasedNode> {
        self.node.clone()
    }

    pub(crate) fn node(&self) -> &Rc<Node<T>> {
        &self.node
    }

    fn from_node(node: Node<T>) -> Self {
        Self {
            node: Rc::new(node),
        }
    }
}

impl<T> fmt::Debug for Anchor<T>
where
    T: Clone + PartialEq + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Anchor")
            .field("id", &self.id())
            .field("height", &self.height())
            .finish()
    }
}
