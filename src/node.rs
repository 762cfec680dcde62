//! The atomic tree element.

use crate::index::NodeIdx;

/// A node in a [`Forest`](crate::Forest) arena: an opaque payload, a
/// non-owning back-reference to the parent, and the ordered handles of the
/// owned children.  `None` as parent means the node is either a top-level
/// tree of its forest or currently detached.
///
/// Structural edits go through the forest so that both sides of the
/// parent/child link — and the index maps — stay consistent; the fields
/// are public for reading.
#[rustfmt::skip]
#[derive(
    Clone,
    PartialEq,
    Eq,
    Hash,
    serde::Deserialize,
    serde::Serialize,
    derive_more::Deref,
    derive_more::DerefMut,
)]
pub struct Node<D> {
    pub idx: NodeIdx,
    pub parent: Option<NodeIdx>,
    pub children: Vec<NodeIdx>,
    #[deref]
    #[deref_mut]
    pub data: D,
}

impl<D> Node<D> {
    pub(crate) fn new(idx: NodeIdx, data: D) -> Self {
        Node {
            idx,
            parent: None,
            children: Vec::with_capacity(4),
            data,
        }
    }

    #[inline(always)]
    pub fn children(&self) -> impl DoubleEndedIterator<Item = NodeIdx> + '_ {
        self.children.iter().copied()
    }

    #[inline(always)]
    pub fn count_children(&self) -> usize {
        self.children.len()
    }

    /// The sibling offset of `child_idx` in `self.children`, if present.
    #[inline]
    pub fn child_position(&self, child_idx: NodeIdx) -> Option<usize> {
        self.children.iter().position(|&cidx| cidx == child_idx)
    }

    #[inline(always)]
    pub(crate) fn push_child(&mut self, child_idx: NodeIdx) -> usize {
        self.children.push(child_idx);
        self.children.len() - 1
    }

    /// Insert `child_idx` as the `pos`-th child of `self`.
    #[inline]
    pub(crate) fn insert_child(&mut self, pos: usize, child_idx: NodeIdx) {
        self.children.insert(pos, child_idx);
    }

    /// Filter out `child_idx` from `self.children`, returning its former
    /// sibling offset.  `None` if `self.children` does not contain it.
    #[inline]
    pub(crate) fn remove_child(&mut self, child_idx: NodeIdx) -> Option<usize> {
        let pos = self.child_position(child_idx)?;
        self.children.remove(pos);
        Some(pos)
    }

    #[inline]
    pub fn is_leaf_node(&self) -> bool {
        self.children.is_empty()
    }

    #[inline]
    pub fn is_branch_node(&self) -> bool {
        !self.is_leaf_node()
    }

    /// Whether this node hangs off another node.  Top-level trees report
    /// `false` as well: their logical parent is the forest itself.
    #[inline]
    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }
}

impl<D: std::fmt::Debug> std::fmt::Debug for Node<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ds = f.debug_struct("Node");
        let ds = ds.field("idx", &self.idx);
        let ds = ds.field("parent", &self.parent);
        let ds = ds.field("children", &self.children);
        let ds = ds.field("data", &self.data);
        ds.finish()
    }
}
