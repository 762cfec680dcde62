//! The addressable container.
//!
//! A [`Forest`] is an ordered sequence of independently rooted trees whose
//! nodes can be addressed two ways at once: by [`NodePath`] (sibling
//! offsets from the forest root) and by flattened pre-order index.  The
//! top-level trees hang off a synthetic root that is never materialized or
//! visible; its child list is the forest's `roots` vector.
//!
//! Every structural mutation delegates the low-level wiring to the arena,
//! then rebuilds the full index in one pre-order pass and notifies the
//! observer.  Group/ungroup run their steps with notification suppressed
//! and fire a single summary callback at the end.

use crate::{
    arena::Arena,
    error::{Error, Result},
    index::{NodeCount, NodeIdx},
    node::Node,
    observer::{ForestObserver, LogObserver},
    path::{NodeKey, NodePath},
};
use itertools::Itertools;
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Debug)]
pub struct Forest<D, Obs = LogObserver> {
    arena: Arena<D>,
    /// The synthetic root's children: the top-level trees, in display order.
    roots: Vec<NodeIdx>,
    paths: HashMap<NodeIdx, NodePath>,
    linear: HashMap<NodeIdx, usize>,
    order: Vec<NodeIdx>,
    max_depth: usize,
    /// Suppression depth; nonzero while a compound transaction runs.
    quiet: u32,
    observer: Obs,
}

impl<D, Obs: ForestObserver + Default> Default for Forest<D, Obs> {
    fn default() -> Self {
        Self::with_capacity(64)
    }
}

impl<D, Obs: ForestObserver + Default> Forest<D, Obs> {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self::bare(cap, Obs::default())
    }
}

impl<D, Obs: ForestObserver> Forest<D, Obs> {
    /// An empty forest reporting its changes to `observer`.
    pub fn with_observer(observer: Obs) -> Self {
        Self::bare(64, observer)
    }
}

impl<D, Obs> Forest<D, Obs> {
    fn bare(cap: usize, observer: Obs) -> Self {
        Self {
            arena: Arena::with_capacity(cap),
            roots: vec![],
            paths: HashMap::new(),
            linear: HashMap::new(),
            order: vec![],
            max_depth: 0,
            quiet: 0,
            observer,
        }
    }

    /// The number of indexed member nodes (the synthetic root and nodes
    /// not yet attached are not counted).
    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The greatest member path length minus one; 0 for an empty forest.
    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Get the logical size, which is defined as `physical size - garbage size`
    /// i.e. the number of allocated, non-garbage nodes in `self`.
    /// Unlike [`Self::len`], this includes detached nodes still being built.
    #[inline]
    pub fn logical_size(&self) -> NodeCount {
        self.arena.logical_size()
    }

    /// Get the physical size, which is defined as the number of nodes
    /// allocated in the forest, whether they are garbage or not.
    #[inline]
    pub fn physical_size(&self) -> NodeCount {
        self.arena.physical_size()
    }

    /// Get the garbage size i.e. the number of garbage nodes in `self`.
    #[inline]
    pub fn garbage_size(&self) -> NodeCount {
        self.arena.garbage_size()
    }

    /// The top-level trees, in display order.
    pub fn roots(&self) -> impl DoubleEndedIterator<Item = NodeIdx> + '_ {
        self.roots.iter().copied()
    }

    /// Whether `idx` is currently an indexed member of the forest.
    #[inline]
    pub fn is_member(&self, idx: NodeIdx) -> bool {
        self.paths.contains_key(&idx)
    }

    /// Resolve a [`NodeKey`] — a path or a (possibly negative) pre-order
    /// index — to a node handle.
    pub fn get(&self, key: impl Into<NodeKey>) -> Result<NodeIdx> {
        match key.into() {
            NodeKey::Path(path) => self.resolve_path(&path),
            NodeKey::Index(index) => {
                let len = self.order.len();
                let pos = if index < 0 { index + len as isize } else { index };
                if pos < 0 || pos >= len as isize {
                    return Err(Error::IndexOutOfRange { index, len });
                }
                Ok(self.order[pos as usize])
            }
        }
    }

    /// The path of member `idx`, if it is one.
    #[inline]
    pub fn path_of(&self, idx: NodeIdx) -> Option<&NodePath> {
        self.paths.get(&idx)
    }

    /// The pre-order index of member `idx`, if it is one.
    #[inline]
    pub fn index_of(&self, idx: NodeIdx) -> Option<usize> {
        self.linear.get(&idx).copied()
    }

    /// Lazy, restartable pre-order walk yielding `(path, handle)` pairs.
    /// The iterator borrows the forest, so structural mutation during
    /// iteration is rejected at compile time.
    pub fn iter(&self) -> Iter<'_, D, Obs> {
        Iter {
            forest: self,
            inner: self.order.iter(),
        }
    }

    /// Allocate a new detached node carrying `data`.  The node is not a
    /// member (and not indexed) until it is attached; build pre-wired
    /// subtrees by attaching further nodes under it with
    /// [`Self::append_child`].
    pub fn add_node(&mut self, data: D) -> NodeIdx {
        self.arena.add_node(data)
    }

    pub fn observer(&self) -> &Obs {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut Obs {
        &mut self.observer
    }

    fn resolve_path(&self, path: &NodePath) -> Result<NodeIdx> {
        let missing = || Error::PathNotFound { path: path.clone() };
        let (&first, rest) = path.offsets().split_first().ok_or_else(missing)?;
        let mut idx = *self.roots.get(first).ok_or_else(missing)?;
        for &offset in rest {
            idx = *self.arena[idx].children.get(offset).ok_or_else(missing)?;
        }
        Ok(idx)
    }

    fn ensure_exists(&self, idx: NodeIdx) -> Result<()> {
        if self.arena.contains(idx) {
            Ok(())
        } else {
            Err(Error::NodeNotFound { idx })
        }
    }

    /// Attachable means: no parent, and not a top-level member either.
    fn ensure_detached(&self, idx: NodeIdx) -> Result<()> {
        if self.arena[idx].has_parent() || self.is_member(idx) {
            return Err(Error::AlreadyAttached { idx });
        }
        Ok(())
    }

    /// One pre-order pass over the whole forest, rebuilding the path map,
    /// the linear map, the order vector and the depth watermark.
    fn reindex(&mut self) {
        self.paths.clear();
        self.linear.clear();
        self.order.clear();
        self.max_depth = 0;
        let mut stack: Vec<(NodeIdx, NodePath)> = Vec::with_capacity(self.roots.len());
        for (pos, &idx) in self.roots.iter().enumerate().rev() {
            stack.push((idx, NodePath::root(pos)));
        }
        while let Some((idx, path)) = stack.pop() {
            self.linear.insert(idx, self.order.len());
            self.order.push(idx);
            self.max_depth = self.max_depth.max(path.len().saturating_sub(1));
            for (pos, &child) in self.arena[idx].children.iter().enumerate().rev() {
                stack.push((child, path.child(pos)));
            }
            self.paths.insert(idx, path);
        }
    }

    /// Copy the subtree rooted in `src[src_root]` into `self`'s arena as a
    /// fresh detached node, returning its handle.  Handles of the source
    /// nodes are *not* valid in `self`; payloads are `Clone`d (use `Rc`/
    /// `Arc` payloads for sharing by reference).
    fn copy_in<O2>(&mut self, src: &Forest<D, O2>, src_root: NodeIdx) -> Result<NodeIdx>
    where
        D: Clone,
    {
        let mut map = HashMap::<NodeIdx, NodeIdx>::new();
        for sidx in src.arena.dfs(src_root) {
            let didx = self.arena.add_node(src.arena[sidx].data.clone());
            if sidx != src_root {
                if let Some(&dparent) =
                    src.arena[sidx].parent.as_ref().and_then(|p| map.get(p))
                {
                    self.arena.append_child(dparent, didx)?;
                }
            }
            map.insert(sidx, didx);
        }
        Ok(map[&src_root])
    }
}

impl<D, Obs: ForestObserver> Forest<D, Obs> {
    /// Append `node` (with any subtree pre-built under it) as the last
    /// top-level tree.  A non-empty forest routes this through
    /// [`Self::insert_after`] relative to the current last top-level tree,
    /// sharing that reindex/notification path.
    pub fn append_node(&mut self, node: NodeIdx) -> Result<()> {
        self.ensure_exists(node)?;
        self.ensure_detached(node)?;
        match self.roots.last().copied() {
            Some(last) => self.insert_after(last, node),
            None => {
                self.roots.push(node);
                self.reindex();
                let path = NodePath::root(0);
                self.notify_appended(&path);
                Ok(())
            }
        }
    }

    /// Attach `node` as the last child of `parent`.  When `parent` is a
    /// member this reindexes and notifies; when `parent` is itself still
    /// detached this only wires the link (subtree building).
    pub fn append_child(&mut self, parent: NodeIdx, node: NodeIdx) -> Result<()> {
        self.ensure_exists(parent)?;
        self.ensure_exists(node)?;
        self.ensure_detached(node)?;
        let parent_path = self.paths.get(&parent).cloned();
        let pos = self.arena.append_child(parent, node)?;
        if let Some(parent_path) = parent_path {
            let path = parent_path.child(pos);
            self.reindex();
            self.notify_appended(&path);
        }
        Ok(())
    }

    /// Insert `node` as a sibling directly before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeIdx, node: NodeIdx) -> Result<()> {
        self.insert_relative(sibling, node, true)
    }

    /// Insert `node` as a sibling directly after `sibling`.
    pub fn insert_after(&mut self, sibling: NodeIdx, node: NodeIdx) -> Result<()> {
        self.insert_relative(sibling, node, false)
    }

    /// Common code for inserting `node` either before or after `sibling`.
    /// Top-level siblings (whose logical parent is the synthetic root) are
    /// handled through the roots vector, all others through the arena.
    fn insert_relative(&mut self, sibling: NodeIdx, node: NodeIdx, before: bool) -> Result<()> {
        self.ensure_exists(sibling)?;
        self.ensure_exists(node)?;
        let sibling_path = self
            .paths
            .get(&sibling)
            .cloned()
            .ok_or(Error::Detached { idx: sibling })?;
        self.ensure_detached(node)?;
        let pos = if self.arena[sibling].has_parent() {
            if before {
                self.arena.insert_before(sibling, node)?
            } else {
                self.arena.insert_after(sibling, node)?
            }
        } else {
            let rpos = self
                .roots
                .iter()
                .position(|&r| r == sibling)
                .ok_or(Error::Detached { idx: sibling })?;
            let rpos = if before { rpos } else { rpos + 1 };
            self.roots.insert(rpos, node);
            rpos
        };
        // The inserted path is the sibling's pre-mutation path with its
        // last offset replaced by the landing position.
        let path = sibling_path.replace_last(pos);
        self.reindex();
        self.notify_inserted(&path);
        Ok(())
    }

    /// Insert `node` directly before whatever currently occupies `path`.
    ///
    /// If `path` does not resolve, fall back: insert after the node at the
    /// same path with its last offset decremented if that one exists;
    /// otherwise append as the last child of the deepest resolvable
    /// ancestor, or as the last top-level tree if no ancestor resolves.
    pub fn insert(&mut self, path: impl Into<NodePath>, node: NodeIdx) -> Result<()> {
        let path = path.into();
        if let Ok(sibling) = self.resolve_path(&path) {
            return self.insert_before(sibling, node);
        }
        let Some((parent_path, last)) = path.split_last() else {
            return self.append_node(node);
        };
        if last > 0 {
            if let Ok(sibling) = self.resolve_path(&parent_path.child(last - 1)) {
                return self.insert_after(sibling, node);
            }
        }
        let mut anchor: Option<NodeIdx> = None;
        for &offset in parent_path.offsets() {
            let next = match anchor {
                None => self.roots.get(offset).copied(),
                Some(idx) => self.arena[idx].children.get(offset).copied(),
            };
            match next {
                Some(idx) => anchor = Some(idx),
                None => break,
            }
        }
        match anchor {
            Some(parent) => self.append_child(parent, node),
            None => self.append_node(node),
        }
    }

    /// Detach member `node` together with its whole subtree and hand it
    /// back as a brand-new, independently indexed forest whose single
    /// top-level tree is the detached node.  The handles of the removed
    /// nodes are invalidated in `self`; re-insert the result through
    /// [`Self::adopt`].
    pub fn remove(&mut self, node: NodeIdx) -> Result<Self>
    where
        D: Clone,
        Obs: Default,
    {
        self.ensure_exists(node)?;
        if !self.is_member(node) {
            return Err(Error::Detached { idx: node });
        }
        let mut tree = Self::bare(64, Obs::default());
        let root = tree.copy_in(self, node)?;
        tree.roots.push(root);
        tree.reindex();
        self.detach_subtree(node)?;
        self.arena.release_subtree(node)?;
        Ok(tree)
    }

    /// Copy `tree`'s single top-level tree into `self` as a new detached
    /// node, ready for [`Self::append_node`] or sibling insertion.
    /// Fails with [`Error::SingleTreeExpected`] otherwise.
    pub fn adopt<O2>(&mut self, tree: &Forest<D, O2>) -> Result<NodeIdx>
    where
        D: Clone,
    {
        match tree.roots.as_slice() {
            &[root] => self.copy_in(tree, root),
            _ => Err(Error::SingleTreeExpected {
                count: tree.roots.len(),
            }),
        }
    }

    /// A non-destructive copy of the subtree rooted in member `node`,
    /// packaged as a new single-tree forest.
    pub fn subtree(&self, node: NodeIdx) -> Result<Self>
    where
        D: Clone,
        Obs: Default,
    {
        self.ensure_exists(node)?;
        if !self.is_member(node) {
            return Err(Error::Detached { idx: node });
        }
        let mut tree = Self::bare(64, Obs::default());
        let root = tree.copy_in(self, node)?;
        tree.roots.push(root);
        tree.reindex();
        Ok(tree)
    }

    /// A full independent duplicate; payload sharing follows the `Clone`
    /// semantics of `D` (`Rc`/`Arc` payloads share by reference).
    pub fn copy(&self) -> Self
    where
        D: Clone,
        Obs: Clone,
    {
        self.clone()
    }

    /// Group `nodes` under the one among them with the smallest current
    /// path: the others are detached — deepest/rightmost first, so earlier
    /// detachments never disturb positions later ones still address — and
    /// re-attached in path order as the root's trailing children.  Fires a
    /// single [`ForestObserver::on_grouped`] with the pre-transaction
    /// paths.
    ///
    /// Input order is irrelevant; duplicates and non-members are skipped.
    /// Handles are stable across the moves, so members that are
    /// descendants of other members simply travel into the group with
    /// them.  An empty (or all-skipped) input is a no-op.
    pub fn group(&mut self, nodes: &[NodeIdx]) -> Result<()> {
        let entries: Vec<(NodePath, NodeIdx)> = nodes
            .iter()
            .filter_map(|&n| self.paths.get(&n).map(|p| (p.clone(), n)))
            .sorted()
            .dedup_by(|a, b| a.1 == b.1)
            .collect();
        let Some((first, rest)) = entries.split_first() else {
            return Ok(());
        };
        let (root_path, root) = first.clone();
        let member_paths: Vec<NodePath> = rest.iter().map(|(p, _)| p.clone()).collect();
        let members: Vec<NodeIdx> = rest.iter().map(|&(_, n)| n).collect();
        self.with_suppressed(|forest| {
            let mut moved = Vec::with_capacity(members.len());
            for &n in members.iter().rev() {
                if !forest.is_member(n) {
                    continue;
                }
                forest.detach_subtree(n)?;
                moved.push(n);
            }
            for &n in moved.iter().rev() {
                forest.append_child(root, n)?;
            }
            Ok(())
        })?;
        self.observer.on_grouped(&root_path, &member_paths);
        Ok(())
    }

    /// Undo a grouping: for each given node (in input order), move its
    /// direct children — each carrying its own subtree — out to become the
    /// node's immediately following siblings, preserving their relative
    /// order.  Fires a single [`ForestObserver::on_ungrouped`] with the
    /// pre-transaction paths of the processed nodes.
    ///
    /// A node that is no longer a member when its turn comes is skipped,
    /// not an error.  Handles are stable across the moves, so a member
    /// that merely travelled along inside an earlier node's subtree is
    /// still processed normally.  An empty (or all-skipped) input is a
    /// no-op.
    pub fn ungroup(&mut self, nodes: &[NodeIdx]) -> Result<()> {
        let root_paths: Vec<NodePath> = nodes
            .iter()
            .filter_map(|n| self.paths.get(n).cloned())
            .collect();
        if root_paths.is_empty() {
            return Ok(());
        }
        let group_roots: Vec<NodeIdx> = nodes.to_vec();
        self.with_suppressed(|forest| {
            for &root in &group_roots {
                if !forest.is_member(root) {
                    continue;
                }
                let children: Vec<NodeIdx> = forest.arena[root].children.clone();
                for &child in children.iter().rev() {
                    forest.detach_subtree(child)?;
                    forest.insert_after(root, child)?;
                }
            }
            Ok(())
        })?;
        self.observer.on_ungrouped(&root_paths);
        Ok(())
    }

    /// Unlink a member subtree (from its parent or from the top level),
    /// reindex, and notify unless suppressed.  The subtree keeps its
    /// internal wiring and stays allocated.
    fn detach_subtree(&mut self, idx: NodeIdx) -> Result<NodePath> {
        let path = self
            .paths
            .get(&idx)
            .cloned()
            .ok_or(Error::Detached { idx })?;
        if self.arena[idx].has_parent() {
            self.arena.detach(idx)?;
        } else {
            let pos = self
                .roots
                .iter()
                .position(|&r| r == idx)
                .ok_or(Error::Detached { idx })?;
            self.roots.remove(pos);
        }
        self.reindex();
        self.notify_removed(&path);
        Ok(path)
    }

    /// Run `f` with per-step observer callbacks suppressed.  The depth
    /// counter is restored on both the success and the error path, and
    /// nests.
    fn with_suppressed<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        self.quiet += 1;
        let result = f(self);
        self.quiet -= 1;
        result
    }

    fn notify_appended(&mut self, path: &NodePath) {
        if self.quiet == 0 {
            self.observer.on_node_appended(path);
        }
    }

    fn notify_inserted(&mut self, path: &NodePath) {
        if self.quiet == 0 {
            self.observer.on_node_inserted(path);
        }
    }

    fn notify_removed(&mut self, path: &NodePath) {
        if self.quiet == 0 {
            self.observer.on_node_removed(path);
        }
    }
}

impl<D, Obs> std::ops::Index<NodeIdx> for Forest<D, Obs> {
    type Output = Node<D>;

    fn index(&self, idx: NodeIdx) -> &Self::Output {
        &self.arena[idx]
    }
}

impl<D, Obs> std::ops::IndexMut<NodeIdx> for Forest<D, Obs> {
    fn index_mut(&mut self, idx: NodeIdx) -> &mut Self::Output {
        &mut self.arena[idx]
    }
}

/// Pre-order iterator over `(path, handle)` pairs.
pub struct Iter<'a, D, Obs = LogObserver> {
    forest: &'a Forest<D, Obs>,
    inner: std::slice::Iter<'a, NodeIdx>,
}

impl<'a, D, Obs> Iterator for Iter<'a, D, Obs> {
    type Item = (&'a NodePath, NodeIdx);

    fn next(&mut self) -> Option<Self::Item> {
        let forest = self.forest;
        let idx = *self.inner.next()?;
        Some((&forest.paths[&idx], idx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<D, Obs> DoubleEndedIterator for Iter<'_, D, Obs> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let forest = self.forest;
        let idx = *self.inner.next_back()?;
        Some((&forest.paths[&idx], idx))
    }
}

impl<D, Obs> ExactSizeIterator for Iter<'_, D, Obs> {}

impl<'a, D, Obs> IntoIterator for &'a Forest<D, Obs> {
    type Item = (&'a NodePath, NodeIdx);
    type IntoIter = Iter<'a, D, Obs>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<D, Obs> fmt::Display for Forest<D, Obs>
where
    D: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // NOTE: This loop is `O(D * N)`, where:
        //       - D is the maximum depth of `self`
        //       - N is the number of member nodes in `self`
        for (i, &idx) in self.order.iter().enumerate() {
            let path = &self.paths[&idx];
            for _ in 1..path.len() {
                write!(f, "| ")?; // no newline
            }
            writeln!(f, "[{i:>2}] {path} {}", self.arena[idx].data)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    /// The example forest:
    ///
    /// ```text
    ///   0   1   2   3
    ///      / \
    ///     4   5
    ///     |
    ///     6
    /// ```
    #[rustfmt::skip]
    fn make_forest() -> Result<(Forest<i32>, Vec<NodeIdx>)> {
        let mut forest: Forest<i32> = Forest::new();
        let n0 = forest.add_node(0); forest.append_node(n0)?;
        let n1 = forest.add_node(1); forest.append_node(n1)?;
        let n2 = forest.add_node(2); forest.append_node(n2)?;
        let n3 = forest.add_node(3); forest.append_node(n3)?;
        let n4 = forest.add_node(4); forest.append_child(n1, n4)?;
        let n5 = forest.add_node(5); forest.append_child(n1, n5)?;
        let n6 = forest.add_node(6); forest.append_child(n4, n6)?;
        Ok((forest, vec![n0, n1, n2, n3, n4, n5, n6]))
    }

    /// `(path, payload)` pairs in pre-order, for structural comparison.
    fn snapshot(forest: &Forest<i32, impl ForestObserver>) -> Vec<(Vec<usize>, i32)> {
        forest
            .iter()
            .map(|(path, idx)| (path.offsets().to_vec(), forest[idx].data))
            .collect()
    }

    #[test]
    fn scenario_paths_and_linear_order() -> Result<()> {
        let (forest, _) = make_forest()?;
        assert_eq!(forest.len(), 7);
        let expected = vec![
            (vec![0], 0),
            (vec![1], 1),
            (vec![1, 0], 4),
            (vec![1, 0, 0], 6),
            (vec![1, 1], 5),
            (vec![2], 2),
            (vec![3], 3),
        ];
        assert_eq!(snapshot(&forest), expected);
        Ok(())
    }

    #[test]
    fn round_trip_addressing() -> Result<()> {
        let (forest, _) = make_forest()?;
        for (path, idx) in forest.iter() {
            assert_eq!(forest.get(path)?, idx);
            let i = forest.index_of(idx).ok_or(Error::Detached { idx })?;
            assert_eq!(forest.get(i)?, idx);
        }
        Ok(())
    }

    #[test]
    fn preorder_monotonicity() -> Result<()> {
        let (forest, _) = make_forest()?;
        let paths: Vec<NodePath> = forest.iter().map(|(p, _)| p.clone()).collect();
        // Lexicographic path order (with ancestors before descendants)
        // must agree with the linear order.
        assert!(paths.windows(2).all(|w| w[0] < w[1]));
        Ok(())
    }

    #[test]
    fn negative_linear_indices() -> Result<()> {
        let (forest, nodes) = make_forest()?;
        assert_eq!(forest.get(-1)?, nodes[3]);
        assert_eq!(forest.get(-7)?, nodes[0]);
        assert_eq!(
            forest.get(-8),
            Err(Error::IndexOutOfRange { index: -8, len: 7 })
        );
        assert_eq!(
            forest.get(7),
            Err(Error::IndexOutOfRange { index: 7, len: 7 })
        );
        Ok(())
    }

    #[test]
    fn path_lookup_failures() -> Result<()> {
        let (forest, _) = make_forest()?;
        for path in [vec![4], vec![1, 2], vec![0, 0], vec![]] {
            assert_eq!(
                forest.get(path.clone()),
                Err(Error::PathNotFound {
                    path: NodePath::from(path)
                })
            );
        }
        Ok(())
    }

    #[test]
    fn attachment_errors() -> Result<()> {
        let (mut forest, nodes) = make_forest()?;
        let loose = forest.add_node(100);
        let other = forest.add_node(101);

        // Inserting relative to a node outside the forest:
        assert_eq!(
            forest.insert_before(loose, other),
            Err(Error::Detached { idx: loose })
        );
        // Attaching an already-attached node:
        assert_eq!(
            forest.append_child(nodes[0], nodes[4]),
            Err(Error::AlreadyAttached { idx: nodes[4] })
        );
        assert_eq!(
            forest.append_node(nodes[2]),
            Err(Error::AlreadyAttached { idx: nodes[2] })
        );
        // A node cannot come to own itself:
        assert_eq!(
            forest.append_child(loose, loose),
            Err(Error::AlreadyAttached { idx: loose })
        );
        // Removing a node that is not a member:
        assert_eq!(
            forest.remove(loose).err(),
            Some(Error::Detached { idx: loose })
        );
        // A forged handle:
        let bogus = NodeIdx::from(1000usize);
        assert_eq!(
            forest.append_node(bogus),
            Err(Error::NodeNotFound { idx: bogus })
        );
        Ok(())
    }

    #[test]
    fn remove_detaches_whole_subtree() -> Result<()> {
        let (mut forest, _) = make_forest()?;
        let node4 = forest.get([1, 0])?;
        let removed = forest.remove(node4)?;

        assert_eq!(removed.len(), 2);
        assert_eq!(
            snapshot(&removed),
            vec![(vec![0], 4), (vec![0, 0], 6)]
        );

        assert_eq!(forest.len(), 5);
        assert!(!forest.is_member(node4));
        assert_eq!(forest[forest.get([1, 0])?].data, 5);
        assert_eq!(*forest.garbage_size(), 2);
        Ok(())
    }

    #[test]
    fn remove_then_adopt_restores_structure() -> Result<()> {
        let (mut forest, _) = make_forest()?;
        let before = snapshot(&forest);

        let node4 = forest.get([1, 0])?;
        let removed = forest.remove(node4)?;
        assert_eq!(forest.len(), 5);

        let adopted = forest.adopt(&removed)?;
        forest.insert([1, 0], adopted)?;
        assert_eq!(forest.len(), 7);
        assert_eq!(snapshot(&forest), before);
        Ok(())
    }

    #[test]
    fn adopt_requires_a_single_tree() -> Result<()> {
        let (mut forest, _) = make_forest()?;
        let (other, _) = make_forest()?;
        assert_eq!(
            forest.adopt(&other).map(|_| ()),
            Err(Error::SingleTreeExpected { count: 4 })
        );
        Ok(())
    }

    #[test]
    fn subtree_copies_without_removing() -> Result<()> {
        let (forest, nodes) = make_forest()?;
        let copy = forest.subtree(nodes[1])?;
        assert_eq!(
            snapshot(&copy),
            vec![
                (vec![0], 1),
                (vec![0, 0], 4),
                (vec![0, 0, 0], 6),
                (vec![0, 1], 5),
            ]
        );
        assert_eq!(forest.len(), 7);
        Ok(())
    }

    #[test]
    fn group_two_unrelated_top_level_nodes() -> Result<()> {
        let (mut forest, nodes) = make_forest()?;
        forest.group(&[nodes[0], nodes[2]])?;

        assert_eq!(forest.roots().count(), 3);
        assert_eq!(
            snapshot(&forest),
            vec![
                (vec![0], 0),
                (vec![0, 0], 2),
                (vec![1], 1),
                (vec![1, 0], 4),
                (vec![1, 0, 0], 6),
                (vec![1, 1], 5),
                (vec![2], 3),
            ]
        );
        Ok(())
    }

    #[test]
    fn group_is_input_order_independent() -> Result<()> {
        let (mut left, lnodes) = make_forest()?;
        let (mut right, rnodes) = make_forest()?;
        left.group(&[lnodes[3], lnodes[2]])?;
        right.group(&[rnodes[2], rnodes[3]])?;
        assert_eq!(snapshot(&left), snapshot(&right));
        // The lexicographically smallest becomes the group root.
        assert_eq!(left[left.get([2])?].data, 2);
        assert_eq!(left[left.get([2, 0])?].data, 3);
        Ok(())
    }

    #[test]
    fn group_then_ungroup_is_an_inverse_for_adjacent_siblings() -> Result<()> {
        let (mut forest, nodes) = make_forest()?;
        let before = snapshot(&forest);
        forest.group(&[nodes[2], nodes[3]])?;
        assert_eq!(forest.len(), 7);
        assert_ne!(snapshot(&forest), before);
        forest.ungroup(&[nodes[2]])?;
        assert_eq!(snapshot(&forest), before);
        Ok(())
    }

    #[test]
    fn ungroup_moves_children_with_their_subtrees() -> Result<()> {
        let (mut forest, nodes) = make_forest()?;
        forest.ungroup(&[nodes[1]])?;
        // 4 (still carrying 6) and 5 become the siblings after 1.
        assert_eq!(
            snapshot(&forest),
            vec![
                (vec![0], 0),
                (vec![1], 1),
                (vec![2], 4),
                (vec![2, 0], 6),
                (vec![3], 5),
                (vec![4], 2),
                (vec![5], 3),
            ]
        );
        Ok(())
    }

    #[test]
    fn group_and_ungroup_skip_absent_nodes() -> Result<()> {
        let (mut forest, nodes) = make_forest()?;
        let before = snapshot(&forest);
        forest.group(&[])?;
        forest.ungroup(&[])?;
        let loose = forest.add_node(100);
        forest.group(&[loose])?;
        forest.ungroup(&[loose])?;
        assert_eq!(snapshot(&forest), before);
        // Duplicates collapse to one entry:
        forest.group(&[nodes[2], nodes[3], nodes[3]])?;
        assert_eq!(forest[forest.get([2, 0])?].data, 3);
        assert_eq!(forest.len(), 7);
        Ok(())
    }

    #[test]
    fn insert_fallback_policy() -> Result<()> {
        let (mut forest, _) = make_forest()?;

        // Past the end at top level: lands after the last top-level tree.
        let a = forest.add_node(10);
        forest.insert(vec![10], a)?;
        assert_eq!(forest.path_of(a), Some(&NodePath::from([4])));

        // Past the end among siblings: appended under the parent.
        let b = forest.add_node(11);
        forest.insert([1, 5], b)?;
        assert_eq!(forest.path_of(b), Some(&NodePath::from([1, 2])));

        // Deep dangling path: appended under the deepest resolvable
        // ancestor.
        let c = forest.add_node(12);
        forest.insert([1, 0, 0, 9, 9], c)?;
        assert_eq!(forest.path_of(c), Some(&NodePath::from([1, 0, 0, 0])));

        // A resolvable path inserts before its occupant.
        let d = forest.add_node(13);
        forest.insert([1, 1], d)?;
        assert_eq!(forest.path_of(d), Some(&NodePath::from([1, 1])));
        assert_eq!(forest[forest.get([1, 2])?].data, 5);
        Ok(())
    }

    #[test]
    fn deep_copy_is_independent() -> Result<()> {
        let (forest, _) = make_forest()?;
        let before = snapshot(&forest);
        let mut copy = forest.copy();
        let node1 = copy.get([1])?;
        copy.remove(node1)?;
        assert_eq!(copy.len(), 3);
        assert_eq!(snapshot(&forest), before);
        Ok(())
    }

    #[test]
    fn copies_share_payloads_by_reference() -> Result<()> {
        let payload = Rc::new("shared".to_string());
        let mut forest: Forest<Rc<String>> = Forest::new();
        let n = forest.add_node(Rc::clone(&payload));
        forest.append_node(n)?;
        assert_eq!(Rc::strong_count(&payload), 2);

        let copy = forest.copy();
        assert_eq!(Rc::strong_count(&payload), 3);
        let copied = copy.get(0)?;
        assert!(Rc::ptr_eq(&copy[copied].data, &payload));
        Ok(())
    }

    #[test]
    fn max_depth_tracks_the_deepest_member() -> Result<()> {
        let mut forest: Forest<i32> = Forest::new();
        assert_eq!(forest.max_depth(), 0);
        let (mut forest7, _) = make_forest()?;
        assert_eq!(forest7.max_depth(), 2);
        let node4 = forest7.get([1, 0])?;
        forest7.remove(node4)?;
        assert_eq!(forest7.max_depth(), 1);
        let n = forest.add_node(0);
        forest.append_node(n)?;
        assert_eq!(forest.max_depth(), 0);
        Ok(())
    }

    #[test]
    fn sizes_distinguish_members_from_builders() -> Result<()> {
        let (mut forest, _) = make_forest()?;
        assert_eq!(*forest.logical_size(), 7);
        let loose = forest.add_node(100);
        assert_eq!(forest.len(), 7);
        assert_eq!(*forest.logical_size(), 8);
        forest.append_node(loose)?;
        assert_eq!(forest.len(), 8);
        Ok(())
    }

    #[test]
    fn display_lists_members_in_preorder() -> Result<()> {
        let (forest, _) = make_forest()?;
        let listing = format!("{forest}");
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "[ 0] (0) 0");
        assert_eq!(lines[3], "| | [ 3] (1, 0, 0) 6");
        Ok(())
    }

    /// Observer recording every callback, for notification-wiring tests.
    #[derive(Clone, Debug, Default, PartialEq)]
    struct Recorder {
        events: Vec<Event>,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum Event {
        Appended(NodePath),
        Inserted(NodePath),
        Removed(NodePath),
        Grouped(NodePath, Vec<NodePath>),
        Ungrouped(Vec<NodePath>),
    }

    impl ForestObserver for Recorder {
        fn on_node_appended(&mut self, path: &NodePath) {
            self.events.push(Event::Appended(path.clone()));
        }
        fn on_node_inserted(&mut self, path: &NodePath) {
            self.events.push(Event::Inserted(path.clone()));
        }
        fn on_node_removed(&mut self, path: &NodePath) {
            self.events.push(Event::Removed(path.clone()));
        }
        fn on_grouped(&mut self, root_path: &NodePath, member_paths: &[NodePath]) {
            self.events
                .push(Event::Grouped(root_path.clone(), member_paths.to_vec()));
        }
        fn on_ungrouped(&mut self, root_paths: &[NodePath]) {
            self.events.push(Event::Ungrouped(root_paths.to_vec()));
        }
    }

    #[test]
    fn notification_wiring() -> Result<()> {
        let mut forest: Forest<i32, Recorder> = Forest::with_observer(Recorder::default());

        // First top-level tree is a plain append ...
        let n0 = forest.add_node(0);
        forest.append_node(n0)?;
        // ... while subsequent ones ride the sibling-insertion path.
        let n1 = forest.add_node(1);
        forest.append_node(n1)?;
        let n2 = forest.add_node(2);
        forest.append_child(n1, n2)?;
        let n3 = forest.add_node(3);
        forest.insert_before(n0, n3)?;
        let removed = forest.remove(n2)?;
        drop(removed);

        assert_eq!(
            forest.observer().events,
            vec![
                Event::Appended(NodePath::from([0])),
                Event::Inserted(NodePath::from([1])),
                Event::Appended(NodePath::from([1, 0])),
                Event::Inserted(NodePath::from([0])),
                Event::Removed(NodePath::from([2, 0])),
            ]
        );
        Ok(())
    }

    #[test]
    fn compound_operations_notify_exactly_once() -> Result<()> {
        let mut forest: Forest<i32, Recorder> = Forest::with_observer(Recorder::default());
        let mut nodes = vec![];
        for payload in 0..4 {
            let n = forest.add_node(payload);
            forest.append_node(n)?;
            nodes.push(n);
        }
        forest.observer_mut().events.clear();

        forest.group(&[nodes[1], nodes[2], nodes[3]])?;
        assert_eq!(
            forest.observer().events,
            vec![Event::Grouped(
                NodePath::from([1]),
                vec![NodePath::from([2]), NodePath::from([3])],
            )]
        );

        forest.observer_mut().events.clear();
        forest.ungroup(&[nodes[1]])?;
        assert_eq!(
            forest.observer().events,
            vec![Event::Ungrouped(vec![NodePath::from([1])])]
        );
        Ok(())
    }
}
