//! Hierarchical addresses.
//!
//! A [`NodePath`] locates a node by the sibling offsets walked from the
//! forest root: `(2, 0, 1)` is the 2nd child of the 1st child of the 3rd
//! top-level tree.  Paths order lexicographically, which coincides with
//! pre-order visitation for nodes on the same root-to-leaf walk.
//!
//! A [`NodeKey`] is either a path or a flattened pre-order index, so that
//! [`Forest::get`](crate::Forest::get) accepts both addressing schemes.

use itertools::Itertools;

#[rustfmt::skip]
#[derive(
    Clone,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Deserialize,
    serde::Serialize,
    derive_more::Deref,
    derive_more::From,
)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// The path of the `offset`-th top-level tree.
    #[inline]
    pub fn root(offset: usize) -> Self {
        Self(vec![offset])
    }

    /// The path of the `offset`-th child of `self`.
    pub fn child(&self, offset: usize) -> Self {
        let mut offsets = Vec::with_capacity(self.0.len() + 1);
        offsets.extend_from_slice(&self.0);
        offsets.push(offset);
        Self(offsets)
    }

    /// The path of the parent, or `None` for a top-level (or empty) path.
    pub fn parent(&self) -> Option<Self> {
        match &*self.0 {
            [] | [_] => None,
            offsets => Some(Self(offsets[..offsets.len() - 1].to_vec())),
        }
    }

    /// Split into the parent path and the final sibling offset.
    pub fn split_last(&self) -> Option<(Self, usize)> {
        let (&last, parent) = self.0.split_last()?;
        Some((Self(parent.to_vec()), last))
    }

    /// A copy of `self` whose final sibling offset is `offset`.
    /// An empty path yields `(offset,)`.
    pub fn replace_last(&self, offset: usize) -> Self {
        let mut offsets = self.0.clone();
        match offsets.last_mut() {
            Some(last) => *last = offset,
            None => offsets.push(offset),
        }
        Self(offsets)
    }

    #[inline(always)]
    pub fn offsets(&self) -> &[usize] {
        &self.0
    }
}

impl From<&[usize]> for NodePath {
    fn from(offsets: &[usize]) -> Self {
        Self(offsets.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for NodePath {
    fn from(offsets: [usize; N]) -> Self {
        Self(offsets.to_vec())
    }
}

impl FromIterator<usize> for NodePath {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Debug for NodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "NodePath{self}")
    }
}

impl std::fmt::Display for NodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({})", self.0.iter().join(", "))
    }
}

/// Either of the two ways to address a node in a forest.
///
/// Linear indices may be negative, in which case they count from the end
/// of the pre-order sequence: `-1` is the last node.
#[rustfmt::skip]
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    derive_more::From,
)]
pub enum NodeKey {
    Path(NodePath),
    Index(isize),
}

impl From<&NodePath> for NodeKey {
    fn from(path: &NodePath) -> Self {
        Self::Path(path.clone())
    }
}

impl From<Vec<usize>> for NodeKey {
    fn from(offsets: Vec<usize>) -> Self {
        Self::Path(NodePath::from(offsets))
    }
}

impl From<&[usize]> for NodeKey {
    fn from(offsets: &[usize]) -> Self {
        Self::Path(NodePath::from(offsets))
    }
}

impl<const N: usize> From<[usize; N]> for NodeKey {
    fn from(offsets: [usize; N]) -> Self {
        Self::Path(NodePath::from(offsets))
    }
}

impl From<i32> for NodeKey {
    fn from(index: i32) -> Self {
        Self::Index(index as isize)
    }
}

impl From<usize> for NodeKey {
    fn from(index: usize) -> Self {
        Self::Index(index as isize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_ordering_is_lexicographic() {
        let mut paths: Vec<NodePath> = [
            vec![1, 0],
            vec![0],
            vec![1],
            vec![0, 2],
            vec![1, 0, 0],
        ]
        .into_iter()
        .map(NodePath::from)
        .collect();
        paths.sort();
        let expected: Vec<NodePath> = [
            vec![0],
            vec![0, 2],
            vec![1],
            vec![1, 0],
            vec![1, 0, 0],
        ]
        .into_iter()
        .map(NodePath::from)
        .collect();
        assert_eq!(paths, expected);
    }

    #[test]
    fn path_arithmetic() {
        let path = NodePath::from([1, 0, 2]);
        assert_eq!(path.parent(), Some(NodePath::from([1, 0])));
        assert_eq!(path.child(4), NodePath::from([1, 0, 2, 4]));
        assert_eq!(path.replace_last(7), NodePath::from([1, 0, 7]));
        assert_eq!(path.split_last(), Some((NodePath::from([1, 0]), 2)));
        assert_eq!(NodePath::root(3).parent(), None);
        assert_eq!(format!("{path}"), "(1, 0, 2)");
    }
}
