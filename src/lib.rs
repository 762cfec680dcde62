//! An ordered forest — a sequence of independently rooted trees — whose
//! nodes are addressable two ways at once: by hierarchical path (sibling
//! offsets from the forest root) and by flattened pre-order index.  Both
//! addressing schemes, and the maps deriving them, are rebuilt after every
//! structural change, so they are always consistent; compound operations
//! (group/ungroup) run transactionally and notify observers exactly once.
//!
//! ```
//! use copse::Forest;
//!
//! let mut forest: Forest<&str> = Forest::new();
//! let a = forest.add_node("a");
//! forest.append_node(a)?;
//! let b = forest.add_node("b");
//! forest.append_child(a, b)?;
//!
//! assert_eq!(forest.len(), 2);
//! assert_eq!(forest.get([0, 0])?, b);
//! assert_eq!(forest.get(-1)?, b);
//! # Ok::<(), copse::Error>(())
//! ```
#![forbid(unsafe_code)]

mod arena;
pub mod error;
pub mod forest;
#[cfg(feature = "graphviz")]
pub mod graphviz;
pub mod index;
pub mod node;
pub mod observer;
pub mod path;

#[rustfmt::skip]
pub use crate::{
    error::{Error, Result},
    forest::Forest,
    index::{NodeCount, NodeIdx},
    node::Node,
    observer::{ForestObserver, LogObserver},
    path::{NodeKey, NodePath},
};
