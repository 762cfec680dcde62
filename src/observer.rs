//! Change notification.
//!
//! A [`Forest`](crate::Forest) reports every completed structural change to
//! its observer.  Compound operations (group/ungroup) suppress the per-step
//! callbacks and fire a single summary callback instead, so an observer
//! never sees a torn intermediate state.
//!
//! Hooks receive the structural delta as paths, never the forest's internal
//! maps.  All default bodies log at debug level, so a forest is observable
//! out of the box via [`LogObserver`].

use crate::path::NodePath;

pub trait ForestObserver {
    /// A node (with its subtree) became the last child of some parent,
    /// or the first top-level tree of an empty forest.
    fn on_node_appended(&mut self, path: &NodePath) {
        tracing::debug!(%path, "node appended");
    }

    /// A node (with its subtree) was inserted among existing siblings.
    fn on_node_inserted(&mut self, path: &NodePath) {
        tracing::debug!(%path, "node inserted");
    }

    /// The subtree formerly at `path` left the forest.
    fn on_node_removed(&mut self, path: &NodePath) {
        tracing::debug!(%path, "node removed");
    }

    /// A group transaction completed: the nodes formerly at
    /// `member_paths` are now children of the node formerly at
    /// `root_path`.
    fn on_grouped(&mut self, root_path: &NodePath, member_paths: &[NodePath]) {
        tracing::debug!(%root_path, ?member_paths, "nodes grouped");
    }

    /// An ungroup transaction completed for the nodes formerly at
    /// `root_paths`.
    fn on_ungrouped(&mut self, root_paths: &[NodePath]) {
        tracing::debug!(?root_paths, "nodes ungrouped");
    }
}

/// The default observer: nothing but the trait's debug logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LogObserver;

impl ForestObserver for LogObserver {}
