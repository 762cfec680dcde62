//! Read-only rendering of a forest to Graphviz DOT text.
//!
//! This is an external consumer of the forest: everything here goes
//! through the public iteration contract and node reads, never the index
//! maps.  Node labels carry the pre-order index and the payload; edges run
//! parent to child.

use crate::{
    error::{Error, Result},
    forest::Forest,
    index::NodeIdx,
};
use dot_structures::Graph;
use graphviz_rust::{cmd::Format, exec, parse, printer::PrinterContext};
use std::collections::HashMap;
use std::path::Path;

impl<D, Obs> Forest<D, Obs>
where
    D: std::fmt::Display,
{
    /// Render `self` as a DOT digraph: one node per member, labelled
    /// `[pre-order index] payload`, one edge per parent/child link.
    /// Top-level trees have no incoming edge — the synthetic root is not
    /// drawn.
    pub fn to_graphviz_graph(&self) -> DotGraph {
        let mut graph = DotGraph {
            rankdir: Some(DotRankDir::LeftToRight),
            ..DotGraph::default()
        };
        let mut dot_ids = HashMap::<NodeIdx, usize>::new();
        for (i, (_path, idx)) in self.iter().enumerate() {
            dot_ids.insert(idx, i);
            let node = &self[idx];
            graph.add(DotNode {
                id: i,
                attrs: DotAttrs {
                    label: Some(format!("[{i}] {}", node.data)),
                    ..DotAttrs::default()
                },
            });
            // Pre-order guarantees the parent was visited already.
            if let Some(&src) = node.parent.as_ref().and_then(|p| dot_ids.get(p)) {
                graph.add(DotEdge {
                    src,
                    dst: i,
                    attrs: DotAttrs::default(),
                });
            }
        }
        graph
    }
}

/// A DOT digraph assembled statement by statement; `Display` yields the
/// textual definition.
#[derive(Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DotGraph {
    /// The rank direction
    pub rankdir: Option<DotRankDir>,
    pub stmts: Vec<DotStmt>,
}

impl DotGraph {
    pub fn add(&mut self, stmt: impl Into<DotStmt>) {
        self.stmts.push(stmt.into());
    }

    /// Write `self` to `{dirpath}/{stem}.svg`.
    pub fn write_to_svg(&self, dirpath: &Path, stem: &str) -> Result<()> {
        let dot = format!("{self}");
        let graph: Graph = parse(&dot).map_err(Error::GraphvizParse)?;
        let mut pctx = PrinterContext::default();
        let svg: Vec<u8> = exec(graph, &mut pctx, vec![Format::Svg.into()])?;
        let svg_filepath = dirpath.join(format!("{stem}.svg"));
        std::fs::write(&svg_filepath, svg)?;
        Ok(())
    }
}

impl std::fmt::Display for DotGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "digraph {{")?;
        if let Some(rankdir) = &self.rankdir {
            writeln!(f, "  rankdir={rankdir};")?;
        }
        for stmt in &self.stmts {
            writeln!(f, "  {stmt}")?;
        }
        writeln!(f, "}}")?;
        Ok(())
    }
}

#[rustfmt::skip]
#[derive(
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    derive_more::From,
)]
pub enum DotStmt {
    Node(DotNode),
    Edge(DotEdge),
}

impl std::fmt::Display for DotStmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node(node) => write!(f, "{node};"),
            Self::Edge(edge) => write!(f, "{edge};"),
        }
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, displaydoc::Display)]
/// {id} [{attrs}]
pub struct DotNode {
    pub id: usize,
    pub attrs: DotAttrs,
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, displaydoc::Display)]
/// {src} -> {dst} [{attrs}]
pub struct DotEdge {
    pub src: usize,
    pub dst: usize,
    pub attrs: DotAttrs,
}

#[rustfmt::skip]
#[derive(
    Default,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    displaydoc::Display,
)]
pub enum DotRankDir {
    #[default]
    /// TB
    TopToBottom,
    /// LR
    LeftToRight,
}

#[derive(Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DotAttrs {
    /// A label that will be displayed within a pair of double quotes.
    pub label: Option<String>,
    /// A shape e.g. "square", "circle", "triangle" etc.
    pub shape: Option<String>,
    /// A color name or hex format e.g. "darkgreen", "#3c3c3c", etc.
    pub color: Option<String>,
    /// The size of the font used for label text.
    pub fontsize: Option<usize>,
}

impl std::fmt::Display for DotAttrs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut n = 0;
        if let Some(label) = &self.label {
            write!(f, "label=\"{label}\"")?;
            n += 1;
        }
        if let Some(shape) = &self.shape {
            if n > 0 { write!(f, ", ")?; }
            write!(f, "shape={shape}")?;
            n += 1;
        }
        if let Some(color) = &self.color {
            if n > 0 { write!(f, ", ")?; }
            write!(f, "color=\"{color}\"")?;
            n += 1;
        }
        if let Some(fontsize) = &self.fontsize {
            if n > 0 { write!(f, ", ")?; }
            write!(f, "fontsize={fontsize}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    fn make_forest() -> crate::Result<Forest<&'static str>> {
        let mut forest: Forest<&str> = Forest::new();
        let a = forest.add_node("a"); forest.append_node(a)?;
        let b = forest.add_node("b"); forest.append_child(a, b)?;
        let c = forest.add_node("c"); forest.append_node(c)?;
        Ok(forest)
    }

    #[test]
    fn renders_nodes_and_edges_in_preorder() -> crate::Result<()> {
        let forest = make_forest()?;
        let dot = format!("{}", forest.to_graphviz_graph());
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("rankdir=LR;"));
        assert!(dot.contains("0 [label=\"[0] a\"];"));
        assert!(dot.contains("1 [label=\"[1] b\"];"));
        assert!(dot.contains("2 [label=\"[2] c\"];"));
        assert!(dot.contains("0 -> 1 [];"));
        // Top-level trees have no incoming edge.
        assert!(!dot.contains("-> 0"));
        assert!(!dot.contains("-> 2"));
        Ok(())
    }
}
