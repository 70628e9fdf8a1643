//! # Grammar
//!
//! The domain layer over [`Graph`]: each vertex is a grammar [`Node`] and each
//! out-edge is one of its symbols, ordered by edge sequence number.
//!
//! A grammar is populated by an external front-end (EBNF text to graph) via
//! [`Grammar::add_node`] and [`Grammar::add_symbol`], then prepared for
//! generation with two passes:
//!
//! 1. [`Grammar::merge_production`] links every `Id` node directly to the
//!    root of the production it names.
//! 2. [`Grammar::build_shortest_notation`] computes each node's distance to
//!    an all-terminal derivation.
//!
//! After both passes the grammar is read-only and may be shared between
//! concurrently running generation contexts.

mod distance;
mod node;
mod persist;

pub use node::{GrammarType, Node, TypeSet, UNREACHABLE};
pub use persist::FORMAT_VERSION;

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::debug;

use crate::graph::{EdgeId, Graph, GraphError, VertexId};

/// Metadata key holding the start symbol name.
pub const START_SYM: &str = "startSym";

/// Index of a node inside its grammar.
pub type NodeId = VertexId;

/// Errors raised while building, preparing or persisting a grammar.
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot decode grammar file: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unsupported grammar file version {0}")]
    UnsupportedVersion(u32),

    #[error("grammar has no start symbol")]
    MissingStartSymbol,

    #[error("unknown node `{0}`")]
    UnknownNode(String),
}

/// Formats the identity of the edge `from -> to`.
pub fn edge_id(from: &str, to: &str) -> String {
    format!("{},{}", from, to)
}

/// Splits an edge identity produced by [`edge_id`].
pub fn split_edge_id(id: &str) -> Option<(&str, &str)> {
    let (from, to) = id.split_once(',')?;
    if to.contains(',') {
        return None;
    }
    Some((from, to))
}

/// A grammar graph.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    graph: Graph<Node>,
}

/// A borrowed view of one grammar node.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'g> {
    grammar: &'g Grammar,
    id: NodeId,
    name: &'g str,
    node: &'g Node,
}

impl<'g> NodeRef<'g> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The node's string identity.
    pub fn name(&self) -> &'g str {
        self.name
    }

    pub fn kind(&self) -> GrammarType {
        self.node.kind
    }

    pub fn content(&self) -> &'g str {
        &self.node.content
    }

    pub fn distance(&self) -> u32 {
        self.node.distance
    }

    pub fn props(&self) -> &'g Node {
        self.node
    }

    /// Children in left-to-right order.
    pub fn symbols(&self) -> Vec<NodeId> {
        self.grammar.symbols(self.id)
    }

    pub fn symbol(&self, idx: usize) -> Option<NodeId> {
        self.symbols().get(idx).copied()
    }
}

impl Grammar {
    /// Creates an empty grammar whose start symbol is `start`.
    pub fn new(start: impl Into<String>) -> Self {
        let mut grammar = Self::default();
        grammar.set_start_symbol(start);
        grammar
    }

    /// The underlying graph.
    pub fn graph(&self) -> &Graph<Node> {
        &self.graph
    }

    pub(crate) fn from_graph(graph: Graph<Node>) -> Self {
        Self { graph }
    }

    pub fn start_symbol(&self) -> Option<&str> {
        self.graph.metadata(START_SYM).and_then(|v| v.as_str())
    }

    pub fn set_start_symbol(&mut self, start: impl Into<String>) {
        self.graph.set_metadata(START_SYM, start.into());
    }

    /// Adds a node with identity `id`.
    pub fn add_node(
        &mut self,
        id: impl Into<String>,
        kind: GrammarType,
        content: impl Into<String>,
    ) -> Result<NodeId, GrammarError> {
        Ok(self.graph.add_vertex(id, Node::new(kind, content))?)
    }

    /// Inserts a node payload as-is, keeping its recorded distance.
    pub(crate) fn insert_node(
        &mut self,
        id: impl Into<String>,
        node: Node,
    ) -> Result<NodeId, GrammarError> {
        Ok(self.graph.add_vertex(id, node)?)
    }

    /// Appends `child` as the next symbol of `parent`.
    pub fn add_symbol(&mut self, parent: NodeId, child: NodeId) -> Result<EdgeId, GrammarError> {
        let id = edge_id(self.name_of(parent)?, self.name_of(child)?);
        Ok(self.graph.add_edge(id, parent, child, ())?)
    }

    fn name_of(&self, id: NodeId) -> Result<&str, GrammarError> {
        self.graph
            .vertex(id)
            .map(|v| v.id())
            .ok_or_else(|| GrammarError::UnknownNode(format!("#{}", id.index())))
    }

    /// Resolves a node by its string identity.
    pub fn get_node(&self, id: &str) -> Option<NodeId> {
        self.graph.vertex_by_id(id)
    }

    /// A view of the node at `id`.
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        let vertex = self.graph.vertex(id)?;
        Some(NodeRef {
            grammar: self,
            id,
            name: vertex.id(),
            node: vertex.props(),
        })
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.graph.vertex_mut(id).map(|v| v.props_mut())
    }

    /// Resolves an edge identity to its endpoints.
    pub fn get_edge(&self, id: &str) -> Option<(NodeRef<'_>, NodeRef<'_>)> {
        let edge = self.graph.edge(self.graph.edge_by_id(id)?)?;
        Some((self.node(edge.from())?, self.node(edge.to())?))
    }

    /// Children of `id` in left-to-right order.
    pub fn symbols(&self, id: NodeId) -> Vec<NodeId> {
        self.graph.out_edges(id).iter().map(|e| e.to()).collect()
    }

    /// Links every reachable `Id` node to the root of the production it names.
    ///
    /// Breadth-first from the start symbol. Content strings are left intact
    /// and already-present links are not duplicated, so the pass is
    /// idempotent. Returns the number of links added.
    pub fn merge_production(&mut self) -> Result<usize, GrammarError> {
        let start_name = self.start_symbol().ok_or(GrammarError::MissingStartSymbol)?;
        let start = self
            .get_node(start_name)
            .ok_or_else(|| GrammarError::UnknownNode(start_name.to_string()))?;

        let mut queue = VecDeque::from([start]);
        let mut visited = FxHashSet::from_iter([start]);
        let mut links = 0;

        while let Some(current) = queue.pop_front() {
            for child in self.symbols(current) {
                let Some(node) = self.node(child) else {
                    continue;
                };
                if node.kind() == GrammarType::Id {
                    match self.get_node(node.content()) {
                        Some(target) if target != child => {
                            let id = edge_id(node.name(), self.name_of(target)?);
                            if self.graph.edge_by_id(&id).is_none() {
                                self.graph.add_edge(id, child, target, ())?;
                                links += 1;
                            }
                            if visited.insert(target) {
                                queue.push_back(target);
                            }
                        }
                        Some(_) => {}
                        None => {
                            debug!(reference = node.content(), "unresolved production reference")
                        }
                    }
                }
                if visited.insert(child) {
                    queue.push_back(child);
                }
            }
        }

        debug!(links, "merged production references");
        Ok(links)
    }

    /// Pre-order walk from `root`.
    ///
    /// Each node is visited at most once and self-loop edges are skipped,
    /// so the walk terminates on cyclic grammars.
    pub fn walk<E>(
        &self,
        root: NodeId,
        mut visit: impl FnMut(NodeRef<'_>) -> Result<(), E>,
    ) -> Result<(), E> {
        let mut stack = vec![root];
        let mut seen = FxHashSet::default();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(node) = self.node(current) else {
                continue;
            };
            visit(node)?;
            for child in node.symbols().into_iter().rev() {
                if child != current {
                    stack.push(child);
                }
            }
        }
        Ok(())
    }

    /// Concatenates terminal content reachable from `start`, quotes stripped.
    pub fn terminals_from(&self, start: &str) -> String {
        let mut out = String::new();
        if let Some(root) = self.get_node(start) {
            let _ = self.walk::<()>(root, |node| {
                if node.kind() == GrammarType::Terminal {
                    out.push_str(node.content().trim_matches(|c| c == '\'' || c == '"'));
                }
                Ok(())
            });
        }
        out
    }
}
