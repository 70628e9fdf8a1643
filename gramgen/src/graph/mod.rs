//! # Graph
//!
//! A directed multigraph whose vertices and edges carry stable, caller-assigned
//! string identities plus a typed payload.
//!
//! Storage is an arena: vertices and edges live in slot vectors addressed by
//! [`VertexId`] / [`EdgeId`], and string identities are resolved through a
//! hash index. Deleting leaves a tombstone so outstanding indices never alias
//! a different element.
//!
//! Every edge carries an ordering sequence number assigned per source vertex
//! at insertion time. [`Graph::out_edges`] returns edges sorted by that
//! number, which is how callers reconstruct left-to-right child order.
//!
//! The graph also owns a free-form metadata map (e.g. the start symbol of a
//! grammar) kept in insertion order.

pub mod dot;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Value type stored in the graph metadata map.
pub type Metadata = serde_json::Value;

/// Errors raised by structural graph operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("vertex `{0}` already exists")]
    DuplicateVertex(String),

    #[error("edge `{0}` already exists")]
    DuplicateEdge(String),

    #[error("vertex `{0}` does not exist")]
    MissingVertex(String),

    #[error("edge `{id}` has out-of-range sequence number {seq}")]
    SequenceOverflow { id: String, seq: u32 },
}

/// Arena index of a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(u32);

impl VertexId {
    /// Position of this vertex in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Arena index of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u32);

impl EdgeId {
    /// Position of this edge in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A vertex with its identity, payload and adjacency.
#[derive(Debug, Clone)]
pub struct Vertex<V> {
    id: String,
    props: V,
    outgoing: Vec<EdgeId>,
    incoming: Vec<EdgeId>,
    next_seq: u32,
}

impl<V> Vertex<V> {
    /// The stable string identity.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn props(&self) -> &V {
        &self.props
    }

    pub fn props_mut(&mut self) -> &mut V {
        &mut self.props
    }
}

/// A directed edge.
#[derive(Debug, Clone)]
pub struct Edge<E> {
    id: String,
    from: VertexId,
    to: VertexId,
    seq: u32,
    props: E,
}

impl<E> Edge<E> {
    /// The stable string identity.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn from(&self) -> VertexId {
        self.from
    }

    pub fn to(&self) -> VertexId {
        self.to
    }

    /// Insertion sequence relative to the other out-edges of `from`.
    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub fn props(&self) -> &E {
        &self.props
    }
}

/// A directed multigraph with string identities.
#[derive(Debug, Clone)]
pub struct Graph<V, E = ()> {
    vertices: Vec<Option<Vertex<V>>>,
    edges: Vec<Option<Edge<E>>>,
    vertex_index: FxHashMap<String, VertexId>,
    edge_index: FxHashMap<String, EdgeId>,
    metadata: IndexMap<String, Metadata>,
}

impl<V, E> Default for Graph<V, E> {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            edges: Vec::new(),
            vertex_index: FxHashMap::default(),
            edge_index: FxHashMap::default(),
            metadata: IndexMap::new(),
        }
    }
}

impl<V, E> Graph<V, E> {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertex_index.len()
    }

    /// Number of live edges.
    pub fn edge_count(&self) -> usize {
        self.edge_index.len()
    }

    /// Adds a vertex. Fails if a vertex with the same id already exists.
    pub fn add_vertex(&mut self, id: impl Into<String>, props: V) -> Result<VertexId, GraphError> {
        let id = id.into();
        if self.vertex_index.contains_key(&id) {
            return Err(GraphError::DuplicateVertex(id));
        }
        let vid = VertexId(self.vertices.len() as u32);
        self.vertex_index.insert(id.clone(), vid);
        self.vertices.push(Some(Vertex {
            id,
            props,
            outgoing: Vec::new(),
            incoming: Vec::new(),
            next_seq: 0,
        }));
        Ok(vid)
    }

    /// Adds an edge `from -> to`, assigning the next sequence number of `from`.
    pub fn add_edge(
        &mut self,
        id: impl Into<String>,
        from: VertexId,
        to: VertexId,
        props: E,
    ) -> Result<EdgeId, GraphError> {
        let seq = self.vertex(from).map(|v| v.next_seq).unwrap_or(0);
        self.add_edge_with_seq(id, from, to, seq, props)
    }

    /// Adds an edge with an explicit sequence number.
    ///
    /// Used when restoring a persisted graph. The source vertex's sequence
    /// counter is bumped past `seq` so later insertions stay ordered after it.
    pub fn add_edge_with_seq(
        &mut self,
        id: impl Into<String>,
        from: VertexId,
        to: VertexId,
        seq: u32,
        props: E,
    ) -> Result<EdgeId, GraphError> {
        let id = id.into();
        if self.edge_index.contains_key(&id) {
            return Err(GraphError::DuplicateEdge(id));
        }
        if self.vertex(to).is_none() {
            return Err(GraphError::MissingVertex(format!("#{}", to.index())));
        }
        let Some(next_seq) = seq.checked_add(1) else {
            return Err(GraphError::SequenceOverflow { id, seq });
        };
        let eid = EdgeId(self.edges.len() as u32);
        match self.vertex_slot_mut(from) {
            Some(source) => {
                source.outgoing.push(eid);
                source.next_seq = source.next_seq.max(next_seq);
            }
            None => return Err(GraphError::MissingVertex(format!("#{}", from.index()))),
        }
        if let Some(target) = self.vertex_slot_mut(to) {
            target.incoming.push(eid);
        }
        self.edge_index.insert(id.clone(), eid);
        self.edges.push(Some(Edge {
            id,
            from,
            to,
            seq,
            props,
        }));
        Ok(eid)
    }

    /// Removes a vertex together with every edge touching it.
    pub fn delete_vertex(&mut self, vid: VertexId) -> Option<V> {
        let vertex = self.vertices.get_mut(vid.index())?.take()?;
        self.vertex_index.remove(&vertex.id);
        for eid in vertex.outgoing.iter().chain(vertex.incoming.iter()) {
            self.delete_edge(*eid);
        }
        Some(vertex.props)
    }

    /// Removes an edge.
    pub fn delete_edge(&mut self, eid: EdgeId) -> Option<E> {
        let edge = self.edges.get_mut(eid.index())?.take()?;
        self.edge_index.remove(&edge.id);
        if let Some(source) = self.vertex_slot_mut(edge.from) {
            source.outgoing.retain(|e| *e != eid);
        }
        if let Some(target) = self.vertex_slot_mut(edge.to) {
            target.incoming.retain(|e| *e != eid);
        }
        Some(edge.props)
    }

    /// Looks up a vertex by index.
    pub fn vertex(&self, vid: VertexId) -> Option<&Vertex<V>> {
        self.vertices.get(vid.index()).and_then(Option::as_ref)
    }

    pub fn vertex_mut(&mut self, vid: VertexId) -> Option<&mut Vertex<V>> {
        self.vertex_slot_mut(vid)
    }

    fn vertex_slot_mut(&mut self, vid: VertexId) -> Option<&mut Vertex<V>> {
        self.vertices.get_mut(vid.index()).and_then(Option::as_mut)
    }

    /// Looks up an edge by index.
    pub fn edge(&self, eid: EdgeId) -> Option<&Edge<E>> {
        self.edges.get(eid.index()).and_then(Option::as_ref)
    }

    /// Resolves a vertex's string identity. Returns `None` when absent.
    pub fn vertex_by_id(&self, id: &str) -> Option<VertexId> {
        self.vertex_index.get(id).copied()
    }

    /// Resolves an edge's string identity. Returns `None` when absent.
    pub fn edge_by_id(&self, id: &str) -> Option<EdgeId> {
        self.edge_index.get(id).copied()
    }

    /// Out-edges of a vertex ordered by sequence number.
    pub fn out_edges(&self, vid: VertexId) -> Vec<&Edge<E>> {
        let Some(vertex) = self.vertex(vid) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = vertex.outgoing.iter().filter_map(|e| self.edge(*e)).collect();
        edges.sort_by_key(|e| e.seq);
        edges
    }

    /// In-edges of a vertex in insertion order.
    pub fn in_edges(&self, vid: VertexId) -> Vec<&Edge<E>> {
        self.vertex(vid)
            .map(|v| v.incoming.iter().filter_map(|e| self.edge(*e)).collect())
            .unwrap_or_default()
    }

    /// All live vertices in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex<V>)> {
        self.vertices
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|v| (VertexId(i as u32), v)))
    }

    /// All live edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge<E>)> {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (EdgeId(i as u32), e)))
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<Metadata>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn metadata(&self, key: &str) -> Option<&Metadata> {
        self.metadata.get(key)
    }

    pub fn all_metadata(&self) -> &IndexMap<String, Metadata> {
        &self.metadata
    }

    /// Structural copy into a graph with a different vertex payload.
    ///
    /// Copies the metadata, then every vertex through `factory` (keeping its
    /// id), then every edge re-linked through the id map with its id, sequence
    /// number and payload preserved. Tombstones are compacted away.
    pub fn clone_with<V2, F>(&self, mut factory: F) -> Graph<V2, E>
    where
        E: Clone,
        F: FnMut(&str, &V) -> V2,
    {
        let mut cloned = Graph::new();
        cloned.metadata = self.metadata.clone();

        let mut remap: FxHashMap<VertexId, VertexId> = FxHashMap::default();
        for (vid, vertex) in self.vertices() {
            let props = factory(&vertex.id, &vertex.props);
            if let Ok(new_id) = cloned.add_vertex(vertex.id.clone(), props) {
                remap.insert(vid, new_id);
            }
        }
        for (_, edge) in self.edges() {
            if let (Some(from), Some(to)) = (remap.get(&edge.from), remap.get(&edge.to)) {
                let added = cloned.add_edge_with_seq(
                    edge.id.clone(),
                    *from,
                    *to,
                    edge.seq,
                    edge.props.clone(),
                );
                debug_assert!(added.is_ok(), "clone dropped edge `{}`: {:?}", edge.id, added);
            }
        }
        cloned
    }
}
