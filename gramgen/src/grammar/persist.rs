//! On-disk grammar format.
//!
//! A JSON document holding the metadata map, every vertex (id, type,
//! content, distance) and every edge (id, endpoints, sequence number).
//! Loading rebuilds the graph in file order with sequence numbers restored,
//! so symbol order survives the round trip.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{Grammar, GrammarError, Node};
use crate::graph::{Graph, Metadata};

/// Version written into every grammar file.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct GrammarFile {
    version: u32,
    metadata: IndexMap<String, Metadata>,
    vertices: Vec<VertexRecord>,
    edges: Vec<EdgeRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct VertexRecord {
    id: String,
    #[serde(flatten)]
    node: Node,
}

#[derive(Debug, Serialize, Deserialize)]
struct EdgeRecord {
    id: String,
    from: String,
    to: String,
    seq: u32,
}

impl Grammar {
    /// Serializes the grammar to a JSON string.
    pub fn to_json(&self) -> Result<String, GrammarError> {
        let graph = self.graph();
        let vertices = graph
            .vertices()
            .map(|(_, v)| VertexRecord {
                id: v.id().to_string(),
                node: v.props().clone(),
            })
            .collect();
        let edges = graph
            .edges()
            .filter_map(|(_, e)| {
                Some(EdgeRecord {
                    id: e.id().to_string(),
                    from: graph.vertex(e.from())?.id().to_string(),
                    to: graph.vertex(e.to())?.id().to_string(),
                    seq: e.seq(),
                })
            })
            .collect();
        let file = GrammarFile {
            version: FORMAT_VERSION,
            metadata: graph.all_metadata().clone(),
            vertices,
            edges,
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Rebuilds a grammar from [`Grammar::to_json`] output.
    pub fn from_json(text: &str) -> Result<Self, GrammarError> {
        let file: GrammarFile = serde_json::from_str(text)?;
        if file.version != FORMAT_VERSION {
            return Err(GrammarError::UnsupportedVersion(file.version));
        }

        let mut graph = Graph::new();
        for (key, value) in file.metadata {
            graph.set_metadata(key, value);
        }
        let mut grammar = Grammar::from_graph(graph);
        for record in file.vertices {
            grammar.insert_node(record.id, record.node)?;
        }
        for record in file.edges {
            let from = grammar
                .get_node(&record.from)
                .ok_or_else(|| GrammarError::UnknownNode(record.from.clone()))?;
            let to = grammar
                .get_node(&record.to)
                .ok_or_else(|| GrammarError::UnknownNode(record.to.clone()))?;
            grammar.graph.add_edge_with_seq(record.id, from, to, record.seq, ())?;
        }
        Ok(grammar)
    }

    /// Writes the grammar to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), GrammarError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Reads a grammar written by [`Grammar::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GrammarError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
