//! Graphviz DOT rendering.
//!
//! A pure consumer of the graph's vertex and edge listings. Only vertex
//! labels are customisable; edges are drawn unlabelled.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use super::{Graph, Vertex};

/// Renders `graph` as a strict digraph.
///
/// `label` maps a vertex to its display label; when `None` the vertex id is
/// used.
pub fn to_dot<V, E>(graph: &Graph<V, E>, label: Option<&dyn Fn(&Vertex<V>) -> String>) -> String {
    let mut out = String::from("strict digraph {\n");
    for (vid, vertex) in graph.vertices() {
        let text = match label {
            Some(f) => f(vertex),
            None => vertex.id().to_string(),
        };
        let _ = writeln!(
            out,
            "\t\"{}\" [ label=\"{}\", weight=1 ];",
            escape(vertex.id()),
            escape(&text)
        );
        for edge in graph.out_edges(vid) {
            if let Some(target) = graph.vertex(edge.to()) {
                let _ = writeln!(
                    out,
                    "\t\"{}\" -> \"{}\" [ label=\"\", weight=1 ];",
                    escape(vertex.id()),
                    escape(target.id())
                );
            }
        }
    }
    out.push_str("}\n");
    out
}

/// Renders `graph` and writes it to `path`.
pub fn write_dot<V, E>(
    path: impl AsRef<Path>,
    graph: &Graph<V, E>,
    label: Option<&dyn Fn(&Vertex<V>) -> String>,
) -> io::Result<()> {
    fs::write(path, to_dot(graph, label))
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_lists_vertices_and_edges() {
        let mut g: Graph<&str> = Graph::new();
        let a = g.add_vertex("a", "'x'").unwrap();
        let b = g.add_vertex("b", "y").unwrap();
        g.add_edge("a,b", a, b, ()).unwrap();

        let dot = to_dot(&g, None);
        assert!(dot.starts_with("strict digraph {"));
        assert!(dot.contains("\"a\" [ label=\"a\", weight=1 ];"));
        assert!(dot.contains("\"a\" -> \"b\""));
    }

    #[test]
    fn test_dot_custom_label_is_escaped() {
        let mut g: Graph<&str> = Graph::new();
        g.add_vertex("t", "\"ab\"").unwrap();
        let label = |v: &Vertex<&str>| v.props().to_string();
        let dot = to_dot(&g, Some(&label));
        assert!(dot.contains("label=\"\\\"ab\\\"\""));
    }
}
