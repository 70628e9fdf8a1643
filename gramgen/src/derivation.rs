//! # Derivation
//!
//! The concrete expansion produced by one generation run, kept apart from
//! the static grammar it was derived from.
//!
//! A static node can be visited many times in one run when the grammar is
//! recursive. Every visit mints a fresh occurrence, addressed by the pair
//! (static node, visit index) and displayed as `<id>#<visit>`. Occurrences
//! only ever get edges to occurrences minted after them, so the derivation
//! is a tree even when the grammar is cyclic.
//!
//! The derivation is stored as a [`Grammar`] whose start symbol is the first
//! occurrence of the run's start symbol, so it can be saved, loaded and
//! visualized with the same tools as any grammar.

use std::path::Path;

use rand::Rng;
use rustc_hash::FxHashMap;

use crate::error::{GenError, GenResult};
use crate::grammar::{Grammar, GrammarError, GrammarType, NodeId};

/// How a terminal's content is quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Quoting {
    /// `'text'`, emitted verbatim.
    Single,
    /// `"regex"`, expanded into a matching string.
    Double,
    /// No quotes, emitted as-is.
    Bare,
}

/// Splits terminal content into its quoting and body.
///
/// Returns `None` when a quote character is unbalanced.
pub(crate) fn unquote(content: &str) -> Option<(Quoting, &str)> {
    let first = content.chars().next();
    let last = content.chars().last();
    match (first, last) {
        (None, _) => Some((Quoting::Bare, "")),
        (Some(q @ ('\'' | '"')), Some(l)) if content.len() >= 2 && l == q => {
            let quoting = if q == '\'' { Quoting::Single } else { Quoting::Double };
            Some((quoting, &content[1..content.len() - 1]))
        }
        (Some('\'' | '"'), _) | (_, Some('\'' | '"')) => None,
        _ => Some((Quoting::Bare, content)),
    }
}

/// Produces the output text of one terminal occurrence.
fn render_terminal<R: Rng + ?Sized>(
    node: &str,
    content: &str,
    rng: &mut R,
    max_repeat: u32,
) -> GenResult<String> {
    let (quoting, body) = unquote(content).ok_or_else(|| GenError::MalformedTerminal {
        node: node.to_string(),
        content: content.to_string(),
    })?;
    match quoting {
        Quoting::Single | Quoting::Bare => Ok(body.to_string()),
        Quoting::Double => {
            let generator = rand_regex::Regex::compile(body, max_repeat).map_err(|source| {
                GenError::RegexSynthesis {
                    pattern: body.to_string(),
                    source,
                }
            })?;
            Ok(rng.sample::<String, _>(&generator))
        }
    }
}

/// The expansion tree of one run.
#[derive(Debug, Clone)]
pub struct Derivation {
    grammar: Grammar,
    occurrences: FxHashMap<(NodeId, u32), NodeId>,
    visits: FxHashMap<NodeId, u32>,
    edge_history: Vec<String>,
}

impl Derivation {
    /// Creates an empty derivation rooted at the first occurrence of `start`.
    pub fn new(start: &str) -> Self {
        Self {
            grammar: Grammar::new(format!("{}#0", start)),
            occurrences: FxHashMap::default(),
            visits: FxHashMap::default(),
            edge_history: Vec::new(),
        }
    }

    /// The occurrence graph.
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Mints the next occurrence of `node`, copying its properties.
    pub fn add_node(&mut self, source: &Grammar, node: NodeId) -> GenResult<NodeId> {
        let view = source
            .node(node)
            .ok_or_else(|| GrammarError::UnknownNode(format!("#{}", node.index())))?;
        let counter = self.visits.entry(node).or_insert(0);
        let visit = *counter;
        *counter += 1;

        let occurrence = self
            .grammar
            .insert_node(format!("{}#{}", view.name(), visit), view.props().clone())?;
        self.occurrences.insert((node, visit), occurrence);
        Ok(occurrence)
    }

    /// Records that occurrence `from` expanded into occurrence `to`.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> GenResult<()> {
        let eid = self.grammar.add_symbol(from, to)?;
        if let Some(edge) = self.grammar.graph().edge(eid) {
            self.edge_history.push(edge.id().to_string());
        }
        Ok(())
    }

    /// The occurrence minted for the `visit`-th visit of `node`.
    pub fn occurrence(&self, node: NodeId, visit: u32) -> Option<NodeId> {
        self.occurrences.get(&(node, visit)).copied()
    }

    /// How many occurrences of `node` exist.
    pub fn visits(&self, node: NodeId) -> u32 {
        self.visits.get(&node).copied().unwrap_or(0)
    }

    /// Number of occurrences minted so far.
    pub fn len(&self) -> usize {
        self.grammar.graph().vertex_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Derivation edge ids in the order they were recorded.
    pub fn edge_history(&self) -> &[String] {
        &self.edge_history
    }

    /// The root occurrence, if the run has started.
    pub fn root(&self) -> Option<NodeId> {
        self.grammar.get_node(self.grammar.start_symbol()?)
    }

    /// Renders the derivation to text.
    ///
    /// Terminal occurrences are concatenated in depth-first order from the
    /// root. Single-quoted content is emitted without its quotes;
    /// double-quoted content is a regex template expanded into a random
    /// matching string, with unbounded repetition capped at `max_repeat`.
    /// `transform` post-processes each terminal's text.
    pub fn get_result<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        max_repeat: u32,
        transform: Option<&dyn Fn(&str) -> String>,
    ) -> GenResult<String> {
        let Some(root) = self.root() else {
            return Ok(String::new());
        };
        let mut out = String::new();
        self.grammar.walk(root, |occurrence| {
            if occurrence.kind() == GrammarType::Terminal {
                let text =
                    render_terminal(occurrence.name(), occurrence.content(), rng, max_repeat)?;
                match transform {
                    Some(f) => out.push_str(&f(&text)),
                    None => out.push_str(&text),
                }
            }
            Ok::<(), GenError>(())
        })?;
        Ok(out)
    }

    /// Writes the occurrence graph with the grammar codec.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), GrammarError> {
        self.grammar.save(path)
    }

    /// Reads a derivation written by [`Derivation::save`].
    ///
    /// Only the occurrence graph is stored, so [`Derivation::occurrence`]
    /// and [`Derivation::visits`] know nothing about the loaded nodes.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GrammarError> {
        let grammar = Grammar::load(path)?;
        let edge_history = grammar.graph().edges().map(|(_, e)| e.id().to_string()).collect();
        Ok(Self {
            grammar,
            occurrences: FxHashMap::default(),
            visits: FxHashMap::default(),
            edge_history,
        })
    }
}
