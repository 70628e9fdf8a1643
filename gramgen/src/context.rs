//! # Generation Context
//!
//! Per-run mutable state. A context is created for one generation request,
//! mutated only by the handlers of the chain driving it, and either
//! discarded or snapshotted into a [`GenerationResult`] once the symbol
//! stack runs dry.
//!
//! The grammar is shared read-only through an [`Arc`]; everything else
//! (stack, trace, derivation, random generator) belongs to this run.

use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;

use crate::config::{GeneratorConfig, Mode};
use crate::constraint::ConstraintGraph;
use crate::derivation::Derivation;
use crate::error::{GenError, GenResult};
use crate::grammar::{Grammar, NodeId, NodeRef};

/// An entry of the symbol stack: a static grammar node and the derivation
/// occurrence minted for this visit of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol {
    pub node: NodeId,
    pub occurrence: NodeId,
}

/// Optional inputs of [`Context::new`].
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    /// Checked between rounds; once passed the run stops.
    pub deadline: Option<Instant>,
    /// Semantic constraints evaluated by the monitor handler.
    pub constraints: Option<Arc<ConstraintGraph>>,
    pub config: GeneratorConfig,
}

/// State of one generation run.
#[derive(Debug)]
pub struct Context {
    grammar: Arc<Grammar>,
    stack: Vec<Symbol>,
    buffer: Vec<Symbol>,
    cursor: usize,
    finished: bool,
    visited_edges: FxHashMap<(NodeId, NodeId), u32>,
    mode: Mode,
    constraints: Option<Arc<ConstraintGraph>>,
    trace: Vec<NodeId>,
    derivation: Derivation,
    rendered: Vec<String>,
    counters: FxHashMap<String, u64>,
    rng: StdRng,
    deadline: Option<Instant>,
    config: GeneratorConfig,
    rounds: u64,
}

impl Context {
    /// Starts a run of `grammar` from the node named `start`.
    pub fn new(grammar: Arc<Grammar>, start: &str, options: ContextOptions) -> GenResult<Self> {
        let root = grammar
            .get_node(start)
            .ok_or_else(|| GenError::UnknownStartSymbol(start.to_string()))?;

        let mut derivation = Derivation::new(start);
        let occurrence = derivation.add_node(&grammar, root)?;

        let rng = match options.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            grammar,
            stack: vec![Symbol {
                node: root,
                occurrence,
            }],
            buffer: Vec::new(),
            cursor: 0,
            finished: false,
            visited_edges: FxHashMap::default(),
            mode: options.config.mode,
            constraints: options.constraints,
            trace: Vec::new(),
            derivation,
            rendered: Vec::new(),
            counters: FxHashMap::default(),
            rng,
            deadline: options.deadline,
            config: options.config,
            rounds: 0,
        })
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// The run's random generator.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Whether the symbol stack has run dry.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn finish(&mut self) {
        self.finished = true;
    }

    /// Completed dispatch rounds.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Whether the caller's deadline has passed.
    pub fn deadline_exceeded(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    // ---- symbol stack ----

    /// The symbol being dispatched.
    pub fn current(&self) -> Option<Symbol> {
        self.stack.last().copied()
    }

    /// Grammar view of the symbol being dispatched.
    pub fn current_node(&self) -> Option<NodeRef<'_>> {
        self.grammar.node(self.current()?.node)
    }

    /// Removes the symbol being dispatched.
    pub fn pop(&mut self) -> Option<Symbol> {
        self.stack.pop()
    }

    /// Pending symbols, top last.
    pub fn stack(&self) -> &[Symbol] {
        &self.stack
    }

    /// Expands `parent` into `children`, left to right.
    ///
    /// Each child gets a fresh derivation occurrence linked under the
    /// parent's occurrence and bumps the static edge's visit counter. The
    /// children are buffered so that, once flushed at the end of the round,
    /// the first child is on top of the stack.
    pub fn expand(&mut self, parent: Symbol, children: &[NodeId]) -> GenResult<()> {
        let start = self.buffer.len();
        for &child in children {
            let symbol = self.record(parent, child)?;
            self.buffer.push(symbol);
        }
        self.buffer[start..].reverse();
        Ok(())
    }

    fn record(&mut self, parent: Symbol, child: NodeId) -> GenResult<Symbol> {
        let occurrence = self.derivation.add_node(&self.grammar, child)?;
        self.derivation.add_edge(parent.occurrence, occurrence)?;
        *self.visited_edges.entry((parent.node, child)).or_insert(0) += 1;
        Ok(Symbol {
            node: child,
            occurrence,
        })
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
    }

    /// Moves buffered children onto the stack and rewinds the cursor.
    pub(crate) fn end_round(&mut self) {
        // The buffer is stored in push order: last child first.
        self.stack.append(&mut self.buffer);
        self.cursor = 0;
        self.rounds += 1;
    }

    // ---- trace & counters ----

    pub(crate) fn record_trace(&mut self, node: NodeId) {
        self.trace.push(node);
    }

    /// Static nodes in the order they were first dispatched.
    pub fn trace(&self) -> &[NodeId] {
        &self.trace
    }

    pub fn constraints(&self) -> Option<Arc<ConstraintGraph>> {
        self.constraints.clone()
    }

    /// A per-run counter, zero when never bumped.
    pub fn counter(&self, key: &str) -> u64 {
        self.counters.get(key).copied().unwrap_or(0)
    }

    /// Increments a per-run counter and returns the new value.
    pub fn bump_counter(&mut self, key: &str) -> u64 {
        let slot = self.counters.entry(key.to_string()).or_insert(0);
        *slot += 1;
        *slot
    }

    // ---- output ----

    pub(crate) fn push_rendered(&mut self, text: impl Into<String>) {
        self.rendered.push(text.into());
    }

    /// Terminal text in dispatch order, quotes stripped but templates unexpanded.
    pub fn rendered(&self) -> String {
        self.rendered.concat()
    }

    pub fn derivation(&self) -> &Derivation {
        &self.derivation
    }

    /// Visit count of the static edge `parent -> child`.
    pub fn edge_visits(&self, parent: NodeId, child: NodeId) -> u32 {
        self.visited_edges.get(&(parent, child)).copied().unwrap_or(0)
    }

    pub fn visited_edges(&self) -> &FxHashMap<(NodeId, NodeId), u32> {
        &self.visited_edges
    }

    /// Distinct visited edges over total grammar edges.
    pub fn edge_coverage(&self) -> f64 {
        coverage(self.visited_edges.len(), self.grammar.graph().edge_count())
    }

    /// Renders the derivation with this run's random generator.
    pub fn render(&mut self, transform: Option<&dyn Fn(&str) -> String>) -> GenResult<String> {
        self.derivation
            .get_result(&mut self.rng, self.config.regex_max_repeat, transform)
    }

    /// Immutable snapshot of the run.
    pub fn snapshot(&self) -> GenerationResult {
        GenerationResult {
            derivation: self.derivation.clone(),
            visited_edges: self.visited_edges.clone(),
            trace: self.trace.clone(),
            rendered: self.rendered.concat(),
            grammar_edges: self.grammar.graph().edge_count(),
            rounds: self.rounds,
            regex_max_repeat: self.config.regex_max_repeat,
        }
    }
}

fn coverage(visited: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        visited as f64 / total as f64
    }
}

/// Snapshot of a finished run.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    derivation: Derivation,
    visited_edges: FxHashMap<(NodeId, NodeId), u32>,
    trace: Vec<NodeId>,
    rendered: String,
    grammar_edges: usize,
    rounds: u64,
    regex_max_repeat: u32,
}

impl GenerationResult {
    pub fn derivation(&self) -> &Derivation {
        &self.derivation
    }

    pub fn visited_edges(&self) -> &FxHashMap<(NodeId, NodeId), u32> {
        &self.visited_edges
    }

    pub fn trace(&self) -> &[NodeId] {
        &self.trace
    }

    /// Terminal text accumulated during dispatch.
    pub fn rendered(&self) -> &str {
        &self.rendered
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn edge_coverage(&self) -> f64 {
        coverage(self.visited_edges.len(), self.grammar_edges)
    }

    /// Renders the derivation to text.
    pub fn render<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        transform: Option<&dyn Fn(&str) -> String>,
    ) -> GenResult<String> {
        self.derivation.get_result(rng, self.regex_max_repeat, transform)
    }
}
