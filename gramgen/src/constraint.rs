//! # Constraints
//!
//! Context-sensitive rules layered over a context-free grammar.
//!
//! A [`BinaryConstraint`] pairs two [`TracePattern`]s with an [`Operation`]
//! each. On every dispatch the [`MonitorHandler`](crate::handlers::MonitorHandler)
//! matches both patterns against the context's production trace and runs
//! the operation of each side that matches, before any structural handler
//! sees the symbol.
//!
//! ## Trace patterns
//!
//! A pattern is a `/`-separated list of node ids, `*` matching any id. The
//! last segment must match the newest trace entry; the earlier segments
//! must occur in order somewhere before it.
//!
//! ```text
//! paren_expr            the symbol being dispatched is paren_expr
//! decl/*/use            a use dispatched after a decl
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::config::Mode;
use crate::context::Context;
use crate::grammar::{Grammar, NodeId};

/// Context-mutating callback.
pub type ConstraintFn = dyn Fn(&mut Context) + Send + Sync;

/// What a constraint side does when its pattern matches.
#[derive(Clone, Default)]
pub enum Operation {
    /// Run a callback on the context.
    Func(Arc<ConstraintFn>),
    /// Regex rewrite of the output. Recognized but not applied.
    Regex(String),
    #[default]
    Noop,
}

impl Operation {
    pub fn func(f: impl Fn(&mut Context) + Send + Sync + 'static) -> Self {
        Operation::Func(Arc::new(f))
    }

    fn apply(&self, ctx: &mut Context) {
        match self {
            Operation::Func(f) => f(ctx),
            Operation::Regex(pattern) => {
                trace!(pattern = %pattern, "regex operations are not applied")
            }
            Operation::Noop => {}
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Func(_) => f.write_str("Func(..)"),
            Operation::Regex(pattern) => f.debug_tuple("Regex").field(pattern).finish(),
            Operation::Noop => f.write_str("Noop"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Any,
    Id(String),
}

impl Segment {
    fn matches(&self, grammar: &Grammar, node: NodeId) -> bool {
        match self {
            Segment::Any => true,
            Segment::Id(id) => grammar.node(node).is_some_and(|n| n.name() == id),
        }
    }
}

/// A pattern over the production trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracePattern {
    source: String,
    segments: Vec<Segment>,
}

impl TracePattern {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let segments = source
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s {
                "*" => Segment::Any,
                id => Segment::Id(id.to_string()),
            })
            .collect();
        Self { source, segments }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern matches `trace`, newest entry last.
    pub fn matches(&self, grammar: &Grammar, trace: &[NodeId]) -> bool {
        let Some((last, earlier)) = self.segments.split_last() else {
            return false;
        };
        let Some((&newest, mut rest)) = trace.split_last() else {
            return false;
        };
        if !last.matches(grammar, newest) {
            return false;
        }
        for segment in earlier.iter().rev() {
            match rest.iter().rposition(|&n| segment.matches(grammar, n)) {
                Some(pos) => rest = &rest[..pos],
                None => return false,
            }
        }
        true
    }
}

impl From<&str> for TracePattern {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

/// Two trace patterns, each with the operation run when it matches.
#[derive(Debug, Clone)]
pub struct BinaryConstraint {
    pub first: TracePattern,
    pub second: TracePattern,
    pub first_op: Operation,
    pub second_op: Operation,
}

impl BinaryConstraint {
    pub fn new(
        first: impl Into<TracePattern>,
        second: impl Into<TracePattern>,
        first_op: Operation,
        second_op: Operation,
    ) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
            first_op,
            second_op,
        }
    }

    /// Bounds how often `first` is expanded.
    ///
    /// Every match of `first` bumps a per-run counter; once a match of
    /// `second` sees the counter above `limit`, the context switches to
    /// shrink mode so the remaining derivation heads for terminals.
    pub fn max_limit(first: &str, second: &str, limit: u64) -> Self {
        let key = format!("max_limit:{}", first);
        let count_key = key.clone();
        Self::new(
            first,
            second,
            Operation::func(move |ctx| {
                ctx.bump_counter(&count_key);
            }),
            Operation::func(move |ctx| {
                if ctx.counter(&key) > limit {
                    ctx.set_mode(Mode::Shrink);
                }
            }),
        )
    }

    pub(crate) fn apply(&self, ctx: &mut Context) {
        let grammar = Arc::clone(ctx.grammar());
        if self.first.matches(&grammar, ctx.trace()) {
            self.first_op.apply(ctx);
        }
        if self.second.matches(&grammar, ctx.trace()) {
            self.second_op.apply(ctx);
        }
    }
}

/// The constraints of a generation run.
#[derive(Debug, Clone, Default)]
pub struct ConstraintGraph {
    constraints: Vec<BinaryConstraint>,
}

impl ConstraintGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_binary_constraint(&mut self, constraint: BinaryConstraint) -> &mut Self {
        self.constraints.push(constraint);
        self
    }

    pub fn constraints(&self) -> &[BinaryConstraint] {
        &self.constraints
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Runs every constraint against the context, in insertion order.
    pub(crate) fn apply(&self, ctx: &mut Context) {
        for constraint in &self.constraints {
            constraint.apply(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarType;

    /// Trace `a, b, c, b`.
    fn names() -> (Grammar, Vec<NodeId>) {
        let mut g = Grammar::new("a");
        let a = g.add_node("a", GrammarType::Terminal, "'a'").unwrap();
        let b = g.add_node("b", GrammarType::Terminal, "'b'").unwrap();
        let c = g.add_node("c", GrammarType::Terminal, "'c'").unwrap();
        (g, vec![a, b, c, b])
    }

    #[test]
    fn test_single_segment_matches_newest_only() {
        let (g, trace) = names();
        assert!(TracePattern::new("b").matches(&g, &trace));
        assert!(!TracePattern::new("c").matches(&g, &trace));
        assert!(TracePattern::new("*").matches(&g, &trace));
        assert!(!TracePattern::new("b").matches(&g, &[]));
    }

    #[test]
    fn test_ordered_subsequence() {
        let (g, trace) = names();
        assert!(TracePattern::new("a/b").matches(&g, &trace));
        assert!(TracePattern::new("a/c/b").matches(&g, &trace));
        assert!(TracePattern::new("b/c/b").matches(&g, &trace));
        assert!(TracePattern::new("a/*/b").matches(&g, &trace));
        assert!(!TracePattern::new("c/a/b").matches(&g, &trace));
        assert!(!TracePattern::new("z/b").matches(&g, &trace));
    }

    #[test]
    fn test_empty_pattern_never_matches() {
        let (g, trace) = names();
        assert!(!TracePattern::new("").matches(&g, &trace));
        assert_eq!(TracePattern::new("a/b").as_str(), "a/b");
    }

    #[test]
    fn test_graph_keeps_insertion_order() {
        let mut graph = ConstraintGraph::new();
        graph
            .add_binary_constraint(BinaryConstraint::max_limit("x", "x", 2))
            .add_binary_constraint(BinaryConstraint::new(
                "y",
                "z",
                Operation::Noop,
                Operation::Regex("r".into()),
            ));
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.constraints()[1].second.as_str(), "z");
        assert!(matches!(graph.constraints()[1].second_op, Operation::Regex(_)));
    }
}
