//! Handlers for the structural grammar constructs.

use std::sync::Arc;

use rand::Rng;
use tracing::{error, trace, warn};

use super::{
    Flow, Handler, CAT_HANDLER, ID_HANDLER, OPTIONAL_HANDLER, OR_HANDLER, PLUS_HANDLER, REP_HANDLER,
    SUB_HANDLER, TERMINAL_HANDLER, TRACE_HANDLER,
};
use crate::context::{Context, Symbol};
use crate::derivation::unquote;
use crate::error::{GenError, GenResult};
use crate::grammar::{Grammar, TypeSet};

/// Pops the current symbol and returns it with a handle on the grammar.
fn take(ctx: &mut Context) -> Option<(Symbol, Arc<Grammar>)> {
    let symbol = ctx.pop()?;
    Some((symbol, Arc::clone(ctx.grammar())))
}

/// Expands productions and sequences into all of their children.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatHandler;

impl Handler for CatHandler {
    fn name(&self) -> &str {
        CAT_HANDLER
    }

    fn accepts(&self) -> TypeSet {
        TypeSet::PRODUCTION | TypeSet::CATENATE
    }

    fn handle(&self, ctx: &mut Context) -> GenResult<Flow> {
        let Some((symbol, grammar)) = take(ctx) else {
            return Ok(Flow::Abort);
        };
        ctx.expand(symbol, &grammar.symbols(symbol.node))?;
        Ok(Flow::Expanded)
    }
}

/// Expands an alternation into one child picked uniformly.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrHandler;

impl Handler for OrHandler {
    fn name(&self) -> &str {
        OR_HANDLER
    }

    fn accepts(&self) -> TypeSet {
        TypeSet::OR | TypeSet::CHOICE
    }

    fn handle(&self, ctx: &mut Context) -> GenResult<Flow> {
        let Some(symbol) = ctx.current() else {
            return Ok(Flow::Abort);
        };
        let children = ctx.grammar().symbols(symbol.node);
        if children.is_empty() {
            return Ok(Flow::Pass);
        }
        let pick = children[ctx.rng().gen_range(0..children.len())];
        ctx.pop();
        ctx.expand(symbol, &[pick])?;
        Ok(Flow::Expanded)
    }
}

/// Follows a production reference.
///
/// `merge_production` links an `Id` node to the production it names; that
/// link is followed when present, otherwise the name is resolved by lookup.
/// An unresolvable reference drops the branch.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdHandler;

impl Handler for IdHandler {
    fn name(&self) -> &str {
        ID_HANDLER
    }

    fn accepts(&self) -> TypeSet {
        TypeSet::ID
    }

    fn handle(&self, ctx: &mut Context) -> GenResult<Flow> {
        let Some((symbol, grammar)) = take(ctx) else {
            return Ok(Flow::Abort);
        };
        let Some(node) = grammar.node(symbol.node) else {
            return Ok(Flow::Abort);
        };
        let target = node
            .symbol(0)
            .or_else(|| grammar.get_node(node.content()));
        match target {
            Some(target) => {
                ctx.expand(symbol, &[target])?;
                Ok(Flow::Expanded)
            }
            None => {
                warn!(
                    node = node.name(),
                    reference = node.content(),
                    "unresolved production reference"
                );
                Ok(Flow::Abort)
            }
        }
    }
}

/// Appends terminal text to the context's output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermHandler;

impl Handler for TermHandler {
    fn name(&self) -> &str {
        TERMINAL_HANDLER
    }

    fn accepts(&self) -> TypeSet {
        TypeSet::TERMINAL
    }

    fn handle(&self, ctx: &mut Context) -> GenResult<Flow> {
        let Some((symbol, grammar)) = take(ctx) else {
            return Ok(Flow::Abort);
        };
        let Some(node) = grammar.node(symbol.node) else {
            return Ok(Flow::Abort);
        };
        if !node.symbols().is_empty() {
            error!(node = node.name(), "terminal node has children");
            return Ok(Flow::Abort);
        }
        let (_, text) = unquote(node.content()).ok_or_else(|| GenError::MalformedTerminal {
            node: node.name().to_string(),
            content: node.content().to_string(),
        })?;
        ctx.push_rendered(text);
        Ok(Flow::Expanded)
    }
}

/// Decides whether an optional part is expanded.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionalPolicy {
    /// Expand with the configured `optional_probability`.
    Random,
    /// Expand only when the node's content equals the tag.
    ContentTag(String),
}

/// Expands or skips a bracketed optional part.
#[derive(Debug, Clone)]
pub struct OptionalHandler {
    policy: OptionalPolicy,
}

impl OptionalHandler {
    pub fn new(policy: OptionalPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &OptionalPolicy {
        &self.policy
    }
}

impl Default for OptionalHandler {
    fn default() -> Self {
        Self::new(OptionalPolicy::Random)
    }
}

impl Handler for OptionalHandler {
    fn name(&self) -> &str {
        OPTIONAL_HANDLER
    }

    fn accepts(&self) -> TypeSet {
        TypeSet::OPTIONAL
    }

    fn handle(&self, ctx: &mut Context) -> GenResult<Flow> {
        let Some((symbol, grammar)) = take(ctx) else {
            return Ok(Flow::Abort);
        };
        let Some(node) = grammar.node(symbol.node) else {
            return Ok(Flow::Abort);
        };
        let children = node.symbols();
        if children.is_empty() {
            warn!(node = node.name(), "optional node has no children");
            return Ok(Flow::Abort);
        }
        let expand = match &self.policy {
            OptionalPolicy::Random => {
                let p = ctx.config().optional_chance();
                ctx.rng().gen_bool(p)
            }
            OptionalPolicy::ContentTag(tag) => node.content() == tag,
        };
        if expand {
            ctx.expand(symbol, &children)?;
        }
        Ok(Flow::Expanded)
    }
}

/// Expands the children one or more times.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlusHandler;

impl Handler for PlusHandler {
    fn name(&self) -> &str {
        PLUS_HANDLER
    }

    fn accepts(&self) -> TypeSet {
        TypeSet::PLUS
    }

    fn handle(&self, ctx: &mut Context) -> GenResult<Flow> {
        let Some((symbol, grammar)) = take(ctx) else {
            return Ok(Flow::Abort);
        };
        let children = grammar.symbols(symbol.node);
        if children.is_empty() {
            warn!(node = symbol.node.index(), "plus node has no children");
            return Ok(Flow::Abort);
        }
        let max = ctx.config().plus_max.max(1);
        let times = ctx.rng().gen_range(1..=max);
        let repeated: Vec<_> = (0..times).flat_map(|_| children.iter().copied()).collect();
        ctx.expand(symbol, &repeated)?;
        Ok(Flow::Expanded)
    }
}

/// Expands the children once more with a low probability, else skips them.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepHandler;

impl Handler for RepHandler {
    fn name(&self) -> &str {
        REP_HANDLER
    }

    fn accepts(&self) -> TypeSet {
        TypeSet::REP
    }

    fn handle(&self, ctx: &mut Context) -> GenResult<Flow> {
        let Some((symbol, grammar)) = take(ctx) else {
            return Ok(Flow::Abort);
        };
        let p = ctx.config().rep_chance();
        if ctx.rng().gen_bool(p) {
            ctx.expand(symbol, &grammar.symbols(symbol.node))?;
        }
        Ok(Flow::Expanded)
    }
}

/// Extension point for groups and exceptions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubHandler;

impl Handler for SubHandler {
    fn name(&self) -> &str {
        SUB_HANDLER
    }

    fn accepts(&self) -> TypeSet {
        TypeSet::SUB | TypeSet::EXT
    }

    fn handle(&self, _ctx: &mut Context) -> GenResult<Flow> {
        Ok(Flow::Pass)
    }
}

/// Logs every dispatch at trace level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceHandler;

impl Handler for TraceHandler {
    fn name(&self) -> &str {
        TRACE_HANDLER
    }

    fn accepts(&self) -> TypeSet {
        TypeSet::ALL_TYPES
    }

    fn handle(&self, ctx: &mut Context) -> GenResult<Flow> {
        if let Some(node) = ctx.current_node() {
            trace!(
                node = node.name(),
                kind = %node.kind(),
                depth = ctx.stack().len(),
                "dispatch"
            );
        }
        Ok(Flow::Pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::context::ContextOptions;
    use crate::grammar::GrammarType;

    fn context(grammar: Grammar, start: &str) -> Context {
        let options = ContextOptions {
            config: GeneratorConfig::new().with_seed(11),
            ..Default::default()
        };
        Context::new(Arc::new(grammar), start, options).unwrap()
    }

    fn pending(ctx: &mut Context) -> Vec<String> {
        ctx.end_round();
        ctx.stack()
            .iter()
            .rev()
            .map(|s| ctx.grammar().node(s.node).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_cat_expands_in_order() {
        let mut g = Grammar::new("S");
        let s = g.add_node("S", GrammarType::Catenate, "").unwrap();
        for name in ["x", "y", "z"] {
            let c = g.add_node(name, GrammarType::Terminal, "'c'").unwrap();
            g.add_symbol(s, c).unwrap();
        }
        let mut ctx = context(g, "S");
        assert_eq!(CatHandler.handle(&mut ctx).unwrap(), Flow::Expanded);
        assert_eq!(pending(&mut ctx), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_or_picks_exactly_one() {
        let mut g = Grammar::new("S");
        let s = g.add_node("S", GrammarType::Or, "").unwrap();
        for name in ["x", "y"] {
            let c = g.add_node(name, GrammarType::Terminal, "'c'").unwrap();
            g.add_symbol(s, c).unwrap();
        }
        let mut ctx = context(g, "S");
        assert_eq!(OrHandler.handle(&mut ctx).unwrap(), Flow::Expanded);
        let picked = pending(&mut ctx);
        assert_eq!(picked.len(), 1);
        assert!(picked[0] == "x" || picked[0] == "y");
    }

    #[test]
    fn test_empty_or_passes() {
        let mut g = Grammar::new("S");
        g.add_node("S", GrammarType::Or, "").unwrap();
        let mut ctx = context(g, "S");
        assert_eq!(OrHandler.handle(&mut ctx).unwrap(), Flow::Pass);
        assert_eq!(ctx.stack().len(), 1);
    }

    #[test]
    fn test_id_follows_reference_by_name() {
        let mut g = Grammar::new("S");
        g.add_node("S", GrammarType::Id, "T").unwrap();
        g.add_node("T", GrammarType::Terminal, "'t'").unwrap();
        let mut ctx = context(g, "S");
        assert_eq!(IdHandler.handle(&mut ctx).unwrap(), Flow::Expanded);
        assert_eq!(pending(&mut ctx), vec!["T"]);
    }

    #[test]
    fn test_missing_reference_aborts_branch() {
        let mut g = Grammar::new("S");
        g.add_node("S", GrammarType::Id, "Nowhere").unwrap();
        let mut ctx = context(g, "S");
        assert_eq!(IdHandler.handle(&mut ctx).unwrap(), Flow::Abort);
        assert!(pending(&mut ctx).is_empty());
    }

    #[test]
    fn test_terminal_text_is_unquoted() {
        let mut g = Grammar::new("S");
        g.add_node("S", GrammarType::Terminal, "'hello'").unwrap();
        let mut ctx = context(g, "S");
        assert_eq!(TermHandler.handle(&mut ctx).unwrap(), Flow::Expanded);
        assert_eq!(ctx.rendered(), "hello");
    }

    #[test]
    fn test_terminal_with_children_aborts() {
        let mut g = Grammar::new("S");
        let s = g.add_node("S", GrammarType::Terminal, "'s'").unwrap();
        let c = g.add_node("c", GrammarType::Terminal, "'c'").unwrap();
        g.add_symbol(s, c).unwrap();
        let mut ctx = context(g, "S");
        assert_eq!(TermHandler.handle(&mut ctx).unwrap(), Flow::Abort);
        assert_eq!(ctx.rendered(), "");
    }

    #[test]
    fn test_malformed_terminal_is_fatal() {
        let mut g = Grammar::new("S");
        g.add_node("S", GrammarType::Terminal, "'open").unwrap();
        let mut ctx = context(g, "S");
        assert!(matches!(
            TermHandler.handle(&mut ctx),
            Err(GenError::MalformedTerminal { .. })
        ));
    }

    #[test]
    fn test_optional_content_tag() {
        let build = |content: &str| {
            let mut g = Grammar::new("S");
            let s = g.add_node("S", GrammarType::Optional, content).unwrap();
            let c = g.add_node("c", GrammarType::Terminal, "'c'").unwrap();
            g.add_symbol(s, c).unwrap();
            g
        };
        let handler = OptionalHandler::new(OptionalPolicy::ContentTag("keep".into()));

        let mut ctx = context(build("keep"), "S");
        handler.handle(&mut ctx).unwrap();
        assert_eq!(pending(&mut ctx), vec!["c"]);

        let mut ctx = context(build("drop"), "S");
        handler.handle(&mut ctx).unwrap();
        assert!(pending(&mut ctx).is_empty());
    }

    #[test]
    fn test_plus_repeats_whole_sequence() {
        let mut g = Grammar::new("S");
        let s = g.add_node("S", GrammarType::Plus, "").unwrap();
        for name in ["x", "y"] {
            let c = g.add_node(name, GrammarType::Terminal, "'c'").unwrap();
            g.add_symbol(s, c).unwrap();
        }
        let mut ctx = context(g, "S");
        PlusHandler.handle(&mut ctx).unwrap();
        let names = pending(&mut ctx);

        assert!(!names.is_empty() && names.len() <= 20);
        assert_eq!(names.len() % 2, 0);
        for pair in names.chunks(2) {
            assert_eq!(pair, ["x", "y"]);
        }
    }

    #[test]
    fn test_rep_probability_bounds() {
        let build = || {
            let mut g = Grammar::new("S");
            let s = g.add_node("S", GrammarType::Rep, "").unwrap();
            let c = g.add_node("c", GrammarType::Terminal, "'c'").unwrap();
            g.add_symbol(s, c).unwrap();
            Arc::new(g)
        };
        for (p, expected) in [(0.0, 0), (1.0, 1)] {
            let mut config = GeneratorConfig::new().with_seed(1);
            config.rep_probability = p;
            let options = ContextOptions {
                config,
                ..Default::default()
            };
            let mut ctx = Context::new(build(), "S", options).unwrap();
            RepHandler.handle(&mut ctx).unwrap();
            assert_eq!(pending(&mut ctx).len(), expected);
        }
    }

    #[test]
    fn test_rep_with_nan_probability_does_not_panic() {
        let mut g = Grammar::new("S");
        let s = g.add_node("S", GrammarType::Rep, "").unwrap();
        let c = g.add_node("c", GrammarType::Terminal, "'c'").unwrap();
        g.add_symbol(s, c).unwrap();

        let mut config = GeneratorConfig::new().with_seed(1);
        config.rep_probability = f64::NAN;
        let options = ContextOptions {
            config,
            ..Default::default()
        };
        let mut ctx = Context::new(Arc::new(g), "S", options).unwrap();
        assert_eq!(RepHandler.handle(&mut ctx).unwrap(), Flow::Expanded);
        assert!(pending(&mut ctx).len() <= 1);
    }

    #[test]
    fn test_sub_passes() {
        let mut g = Grammar::new("S");
        g.add_node("S", GrammarType::Sub, "").unwrap();
        let mut ctx = context(g, "S");
        assert_eq!(SubHandler.handle(&mut ctx).unwrap(), Flow::Pass);
        assert_eq!(ctx.stack().len(), 1);
    }
}
