//! Distance-aware alternation.
//!
//! In [`Mode::Shrink`] the children of an alternation are split into
//! *candidates*, whose distance to an all-terminal derivation is strictly
//! below the alternation's own, and the *repechage* holding the rest. The
//! choice is uniform over the candidates and falls back to the repechage
//! only when there are none. Since each candidate brings the derivation
//! closer to termination, recursive grammars wind down.
//!
//! In [`Mode::Normal`] the choice is uniform over all children.

use std::sync::Arc;

use rand::Rng;
use tracing::trace;

use super::{Flow, Handler, WEIGHTED_HANDLER};
use crate::config::Mode;
use crate::context::Context;
use crate::error::GenResult;
use crate::grammar::{Grammar, NodeId, TypeSet};

#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedHandler;

impl WeightedHandler {
    /// Indices of the children eligible in shrink mode.
    fn shrink_pool(grammar: &Grammar, own: u32, children: &[NodeId]) -> Vec<usize> {
        let (candidates, repechage): (Vec<usize>, Vec<usize>) = (0..children.len()).partition(|&i| {
            grammar
                .node(children[i])
                .is_some_and(|child| child.distance() < own)
        });
        if candidates.is_empty() {
            repechage
        } else {
            candidates
        }
    }
}

impl Handler for WeightedHandler {
    fn name(&self) -> &str {
        WEIGHTED_HANDLER
    }

    fn accepts(&self) -> TypeSet {
        TypeSet::OR | TypeSet::CHOICE
    }

    fn handle(&self, ctx: &mut Context) -> GenResult<Flow> {
        let Some(symbol) = ctx.current() else {
            return Ok(Flow::Abort);
        };
        let grammar = Arc::clone(ctx.grammar());
        let Some(node) = grammar.node(symbol.node) else {
            return Ok(Flow::Abort);
        };
        let children = node.symbols();
        if children.is_empty() {
            return Ok(Flow::Pass);
        }
        ctx.pop();

        let mut idx = match ctx.mode() {
            Mode::Shrink => {
                let pool = Self::shrink_pool(&grammar, node.distance(), &children);
                pool[ctx.rng().gen_range(0..pool.len())]
            }
            Mode::Normal => ctx.rng().gen_range(0..children.len()),
        };

        let revote = ctx.config().revote;
        if let Some(revote) = revote {
            let votes: u64 = children
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != idx)
                .map(|(_, &c)| u64::from(ctx.edge_visits(symbol.node, c)))
                .sum();
            let chosen = u64::from(ctx.edge_visits(symbol.node, children[idx]));
            let looping = if votes > 0 {
                chosen > u64::from(revote.ratio) * votes
            } else {
                chosen > u64::from(revote.floor)
            };
            if looping {
                trace!(node = node.name(), chosen, votes, "re-voting over-visited edge");
                idx = ctx.rng().gen_range(0..children.len());
            }
        }

        ctx.expand(symbol, &[children[idx]])?;
        Ok(Flow::Expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GeneratorConfig, RevoteConfig};
    use crate::context::ContextOptions;
    use crate::grammar::GrammarType;

    /// `S -> 'a' S | 'b'`, prepared.
    fn recursive() -> Arc<Grammar> {
        let mut g = Grammar::new("S");
        let s = g.add_node("S", GrammarType::Production, "S").unwrap();
        let or = g.add_node("S_or", GrammarType::Or, "").unwrap();
        let cat = g.add_node("S_cat", GrammarType::Catenate, "").unwrap();
        let a = g.add_node("S_a", GrammarType::Terminal, "'a'").unwrap();
        let id = g.add_node("S_ref", GrammarType::Id, "S").unwrap();
        let b = g.add_node("S_b", GrammarType::Terminal, "'b'").unwrap();
        g.add_symbol(s, or).unwrap();
        g.add_symbol(or, cat).unwrap();
        g.add_symbol(or, b).unwrap();
        g.add_symbol(cat, a).unwrap();
        g.add_symbol(cat, id).unwrap();
        g.merge_production().unwrap();
        g.build_shortest_notation();
        Arc::new(g)
    }

    fn choose(config: GeneratorConfig) -> String {
        let options = ContextOptions {
            config,
            ..Default::default()
        };
        let grammar = recursive();
        let mut ctx = Context::new(grammar.clone(), "S_or", options).unwrap();
        assert_eq!(WeightedHandler.handle(&mut ctx).unwrap(), Flow::Expanded);
        ctx.end_round();
        let top = ctx.current().unwrap();
        grammar.node(top.node).unwrap().name().to_string()
    }

    #[test]
    fn test_shrink_picks_only_closer_children() {
        for seed in 0..50 {
            let config = GeneratorConfig::new().with_seed(seed).with_mode(Mode::Shrink);
            assert_eq!(choose(config), "S_b");
        }
    }

    #[test]
    fn test_normal_reaches_every_child() {
        let picks: Vec<_> = (0..50)
            .map(|seed| choose(GeneratorConfig::new().with_seed(seed)))
            .collect();
        assert!(picks.iter().any(|p| p == "S_b"));
        assert!(picks.iter().any(|p| p == "S_cat"));
    }

    #[test]
    fn test_shrink_pool_falls_back_to_repechage() {
        let mut g = Grammar::new("S");
        let s = g.add_node("S", GrammarType::Or, "").unwrap();
        let x = g.add_node("x", GrammarType::Terminal, "'x'").unwrap();
        let y = g.add_node("y", GrammarType::Terminal, "'y'").unwrap();
        g.add_symbol(s, x).unwrap();
        g.add_symbol(s, y).unwrap();
        assert_eq!(WeightedHandler::shrink_pool(&g, 0, &[x, y]), vec![0, 1]);
        assert_eq!(WeightedHandler::shrink_pool(&g, 1, &[x, y]), vec![0, 1]);
    }

    #[test]
    fn test_revote_keeps_valid_choice() {
        let mut config = GeneratorConfig::new().with_seed(3).with_mode(Mode::Shrink);
        config.revote = Some(RevoteConfig { ratio: 0, floor: 0 });
        let name = choose(config);
        assert!(name == "S_b" || name == "S_cat");
    }
}
