//! Generation benchmarks using criterion.
//!
//! Benchmarks grammar preparation and full generation runs in normal and
//! shrink mode over a small arithmetic expression grammar.
//!
//! Run with: cargo bench --bench generation_bench

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gramgen::{
    BinaryConstraint, Chain, ConstraintGraph, Context, ContextOptions, GeneratorConfig, Grammar,
    GrammarType, Mode,
};

/// ```text
/// expr   -> term { ('+' | '-') term }
/// term   -> factor { ('*' | '/') factor }
/// factor -> "[0-9]{1,3}" | '(' expr ')'
/// ```
fn arithmetic() -> Grammar {
    fn binary(g: &mut Grammar, name: &str, operand: &str, ops: [&str; 2]) {
        let root = g.add_node(name, GrammarType::Production, name).unwrap();
        let cat = g.add_node(format!("{}_cat", name), GrammarType::Catenate, "").unwrap();
        let first = g.add_node(format!("{}_first", name), GrammarType::Id, operand).unwrap();
        let rep = g.add_node(format!("{}_rep", name), GrammarType::Rep, "").unwrap();
        let step = g.add_node(format!("{}_step", name), GrammarType::Catenate, "").unwrap();
        let op = g.add_node(format!("{}_op", name), GrammarType::Or, "").unwrap();
        let lhs = g
            .add_node(format!("{}_op0", name), GrammarType::Terminal, format!("'{}'", ops[0]))
            .unwrap();
        let rhs = g
            .add_node(format!("{}_op1", name), GrammarType::Terminal, format!("'{}'", ops[1]))
            .unwrap();
        let next = g.add_node(format!("{}_next", name), GrammarType::Id, operand).unwrap();
        g.add_symbol(root, cat).unwrap();
        g.add_symbol(cat, first).unwrap();
        g.add_symbol(cat, rep).unwrap();
        g.add_symbol(rep, step).unwrap();
        g.add_symbol(step, op).unwrap();
        g.add_symbol(step, next).unwrap();
        g.add_symbol(op, lhs).unwrap();
        g.add_symbol(op, rhs).unwrap();
    }

    let mut g = Grammar::new("expr");
    binary(&mut g, "expr", "term", ["+", "-"]);
    binary(&mut g, "term", "factor", ["*", "/"]);

    let factor = g.add_node("factor", GrammarType::Production, "factor").unwrap();
    let or = g.add_node("factor_or", GrammarType::Or, "").unwrap();
    let num = g.add_node("factor_num", GrammarType::Terminal, "\"[0-9]{1,3}\"").unwrap();
    let group = g.add_node("factor_group", GrammarType::Catenate, "").unwrap();
    let open = g.add_node("factor_open", GrammarType::Terminal, "'('").unwrap();
    let inner = g.add_node("factor_expr", GrammarType::Id, "expr").unwrap();
    let close = g.add_node("factor_close", GrammarType::Terminal, "')'").unwrap();
    g.add_symbol(factor, or).unwrap();
    g.add_symbol(or, num).unwrap();
    g.add_symbol(or, group).unwrap();
    g.add_symbol(group, open).unwrap();
    g.add_symbol(group, inner).unwrap();
    g.add_symbol(group, close).unwrap();
    g
}

fn prepared() -> Arc<Grammar> {
    let mut g = arithmetic();
    g.merge_production().unwrap();
    g.build_shortest_notation();
    Arc::new(g)
}

/// Benchmark reference linking and distance analysis
fn bench_prepare(c: &mut Criterion) {
    c.bench_function("prepare_arithmetic", |b| {
        b.iter(|| {
            let mut g = arithmetic();
            g.merge_production().unwrap();
            black_box(g.build_shortest_notation())
        });
    });
}

/// Benchmark complete runs, rendering included
fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    let grammar = prepared();
    let chain = Chain::with_defaults("bench");

    for mode in [Mode::Normal, Mode::Shrink] {
        group.bench_with_input(BenchmarkId::new("mode", format!("{:?}", mode)), &mode, |b, &mode| {
            let mut seed = 0;
            b.iter(|| {
                seed += 1;
                // Normal mode is bounded by a nesting limit.
                let mut constraints = ConstraintGraph::new();
                constraints.add_binary_constraint(BinaryConstraint::max_limit(
                    "factor_group",
                    "factor_group",
                    4,
                ));
                let options = ContextOptions {
                    constraints: Some(Arc::new(constraints)),
                    config: GeneratorConfig::new().with_seed(seed).with_mode(mode),
                    ..Default::default()
                };
                let mut ctx = Context::new(Arc::clone(&grammar), "expr", options).unwrap();
                chain.run(&mut ctx).unwrap();
                black_box(ctx.render(None).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_prepare, bench_generate);
criterion_main!(benches);
