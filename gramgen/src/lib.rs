//! Grammar-Driven Test Input Generator
//!
//! This crate turns a context-free grammar, held as a directed graph of
//! typed nodes, into random sentences of the language it describes. It is
//! meant for fuzzing parsers and other programs whose inputs follow a
//! grammar.
//!
//! - Arena-backed graph with string identities and ordered edges
//! - Reference linking and distance-to-terminal analysis of grammars
//! - A configurable chain of expansion handlers driving a symbol stack
//! - Shrink mode biasing choices towards short derivations
//! - Trace-pattern constraints for context-sensitive rules
//! - Per-run derivation trees, rendered with regex-expanded terminals
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌────────────┐
//! │ Grammar  │──►│ Context  │◄─►│   Chain   │──►│ Derivation │
//! │ (shared) │   │ (per run)│   │ (handlers)│   │  → text    │
//! └──────────┘   └──────────┘   └───────────┘   └────────────┘
//! ```
//!
//! A grammar is built once, prepared with [`Grammar::merge_production`] and
//! [`Grammar::build_shortest_notation`], and then shared read-only. Each run
//! gets its own [`Context`], which a [`Chain`] drives round by round until
//! the symbol stack is empty.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use gramgen::{Chain, Context, ContextOptions, GeneratorConfig, Grammar, GrammarType, Mode};
//!
//! // S -> 'a' S | 'b'
//! let mut g = Grammar::new("S");
//! let s = g.add_node("S", GrammarType::Production, "S")?;
//! let or = g.add_node("S_or", GrammarType::Or, "")?;
//! // ...
//! g.merge_production()?;
//! g.build_shortest_notation();
//!
//! let chain = Chain::with_defaults("default");
//! let options = ContextOptions {
//!     config: GeneratorConfig::new().with_seed(7).with_mode(Mode::Shrink),
//!     ..Default::default()
//! };
//! let mut ctx = Context::new(Arc::new(g), "S", options)?;
//! let result = chain.run(&mut ctx)?;
//! println!("{}", ctx.render(None)?);
//! ```

pub mod chain;
pub mod config;
pub mod constraint;
pub mod context;
pub mod derivation;
pub mod error;
pub mod grammar;
pub mod graph;
pub mod handlers;

pub use chain::{generate, Chain, Round};
pub use config::{ConfigError, GeneratorConfig, Mode, RevoteConfig};
pub use constraint::{BinaryConstraint, ConstraintGraph, Operation, TracePattern};
pub use context::{Context, ContextOptions, GenerationResult, Symbol};
pub use derivation::Derivation;
pub use error::{GenError, GenResult};
pub use grammar::{Grammar, GrammarError, GrammarType, Node, NodeId, TypeSet, UNREACHABLE};
pub use handlers::{Flow, Handler};
