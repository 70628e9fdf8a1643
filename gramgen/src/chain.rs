//! # Handler Chain
//!
//! An ordered list of [`Handler`]s and the loop that drives a [`Context`]
//! through it.
//!
//! ## Dispatch
//!
//! One call to [`Chain::next`] is one *round*: it dispatches the symbol on
//! top of the stack and returns control to the caller. Handlers are looked
//! up through a table built at registration time that maps each
//! [`GrammarType`] to the indices of the handlers accepting it, in
//! registration order. Within a round:
//!
//! 1. An empty stack finishes the run.
//! 2. Accepting handlers at or past the context's cursor are tried in order.
//!    The cursor is advanced past each one before it runs.
//! 3. [`Flow::Pass`] continues with the next accepting handler;
//!    [`Flow::Expanded`] and [`Flow::Abort`] end the scan.
//! 4. A symbol no handler consumed is popped without expansion.
//! 5. Children buffered during the round are moved onto the stack.
//!
//! [`Chain::run`] repeats rounds until the run finishes, checking the
//! context's deadline between rounds.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::context::{Context, GenerationResult};
use crate::error::{GenError, GenResult};
use crate::grammar::GrammarType;
use crate::handlers::{self, Flow, Handler};

/// Outcome of one dispatch round.
#[derive(Debug)]
pub enum Round {
    /// More symbols are pending.
    Continue,
    /// The stack ran dry; holds the completion snapshot.
    Finished(Box<GenerationResult>),
}

/// An ordered, named list of handlers.
///
/// Cloning is cheap: handlers are shared.
#[derive(Debug, Clone)]
pub struct Chain {
    name: String,
    handlers: Vec<Arc<dyn Handler>>,
    /// Handler indices per grammar type, in registration order.
    table: Vec<Vec<usize>>,
}

impl Chain {
    /// Creates an empty chain.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: Vec::new(),
            table: vec![Vec::new(); GrammarType::ALL.len()],
        }
    }

    /// Creates a chain with the built-in handlers registered.
    pub fn with_defaults(name: impl Into<String>) -> Self {
        let mut chain = Self::new(name);
        for handler in handlers::defaults() {
            chain.add_handler(handler);
        }
        chain
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a handler; it runs after every handler already registered.
    pub fn add_handler(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        let idx = self.handlers.len();
        let accepts = handler.accepts();
        for ty in GrammarType::ALL {
            if accepts.accepts(ty) {
                self.table[ty.index()].push(idx);
            }
        }
        self.handlers.push(handler);
        self
    }

    pub fn handlers(&self) -> &[Arc<dyn Handler>] {
        &self.handlers
    }

    /// Looks up a registered handler by name.
    pub fn handler(&self, name: &str) -> Option<&Arc<dyn Handler>> {
        self.handlers.iter().find(|h| h.name() == name)
    }

    /// Runs one dispatch round.
    ///
    /// Calling this on a finished context dispatches nothing and returns
    /// the completion snapshot again.
    pub fn next(&self, ctx: &mut Context) -> GenResult<Round> {
        if ctx.is_finished() {
            warn!(chain = %self.name, "next called on a finished context");
            return Ok(Round::Finished(Box::new(ctx.snapshot())));
        }
        let Some(symbol) = ctx.current() else {
            return Ok(self.complete(ctx));
        };
        let Some(kind) = ctx.grammar().node(symbol.node).map(|n| n.kind()) else {
            warn!(chain = %self.name, node = symbol.node.index(), "symbol is not in the grammar");
            ctx.pop();
            return Ok(self.end_round(ctx));
        };

        if ctx.cursor() == 0 {
            ctx.record_trace(symbol.node);
        }

        for &idx in &self.table[kind.index()] {
            if idx < ctx.cursor() {
                continue;
            }
            let handler = &self.handlers[idx];
            if !handler.admits(ctx) {
                continue;
            }
            ctx.set_cursor(idx + 1);
            match handler.handle(ctx)? {
                Flow::Pass => {}
                Flow::Expanded | Flow::Abort => break,
            }
        }

        if ctx.current() == Some(symbol) {
            ctx.pop();
        }
        Ok(self.end_round(ctx))
    }

    fn end_round(&self, ctx: &mut Context) -> Round {
        ctx.end_round();
        if ctx.stack().is_empty() {
            self.complete(ctx)
        } else {
            Round::Continue
        }
    }

    fn complete(&self, ctx: &mut Context) -> Round {
        ctx.finish();
        debug!(
            chain = %self.name,
            rounds = ctx.rounds(),
            coverage = ctx.edge_coverage(),
            "generation finished"
        );
        Round::Finished(Box::new(ctx.snapshot()))
    }

    /// Runs rounds until the context finishes.
    ///
    /// The deadline is checked before each round, never inside one.
    pub fn run(&self, ctx: &mut Context) -> GenResult<GenerationResult> {
        loop {
            if !ctx.is_finished() && ctx.deadline_exceeded() {
                return Err(GenError::DeadlineExceeded { rounds: ctx.rounds() });
            }
            if let Round::Finished(result) = self.next(ctx)? {
                return Ok(*result);
            }
        }
    }
}

/// Drives `ctx` through `chain` to completion.
pub fn generate(chain: &Chain, ctx: &mut Context) -> GenResult<GenerationResult> {
    chain.run(ctx)
}
