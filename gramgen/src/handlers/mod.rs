//! # Handlers
//!
//! A handler processes the symbol on top of a context's stack when that
//! symbol's grammar type is in its [`TypeSet`]. Handlers are registered on a
//! [`Chain`](crate::chain::Chain) in priority order; for each symbol the
//! chain runs the accepting handlers one after another until one of them
//! returns something other than [`Flow::Pass`].
//!
//! ## Built-in handlers
//!
//! | Handler | Types | Behavior |
//! |---------|-------|----------|
//! | [`CatHandler`] | Production, Catenate | expand all children in order |
//! | [`OrHandler`] | Or, Choice | expand one child chosen uniformly |
//! | [`WeightedHandler`] | Or, Choice | distance-aware choice, see [`Mode`](crate::config::Mode) |
//! | [`IdHandler`] | Id | follow the reference to its production |
//! | [`TermHandler`] | Terminal | append the terminal text |
//! | [`OptionalHandler`] | Optional | expand children or skip |
//! | [`PlusHandler`] | Plus | expand children one or more times |
//! | [`RepHandler`] | Rep | expand children zero or one time |
//! | [`SubHandler`] | Sub, Ext | pass |
//! | [`TraceHandler`] | all | log the dispatch |
//! | [`MonitorHandler`] | all | evaluate constraints |

mod monitor;
mod structural;
mod weighted;

pub use monitor::MonitorHandler;
pub use structural::{
    CatHandler, IdHandler, OptionalHandler, OptionalPolicy, OrHandler, PlusHandler, RepHandler,
    SubHandler, TermHandler, TraceHandler,
};
pub use weighted::WeightedHandler;

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::error::GenResult;
use crate::grammar::TypeSet;

pub const CAT_HANDLER: &str = "cat_handler";
pub const OR_HANDLER: &str = "or_handler";
pub const ID_HANDLER: &str = "id_handler";
pub const OPTIONAL_HANDLER: &str = "bracket_handler";
pub const PLUS_HANDLER: &str = "plus_handler";
pub const TERMINAL_HANDLER: &str = "terminal_handler";
pub const SUB_HANDLER: &str = "sub_handler";
pub const REP_HANDLER: &str = "rep_handler";
pub const TRACE_HANDLER: &str = "trace_handler";
pub const WEIGHTED_HANDLER: &str = "weight";
pub const MONITOR_HANDLER: &str = "monitor";

/// What the chain does after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Not handled here; continue with the next accepting handler.
    Pass,
    /// The symbol was consumed; end its round.
    Expanded,
    /// The branch was dropped; end its round.
    Abort,
}

/// A unit of expansion logic.
///
/// Handlers hold no per-run state. Everything a run mutates lives in the
/// [`Context`], so one handler instance can serve many runs at once.
pub trait Handler: Send + Sync {
    /// Identifier used in logs and for lookup.
    fn name(&self) -> &str;

    /// Grammar types this handler is dispatched for.
    fn accepts(&self) -> TypeSet;

    /// Per-symbol guard checked after the type filter.
    fn admits(&self, _ctx: &Context) -> bool {
        true
    }

    /// Processes the symbol on top of `ctx`'s stack.
    ///
    /// An `Err` aborts the whole run.
    fn handle(&self, ctx: &mut Context) -> GenResult<Flow>;
}

impl fmt::Debug for dyn Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name())
            .field("accepts", &self.accepts())
            .finish()
    }
}

/// The handlers of the default chain, in registration order.
pub fn defaults() -> Vec<Arc<dyn Handler>> {
    vec![
        Arc::new(TraceHandler),
        Arc::new(MonitorHandler),
        Arc::new(CatHandler),
        Arc::new(WeightedHandler),
        Arc::new(IdHandler),
        Arc::new(TermHandler),
        Arc::new(OptionalHandler::default()),
        Arc::new(PlusHandler),
        Arc::new(RepHandler),
        Arc::new(SubHandler),
    ]
}
