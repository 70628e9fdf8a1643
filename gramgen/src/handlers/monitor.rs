//! Constraint evaluation ahead of structural expansion.

use super::{Flow, Handler, MONITOR_HANDLER};
use crate::context::Context;
use crate::error::GenResult;
use crate::grammar::TypeSet;

/// Runs the context's constraints on every dispatch, then passes.
///
/// Register it before the structural handlers so constraint operations
/// take effect on the symbol being dispatched.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitorHandler;

impl Handler for MonitorHandler {
    fn name(&self) -> &str {
        MONITOR_HANDLER
    }

    fn accepts(&self) -> TypeSet {
        TypeSet::ALL_TYPES
    }

    fn admits(&self, ctx: &Context) -> bool {
        ctx.constraints().is_some_and(|c| !c.is_empty())
    }

    fn handle(&self, ctx: &mut Context) -> GenResult<Flow> {
        if let Some(constraints) = ctx.constraints() {
            constraints.apply(ctx);
        }
        Ok(Flow::Pass)
    }
}
