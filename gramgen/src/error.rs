//! Generation errors.
//!
//! Only conditions that must stop a run are errors. A missing production
//! reference or a structurally odd node aborts the current branch and is
//! reported through `tracing` instead.

use thiserror::Error;

use crate::grammar::GrammarError;

/// Errors that abort a generation run.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("start symbol `{0}` is not in the grammar")]
    UnknownStartSymbol(String),

    #[error("malformed terminal {content} at node `{node}`")]
    MalformedTerminal { node: String, content: String },

    #[error("cannot synthesize text for regex `{pattern}`: {source}")]
    RegexSynthesis {
        pattern: String,
        #[source]
        source: rand_regex::Error,
    },

    #[error("deadline exceeded after {rounds} rounds")]
    DeadlineExceeded { rounds: u64 },

    #[error(transparent)]
    Grammar(#[from] GrammarError),
}

/// Result type for generation.
pub type GenResult<T> = Result<T, GenError>;
