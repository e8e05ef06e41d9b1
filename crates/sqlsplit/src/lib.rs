//! Statement splitting and classification for learner SQL.
//!
//! Input arrives as free-form text that may hold several statements, string
//! literals with embedded semicolons, comments and dollar-quoted function
//! bodies. The splitter walks the text once with a small state machine
//! instead of trying to express PostgreSQL lexing as regular expressions.

mod classify;
mod splitter;

pub use classify::CommandKind;
pub use splitter::{split_statements, RawStatement};
