//! Shared domain types for the sqlab grading service.

pub mod errors;
pub mod naming;

mod attempt;
mod credentials;
mod execution;
mod question;

pub use attempt::*;
pub use credentials::*;
pub use errors::{SqlabError, SqlabResult};
pub use execution::*;
pub use question::*;
