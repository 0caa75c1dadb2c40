//! CLI layer for NLQ-RS.
//!
//! Provides the command-line interface using clap, with commands for
//! initializing the database, serving HTTP and running one-shot queries.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
