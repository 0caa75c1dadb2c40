//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::agent::config::DEFAULT_DB_PATH;

/// NLQ-RS: natural-language queries over the users table.
///
/// Translates free text into a whitelisted filter via a remote LLM and
/// runs it read-only against the users database.
#[derive(Parser, Debug)]
#[command(name = "nlq-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the users database file.
    ///
    /// Defaults to `.nlq/users.db` in the current directory.
    #[arg(short, long, env = "NLQ_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Enable verbose (debug) logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the users database.
    ///
    /// Creates the database file and schema if they don't exist.
    #[command(after_help = r#"Examples:
  nlq-rs init                        # Initialize .nlq/users.db
  nlq-rs --db-path ./users.db init   # Initialize with custom path
"#)]
    Init,

    /// Start the HTTP query server.
    #[cfg(feature = "server")]
    #[command(after_help = r#"Examples:
  nlq-rs serve                       # Listen on 127.0.0.1:8000
  nlq-rs serve --bind 0.0.0.0:8080
"#)]
    Serve {
        /// Address to bind to.
        #[arg(long, env = "NLQ_BIND")]
        bind: Option<String>,
    },

    /// Translate a question and run it against the users table.
    #[command(after_help = r#"Examples:
  nlq-rs query "find user email is john@example.com" -p google
  nlq-rs query "show inactive users" -p openrouter -l 5
  nlq-rs --format json query "users created in 2024" -p google | jq '.[].email'
"#)]
    Query {
        /// Natural-language question.
        text: String,

        /// Provider backend (google, openrouter).
        #[arg(short, long, env = "NLQ_PROVIDER")]
        provider: Option<String>,

        /// Maximum number of records (1-100).
        #[arg(short, long, allow_negative_numbers = true)]
        limit: Option<i64>,

        /// Directory containing prompt template overrides.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,
    },

    /// Print the prompt that would be sent for a question.
    Prompt {
        /// Natural-language question.
        text: String,

        /// Directory containing prompt template overrides.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,
    },

    /// Write the default prompt template for customization.
    ///
    /// Existing files are left untouched.
    InitPrompts {
        /// Target directory (defaults to `~/.config/nlq-rs/prompts`).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
    }
}
