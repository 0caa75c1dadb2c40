//! # nlq-rs
//!
//! Natural-language queries over a users table.
//!
//! Free text is translated by a remote LLM (Google Gemini or `OpenRouter`)
//! into a structured filter, which is strictly parsed, checked against a
//! fixed field whitelist and run read-only with a bounded row count.
//!
//! ```text
//! text → PromptBuilder → ProviderGateway → parser → validator → QueryExecutor → records
//! ```
//!
//! The [`agent::Orchestrator`] sequences one request through those stages
//! and owns the timeout and single-retry policy.

pub mod agent;
pub mod cli;
pub mod core;
pub mod error;
#[cfg(feature = "server")]
pub mod server;
pub mod storage;

pub use agent::{AgentConfig, Orchestrator, QueryRequest, QueryResult};
pub use error::{AgentError, Result};
