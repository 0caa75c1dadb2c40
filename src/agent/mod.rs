//! Natural-language query pipeline.
//!
//! Translates free text into a whitelisted, read-only filter through a
//! remote LLM and runs it against the record store. Uses a pluggable
//! provider abstraction with Gemini and `OpenRouter` backends.
//!
//! # Architecture
//!
//! ```text
//! QueryRequest → Orchestrator
//!   ├── PromptBuilder (instructions + whitelist + <query>)
//!   ├── ProviderGateway → google | openrouter (retried once if transient)
//!   ├── parser::parse (first balanced JSON object → Filter)
//!   ├── filter::validate (whitelist, operators, types → ValidatedFilter)
//!   └── QueryExecutor → RecordStore::find (capped at limit)
//! ```

pub mod client;
pub mod config;
pub mod executor;
pub mod filter;
pub mod message;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod request;

// Re-export key types
pub use client::{ProviderGateway, ProviderResponse, create_gateway};
pub use config::AgentConfig;
pub use executor::QueryExecutor;
pub use filter::{Condition, Filter, Predicate, ValidatedFilter};
pub use orchestrator::{Orchestrator, PipelineState, QueryResult};
pub use prompt::PromptBuilder;
pub use provider::LlmProvider;
pub use request::{ProviderKind, QueryRequest, ValidatedRequest};
