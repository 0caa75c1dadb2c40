//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::agent::{AgentConfig, Orchestrator, PromptBuilder, QueryRequest, create_gateway};
use crate::cli::output::{OutputFormat, format_query_result};
use crate::cli::parser::{Cli, Commands};
use crate::core::Whitelist;
use crate::error::{CommandError, Result};
use crate::storage::SqliteStore;

type CmdResult = Result<String, CommandError>;

/// Executes the CLI command.
///
/// # Returns
///
/// Output string to print on stdout.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> CmdResult {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.get_db_path();

    match &cli.command {
        Commands::Init => cmd_init(&db_path, format),
        #[cfg(feature = "server")]
        Commands::Serve { bind } => cmd_serve(&db_path, bind.as_deref()),
        Commands::Query {
            text,
            provider,
            limit,
            prompt_dir,
        } => {
            let request = QueryRequest {
                query: text.clone(),
                provider: provider.clone(),
                limit: *limit,
            };
            cmd_query(&db_path, &request, prompt_dir.as_deref(), format)
        }
        Commands::Prompt { text, prompt_dir } => cmd_prompt(&db_path, text, prompt_dir.as_deref()),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, CommandError> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}"))
    })
}

/// Loads configuration from the environment with the CLI database path.
fn load_config(db_path: &Path, prompt_dir: Option<&Path>) -> Result<AgentConfig, CommandError> {
    let mut builder = AgentConfig::builder().db_path(db_path);
    if let Some(dir) = prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    Ok(builder.from_env().build()?)
}

fn build_orchestrator(config: AgentConfig) -> Result<Orchestrator, CommandError> {
    let gateway = create_gateway(&config)?;
    let store = Arc::new(SqliteStore::new(&config.db_path));
    Ok(Orchestrator::new(gateway, store, config))
}

// ==================== Command Implementations ====================

fn cmd_init(db_path: &Path, format: OutputFormat) -> CmdResult {
    let store = SqliteStore::new(db_path);
    runtime()?.block_on(store.init())?;

    match format {
        OutputFormat::Text => Ok(format!(
            "Initialized users database at: {}\n",
            db_path.display()
        )),
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "success": true,
            "path": db_path.to_string_lossy(),
        }))),
    }
}

#[cfg(feature = "server")]
fn cmd_serve(db_path: &Path, bind: Option<&str>) -> CmdResult {
    let mut config = load_config(db_path, None)?;
    if let Some(addr) = bind {
        config.bind = addr.to_string();
    }
    let bind = config.bind.clone();
    let orchestrator = build_orchestrator(config)?;

    runtime()?
        .block_on(crate::server::serve(Arc::new(orchestrator), &bind))
        .map_err(|e| CommandError::ExecutionFailed(format!("HTTP server error: {e}")))?;

    Ok(String::new())
}

fn cmd_query(
    db_path: &Path,
    request: &QueryRequest,
    prompt_dir: Option<&Path>,
    format: OutputFormat,
) -> CmdResult {
    let config = load_config(db_path, prompt_dir)?;
    let orchestrator = build_orchestrator(config)?;
    let cancel = CancellationToken::new();

    let result = runtime()?.block_on(async {
        let ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrl_c.cancel();
            }
        });
        orchestrator.query(request, &cancel).await
    })?;

    Ok(format_query_result(&result, format))
}

fn cmd_prompt(db_path: &Path, text: &str, prompt_dir: Option<&Path>) -> CmdResult {
    let config = load_config(db_path, prompt_dir)?;
    let mut prompt = PromptBuilder::load(config.prompt_dir.as_deref())
        .with_max_predicates(config.max_predicates)
        .build(text, Whitelist::users());
    prompt.push('\n');
    Ok(prompt)
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> CmdResult {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptBuilder::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptBuilder::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt template: {e}"))
    })?;

    match format {
        OutputFormat::Text if written.is_empty() => Ok(format!(
            "Prompt template already exists in: {}\n",
            target_dir.display()
        )),
        OutputFormat::Text => Ok(written
            .iter()
            .map(|p| format!("Wrote prompt template: {}\n", p.display()))
            .collect()),
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "directory": target_dir.to_string_lossy(),
            "written": written.iter().map(|p| p.to_string_lossy()).collect::<Vec<_>>(),
        }))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli(db_path: PathBuf, format: &str, command: Commands) -> Cli {
        Cli {
            db_path: Some(db_path),
            verbose: false,
            format: format.to_string(),
            command,
        }
    }

    #[test]
    fn test_init_creates_database() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let db = dir.path().join("sub/users.db");
        let out = execute(&cli(db.clone(), "text", Commands::Init))
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert!(out.contains("Initialized users database"));
        assert!(db.exists());

        // Idempotent.
        assert!(execute(&cli(db, "json", Commands::Init)).is_ok());
    }

    #[test]
    fn test_prompt_contains_query() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let out = execute(&cli(
            dir.path().join("users.db"),
            "text",
            Commands::Prompt {
                text: "find john".to_string(),
                prompt_dir: Some(dir.path().to_path_buf()),
            },
        ))
        .unwrap_or_default();
        assert!(out.contains("<query>find john</query>"));
        assert!(out.contains("| email | text |"));
    }

    #[test]
    fn test_init_prompts_writes_once() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let command = || Commands::InitPrompts {
            dir: Some(dir.path().to_path_buf()),
        };
        let first = execute(&cli(dir.path().join("db"), "text", command())).unwrap_or_default();
        assert!(first.contains("Wrote prompt template"));
        let second = execute(&cli(dir.path().join("db"), "text", command())).unwrap_or_default();
        assert!(second.contains("already exists"));
    }

    #[test]
    fn test_query_rejects_unsupported_provider() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let result = execute(&cli(
            dir.path().join("users.db"),
            "text",
            Commands::Query {
                text: "anything".to_string(),
                provider: Some("anthropic".to_string()),
                limit: None,
                prompt_dir: None,
            },
        ));
        match result {
            Err(CommandError::Agent(e)) => assert_eq!(e.reason(), "unsupported_provider"),
            other => unreachable!("unexpected: {other:?}"),
        }
    }
}
