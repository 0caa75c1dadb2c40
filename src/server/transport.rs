//! HTTP transport.
//!
//! Binds the router to a TCP listener and shuts down gracefully on ctrl-c.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::routes::{AppState, router};
use crate::agent::Orchestrator;

/// Starts the HTTP server on `addr` and runs until ctrl-c.
///
/// In-flight queries are cancelled when shutdown begins.
///
/// # Errors
///
/// Returns an error if the server fails to bind or encounters a runtime error.
pub async fn serve(orchestrator: Arc<Orchestrator>, addr: &str) -> anyhow::Result<()> {
    let ct = CancellationToken::new();
    let app = router(AppState::new(orchestrator, ct.child_token()));

    let tcp_listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %tcp_listener.local_addr()?, "nlq-rs HTTP server listening");

    axum::serve(tcp_listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
            ct.cancel();
        })
        .await?;

    Ok(())
}
