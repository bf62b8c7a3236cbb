use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use strudel_core::{ChangeQueue, FallbackAgent, PatternStore};

pub mod agent;
mod http_server;
pub mod protocol;

pub use agent::{CommandAgent, UnavailableAgent};
pub use http_server::{AppError, AppState, create_router};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// The pattern file the player loads.
    pub pattern_file: PathBuf,
    /// Directory served at `/`.
    pub static_dir: PathBuf,
    /// Program that handles changes the queue cannot apply literally.
    pub agent_command: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            pattern_file: PathBuf::from("patterns.js"),
            static_dir: PathBuf::from("."),
            agent_command: None,
        }
    }
}

/// Create shared state for the server
pub fn create_app_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let (agent, agent_ready): (Arc<dyn FallbackAgent>, bool) = match &config.agent_command {
        Some(command) => {
            let agent = CommandAgent::new(command)
                .with_context(|| format!("Invalid agent command '{}'", command))?;
            tracing::info!("Fallback agent: {}", agent.program());
            let agent: Arc<dyn FallbackAgent> = Arc::new(agent);
            (agent, true)
        }
        None => {
            tracing::warn!(
                "No agent command configured; changes whose text is missing will fail"
            );
            let agent: Arc<dyn FallbackAgent> = Arc::new(UnavailableAgent);
            (agent, false)
        }
    };

    let store = PatternStore::new(config.pattern_file.clone());
    Ok(AppState {
        queue: ChangeQueue::new(store, agent.clone()),
        agent,
        agent_ready,
        static_dir: config.static_dir.clone(),
    })
}

pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    if !config.pattern_file.exists() {
        tracing::warn!(
            "Pattern file {} does not exist yet; pattern reads will fail until it is written",
            config.pattern_file.display()
        );
    }

    let state = create_app_state(&config)?;
    let app = create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(
        "HTTP server listening on http://localhost:{} (pattern file: {})",
        config.port,
        config.pattern_file.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutting down");
}
